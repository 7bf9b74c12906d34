//! Module registry and completeness tracking

use std::collections::{BTreeMap, BTreeSet};

/// Name of the synthetic module that collects unclaimed identifiers.
pub const UNKNOWN_MODULE: &str = "Unknown";

/// A named group of identifiers a feature area is expected to capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    /// Identifiers this module expects to find in the store.
    pub required: BTreeSet<String>,
    /// The subset of `required` currently present in the store.
    pub file_list: BTreeSet<String>,
}

impl Module {
    pub fn new(name: impl Into<String>, required: BTreeSet<String>) -> Self {
        Self {
            name: name.into(),
            required,
            file_list: BTreeSet::new(),
        }
    }

    /// Every required identifier has been captured.
    pub fn is_complete(&self) -> bool {
        self.file_list == self.required
    }

    /// Required identifiers not yet present in the store.
    pub fn missing(&self) -> Vec<&str> {
        self.required
            .difference(&self.file_list)
            .map(String::as_str)
            .collect()
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_MODULE
    }
}

/// Registered modules plus the transient Unknown module.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Registry {
    modules: BTreeMap<String, Module>,
    unknown: Option<Module>,
}

impl Registry {
    /// Insert or replace a module, returning identifiers it shares with others.
    pub(crate) fn register(
        &mut self,
        name: String,
        required: BTreeSet<String>,
    ) -> BTreeMap<String, Vec<String>> {
        let overlaps = self
            .modules
            .values()
            .filter(|other| other.name != name)
            .filter_map(|other| {
                let shared: Vec<String> =
                    other.required.intersection(&required).cloned().collect();
                (!shared.is_empty()).then(|| (other.name.clone(), shared))
            })
            .collect();
        self.modules.insert(name.clone(), Module::new(name, required));
        overlaps
    }

    /// Recompute every module's `file_list` and the Unknown module.
    pub(crate) fn refresh(&mut self, inventory: &BTreeSet<String>) {
        let mut unclaimed = inventory.clone();
        for module in self.modules.values_mut() {
            module.file_list = module.required.intersection(inventory).cloned().collect();
            for identifier in &module.required {
                unclaimed.remove(identifier);
            }
        }

        self.unknown = (!unclaimed.is_empty()).then(|| Module {
            name: UNKNOWN_MODULE.to_string(),
            required: unclaimed.clone(),
            file_list: unclaimed,
        });
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Module> {
        if name == UNKNOWN_MODULE {
            return self.unknown.as_ref();
        }
        self.modules.get(name)
    }

    /// Registered modules sorted by name, then Unknown if present.
    pub(crate) fn all(&self) -> Vec<Module> {
        self.modules
            .values()
            .chain(self.unknown.iter())
            .cloned()
            .collect()
    }
}
