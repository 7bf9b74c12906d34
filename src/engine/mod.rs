//! Snapshot engine
//!
//! The engine sits between an application and its backend. Every response the
//! application wants to make deterministic goes through
//! [`SnapshotEngine::capture_or_serve`] together with a caller-chosen
//! identifier; depending on the current [`Mode`] the bytes are recorded to the
//! store, replaced by previously recorded bytes, or passed through.
//!
//! Capture and replay failures never surface to the caller: they are logged
//! and the original bytes are returned so the application keeps running.
//!
//! The engine does not serialize concurrent calls. Two captures racing on the
//! same identifier are last-write-wins, and each call sees whatever mode is
//! current at the moment it checks.

mod error;
mod mode;
mod module;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::preferences::{PreferenceError, PreferenceStore, MODE_PREFERENCE_KEY};
use crate::remote::{RemoteError, Snapshot, SnapshotGateway};
use crate::storage::StorageBackend;

pub use error::{validate_identifier, EngineError, IdentifierError};
pub use mode::{resolve_start_mode, Mode, ParseModeError};
pub use module::{Module, UNKNOWN_MODULE};

use module::Registry;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Startup parameters for [`SnapshotEngine::initialize`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Mode used when nothing (valid) was persisted or restoring is off.
    pub default_mode: Mode,
    /// Start in the last persisted mode if there is one.
    pub restore_previous: bool,
    /// Directory holding one file per captured identifier.
    pub base_dir: PathBuf,
}

/// Change notifications for consumers that mirror engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ModeChanged(Mode),
    RegistryRefreshed,
}

pub struct SnapshotEngine {
    base_dir: PathBuf,
    mode: Mutex<Mode>,
    registry: Mutex<Registry>,
    storage: Arc<dyn StorageBackend>,
    preferences: Arc<dyn PreferenceStore>,
    events: broadcast::Sender<EngineEvent>,
}

impl SnapshotEngine {
    /// Set up the engine and take a first inventory of the store.
    ///
    /// If the base directory is missing and cannot be created the engine
    /// starts disabled instead of failing.
    pub async fn initialize(
        options: EngineOptions,
        storage: Arc<dyn StorageBackend>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        let mut mode = resolve_start_mode(
            options.default_mode,
            options.restore_previous,
            preferences.as_ref(),
        );

        if !storage.exists(&options.base_dir).await {
            if let Err(e) = storage.create_directory(&options.base_dir, true).await {
                tracing::error!(
                    path = %options.base_dir.display(),
                    error = %e,
                    "Unable to create snapshot directory, disabling snapshots"
                );
                mode = Mode::Disabled;
            }
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let engine = Self {
            base_dir: options.base_dir,
            mode: Mutex::new(mode),
            registry: Mutex::new(Registry::default()),
            storage,
            preferences,
            events,
        };
        engine.refresh_registry().await;

        tracing::debug!(
            mode = %mode,
            base_dir = %engine.base_dir.display(),
            "Snapshot engine initialized"
        );
        engine
    }

    pub fn mode(&self) -> Mode {
        *self.mode.lock()
    }

    /// Switch mode and persist it.
    ///
    /// The in-memory mode changes even when persisting fails; the error tells
    /// the caller the choice will not survive a restart.
    pub fn set_mode(&self, mode: Mode) -> Result<(), PreferenceError> {
        *self.mode.lock() = mode;
        let persisted = self.preferences.set_string(MODE_PREFERENCE_KEY, mode.as_str());
        let _ = self.events.send(EngineEvent::ModeChanged(mode));

        match &persisted {
            Ok(()) => tracing::info!(mode = %mode, "Snapshot mode changed"),
            Err(e) => tracing::warn!(mode = %mode, error = %e, "Failed to persist snapshot mode"),
        }
        persisted
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Receive mode and registry change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Register (or re-register) a module's required identifiers.
    ///
    /// Takes effect on the next registry refresh.
    pub fn register<I, S>(&self, name: impl Into<String>, required: I) -> Result<(), EngineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if name == UNKNOWN_MODULE {
            return Err(EngineError::ReservedModuleName(name));
        }

        let required: BTreeSet<String> = required.into_iter().map(Into::into).collect();
        let overlaps = self.registry.lock().register(name.clone(), required);
        for (other, shared) in overlaps {
            tracing::warn!(
                module = %name,
                other = %other,
                shared = ?shared,
                "Modules declare overlapping identifiers"
            );
        }
        Ok(())
    }

    /// Recompute module file lists from the store's current contents.
    pub async fn refresh_registry(&self) {
        let inventory = self.file_inventory().await;
        self.registry.lock().refresh(&inventory);
        let _ = self.events.send(EngineEvent::RegistryRefreshed);
    }

    /// Registered modules sorted by name, followed by Unknown if present.
    pub fn modules(&self) -> Vec<Module> {
        self.registry.lock().all()
    }

    pub fn module(&self, name: &str) -> Option<Module> {
        self.registry.lock().get(name).cloned()
    }

    /// Identifiers currently present in the store.
    ///
    /// An unreadable store is reported as empty.
    pub async fn file_inventory(&self) -> BTreeSet<String> {
        match self.storage.list_directory(&self.base_dir).await {
            Ok(paths) => paths
                .iter()
                .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
                .collect(),
            Err(e) => {
                tracing::warn!(
                    path = %self.base_dir.display(),
                    error = %e,
                    "Unable to list snapshot directory"
                );
                BTreeSet::new()
            }
        }
    }

    /// Record, replay or pass through `bytes` depending on the current mode.
    pub async fn capture_or_serve(&self, bytes: Vec<u8>, identifier: &str) -> Vec<u8> {
        match self.mode() {
            Mode::Recording => {
                let bytes = self.record(bytes, identifier).await;
                self.refresh_registry().await;
                bytes
            }
            Mode::Replaying => self.replay(bytes, identifier).await,
            Mode::Disabled => {
                tracing::debug!(identifier, "Snapshot mode is disabled");
                bytes
            }
        }
    }

    async fn record(&self, bytes: Vec<u8>, identifier: &str) -> Vec<u8> {
        let path = match self.identifier_path(identifier) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(identifier, error = %e, "Unable to record snapshot");
                return bytes;
            }
        };

        match self.storage.write_file(&path, &bytes).await {
            Ok(()) => tracing::info!(
                identifier,
                path = %path.display(),
                len = bytes.len(),
                "Recorded snapshot"
            ),
            Err(e) => tracing::error!(identifier, error = %e, "Unable to record snapshot"),
        }
        bytes
    }

    async fn replay(&self, bytes: Vec<u8>, identifier: &str) -> Vec<u8> {
        let path = match self.identifier_path(identifier) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(identifier, error = %e, "Unable to replay snapshot");
                return bytes;
            }
        };

        match self.storage.read_file(&path).await {
            Ok(recorded) => {
                tracing::debug!(identifier, len = recorded.len(), "Replayed snapshot");
                recorded
            }
            Err(e) => {
                tracing::error!(identifier, error = %e, "Unable to replay snapshot");
                bytes
            }
        }
    }

    fn identifier_path(&self, identifier: &str) -> Result<PathBuf, IdentifierError> {
        validate_identifier(identifier)?;
        Ok(self.base_dir.join(identifier))
    }

    /// Upload the whole store through `gateway`.
    pub async fn export_snapshot(
        &self,
        gateway: &dyn SnapshotGateway,
    ) -> Result<Snapshot, RemoteError> {
        let file_list: Vec<String> = self.file_inventory().await.into_iter().collect();
        gateway.upload(&self.base_dir, file_list).await
    }

    /// Replace the store with a remote snapshot and refresh the registry.
    pub async fn import_snapshot(
        &self,
        gateway: &dyn SnapshotGateway,
        snapshot: &Snapshot,
    ) -> Result<(), RemoteError> {
        gateway.download_and_install(snapshot, &self.base_dir).await?;
        self.refresh_registry().await;
        Ok(())
    }

    /// Identifiers required by more than one registered module.
    pub fn overlapping_identifiers(&self) -> HashMap<String, Vec<String>> {
        let mut owners: HashMap<String, Vec<String>> = HashMap::new();
        for module in self.modules().into_iter().filter(|m| !m.is_unknown()) {
            for identifier in module.required {
                owners.entry(identifier).or_default().push(module.name.clone());
            }
        }
        owners.retain(|_, names| names.len() > 1);
        owners
    }
}
