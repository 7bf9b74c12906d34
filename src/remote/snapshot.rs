use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use thiserror::Error;

/// Flat string metadata attached to a remote object.
pub type ObjectMetadata = BTreeMap<String, String>;

const NAME_KEY: &str = "name";
const DATE_KEY: &str = "date";
const FILE_LIST_KEY: &str = "fileList";
const FILE_LIST_SEPARATOR: &str = ",";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataDecodeError {
    #[error("missing metadata key {0:?}")]
    MissingKey(&'static str),
    #[error("invalid date {0:?}")]
    InvalidDate(String),
}

/// One archived copy of the whole snapshot store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Remote object name.
    pub name: String,
    /// Capture time, whole seconds.
    pub date: DateTime<Utc>,
    /// Identifiers present when the snapshot was taken.
    pub file_list: Vec<String>,
}

impl Snapshot {
    pub fn new(name: impl Into<String>, date: DateTime<Utc>, file_list: Vec<String>) -> Self {
        Self {
            name: name.into(),
            date: date.trunc_subsecs(0),
            file_list,
        }
    }

    pub fn to_metadata(&self) -> ObjectMetadata {
        ObjectMetadata::from([
            (NAME_KEY.to_string(), self.name.clone()),
            (
                DATE_KEY.to_string(),
                self.date.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (FILE_LIST_KEY.to_string(), self.file_list.join(FILE_LIST_SEPARATOR)),
        ])
    }

    pub fn from_metadata(metadata: &ObjectMetadata) -> Result<Self, MetadataDecodeError> {
        let name = metadata
            .get(NAME_KEY)
            .ok_or(MetadataDecodeError::MissingKey(NAME_KEY))?;
        let raw_date = metadata
            .get(DATE_KEY)
            .ok_or(MetadataDecodeError::MissingKey(DATE_KEY))?;
        let date = DateTime::parse_from_rfc3339(raw_date)
            .map_err(|_| MetadataDecodeError::InvalidDate(raw_date.clone()))?
            .with_timezone(&Utc);
        let raw_files = metadata
            .get(FILE_LIST_KEY)
            .ok_or(MetadataDecodeError::MissingKey(FILE_LIST_KEY))?;
        let file_list = if raw_files.is_empty() {
            Vec::new()
        } else {
            raw_files
                .split(FILE_LIST_SEPARATOR)
                .map(str::to_string)
                .collect()
        };

        Ok(Self::new(name.clone(), date, file_list))
    }
}
