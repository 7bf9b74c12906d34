pub mod archive;
pub mod config;
pub mod engine;
pub mod preferences;
pub mod remote;
pub mod storage;
pub mod util;

pub use archive::{PackError, PackedArchive, UnpackError, UnpackOptions, UnpackSummary};
pub use config::Config;
pub use engine::{
    EngineError, EngineEvent, EngineOptions, IdentifierError, Mode, Module, SnapshotEngine,
    UNKNOWN_MODULE,
};
pub use preferences::{FilePreferences, MemoryPreferences, PreferenceError, PreferenceStore};
pub use remote::{
    ArchiveGateway, DirectoryObjectStore, ObjectStore, RemoteError, Snapshot, SnapshotGateway,
};
pub use storage::{LocalStorage, MemoryStorage, StorageBackend};
