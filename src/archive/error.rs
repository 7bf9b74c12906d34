use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackError {
    #[error("Source is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("Failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
    #[error("Failed to encode archive: {0}")]
    Encode(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum UnpackError {
    #[error("Failed to decode archive: {0}")]
    Decode(#[from] zip::result::ZipError),
    #[error("Unsupported archive entry: {0}")]
    UnsupportedEntry(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
