use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Module name {0:?} is reserved")]
    ReservedModuleName(String),
}

/// Why an identifier cannot be captured or replayed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier {0:?} is not a plain file name")]
    NotAFileName(String),
    #[error("identifier {0:?} contains a comma")]
    ContainsComma(String),
}

/// Identifiers name one file directly inside the store and must survive the
/// comma-joined snapshot metadata.
pub fn validate_identifier(identifier: &str) -> Result<(), IdentifierError> {
    if identifier.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if identifier == "."
        || identifier == ".."
        || identifier.contains('/')
        || identifier.contains('\\')
        || identifier.contains('\0')
    {
        return Err(IdentifierError::NotAFileName(identifier.to_string()));
    }
    if identifier.contains(',') {
        return Err(IdentifierError::ContainsComma(identifier.to_string()));
    }
    Ok(())
}
