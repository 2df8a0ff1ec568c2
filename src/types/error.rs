use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("copy of {key} failed verification: {fields:?}")]
    Integrity { key: String, fields: Vec<String> },
    #[error("{0}")]
    Transport(String),
}

impl TransferError {
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, TransferError::Integrity { .. })
    }
}
