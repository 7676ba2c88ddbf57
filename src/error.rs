use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Position {position} out of range for chain of length {length}")]
    PositionOutOfRange { position: usize, length: usize },

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
