use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Write failed: {0}")]
    WriteFailure(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt column data: {0}")]
    Corrupt(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<rmp_serde::encode::Error> for StoreError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
