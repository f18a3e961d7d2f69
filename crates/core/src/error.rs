use strata_api::BoxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("Illegal state: {0}")]
    IllegalState(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("Parsing error: {0}")]
    Parsing(String),
    #[error("Host framework error: {0}")]
    Host(String),
}

impl From<BoxError> for StrataError {
    fn from(err: BoxError) -> Self {
        StrataError::Host(err.to_string())
    }
}

impl StrataError {
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        StrataError::IllegalState(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        StrataError::Unsupported(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, StrataError>;
