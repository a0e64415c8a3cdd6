use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no documents to index")]
    EmptyBatch,

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("query translation failed: {0}")]
    QueryTranslation(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to decode backend payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn unavailable(msg: impl std::fmt::Display) -> Self {
        Self::BackendUnavailable(msg.to_string())
    }

    /// Stable code presentation layers key on.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyBatch => "EmptyBatchError",
            Self::InvalidQuery(_) => "InvalidQueryError",
            Self::BackendUnavailable(_) => "BackendUnavailableError",
            Self::QueryTranslation(_) => "QueryTranslationError",
            Self::Cancelled => "Cancelled",
            Self::InvalidConfig(_) => "InvalidConfigError",
            Self::Decode(_) => "DecodeError",
            Self::Io(_) => "IoError",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::EmptyBatch | Self::InvalidQuery(_) | Self::QueryTranslation(_) => 400,
            Self::BackendUnavailable(_) | Self::Decode(_) => 502,
            Self::Cancelled => 499,
            Self::InvalidConfig(_) | Self::Io(_) => 500,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The `{data, error}` JSON envelope every entry point answers with.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self { data: Some(data), error: None }
    }

    pub fn failure(err: &Error) -> Self {
        Self::failure_with(err, None)
    }

    pub fn failure_with(err: &Error, data: Option<Value>) -> Self {
        Self {
            data: None,
            error: Some(ErrorBody { code: err.code().to_string(), message: err.to_string(), data }),
        }
    }
}
