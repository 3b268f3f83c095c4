use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetrioError {
    #[error("unknown metric type: {0}")]
    UnknownKind(String),
    #[error("metric {id} has no {field} field")]
    MissingValue { id: String, field: &'static str },
    #[error("invalid metric value: {0}")]
    InvalidValue(String),
    #[error("metric not found: {kind}/{id}")]
    NotFound { kind: crate::types::MetricKind, id: String },
    #[error("signature does not match")]
    SignatureMismatch,
    #[error("database unavailable: {0}")]
    DatabaseUnavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for MetrioError {
    fn from(err: serde_json::Error) -> Self {
        MetrioError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MetrioError>;
