use thiserror::Error;

/// Failures talking to the clinic REST backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Cannot reach backend: {0}")]
    Unreachable(String),

    #[error("Backend request timed out: {0}")]
    Timeout(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Transport-class failures are retried only on explicit user retry.
    pub fn is_transport(&self) -> bool {
        !matches!(self, BackendError::NotFound(_))
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}
