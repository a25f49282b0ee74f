use thiserror::Error;

use shared_models::BackendError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorklistError {
    #[error("Cannot reach backend: {0}")]
    Transport(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Appointment not found: {0}")]
    NotFound(String),

    #[error("Backend rejected the request: {0}")]
    Rejected(String),

    #[error("Patient {patient_id} already has an open appointment today ({status})")]
    AlreadyBooked { patient_id: String, status: String },

    #[error("Action was not confirmed")]
    NotConfirmed,

    #[error("No row with key {0} in the current worklist")]
    UnknownRow(u64),
}

impl WorklistError {
    pub fn missing(field: &str) -> Self {
        WorklistError::Validation(format!("{} is required", field))
    }

    /// Message suitable for showing to front-desk staff.
    pub fn user_message(&self) -> String {
        match self {
            WorklistError::Transport(_) => "Cannot reach the server. Please retry.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<BackendError> for WorklistError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(body) => WorklistError::NotFound(body),
            other => WorklistError::Transport(other.to_string()),
        }
    }
}
