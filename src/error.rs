use thiserror::Error;

pub const MISSING_FIELDS: &str = "Missing fields";
pub const INTERVENTION_NOT_FOUND: &str = "Intervention not found";
pub const NO_PENDING_INTERVENTION: &str = "No pending intervention found";
pub const NO_ACTIVE_INTERVENTION: &str = "No active intervention found";

/// Errors surfaced by workflow operations
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Missing input or an unmet precondition; safe to report to the caller
    #[error("{0}")]
    Validation(String),

    /// Store or other infrastructure failure; details are for operators only
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }

    pub fn missing_fields() -> Self {
        WorkflowError::validation(MISSING_FIELDS)
    }
}
