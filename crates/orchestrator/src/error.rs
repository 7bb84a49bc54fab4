use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The request is malformed in a way no step could repair.
    #[error("Invalid workflow request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
