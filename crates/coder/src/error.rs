use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoderError {
    /// Non-2xx response from the completion API.
    #[error("Completion API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    /// Completion response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for CoderError {
    fn from(err: reqwest::Error) -> Self {
        CoderError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoderError>;
