use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForgeError {
    /// Non-2xx response from the forge.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid repository name: {0}")]
    InvalidRepo(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for ForgeError {
    fn from(err: reqwest::Error) -> Self {
        ForgeError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;
