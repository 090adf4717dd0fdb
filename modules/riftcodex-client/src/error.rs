use thiserror::Error;

pub type Result<T> = std::result::Result<T, CardApiError>;

#[derive(Debug, Error)]
pub enum CardApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Path template must contain {{name}}: {0}")]
    InvalidTemplate(String),
}

impl From<reqwest::Error> for CardApiError {
    fn from(err: reqwest::Error) -> Self {
        CardApiError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for CardApiError {
    fn from(err: serde_json::Error) -> Self {
        CardApiError::Parse(err.to_string())
    }
}
