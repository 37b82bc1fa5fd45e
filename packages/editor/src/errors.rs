//! Error types for the editor core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Local cache error: {0}")]
    Cache(String),

    #[error("Session is not active")]
    NotActive,
}

impl From<reqwest::Error> for EditorError {
    fn from(e: reqwest::Error) -> Self {
        EditorError::Gateway(e.to_string())
    }
}
