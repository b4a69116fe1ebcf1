use serde::{ser::Serializer, Serialize};
use thiserror::Error;

/// A specialized `Result` type for the Pavlov TV API crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for the Pavlov TV API crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid base URL ({0})")]
    InvalidUrl(String),

    #[error("Invalid replay id: must not be empty or whitespace")]
    InvalidReplayId,

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(String),
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
