use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by collection operations.
///
/// Ordinary data-shape variation (missing attributes, unknown index names,
/// removal of non-members) never produces an error; lookups fall back to
/// the correlation identifier and mutations report per-item outcomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    #[error("cannot sort a collection without a comparator")]
    NoComparator,

    #[error("invalid collection configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for CollectionError {
    fn from(err: serde_json::Error) -> Self {
        CollectionError::Config(err.to_string())
    }
}

/// A validation failure reported by a model.
///
/// Travels on the collection's `invalid` event; it is never returned as an
/// `Err` from a mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for ValidationError {
    fn from(message: &str) -> Self {
        ValidationError::new(message)
    }
}

impl From<String> for ValidationError {
    fn from(message: String) -> Self {
        ValidationError { message }
    }
}

pub type Result<T> = std::result::Result<T, CollectionError>;
