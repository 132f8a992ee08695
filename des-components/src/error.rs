//! Error types for pipeline components

use thiserror::Error;

/// Errors related to queue operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Queue is full (capacity: {capacity}, workers: {workers})")]
    Full { capacity: usize, workers: usize },
}

/// Errors raised while deriving request metadata from a key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("Key has no numeric suffix: {0:?}")]
    MissingKeySuffix(String),

    #[error("Key suffix does not fit in 64 bits: {0:?}")]
    SuffixOutOfRange(String),
}
