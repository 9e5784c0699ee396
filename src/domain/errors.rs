//! Domain errors - Failures surfaced by the gamebook core

use crate::domain::value_objects::PageId;
use thiserror::Error;

/// Errors raised by a key/value storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on key '{key}': {message}")]
    Io {
        key: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Storage full: cannot write '{key}'")]
    QuotaExceeded { key: String },

    #[error("Corrupt document under '{key}': {message}")]
    Corrupt { key: String, message: String },

    #[error("Failed to serialize document for '{key}': {message}")]
    Serialization { key: String, message: String },

    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StorageError {
    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Errors raised while reading, updating or persisting game state
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to serialize state: {message}")]
    Serialization { message: String },

    #[error("Invalid value for state key '{key}': {message}")]
    InvalidUpdate { key: String, message: String },
}

impl StateError {
    pub fn invalid_update(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUpdate {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by save slot operations
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Invalid save slot {slot}, expected 1..={max}")]
    InvalidSlot { slot: u32, max: u8 },

    #[error("No save data found in slot {slot}")]
    EmptySlot { slot: u8 },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Errors raised by a host environment
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HostError {
    #[error("Element '{id}' not found")]
    ElementNotFound { id: String },

    #[error("Element '{id}' already mounted")]
    AlreadyMounted { id: String },

    #[error("Media error: {message}")]
    Media { message: String },
}

/// Errors raised by the game engine collaborator
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Engine rejected request: {reason}")]
    Rejected { reason: String },
}

/// Errors raised by a page lifecycle operation
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Page '{page}' host operation failed: {source}")]
    Host {
        page: PageId,
        #[source]
        source: HostError,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn storage_io_error_keeps_source() {
        let err = StorageError::io(
            "gameState",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("gameState"));
        assert!(err.source().is_some());
    }

    #[test]
    fn storage_error_chains_through_save_error() {
        let err: SaveError = StateError::from(StorageError::unavailable("offline")).into();
        assert_eq!(err.to_string(), "Storage unavailable: offline");
    }

    #[test]
    fn invalid_slot_message_names_range() {
        let err = SaveError::InvalidSlot { slot: 6, max: 5 };
        assert_eq!(err.to_string(), "Invalid save slot 6, expected 1..=5");
    }
}
