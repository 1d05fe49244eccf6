//! Unified error types for oshin.

use thiserror::Error;

/// Result type alias using OshinError.
pub type Result<T> = std::result::Result<T, OshinError>;

#[derive(Error, Debug)]
pub enum OshinError {
    // Ingestion errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Record store errors
    #[error("Persistence failure: {0}")]
    Persistence(String),

    // Notification errors
    #[error("Delivery failure: {0}")]
    Delivery(String),

    // Owner directory errors
    #[error("Directory failure: {0}")]
    Directory(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Time utility errors
    #[error("Unknown time zone: {0}")]
    Timezone(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{0}")]
    Other(String),
}

impl OshinError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    pub fn directory(msg: impl Into<String>) -> Self {
        Self::Directory(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
