//! Error types for the chat-toxicity library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the application.

use thiserror::Error;

/// Errors that can occur in the chat-toxicity application.
#[derive(Error, Debug)]
pub enum ChatToxicityError {
    /// Raw chat text produced no parsable messages
    #[error("No messages found in raw chat")]
    EmptyImport,

    /// The analysis capability answered with something that is not a usable result list
    #[error("Malformed analysis output: {0}")]
    MalformedAnalysisOutput(String),

    /// The analysis capability could not be reached or refused the request
    #[error("Analysis capability unavailable: {0}")]
    AnalysisUnavailable(String),

    /// The analysis API answered with a non-success HTTP status
    #[error("Analysis API returned {status}: {body}")]
    AnalysisStatus {
        /// HTTP status code
        status: u16,
        /// Start of the response body
        body: String,
    },

    /// Conversation not found
    #[error("Conversation not found: {0}")]
    ConversationNotFound(i64),

    /// Rejected user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writer errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// A blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with `ChatToxicityError`
pub type Result<T> = std::result::Result<T, ChatToxicityError>;

impl ChatToxicityError {
    /// True for failures of the analysis capability, which the import
    /// pipeline absorbs by substituting neutral scores.
    #[must_use]
    pub const fn is_analysis_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedAnalysisOutput(_)
                | Self::AnalysisUnavailable(_)
                | Self::AnalysisStatus { .. }
                | Self::Http(_)
        )
    }
}

impl From<anyhow::Error> for ChatToxicityError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<sled::Error> for ChatToxicityError {
    fn from(err: sled::Error) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<bincode::Error> for ChatToxicityError {
    fn from(err: bincode::Error) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ChatToxicityError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
