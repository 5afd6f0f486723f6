//! Chat Toxicity - Relationship Chat Log Analysis
//!
//! A Rust library for importing pasted chat logs, scoring each message for
//! toxicity and sentiment, and keeping a per-conversation risk summary.
//!
//! # Features
//!
//! - Parse `Name: text` chat lines, classifying senders as self, other or system
//! - Score messages through an OpenAI-compatible analysis API with neutral fallback
//! - Aggregate averages, conflict days and a breakup risk score per conversation
//! - Store conversations in SQLite and export them to CSV or JSON

/// Analysis capability and HTTP client
pub mod analysis;
/// On-disk cache of analysis results
pub mod cache;
/// Sender classification
pub mod classifier;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Conversation export
pub mod file_writer;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Analysis output normalization
pub mod normalizer;
/// Chat line parsing
pub mod parser;
/// Repository pattern for data access
pub mod repository;
/// Database schema definitions
pub mod schema;
/// Import orchestration
pub mod service;
/// Summary aggregation
pub mod summary;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use classifier::SenderClassifier;
pub use db::Database;
pub use error::{ChatToxicityError, Result};
pub use models::{AnalysisResult, ConversationSummary, OutputFormat, ParsedMessage, SenderType, SummaryRecord};
pub use parser::ChatLineParser;
pub use service::ImportService;
