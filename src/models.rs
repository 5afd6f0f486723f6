//! Data models for chat parsing, scoring and storage
//!
//! This module contains all data structures used throughout the application,
//! including parsed lines, analysis scores, stored messages and summaries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChatToxicityError;

/// Sender name used for lines that carry no `Name: text` structure
pub const SYSTEM_SENDER: &str = "SYSTEM";

/// Who a message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SenderType {
    /// The analysis subject
    #[serde(rename = "SELF")]
    Me,
    /// A conversation counterpart
    #[serde(rename = "OTHER")]
    Other,
    /// A non-human or unstructured line
    #[serde(rename = "SYSTEM")]
    System,
}

impl SenderType {
    /// Stored / wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Me => "SELF",
            Self::Other => "OTHER",
            Self::System => "SYSTEM",
        }
    }
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SenderType {
    type Err = ChatToxicityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SELF" => Ok(Self::Me),
            "OTHER" => Ok(Self::Other),
            "SYSTEM" => Ok(Self::System),
            other => Err(ChatToxicityError::InvalidInput(format!("Unknown sender type: {other}"))),
        }
    }
}

/// One line of a chat export after parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMessage {
    /// Text before the first colon, or `SYSTEM`
    pub sender_name: String,
    /// Classification of the sender
    pub sender_type: SenderType,
    /// Text after the first colon, or the whole line for system lines
    pub text: String,
}

impl ParsedMessage {
    /// A system line carrying the full trimmed input line as its text
    #[must_use]
    pub fn system(line: &str) -> Self {
        Self {
            sender_name: SYSTEM_SENDER.to_string(),
            sender_type: SenderType::System,
            text: line.to_string(),
        }
    }
}

/// Item sent to the analysis capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Message text
    pub text: String,
    /// Who sent it
    pub sender_type: SenderType,
}

impl From<&ParsedMessage> for AnalysisRequest {
    fn from(message: &ParsedMessage) -> Self {
        Self {
            text: message.text.clone(),
            sender_type: message.sender_type,
        }
    }
}

/// Scores for a single message
///
/// The default value is the neutral result used whenever analysis is
/// missing or cannot be trusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Toxicity in `[0, 1]`
    pub toxicity_score: f64,
    /// Sentiment in `[-1, 1]`
    pub sentiment_score: f64,
    /// Pattern tags such as `insult` or `gaslighting`
    pub flags: Vec<String>,
}

impl AnalysisResult {
    /// Zero scores, no flags
    #[must_use]
    pub fn neutral() -> Self {
        Self::default()
    }
}

/// A conversation that messages are imported into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Database primary key
    pub id: i64,
    /// Display title
    pub title: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Data for creating a new conversation
#[derive(Debug, Clone)]
pub struct NewConversation {
    /// Display title
    pub title: String,
    /// Optional free-form description
    pub description: Option<String>,
}

/// Data for inserting a message; the store assigns id and `created_at`
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    /// Sender name as parsed
    pub sender_name: String,
    /// Sender classification
    pub sender_type: SenderType,
    /// Message text
    pub text: String,
    /// Toxicity score, if analyzed
    pub toxicity_score: Option<f64>,
    /// Sentiment score, if analyzed
    pub sentiment_score: Option<f64>,
    /// Flags, if analyzed
    pub flags: Option<Vec<String>>,
}

impl NewMessage {
    /// Pair a parsed line with its analysis result
    #[must_use]
    pub fn scored(message: ParsedMessage, result: AnalysisResult) -> Self {
        Self {
            sender_name: message.sender_name,
            sender_type: message.sender_type,
            text: message.text,
            toxicity_score: Some(result.toxicity_score),
            sentiment_score: Some(result.sentiment_score),
            flags: Some(result.flags),
        }
    }
}

/// A message as persisted by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Database primary key
    pub id: i64,
    /// Owning conversation
    pub conversation_id: i64,
    /// Sender name as parsed
    pub sender_name: String,
    /// Sender classification
    pub sender_type: SenderType,
    /// Message text
    pub text: String,
    /// Toxicity score, if analyzed
    pub toxicity_score: Option<f64>,
    /// Sentiment score, if analyzed
    pub sentiment_score: Option<f64>,
    /// Flags, if analyzed
    pub flags: Option<Vec<String>>,
    /// Insertion time, assigned by the store
    pub created_at: DateTime<Utc>,
}

/// Conversation-level statistics, always recomputed from the full message set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Mean toxicity over all scored messages
    pub avg_toxicity_overall: f64,
    /// Mean toxicity of SELF messages
    pub avg_toxicity_self: f64,
    /// Mean toxicity of OTHER messages
    pub avg_toxicity_other: f64,
    /// Mean sentiment over all scored messages
    pub sentiment_overall: f64,
    /// Days whose mean toxicity reached the conflict threshold
    pub conflict_days_count: u32,
    /// Derived risk in `[0, 1]`
    pub breakup_risk_score: f64,
}

/// A summary as stored for one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Owning conversation
    pub conversation_id: i64,
    /// The statistics
    #[serde(flatten)]
    pub summary: ConversationSummary,
    /// When the summary was last recomputed; `None` if it never was
    pub last_calculated_at: Option<DateTime<Utc>>,
}

impl SummaryRecord {
    /// All-zero summary reported for conversations that were never summarized
    #[must_use]
    pub fn empty(conversation_id: i64) -> Self {
        Self {
            conversation_id,
            summary: ConversationSummary::default(),
            last_calculated_at: None,
        }
    }
}

/// Limit/offset window over a conversation's messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of messages returned
    pub limit: usize,
    /// Number of messages skipped
    pub offset: usize,
}

impl Page {
    /// Default number of messages per page
    pub const DEFAULT_LIMIT: usize = 50;
    /// Largest page a caller may request
    pub const MAX_LIMIT: usize = 200;

    /// Build a page from untrusted values.
    ///
    /// A missing or non-positive limit falls back to `default_limit` and is
    /// capped at `max_limit`; a missing or negative offset becomes 0.
    #[must_use]
    pub fn new(limit: Option<i64>, offset: Option<i64>, default_limit: usize, max_limit: usize) -> Self {
        let limit = limit
            .and_then(|l| usize::try_from(l).ok())
            .filter(|l| *l > 0)
            .map_or(default_limit, |l| l.min(max_limit));
        let offset = offset.and_then(|o| usize::try_from(o).ok()).unwrap_or(0);
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Result of a successful import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    /// Number of messages stored
    pub imported: usize,
}

/// Output format for exported messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated values format
    Csv,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Get the file extension for this format
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ChatToxicityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(ChatToxicityError::InvalidInput(format!("Unsupported export format: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_type_round_trips_through_str() {
        for sender_type in [SenderType::Me, SenderType::Other, SenderType::System] {
            assert_eq!(sender_type.as_str().parse::<SenderType>().ok(), Some(sender_type));
        }
        assert!("self".parse::<SenderType>().is_err());
    }

    #[test]
    fn test_sender_type_serializes_uppercase() {
        let json = serde_json::to_string(&SenderType::Me).expect("serialize");
        assert_eq!(json, "\"SELF\"");
    }

    #[test]
    fn test_page_defaults_and_caps() {
        assert_eq!(Page::new(None, None, 50, 200), Page { limit: 50, offset: 0 });
        assert_eq!(Page::new(Some(500), Some(10), 50, 200), Page { limit: 200, offset: 10 });
        assert_eq!(Page::new(Some(0), Some(-3), 50, 200), Page { limit: 50, offset: 0 });
        assert_eq!(Page::new(Some(-7), None, 50, 200).limit, 50);
    }

    #[test]
    fn test_summary_record_flattens_statistics() {
        let record = SummaryRecord::empty(7);
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["conversation_id"], 7);
        assert_eq!(value["breakup_risk_score"], 0.0);
        assert!(value["last_calculated_at"].is_null());
    }
}
