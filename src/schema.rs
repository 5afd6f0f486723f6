//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.

/// Conversations table schema
pub mod conversations {
    /// Table name
    pub const TABLE: &str = "conversations";
    /// Primary key column
    pub const ID: &str = "id";
    /// Title column
    pub const TITLE: &str = "title";
    /// Description column
    pub const DESCRIPTION: &str = "description";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Messages table schema
pub mod messages {
    /// Table name
    pub const TABLE: &str = "messages";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to conversations table
    pub const CONVERSATION_ID: &str = "conversation_id";
    /// Sender name column
    pub const SENDER_NAME: &str = "sender_name";
    /// Sender classification column (SELF, OTHER, SYSTEM)
    pub const SENDER_TYPE: &str = "sender_type";
    /// Message text column
    pub const TEXT: &str = "text";
    /// Toxicity score column
    pub const TOXICITY_SCORE: &str = "toxicity_score";
    /// Sentiment score column
    pub const SENTIMENT_SCORE: &str = "sentiment_score";
    /// JSON-encoded flags column
    pub const FLAGS: &str = "flags";
    /// Insertion timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Conversation summary table schema
pub mod conversation_summary {
    /// Table name
    pub const TABLE: &str = "conversation_summary";
    /// Foreign key to conversations table, unique
    pub const CONVERSATION_ID: &str = "conversation_id";
    /// Mean toxicity column
    pub const AVG_TOXICITY_OVERALL: &str = "avg_toxicity_overall";
    /// Mean SELF toxicity column
    pub const AVG_TOXICITY_SELF: &str = "avg_toxicity_self";
    /// Mean OTHER toxicity column
    pub const AVG_TOXICITY_OTHER: &str = "avg_toxicity_other";
    /// Mean sentiment column
    pub const SENTIMENT_OVERALL: &str = "sentiment_overall";
    /// Conflict day count column
    pub const CONFLICT_DAYS_COUNT: &str = "conflict_days_count";
    /// Risk score column
    pub const BREAKUP_RISK_SCORE: &str = "breakup_risk_score";
    /// Recompute timestamp column
    pub const LAST_CALCULATED_AT: &str = "last_calculated_at";
}
