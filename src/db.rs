//! SQLite storage: connection pool, migrations and the queries behind
//! [`crate::repository::SqliteRepository`].

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::{ChatToxicityError, Result};
use crate::models::{
    Conversation, ConversationSummary, NewConversation, NewMessage, Page, SenderType, StoredMessage, SummaryRecord,
};
use crate::schema::{conversation_summary, conversations, messages};
use crate::validation::InputValidator;

// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager for handling connections and operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) the database at `database_url` with default pool settings
    pub fn new(database_url: &str) -> Result<Self> {
        Self::from_config(&DatabaseConfig {
            url: database_url.to_string(),
            max_connections: 10,
            connection_timeout_secs: 30,
        })
    }

    /// Create a new database connection pool
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        InputValidator::validate_database_url(&config.url)
            .map_err(|e| ChatToxicityError::InvalidConfig(e.to_string()))?;

        let path = config.url.strip_prefix("sqlite:").unwrap_or(&config.url);
        let path = path.strip_prefix("//").unwrap_or(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Set up connection manager and pool
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;"));
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build(manager)?;

        // Run migrations
        let conn = pool.get()?;
        Self::run_migrations(&conn)?;

        debug!(path, "Database opened");
        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../migrations/2025-06-01-000000_create_tables/up.sql"))?;
        conn.execute_batch(include_str!("../migrations/2025-06-08-000000_add_conversation_summary/up.sql"))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Create a conversation
    pub fn create_conversation(&self, new_conversation: &NewConversation) -> Result<Conversation> {
        let conn = self.get_connection()?;
        let created_at = Utc::now();

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}) VALUES (?, ?, ?)",
                conversations::TABLE,
                conversations::TITLE,
                conversations::DESCRIPTION,
                conversations::CREATED_AT
            ),
            params![new_conversation.title, new_conversation.description, created_at],
        )?;

        Ok(Conversation {
            id: conn.last_insert_rowid(),
            title: new_conversation.title.clone(),
            description: new_conversation.description.clone(),
            created_at,
        })
    }

    /// Get a conversation by ID
    pub fn get_conversation(&self, conversation_id: i64) -> Result<Option<Conversation>> {
        let conn = self.get_connection()?;

        let conversation = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?", conversations::TABLE, conversations::ID),
                params![conversation_id],
                map_conversation,
            )
            .optional()?;

        Ok(conversation)
    }

    /// All conversations, newest first
    pub fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} ORDER BY {} DESC, {} DESC",
            conversations::TABLE,
            conversations::CREATED_AT,
            conversations::ID
        ))?;
        let rows = stmt.query_map([], map_conversation)?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Insert messages in one transaction, preserving slice order.
    ///
    /// `created_at` is assigned here and never decreases within a batch.
    pub fn insert_messages(&self, conversation_id: i64, records: &[NewMessage]) -> Result<usize> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                messages::TABLE,
                messages::CONVERSATION_ID,
                messages::SENDER_NAME,
                messages::SENDER_TYPE,
                messages::TEXT,
                messages::TOXICITY_SCORE,
                messages::SENTIMENT_SCORE,
                messages::FLAGS,
                messages::CREATED_AT
            ))?;

            let mut last_created: Option<DateTime<Utc>> = None;
            for record in records {
                let now = Utc::now();
                let created_at = last_created.map_or(now, |last| last.max(now));
                last_created = Some(created_at);

                let flags = record.flags.as_ref().map(serde_json::to_string).transpose()?;
                stmt.execute(params![
                    conversation_id,
                    record.sender_name,
                    record.sender_type.as_str(),
                    record.text,
                    record.toxicity_score,
                    record.sentiment_score,
                    flags,
                    created_at
                ])?;
            }
        }

        tx.commit()?;
        Ok(records.len())
    }

    /// Every message of a conversation in conversation order
    pub fn list_messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? ORDER BY {} ASC, {} ASC",
            messages::TABLE,
            messages::CONVERSATION_ID,
            messages::CREATED_AT,
            messages::ID
        ))?;
        let rows = stmt.query_map(params![conversation_id], map_stored_message)?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// One page of a conversation's messages in conversation order
    pub fn list_messages_page(&self, conversation_id: i64, page: Page) -> Result<Vec<StoredMessage>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? ORDER BY {} ASC, {} ASC LIMIT ? OFFSET ?",
            messages::TABLE,
            messages::CONVERSATION_ID,
            messages::CREATED_AT,
            messages::ID
        ))?;
        let limit = i64::try_from(page.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(page.offset).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![conversation_id, limit, offset], map_stored_message)?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Number of stored messages in a conversation
    pub fn count_messages(&self, conversation_id: i64) -> Result<usize> {
        let conn = self.get_connection()?;

        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?",
                messages::TABLE,
                messages::CONVERSATION_ID
            ),
            params![conversation_id],
            |row| row.get(0),
        )?;

        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Insert or replace the single summary row of a conversation
    pub fn upsert_summary(&self, conversation_id: i64, summary: &ConversationSummary) -> Result<SummaryRecord> {
        let conn = self.get_connection()?;
        let last_calculated_at = Utc::now();

        conn.execute(
            &format!(
                "INSERT INTO {table} ({cid}, {overall}, {own}, {other}, {sentiment}, {days}, {risk}, {at}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT({cid}) DO UPDATE SET \
                 {overall} = excluded.{overall}, {own} = excluded.{own}, {other} = excluded.{other}, \
                 {sentiment} = excluded.{sentiment}, {days} = excluded.{days}, {risk} = excluded.{risk}, \
                 {at} = excluded.{at}",
                table = conversation_summary::TABLE,
                cid = conversation_summary::CONVERSATION_ID,
                overall = conversation_summary::AVG_TOXICITY_OVERALL,
                own = conversation_summary::AVG_TOXICITY_SELF,
                other = conversation_summary::AVG_TOXICITY_OTHER,
                sentiment = conversation_summary::SENTIMENT_OVERALL,
                days = conversation_summary::CONFLICT_DAYS_COUNT,
                risk = conversation_summary::BREAKUP_RISK_SCORE,
                at = conversation_summary::LAST_CALCULATED_AT,
            ),
            params![
                conversation_id,
                summary.avg_toxicity_overall,
                summary.avg_toxicity_self,
                summary.avg_toxicity_other,
                summary.sentiment_overall,
                summary.conflict_days_count,
                summary.breakup_risk_score,
                last_calculated_at
            ],
        )?;

        Ok(SummaryRecord {
            conversation_id,
            summary: *summary,
            last_calculated_at: Some(last_calculated_at),
        })
    }

    /// The stored summary, if one was ever computed
    pub fn get_summary(&self, conversation_id: i64) -> Result<Option<SummaryRecord>> {
        let conn = self.get_connection()?;

        let record = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ?",
                    conversation_summary::TABLE,
                    conversation_summary::CONVERSATION_ID
                ),
                params![conversation_id],
                map_summary,
            )
            .optional()?;

        Ok(record)
    }
}

/// Map a database row to a Conversation
fn map_conversation(row: &Row) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(conversations::ID)?,
        title: row.get(conversations::TITLE)?,
        description: row.get(conversations::DESCRIPTION)?,
        created_at: row.get(conversations::CREATED_AT)?,
    })
}

/// Map a database row to a StoredMessage
fn map_stored_message(row: &Row) -> rusqlite::Result<StoredMessage> {
    let sender_type: String = row.get(messages::SENDER_TYPE)?;
    let sender_type = sender_type
        .parse::<SenderType>()
        .map_err(|e: ChatToxicityError| conversion_error(row, messages::SENDER_TYPE, e))?;

    let flags: Option<String> = row.get(messages::FLAGS)?;
    let flags = flags
        .as_deref()
        .map(serde_json::from_str::<Vec<String>>)
        .transpose()
        .map_err(|e| conversion_error(row, messages::FLAGS, e))?;

    Ok(StoredMessage {
        id: row.get(messages::ID)?,
        conversation_id: row.get(messages::CONVERSATION_ID)?,
        sender_name: row.get(messages::SENDER_NAME)?,
        sender_type,
        text: row.get(messages::TEXT)?,
        toxicity_score: row.get(messages::TOXICITY_SCORE)?,
        sentiment_score: row.get(messages::SENTIMENT_SCORE)?,
        flags,
        created_at: row.get(messages::CREATED_AT)?,
    })
}

/// Map a database row to a SummaryRecord
fn map_summary(row: &Row) -> rusqlite::Result<SummaryRecord> {
    Ok(SummaryRecord {
        conversation_id: row.get(conversation_summary::CONVERSATION_ID)?,
        summary: ConversationSummary {
            avg_toxicity_overall: row.get(conversation_summary::AVG_TOXICITY_OVERALL)?,
            avg_toxicity_self: row.get(conversation_summary::AVG_TOXICITY_SELF)?,
            avg_toxicity_other: row.get(conversation_summary::AVG_TOXICITY_OTHER)?,
            sentiment_overall: row.get(conversation_summary::SENTIMENT_OVERALL)?,
            conflict_days_count: row.get(conversation_summary::CONFLICT_DAYS_COUNT)?,
            breakup_risk_score: row.get(conversation_summary::BREAKUP_RISK_SCORE)?,
        },
        last_calculated_at: row.get(conversation_summary::LAST_CALCULATED_AT)?,
    })
}

fn conversion_error<E>(row: &Row, column: &str, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let index = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}
