//! Storage contract used by the import pipeline
//!
//! The pipeline only needs a handful of operations; keeping them behind a
//! trait lets tests and embedders swap in other stores.

use async_trait::async_trait;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Conversation, ConversationSummary, NewConversation, NewMessage, Page, StoredMessage, SummaryRecord};

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn create_conversation(&self, conversation: NewConversation) -> Result<Conversation>;
    async fn get_conversation(&self, conversation_id: i64) -> Result<Option<Conversation>>;
    async fn list_conversations(&self) -> Result<Vec<Conversation>>;
    async fn insert_messages(&self, conversation_id: i64, records: Vec<NewMessage>) -> Result<usize>;
    async fn list_messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>>;
    async fn list_messages_page(&self, conversation_id: i64, page: Page) -> Result<Vec<StoredMessage>>;
    async fn upsert_summary(&self, conversation_id: i64, summary: ConversationSummary) -> Result<SummaryRecord>;
    async fn get_summary(&self, conversation_id: i64) -> Result<Option<SummaryRecord>>;
}

/// SQLite-backed repository; rusqlite calls run on the blocking pool
#[derive(Clone)]
pub struct SqliteRepository {
    database: Database,
}

impl SqliteRepository {
    /// Wrap an opened database
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.database
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let database = self.database.clone();
        tokio::task::spawn_blocking(move || op(&database)).await?
    }
}

#[async_trait]
impl ConversationRepository for SqliteRepository {
    async fn create_conversation(&self, conversation: NewConversation) -> Result<Conversation> {
        self.run_blocking(move |db| db.create_conversation(&conversation)).await
    }

    async fn get_conversation(&self, conversation_id: i64) -> Result<Option<Conversation>> {
        self.run_blocking(move |db| db.get_conversation(conversation_id)).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.run_blocking(Database::list_conversations).await
    }

    async fn insert_messages(&self, conversation_id: i64, records: Vec<NewMessage>) -> Result<usize> {
        self.run_blocking(move |db| db.insert_messages(conversation_id, &records)).await
    }

    async fn list_messages(&self, conversation_id: i64) -> Result<Vec<StoredMessage>> {
        self.run_blocking(move |db| db.list_messages(conversation_id)).await
    }

    async fn list_messages_page(&self, conversation_id: i64, page: Page) -> Result<Vec<StoredMessage>> {
        self.run_blocking(move |db| db.list_messages_page(conversation_id, page)).await
    }

    async fn upsert_summary(&self, conversation_id: i64, summary: ConversationSummary) -> Result<SummaryRecord> {
        self.run_blocking(move |db| db.upsert_summary(conversation_id, &summary)).await
    }

    async fn get_summary(&self, conversation_id: i64) -> Result<Option<SummaryRecord>> {
        self.run_blocking(move |db| db.get_summary(conversation_id)).await
    }
}
