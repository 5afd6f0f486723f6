//! Import pipeline
//!
//! [`ImportService`] parses raw chat text, scores it through the analysis
//! provider, stores the messages and keeps the conversation summary current.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::analysis::{provider_from_config, AnalysisProvider};
use crate::cache::AnalysisCache;
use crate::classifier::SenderClassifier;
use crate::config::AppConfig;
use crate::error::{ChatToxicityError, Result};
use crate::file_writer;
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::models::{
    AnalysisRequest, AnalysisResult, Conversation, ImportOutcome, NewConversation, NewMessage, OutputFormat, Page,
    ParsedMessage, StoredMessage, SummaryRecord,
};
use crate::normalizer::{neutral_results, normalize};
use crate::parser::ChatLineParser;
use crate::repository::ConversationRepository;
use crate::summary::summarize;
use crate::validation::InputValidator;

/// Tunables for the import pipeline
#[derive(Debug, Clone, Copy)]
pub struct ImportSettings {
    /// Messages sent to the analysis capability per request
    pub batch_size: usize,
    /// Upper bound on one analysis request, retries included
    pub analysis_timeout: Duration,
    /// Largest accepted raw chat text
    pub max_raw_bytes: usize,
    /// Page size when the caller gives none
    pub default_page_size: usize,
    /// Largest page a caller may request
    pub max_page_size: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            analysis_timeout: Duration::from_secs(60),
            max_raw_bytes: 2 * 1024 * 1024,
            default_page_size: Page::DEFAULT_LIMIT,
            max_page_size: Page::MAX_LIMIT,
        }
    }
}

impl ImportSettings {
    /// Settings taken from the analysis and import sections of the config
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.analysis.batch_size,
            // Leave room for the client's own retries inside one bound
            analysis_timeout: Duration::from_secs(
                config
                    .analysis
                    .timeout_secs
                    .saturating_mul(u64::from(config.analysis.max_retries.saturating_add(1))),
            ),
            max_raw_bytes: config.import.max_raw_bytes,
            default_page_size: config.import.default_page_size,
            max_page_size: config.import.max_page_size,
        }
    }
}

/// Sequences parsing, analysis, persistence and summary recomputation
pub struct ImportService {
    repository: Arc<dyn ConversationRepository>,
    analyzer: Arc<dyn AnalysisProvider>,
    parser: ChatLineParser,
    cache: Option<AnalysisCache>,
    metrics: MetricsCollector,
    settings: ImportSettings,
    // Serializes read-all/recompute/upsert so a later recompute never
    // overwrites a summary that already saw more messages.
    summary_lock: Mutex<()>,
}

impl ImportService {
    /// Service with default settings and no cache
    pub fn new(
        repository: Arc<dyn ConversationRepository>,
        analyzer: Arc<dyn AnalysisProvider>,
        parser: ChatLineParser,
    ) -> Self {
        Self {
            repository,
            analyzer,
            parser,
            cache: None,
            metrics: MetricsCollector::default(),
            settings: ImportSettings::default(),
            summary_lock: Mutex::new(()),
        }
    }

    /// Wire a service from configuration; the repository is supplied by the caller
    pub fn from_config(config: &AppConfig, repository: Arc<dyn ConversationRepository>) -> Result<Self> {
        InputValidator::validate_batch_size(config.analysis.batch_size)?;

        let analyzer: Arc<dyn AnalysisProvider> = Arc::from(provider_from_config(&config.analysis)?);
        let parser = ChatLineParser::new(SenderClassifier::new(&config.parser.self_aliases));
        let mut service = Self::new(repository, analyzer, parser).with_settings(ImportSettings::from_config(config));

        if let Some(cache_path) = config.analysis.cache_path.as_deref() {
            service = service.with_cache(AnalysisCache::open(Path::new(cache_path), &config.analysis.model)?);
        }

        Ok(service)
    }

    /// Replace the pipeline settings
    #[must_use]
    pub const fn with_settings(mut self, settings: ImportSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Serve repeated batches from `cache`
    #[must_use]
    pub fn with_cache(mut self, cache: AnalysisCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub const fn parser(&self) -> &ChatLineParser {
        &self.parser
    }

    /// Create a conversation after validating its title and description
    pub async fn create_conversation(&self, title: &str, description: Option<&str>) -> Result<Conversation> {
        InputValidator::validate_title(title)?;
        InputValidator::validate_description(description)?;

        let conversation = NewConversation {
            title: InputValidator::sanitize_text(title),
            description: description.map(InputValidator::sanitize_text).filter(|d| !d.is_empty()),
        };
        let created = self.repository.create_conversation(conversation).await?;
        info!(conversation_id = created.id, "Conversation created");
        Ok(created)
    }

    /// Every conversation, newest first
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.repository.list_conversations().await
    }

    /// Import raw chat text into a conversation.
    ///
    /// Fails before any write if the conversation does not exist or the text
    /// holds no messages. Analysis failures degrade to neutral scores, and a
    /// failed summary recompute is logged without undoing the insert.
    pub async fn import(&self, conversation_id: i64, raw: &str) -> Result<ImportOutcome> {
        let timer = OperationTimer::new("import");

        InputValidator::validate_raw_import(raw, self.settings.max_raw_bytes)?;
        self.require_conversation(conversation_id).await?;

        let parsed = self.parser.parse(raw);
        if parsed.is_empty() {
            return Err(ChatToxicityError::EmptyImport);
        }
        debug!(conversation_id, parsed = parsed.len(), "Parsed raw chat");

        let results = self.analyze(&parsed).await;
        debug_assert_eq!(results.len(), parsed.len());

        let records: Vec<NewMessage> = parsed
            .into_iter()
            .zip(results)
            .map(|(message, result)| NewMessage::scored(message, result))
            .collect();
        let imported = self.repository.insert_messages(conversation_id, records).await?;

        if let Err(e) = self.recompute_summary(conversation_id).await {
            warn!(conversation_id, error = %e, "Summary recompute failed after import");
            self.metrics.record_error("summary", "import");
        }

        let duration = timer.finish();
        self.metrics.record_import(imported, duration);
        info!(conversation_id, imported, "Import completed");

        Ok(ImportOutcome { imported })
    }

    /// Recompute and store the summary from every message of the conversation
    pub async fn recompute_summary(&self, conversation_id: i64) -> Result<SummaryRecord> {
        self.require_conversation(conversation_id).await?;

        let _guard = self.summary_lock.lock().await;
        let timer = OperationTimer::new("summary_recompute");

        let messages = self.repository.list_messages(conversation_id).await?;
        let summary = summarize(&messages);
        let record = self.repository.upsert_summary(conversation_id, summary).await?;

        self.metrics.record_summary(&summary);
        timer.finish();
        info!(
            conversation_id,
            messages = messages.len(),
            risk = summary.breakup_risk_score,
            conflict_days = summary.conflict_days_count,
            "Summary recomputed"
        );

        Ok(record)
    }

    /// The stored summary, or an all-zero one if none was computed yet
    pub async fn get_summary(&self, conversation_id: i64) -> Result<SummaryRecord> {
        self.require_conversation(conversation_id).await?;

        Ok(self
            .repository
            .get_summary(conversation_id)
            .await?
            .unwrap_or_else(|| SummaryRecord::empty(conversation_id)))
    }

    /// One page of messages; out-of-range paging values fall back to defaults
    pub async fn list_messages(
        &self,
        conversation_id: i64,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<StoredMessage>> {
        self.require_conversation(conversation_id).await?;

        let page = Page::new(limit, offset, self.settings.default_page_size, self.settings.max_page_size);
        self.repository.list_messages_page(conversation_id, page).await
    }

    /// Write every message and the summary of a conversation to `output_dir`
    pub async fn export(&self, conversation_id: i64, format: OutputFormat, output_dir: &Path) -> Result<PathBuf> {
        InputValidator::validate_export_path(output_dir)?;

        let summary = self.get_summary(conversation_id).await?;
        let messages = self.repository.list_messages(conversation_id).await?;
        let path = file_writer::export_conversation(&messages, &summary, format, output_dir)?;

        info!(conversation_id, path = %path.display(), messages = messages.len(), "Conversation exported");
        Ok(path)
    }

    async fn require_conversation(&self, conversation_id: i64) -> Result<Conversation> {
        self.repository
            .get_conversation(conversation_id)
            .await?
            .ok_or(ChatToxicityError::ConversationNotFound(conversation_id))
    }

    /// One result per message, in order; never fails
    async fn analyze(&self, parsed: &[ParsedMessage]) -> Vec<AnalysisResult> {
        let requests: Vec<AnalysisRequest> = parsed.iter().map(AnalysisRequest::from).collect();

        let mut results = Vec::with_capacity(requests.len());
        for batch in requests.chunks(self.settings.batch_size.max(1)) {
            results.extend(self.analyze_batch(batch).await);
        }
        results
    }

    async fn analyze_batch(&self, batch: &[AnalysisRequest]) -> Vec<AnalysisResult> {
        if let Some(cache) = &self.cache {
            match cache.get(batch) {
                Ok(Some(results)) => {
                    self.metrics.record_cache_hit();
                    debug!(messages = batch.len(), "Analysis served from cache");
                    return results;
                },
                Ok(None) => {},
                Err(e) => warn!(error = %e, "Analysis cache read failed"),
            }
        }

        let started = Instant::now();
        let outcome = match timeout(self.settings.analysis_timeout, self.analyzer.analyze(batch)).await {
            Ok(Ok(raw)) => normalize(&raw, batch.len()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ChatToxicityError::AnalysisUnavailable(format!(
                "timed out after {:?}",
                self.settings.analysis_timeout
            ))),
        };
        self.metrics.record_analysis_call(batch.len(), started.elapsed(), outcome.is_ok());

        match outcome {
            Ok(results) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.put(batch, &results) {
                        warn!(error = %e, "Analysis cache write failed");
                    }
                }
                results
            },
            Err(e) => {
                warn!(error = %e, messages = batch.len(), "Analysis failed, using neutral scores");
                self.metrics.record_analysis_fallback(fallback_reason(&e), batch.len());
                neutral_results(batch.len())
            },
        }
    }
}

const fn fallback_reason(err: &ChatToxicityError) -> &'static str {
    match err {
        ChatToxicityError::MalformedAnalysisOutput(_) => "malformed",
        ChatToxicityError::AnalysisUnavailable(_) => "unavailable",
        ChatToxicityError::AnalysisStatus { .. } => "status",
        ChatToxicityError::Http(_) => "transport",
        _ => "other",
    }
}
