//! Analysis capability
//!
//! Scores are produced by an external model reached over HTTP. The provider
//! returns the raw, untrusted JSON body; [`crate::normalizer`] turns it into
//! aligned results.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{AnalysisConfig, AnalysisProviderKind};
use crate::error::{ChatToxicityError, Result};
use crate::models::AnalysisRequest;

const SYSTEM_PROMPT: &str = r#"You analyze chat messages between people in a relationship.

For every message in the input array return one object with:
1. toxicity_score: number from 0 (not toxic) to 1 (extremely toxic)
2. sentiment_score: number from -1 (very negative) through 0 (neutral) to 1 (very positive)
3. flags: array of strings naming concerning patterns, chosen from
   "passive_aggressive", "insult", "gaslighting", "dismissive", "threatening",
   "guilt_tripping", "stonewalling", "love_bombing", "blame_shifting"

Input is a JSON array of {"text", "sender_type"} objects where sender_type is SELF, OTHER or SYSTEM.
Messages may be in Thai or English.

Example input:
[{"text": "why aren't you answering", "sender_type": "SELF"}, {"text": "busy with work", "sender_type": "OTHER"}]

Example output:
[{"toxicity_score": 0.3, "sentiment_score": -0.2, "flags": ["passive_aggressive"]},
 {"toxicity_score": 0.1, "sentiment_score": -0.1, "flags": ["dismissive"]}]

Respond with ONLY the JSON array, one object per input message, in input order."#;

/// Something that scores messages
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Score `messages`, returning the raw response body for normalization
    async fn analyze(&self, messages: &[AnalysisRequest]) -> Result<Value>;
}

/// Build the provider selected in configuration
pub fn provider_from_config(config: &AnalysisConfig) -> Result<Box<dyn AnalysisProvider>> {
    match config.provider {
        AnalysisProviderKind::Http => Ok(Box::new(HttpAnalysisClient::new(config)?)),
        AnalysisProviderKind::Disabled => Ok(Box::new(DisabledAnalyzer)),
    }
}

/// Provider that never scores anything; imports fall back to neutral scores
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAnalyzer;

#[async_trait]
impl AnalysisProvider for DisabledAnalyzer {
    async fn analyze(&self, _messages: &[AnalysisRequest]) -> Result<Value> {
        Err(ChatToxicityError::AnalysisUnavailable("analysis is disabled".to_string()))
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct CompletionMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

/// OpenAI-compatible chat completions client
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    max_retries: u32,
}

impl HttpAnalysisClient {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    async fn analyze_attempt(&self, api_key: &str, messages: &[AnalysisRequest]) -> Result<Value> {
        let body = CompletionRequest {
            model: &self.model,
            messages: vec![
                CompletionMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                CompletionMessage {
                    role: "user".to_string(),
                    content: serde_json::to_string(messages)?,
                },
            ],
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ChatToxicityError::AnalysisStatus {
                status: status.as_u16(),
                body: truncate(&text, 200).to_string(),
            });
        }

        let data: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| ChatToxicityError::MalformedAnalysisOutput(format!("invalid completion body: {e}")))?;
        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .map(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ChatToxicityError::MalformedAnalysisOutput("missing completion content".to_string()))?;

        parse_completion_content(&content)
    }
}

#[async_trait]
impl AnalysisProvider for HttpAnalysisClient {
    async fn analyze(&self, messages: &[AnalysisRequest]) -> Result<Value> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ChatToxicityError::AnalysisUnavailable("analysis API key is not configured".to_string()));
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.analyze_attempt(api_key, messages).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt <= self.max_retries && is_retryable(&e) => {
                    let backoff = Duration::from_millis(250 * u64::from(attempt) + rand::random::<u64>() % 250);
                    warn!(attempt, error = %e, ?backoff, "Analysis request failed, retrying");
                    sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Extract the JSON array from a completion, tolerating surrounding prose
pub fn parse_completion_content(content: &str) -> Result<Value> {
    static ARRAY: OnceLock<Option<Regex>> = OnceLock::new();
    let array = ARRAY.get_or_init(|| Regex::new(r"\[[\s\S]*\]").ok());

    let candidate = array
        .as_ref()
        .and_then(|re| re.find(content))
        .map_or(content, |m| m.as_str());

    serde_json::from_str(candidate).map_err(|e| {
        debug!(content = truncate(content, 500), "Unparseable analysis content");
        ChatToxicityError::MalformedAnalysisOutput(format!("completion is not valid JSON: {e}"))
    })
}

fn is_retryable(err: &ChatToxicityError) -> bool {
    match err {
        ChatToxicityError::Http(e) => e.is_timeout() || e.is_connect() || e.status().is_some_and(retryable_status),
        ChatToxicityError::AnalysisStatus { status, .. } => {
            StatusCode::from_u16(*status).is_ok_and(retryable_status)
        },
        _ => false,
    }
}

fn retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn truncate(text: &str, max_chars: usize) -> &str {
    text.char_indices().nth(max_chars).map_or(text, |(idx, _)| &text[..idx])
}
