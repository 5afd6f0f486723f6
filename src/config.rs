use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::classifier::DEFAULT_SELF_ALIASES;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub analysis: AnalysisConfig,
    pub parser: ParserConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

/// Which analysis backend scores imported messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisProviderKind {
    /// OpenAI-compatible chat completions endpoint
    Http,
    /// No remote calls; every message gets neutral scores
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub provider: AnalysisProviderKind,
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub batch_size: usize,
    pub cache_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Sender names treated as the analysis subject
    pub self_aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub max_raw_bytes: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/chat_toxicity.db".to_string(),
                max_connections: 10,
                connection_timeout_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            analysis: AnalysisConfig {
                provider: AnalysisProviderKind::Http,
                api_url: "https://integrate.api.nvidia.com/v1/chat/completions".to_string(),
                api_key: None,
                model: "openai/gpt-oss-120b".to_string(),
                temperature: 0.3,
                top_p: 1.0,
                max_tokens: 2048,
                timeout_secs: 60,
                max_retries: 2,
                batch_size: 100,
                cache_path: None,
            },
            parser: ParserConfig {
                self_aliases: DEFAULT_SELF_ALIASES.iter().map(ToString::to_string).collect(),
            },
            import: ImportConfig {
                max_raw_bytes: 2 * 1024 * 1024,
                default_page_size: 50,
                max_page_size: 200,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Same as [`AppConfig::load`], with an extra file layered above the defaults
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&Self::default()).context("Failed to build default configuration")?;

        let mut builder = Config::builder()
            // Start with default values
            .add_source(defaults)
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // e.g. CHAT_TOXICITY_ANALYSIS__API_KEY
            .add_source(
                Environment::with_prefix("CHAT_TOXICITY")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("parser.self_aliases")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        let app_config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate database config
        if !self.database.url.starts_with("sqlite:") {
            return Err(anyhow::anyhow!("database url must start with sqlite:"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be greater than 0"));
        }
        if self.database.connection_timeout_secs == 0 {
            return Err(anyhow::anyhow!("connection_timeout_secs must be greater than 0"));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        // Validate analysis config
        if self.analysis.provider == AnalysisProviderKind::Http && self.analysis.api_url.trim().is_empty() {
            return Err(anyhow::anyhow!("api_url is required for the http analysis provider"));
        }
        if self.analysis.timeout_secs == 0 {
            return Err(anyhow::anyhow!("analysis timeout_secs must be greater than 0"));
        }
        if self.analysis.batch_size == 0 {
            return Err(anyhow::anyhow!("batch_size must be greater than 0"));
        }
        if !(0.0..=2.0).contains(&self.analysis.temperature) {
            return Err(anyhow::anyhow!("temperature must be between 0 and 2"));
        }

        // Validate parser config
        if self.parser.self_aliases.iter().all(|alias| alias.trim().is_empty()) {
            return Err(anyhow::anyhow!("self_aliases must contain at least one name"));
        }

        // Validate import config
        if self.import.max_raw_bytes == 0 {
            return Err(anyhow::anyhow!("max_raw_bytes must be greater than 0"));
        }
        if self.import.default_page_size == 0 || self.import.default_page_size > self.import.max_page_size {
            return Err(anyhow::anyhow!(
                "default_page_size must be between 1 and max_page_size ({})",
                self.import.max_page_size
            ));
        }

        Ok(())
    }

    /// Filesystem path of the SQLite database
    pub fn database_path(&self) -> &str {
        self.database.url.strip_prefix("sqlite:").unwrap_or(&self.database.url)
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}
