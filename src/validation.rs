//! Input checks run before anything is parsed or written.

use std::path::Path;

use crate::error::{ChatToxicityError, Result};

const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 2000;

fn invalid(message: impl Into<String>) -> ChatToxicityError {
    ChatToxicityError::InvalidInput(message.into())
}

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate conversation title
    pub fn validate_title(title: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Err(invalid("title is required and must not be blank"));
        }

        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(invalid(format!("title too long (max {MAX_TITLE_CHARS} characters)")));
        }

        if title.chars().any(char::is_control) {
            return Err(invalid("title contains control characters"));
        }

        Ok(())
    }

    /// Validate optional conversation description
    pub fn validate_description(description: Option<&str>) -> Result<()> {
        if let Some(description) = description {
            if description.chars().count() > MAX_DESCRIPTION_CHARS {
                return Err(invalid(format!(
                    "description too long (max {MAX_DESCRIPTION_CHARS} characters)"
                )));
            }
            if description.contains('\0') {
                return Err(invalid("description contains invalid characters"));
            }
        }

        Ok(())
    }

    /// Validate the size of raw chat text submitted for import
    ///
    /// Blank input is not rejected here; it parses to nothing and the import
    /// fails as empty.
    pub fn validate_raw_import(raw: &str, max_bytes: usize) -> Result<()> {
        if raw.len() > max_bytes {
            return Err(invalid(format!(
                "raw chat text too large ({} bytes, max {max_bytes})",
                raw.len()
            )));
        }

        Ok(())
    }

    /// Validate batch size for analysis
    pub fn validate_batch_size(batch_size: usize) -> Result<()> {
        if batch_size == 0 {
            return Err(invalid("Batch size must be greater than 0"));
        }

        if batch_size > 10_000 {
            return Err(invalid("Batch size too large (max 10,000)"));
        }

        Ok(())
    }

    /// Validate an export destination
    pub fn validate_export_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.is_empty() {
            return Err(invalid("File path cannot be empty"));
        }

        // Check for path traversal attempts
        if path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(invalid("File path must not contain '..'"));
        }

        // Check path length
        if path_str.len() > 4096 {
            return Err(invalid("File path too long (max 4096 characters)"));
        }

        Ok(())
    }

    /// Validate database URL
    pub fn validate_database_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(invalid("Database URL cannot be empty"));
        }

        if !url.starts_with("sqlite:") {
            return Err(invalid("Only SQLite databases are supported"));
        }

        if url.len() > 1000 {
            return Err(invalid("Database URL too long"));
        }

        Ok(())
    }

    /// Normalize a user-supplied title or description
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
