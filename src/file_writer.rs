//! File writing utilities for scored message export.
//!
//! This module writes a conversation's stored messages, with their scores,
//! to CSV or JSON files.

use crate::error::Result;
use crate::models::{OutputFormat, StoredMessage, SummaryRecord};
use csv::Writer;
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const CSV_HEADER: [&str; 8] = [
    "id",
    "created_at",
    "sender_name",
    "sender_type",
    "text",
    "toxicity_score",
    "sentiment_score",
    "flags",
];

#[derive(Serialize)]
struct ConversationExport<'a> {
    summary: &'a SummaryRecord,
    messages: &'a [StoredMessage],
}

/// Export messages to `output_dir/conversation_<id>.<ext>`.
///
/// # Returns
///
/// Path of the created file
pub fn export_conversation(
    messages: &[StoredMessage],
    summary: &SummaryRecord,
    format: OutputFormat,
    output_dir: &Path,
) -> Result<PathBuf> {
    create_dir_all(output_dir)?;
    let file_path = output_dir.join(format!(
        "conversation_{}.{}",
        summary.conversation_id,
        format.extension()
    ));

    match format {
        OutputFormat::Csv => write_csv_file(messages, &file_path)?,
        OutputFormat::Json => write_json_file(messages, summary, &file_path)?,
    }

    Ok(file_path)
}

/// Write messages to a CSV file, one row per message
pub fn write_csv_file(messages: &[StoredMessage], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = Writer::from_writer(BufWriter::new(file));

    writer.write_record(CSV_HEADER)?;

    for message in messages {
        writer.write_record([
            message.id.to_string(),
            message.created_at.to_rfc3339(),
            message.sender_name.clone(),
            message.sender_type.to_string(),
            message.text.clone(),
            format_score(message.toxicity_score),
            format_score(message.sentiment_score),
            message.flags.as_deref().map(|flags| flags.join(";")).unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write messages and the conversation summary to a JSON file
pub fn write_json_file(messages: &[StoredMessage], summary: &SummaryRecord, file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, &ConversationExport { summary, messages })?;
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}

fn format_score(score: Option<f64>) -> String {
    score.map(|s| format!("{s:.4}")).unwrap_or_default()
}
