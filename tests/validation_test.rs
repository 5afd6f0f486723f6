//! Unit tests for validation.rs module

use chat_toxicity::error::ChatToxicityError;
use chat_toxicity::validation::InputValidator;
use std::path::Path;

#[test]
fn test_validate_title_valid() {
    assert!(InputValidator::validate_title("Us, 2024").is_ok());
    assert!(InputValidator::validate_title("เรา").is_ok());
}

#[test]
fn test_validate_title_blank() {
    assert!(InputValidator::validate_title("").is_err());
    assert!(InputValidator::validate_title("   ").is_err());
}

#[test]
fn test_validate_title_length_is_counted_in_chars() {
    assert!(InputValidator::validate_title(&"ก".repeat(200)).is_ok());
    assert!(InputValidator::validate_title(&"a".repeat(201)).is_err());
}

#[test]
fn test_validate_title_control_characters() {
    assert!(InputValidator::validate_title("Us\0").is_err());
    assert!(InputValidator::validate_title("line\nbreak").is_err());
}

#[test]
fn test_validate_description() {
    assert!(InputValidator::validate_description(None).is_ok());
    assert!(InputValidator::validate_description(Some("")).is_ok());
    assert!(InputValidator::validate_description(Some("multi\nline")).is_ok());
    assert!(InputValidator::validate_description(Some("bad\0byte")).is_err());
    assert!(InputValidator::validate_description(Some(&"x".repeat(2001))).is_err());
}

#[test]
fn test_validate_raw_import_size() {
    assert!(InputValidator::validate_raw_import("me: hi", 1024).is_ok());
    assert!(InputValidator::validate_raw_import("", 1024).is_ok());

    let err = InputValidator::validate_raw_import(&"a".repeat(11), 10).expect_err("too large");
    assert!(matches!(err, ChatToxicityError::InvalidInput(_)));
}

#[test]
fn test_validate_batch_size() {
    assert!(InputValidator::validate_batch_size(1).is_ok());
    assert!(InputValidator::validate_batch_size(10_000).is_ok());
    assert!(InputValidator::validate_batch_size(0).is_err());
    assert!(InputValidator::validate_batch_size(10_001).is_err());
}

#[test]
fn test_validate_export_path() {
    assert!(InputValidator::validate_export_path(Path::new("./output")).is_ok());
    assert!(InputValidator::validate_export_path(Path::new("/tmp/exports")).is_ok());
    assert!(InputValidator::validate_export_path(Path::new("")).is_err());
    assert!(InputValidator::validate_export_path(Path::new("output/../../etc")).is_err());
}

#[test]
fn test_validate_database_url() {
    assert!(InputValidator::validate_database_url("sqlite:data/chat.db").is_ok());
    assert!(InputValidator::validate_database_url("").is_err());
    assert!(InputValidator::validate_database_url("mysql://localhost").is_err());
}

#[test]
fn test_sanitize_text() {
    assert_eq!(InputValidator::sanitize_text("  Us\u{7}  "), "Us");
    assert_eq!(InputValidator::sanitize_text("a\tb\nc"), "a\tb\nc");
    assert_eq!(InputValidator::sanitize_text("\0\0"), "");
}
