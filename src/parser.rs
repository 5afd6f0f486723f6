//! Line-based chat parser
//!
//! Turns a free-form chat export into ordered [`ParsedMessage`]s. Every
//! non-blank line yields exactly one message; lines that do not look like
//! `Name: text` degrade to SYSTEM messages instead of failing.

use crate::classifier::SenderClassifier;
use crate::models::ParsedMessage;

/// Parser for `Name: text` chat exports
#[derive(Debug, Clone, Default)]
pub struct ChatLineParser {
    classifier: SenderClassifier,
}

impl ChatLineParser {
    /// Create a parser that classifies senders with `classifier`
    #[must_use]
    pub const fn new(classifier: SenderClassifier) -> Self {
        Self { classifier }
    }

    /// The classifier used for named senders
    #[must_use]
    pub const fn classifier(&self) -> &SenderClassifier {
        &self.classifier
    }

    /// Parse raw multi-line text, preserving line order
    #[must_use]
    pub fn parse(&self, raw: &str) -> Vec<ParsedMessage> {
        raw.split('\n').filter_map(|line| self.parse_line(line)).collect()
    }

    /// Parse a single line; `None` for blank lines
    #[must_use]
    pub fn parse_line(&self, line: &str) -> Option<ParsedMessage> {
        let line = trim_line(line);
        if line.is_empty() {
            return None;
        }

        // A colon at index 0 leaves no room for a name.
        let Some(colon) = line.find(':').filter(|idx| *idx > 0) else {
            return Some(ParsedMessage::system(line));
        };

        let sender_name = trim_line(&line[..colon]);
        let text = trim_line(&line[colon + 1..]);
        if sender_name.is_empty() || text.is_empty() {
            return Some(ParsedMessage::system(line));
        }

        Some(ParsedMessage {
            sender_name: sender_name.to_string(),
            sender_type: self.classifier.classify(sender_name),
            text: text.to_string(),
        })
    }
}

/// Whitespace plus the byte-order mark some exporters prepend
pub(crate) fn trim_line(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SenderType;

    #[test]
    fn test_trim_line_strips_bom() {
        assert_eq!(trim_line("\u{FEFF} me \u{FEFF}"), "me");
        assert_eq!(trim_line("\u{FEFF}"), "");
    }

    #[test]
    fn test_named_line() {
        let parser = ChatLineParser::default();
        let message = parser.parse_line("  John :  hi there ").expect("message");
        assert_eq!(message.sender_name, "John");
        assert_eq!(message.sender_type, SenderType::Other);
        assert_eq!(message.text, "hi there");
    }

    #[test]
    fn test_only_first_colon_splits() {
        let parser = ChatLineParser::default();
        let message = parser.parse_line("me: meet at 10:30").expect("message");
        assert_eq!(message.sender_type, SenderType::Me);
        assert_eq!(message.text, "meet at 10:30");
    }

    #[test]
    fn test_lone_colon_is_system() {
        let parser = ChatLineParser::default();
        assert_eq!(parser.parse_line(":"), Some(ParsedMessage::system(":")));
    }

    #[test]
    fn test_blank_line_is_skipped() {
        let parser = ChatLineParser::default();
        assert_eq!(parser.parse_line(" \t "), None);
    }
}
