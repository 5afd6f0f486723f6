//! Sender classification
//!
//! Decides whether a sender name refers to the analysis subject. The set of
//! self-referring names is locale dependent and comes from configuration.

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

use crate::models::SenderType;
use crate::parser::trim_line;

/// Names that refer to the analysis subject when no configuration is given
pub const DEFAULT_SELF_ALIASES: [&str; 2] = ["กู", "me"];

/// Classifies named senders as SELF or OTHER
#[derive(Debug, Clone)]
pub struct SenderClassifier {
    aliases: HashSet<String>,
}

impl SenderClassifier {
    /// Create a classifier recognizing the given self-referring names
    pub fn new<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let aliases = aliases
            .into_iter()
            .map(|alias| normalize_name(alias.as_ref()))
            .filter(|alias| !alias.is_empty())
            .collect();
        Self { aliases }
    }

    /// True iff `name`, trimmed and case-folded, is exactly one of the aliases
    #[must_use]
    pub fn is_self(&self, name: &str) -> bool {
        self.aliases.contains(&normalize_name(name))
    }

    /// SELF for recognized aliases, OTHER for everyone else
    #[must_use]
    pub fn classify(&self, name: &str) -> SenderType {
        if self.is_self(name) {
            SenderType::Me
        } else {
            SenderType::Other
        }
    }
}

impl Default for SenderClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_SELF_ALIASES)
    }
}

// NFC first so composed and decomposed Thai/accented input compare equal.
fn normalize_name(name: &str) -> String {
    trim_line(name).nfc().collect::<String>().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_aliases() {
        let classifier = SenderClassifier::default();
        assert!(classifier.is_self("me"));
        assert!(classifier.is_self(" Me "));
        assert!(classifier.is_self("ME"));
        assert!(classifier.is_self("กู"));
        assert!(!classifier.is_self("Bob"));
    }

    #[test]
    fn test_exact_match_only() {
        let classifier = SenderClassifier::default();
        assert!(!classifier.is_self("meg"));
        assert!(!classifier.is_self("me and you"));
        assert!(!classifier.is_self(""));
    }

    #[test]
    fn test_custom_aliases() {
        let classifier = SenderClassifier::new(["Yo", " moi "]);
        assert!(classifier.is_self("yo"));
        assert!(classifier.is_self("MOI"));
        assert!(!classifier.is_self("me"));
        assert_eq!(classifier.classify("Moi"), SenderType::Me);
        assert_eq!(classifier.classify("Anna"), SenderType::Other);
    }

    #[test]
    fn test_bom_is_ignored() {
        let classifier = SenderClassifier::default();
        assert!(classifier.is_self("\u{FEFF}me"));
        assert!(!SenderClassifier::new(["\u{FEFF}"]).is_self(""));
    }

    #[test]
    fn test_blank_alias_is_ignored() {
        let classifier = SenderClassifier::new(["", "  "]);
        assert!(!classifier.is_self(""));
    }
}
