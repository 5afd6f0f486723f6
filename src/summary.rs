//! Conversation summary aggregation
//!
//! [`summarize`] is a pure reducer from the complete message set of one
//! conversation to its [`ConversationSummary`]. It performs no I/O; callers
//! read the messages, reduce, and upsert the result.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{ConversationSummary, SenderType, StoredMessage};

/// A day whose mean toxicity reaches this value counts as a conflict day
pub const CONFLICT_DAY_THRESHOLD: f64 = 0.5;
/// Weight of overall toxicity in the risk score
pub const RISK_TOXICITY_WEIGHT: f64 = 0.6;
/// Fixed risk added per conflict day
pub const RISK_CONFLICT_DAY_PENALTY: f64 = 0.05;

/// Compute conversation statistics from every persisted message.
///
/// Messages without a toxicity score do not take part in the toxicity
/// averages or in conflict-day detection; messages without a sentiment
/// score do not take part in the sentiment average.
#[must_use]
pub fn summarize(messages: &[StoredMessage]) -> ConversationSummary {
    let toxicity: Vec<(&StoredMessage, f64)> = messages
        .iter()
        .filter_map(|m| m.toxicity_score.map(|score| (m, score)))
        .collect();

    let avg_toxicity_overall = mean(toxicity.iter().map(|(_, score)| *score));
    let avg_toxicity_self = mean_for_sender(&toxicity, SenderType::Me);
    let avg_toxicity_other = mean_for_sender(&toxicity, SenderType::Other);
    let sentiment_overall = mean(messages.iter().filter_map(|m| m.sentiment_score));
    let conflict_days_count = count_conflict_days(&toxicity);

    ConversationSummary {
        avg_toxicity_overall,
        avg_toxicity_self,
        avg_toxicity_other,
        sentiment_overall,
        conflict_days_count,
        breakup_risk_score: risk_score(avg_toxicity_overall, conflict_days_count),
    }
}

/// `clamp(toxicity * 0.6 + conflict_days * 0.05, 0, 1)`
#[must_use]
#[allow(clippy::suboptimal_flops)] // fused multiply-add would round differently from stored scores
pub fn risk_score(avg_toxicity_overall: f64, conflict_days_count: u32) -> f64 {
    let raw = avg_toxicity_overall * RISK_TOXICITY_WEIGHT + f64::from(conflict_days_count) * RISK_CONFLICT_DAY_PENALTY;
    raw.clamp(0.0, 1.0)
}

fn mean_for_sender(scored: &[(&StoredMessage, f64)], sender_type: SenderType) -> f64 {
    mean(
        scored
            .iter()
            .filter(|(m, _)| m.sender_type == sender_type)
            .map(|(_, score)| *score),
    )
}

// Days are UTC calendar dates of the store-assigned creation time.
fn count_conflict_days(scored: &[(&StoredMessage, f64)]) -> u32 {
    let mut days: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for (message, score) in scored {
        let entry = days.entry(message.created_at.date_naive()).or_insert((0.0, 0));
        entry.0 += score;
        entry.1 += 1;
    }

    let conflict_days = days
        .values()
        .filter(|(sum, count)| sum / *count as f64 >= CONFLICT_DAY_THRESHOLD)
        .count();
    u32::try_from(conflict_days).unwrap_or(u32::MAX)
}

/// Arithmetic mean, 0 for an empty input
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_nothing_is_zero() {
        assert_eq!(mean(std::iter::empty()), 0.0);
    }

    #[test]
    fn test_risk_score_saturates() {
        assert!((risk_score(1.0, 20) - 1.0).abs() < f64::EPSILON);
        assert!((risk_score(0.5, 0) - 0.3).abs() < 1e-12);
        assert!((risk_score(0.0, 3) - 0.15).abs() < 1e-12);
    }
}
