//! Unit tests for metrics.rs module

use chat_toxicity::metrics::MetricsCollector;
use chat_toxicity::models::ConversationSummary;
use std::time::Duration;

#[test]
fn test_metrics_collector_default_names() {
    let collector = MetricsCollector::default();
    let names = [
        collector.messages_imported_total,
        collector.imports_total,
        collector.import_duration,
        collector.analysis_requests_total,
        collector.analysis_failures_total,
        collector.analysis_fallback_messages_total,
        collector.analysis_cache_hits_total,
        collector.analysis_duration,
        collector.summary_recomputes_total,
        collector.breakup_risk_score,
        collector.conflict_days,
        collector.errors_total,
    ];

    assert!(names.iter().all(|name| name.starts_with("chat_toxicity_")));
}

#[test]
fn test_metrics_initialization_is_once() {
    assert!(MetricsCollector::init().is_ok());
    assert!(MetricsCollector::init().is_err());
}

#[test]
fn test_record_everything() {
    let collector = MetricsCollector::default();
    collector.record_import(10, Duration::from_millis(120));
    collector.record_analysis_call(10, Duration::from_millis(80), true);
    collector.record_analysis_call(10, Duration::from_secs(60), false);
    collector.record_analysis_fallback("unavailable", 10);
    collector.record_cache_hit();
    collector.record_summary(&ConversationSummary {
        breakup_risk_score: 0.48,
        conflict_days_count: 2,
        ..ConversationSummary::default()
    });
    collector.record_error("database", "import");
}
