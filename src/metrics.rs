use anyhow::Result;
use metrics::{counter, gauge, histogram};
use std::time::Duration;

use crate::models::ConversationSummary;

/// Metrics collection and management
#[derive(Debug, Clone, Copy)]
pub struct MetricsCollector {
    // Import metrics
    pub messages_imported_total: &'static str,
    pub imports_total: &'static str,
    pub import_duration: &'static str,

    // Analysis metrics
    pub analysis_requests_total: &'static str,
    pub analysis_failures_total: &'static str,
    pub analysis_fallback_messages_total: &'static str,
    pub analysis_cache_hits_total: &'static str,
    pub analysis_duration: &'static str,

    // Summary metrics
    pub summary_recomputes_total: &'static str,
    pub breakup_risk_score: &'static str,
    pub conflict_days: &'static str,

    // Error metrics
    pub errors_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            messages_imported_total: "chat_toxicity_messages_imported_total",
            imports_total: "chat_toxicity_imports_total",
            import_duration: "chat_toxicity_import_duration_seconds",

            analysis_requests_total: "chat_toxicity_analysis_requests_total",
            analysis_failures_total: "chat_toxicity_analysis_failures_total",
            analysis_fallback_messages_total: "chat_toxicity_analysis_fallback_messages_total",
            analysis_cache_hits_total: "chat_toxicity_analysis_cache_hits_total",
            analysis_duration: "chat_toxicity_analysis_duration_seconds",

            summary_recomputes_total: "chat_toxicity_summary_recomputes_total",
            breakup_risk_score: "chat_toxicity_breakup_risk_score",
            conflict_days: "chat_toxicity_conflict_days",

            errors_total: "chat_toxicity_errors_total",
        }
    }
}

impl MetricsCollector {
    /// Install a no-op global recorder; exporters can replace it in embedding applications
    pub fn init() -> Result<()> {
        metrics::set_global_recorder(metrics::NoopRecorder)
            .map_err(|_| anyhow::anyhow!("Failed to initialize metrics recorder: already set"))?;

        Ok(())
    }

    /// Record a finished import
    pub fn record_import(&self, count: usize, duration: Duration) {
        counter!(self.imports_total).increment(1);
        counter!(self.messages_imported_total).increment(count as u64);
        histogram!(self.import_duration).record(duration.as_secs_f64());
    }

    /// Record one call to the analysis capability
    pub fn record_analysis_call(&self, batch_size: usize, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };
        counter!(self.analysis_requests_total, "status" => status).increment(1);
        histogram!(self.analysis_duration, "status" => status).record(duration.as_secs_f64());
        histogram!("chat_toxicity_analysis_batch_size").record(batch_size as f64);
    }

    /// Record an analysis failure that was absorbed by the neutral fallback
    pub fn record_analysis_fallback(&self, reason: &'static str, message_count: usize) {
        counter!(self.analysis_failures_total, "reason" => reason).increment(1);
        counter!(self.analysis_fallback_messages_total).increment(message_count as u64);
    }

    /// Record a batch served from the analysis cache
    pub fn record_cache_hit(&self) {
        counter!(self.analysis_cache_hits_total).increment(1);
    }

    /// Record a recomputed summary
    pub fn record_summary(&self, summary: &ConversationSummary) {
        counter!(self.summary_recomputes_total).increment(1);
        gauge!(self.breakup_risk_score).set(summary.breakup_risk_score);
        gauge!(self.conflict_days).set(f64::from(summary.conflict_days_count));
    }

    /// Record error metrics
    pub fn record_error(&self, error_type: &'static str, operation: &'static str) {
        counter!(self.errors_total, "type" => error_type, "operation" => operation).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::default();
        assert_eq!(collector.messages_imported_total, "chat_toxicity_messages_imported_total");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let collector = MetricsCollector::default();
        collector.record_import(3, Duration::from_millis(5));
        collector.record_analysis_call(3, Duration::from_millis(5), false);
        collector.record_analysis_fallback("timeout", 3);
        collector.record_summary(&ConversationSummary::default());
        collector.record_error("database", "import");
    }
}
