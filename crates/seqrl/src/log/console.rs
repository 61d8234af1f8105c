//! Console logging backend.

use super::{MetricLogger, Metrics};

/// Logger that prints one line per step through tracing.
#[derive(Default)]
pub struct ConsoleLogger;

impl ConsoleLogger {
    pub fn new() -> Self {
        Self
    }
}

/// `name=value` pairs in name order
fn format_metrics(metrics: &Metrics) -> String {
    metrics
        .iter()
        .map(|(name, value)| format!("{}={:.4}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}

impl MetricLogger for ConsoleLogger {
    fn record(&self, step: u64, metrics: &Metrics) {
        tracing::info!("Step {}: {}", step, format_metrics(metrics));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sorted() {
        let metrics = Metrics::from([
            ("train/reward".to_string(), 0.5),
            ("train/loss".to_string(), -1.25),
        ]);
        assert_eq!(
            format_metrics(&metrics),
            "train/loss=-1.2500, train/reward=0.5000"
        );
    }
}
