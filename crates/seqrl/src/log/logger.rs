//! Metric sinks.

use std::collections::BTreeMap;

/// Metrics of one logged step keyed `group/name`, iterated in name order.
pub type Metrics = BTreeMap<String, f64>;

/// Destination for training metrics.
///
/// Steps are counts of generated sequences, so they increase by the
/// population's batch size rather than by one.
pub trait MetricLogger: Send + Sync {
    /// Record all metrics of one step.
    fn record(&self, step: u64, metrics: &Metrics);

    /// Record a single value.
    fn record_one(&self, step: u64, name: &str, value: f64) {
        self.record(step, &Metrics::from([(name.to_string(), value)]));
    }

    /// Flush buffered output. The trainer calls this once when it finishes.
    fn flush(&self) {}
}

/// Drops everything. Used until a trainer is given a real logger.
pub struct NoOpLogger;

impl MetricLogger for NoOpLogger {
    fn record(&self, _step: u64, _metrics: &Metrics) {}
}

/// Forwards every record to each inner logger in insertion order.
#[derive(Default)]
pub struct CompositeLogger {
    sinks: Vec<Box<dyn MetricLogger>>,
}

impl CompositeLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with(mut self, sink: Box<dyn MetricLogger>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl FromIterator<Box<dyn MetricLogger>> for CompositeLogger {
    fn from_iter<I: IntoIterator<Item = Box<dyn MetricLogger>>>(iter: I) -> Self {
        Self {
            sinks: iter.into_iter().collect(),
        }
    }
}

impl MetricLogger for CompositeLogger {
    fn record(&self, step: u64, metrics: &Metrics) {
        self.sinks.iter().for_each(|sink| sink.record(step, metrics));
    }

    fn flush(&self) {
        self.sinks.iter().for_each(|sink| sink.flush());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture {
        steps: Arc<Mutex<Vec<(u64, Vec<String>)>>>,
        flushes: Arc<Mutex<usize>>,
    }

    impl MetricLogger for Capture {
        fn record(&self, step: u64, metrics: &Metrics) {
            let names = metrics.keys().cloned().collect();
            self.steps.lock().unwrap().push((step, names));
        }

        fn flush(&self) {
            *self.flushes.lock().unwrap() += 1;
        }
    }

    #[test]
    fn test_composite_forwards_to_every_sink() {
        let first = Capture::default();
        let second = Capture::default();
        let composite = CompositeLogger::new()
            .with(Box::new(first.clone()))
            .with(Box::new(second.clone()))
            .with(Box::new(NoOpLogger));
        assert_eq!(composite.len(), 3);

        composite.record_one(16, "agent0/reward", 0.4);
        composite.flush();

        let expected = vec![(16, vec!["agent0/reward".to_string()])];
        assert_eq!(*first.steps.lock().unwrap(), expected);
        assert_eq!(*second.steps.lock().unwrap(), expected);
        assert_eq!(*second.flushes.lock().unwrap(), 1);
    }

    #[test]
    fn test_collect_into_composite() {
        let composite: CompositeLogger = vec![Box::new(NoOpLogger) as Box<dyn MetricLogger>]
            .into_iter()
            .collect();
        assert!(!composite.is_empty());
        assert!(CompositeLogger::new().is_empty());
    }
}
