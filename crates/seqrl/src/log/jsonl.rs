//! JSON-lines logging backend.

use super::{MetricLogger, Metrics};
use crate::Result;
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Appends one JSON object per logged step: `{"step": 3, "train/reward": 0.4, ...}`.
///
/// Non-finite values are written as `null`.
pub struct JsonlLogger {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlLogger {
    /// Open `path` for appending, creating it if needed
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&self, record: Map<String, Value>) {
        let line = Value::Object(record).to_string();
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        if let Err(e) = writeln!(writer, "{}", line) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write metrics");
        }
    }
}

impl MetricLogger for JsonlLogger {
    fn record(&self, step: u64, metrics: &Metrics) {
        let mut record = Map::new();
        record.insert("step".to_string(), Value::from(step));
        for (name, &value) in metrics {
            record.insert(name.clone(), Value::from(value));
        }
        self.write_record(record);
    }

    fn flush(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            if let Err(e) = writer.flush() {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to flush metrics");
            }
        }
    }
}

impl Drop for JsonlLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writes_one_line_per_step() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runs").join("metrics.jsonl");
        let logger = JsonlLogger::create(&path).unwrap();

        let metrics = Metrics::from([
            ("train/reward".to_string(), 0.25),
            ("train/loss".to_string(), f64::NAN),
        ]);
        logger.record(1, &metrics);
        logger.record_one(2, "train/reward", 0.5);
        logger.flush();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["step"], 1);
        assert_eq!(lines[0]["train/reward"], 0.25);
        assert!(lines[0]["train/loss"].is_null());
        assert_eq!(lines[1]["train/reward"], 0.5);
    }
}
