//! Per-operation-type record logs
//!
//! Workers append raw strings (usually trace lines) under an operation name.
//! Each name gets its own log behind its own mutex, so appends for different
//! operation types never contend. The name-to-log map is only write-locked
//! the first time a name is seen.

use crate::error::Result;
use crate::export::MeasurementsExporter;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// How much of each log is retained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum RecordLogKind {
    /// Keep every appended line
    #[default]
    PerLine,
    /// Keep only the number of appended lines
    Count,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct RecordLogConfig {
    pub kind: RecordLogKind,
}

/// One operation type's log
pub trait RecordLog: Send {
    fn append(&mut self, content: &str);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored lines in append order; empty when lines are not retained
    fn lines(&self) -> &[String];
}

#[derive(Debug, Default)]
pub struct PerLineLog {
    lines: Vec<String>,
}

impl RecordLog for PerLineLog {
    fn append(&mut self, content: &str) {
        self.lines.push(content.to_string());
    }

    fn len(&self) -> usize {
        self.lines.len()
    }

    fn lines(&self) -> &[String] {
        &self.lines
    }
}

#[derive(Debug, Default)]
pub struct CountingLog {
    count: usize,
}

impl RecordLog for CountingLog {
    fn append(&mut self, _content: &str) {
        self.count += 1;
    }

    fn len(&self) -> usize {
        self.count
    }

    fn lines(&self) -> &[String] {
        &[]
    }
}

type SharedLog = Arc<Mutex<Box<dyn RecordLog>>>;

/// Registry of record logs keyed by operation name
pub struct RecordLogs {
    config: RecordLogConfig,
    logs: RwLock<HashMap<String, SharedLog>>,
}

impl RecordLogs {
    pub fn new(config: RecordLogConfig) -> Self {
        Self { config, logs: RwLock::new(HashMap::new()) }
    }

    pub fn config(&self) -> &RecordLogConfig {
        &self.config
    }

    fn new_log(&self) -> Box<dyn RecordLog> {
        match self.config.kind {
            RecordLogKind::PerLine => Box::new(PerLineLog::default()),
            RecordLogKind::Count => Box::new(CountingLog::default()),
        }
    }

    fn log_for(&self, operation: &str) -> SharedLog {
        if let Some(log) = self.logs.read().get(operation) {
            return Arc::clone(log);
        }

        let mut logs = self.logs.write();
        // another writer may have created it between the two locks
        if let Some(log) = logs.get(operation) {
            return Arc::clone(log);
        }
        let log: SharedLog = Arc::new(Mutex::new(self.new_log()));
        logs.insert(operation.to_string(), Arc::clone(&log));
        log
    }

    /// Append `content` to the log for `operation`, creating it on first use
    pub fn record_log(&self, operation: &str, content: &str) {
        let log = self.log_for(operation);
        log.lock().append(content);
    }

    /// Number of records appended under `operation`
    pub fn len(&self, operation: &str) -> usize {
        self.logs.read().get(operation).map(|log| log.lock().len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.logs.read().is_empty()
    }

    /// Operation names seen so far, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.logs.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Write every log as `(name, "size", count)` followed by one `(name, line)` per line
    pub fn export_record_logs(&self, exporter: &mut dyn MeasurementsExporter) -> Result<()> {
        let mut entries: Vec<(String, SharedLog)> = self
            .logs
            .read()
            .iter()
            .map(|(name, log)| (name.clone(), Arc::clone(log)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, log) in entries {
            let log = log.lock();
            exporter.write(&name, "size", Some(log.len() as i64))?;
            for line in log.lines() {
                exporter.write(&name, line, None)?;
            }
        }
        Ok(())
    }
}

impl Default for RecordLogs {
    fn default() -> Self {
        Self::new(RecordLogConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::TextExporter;
    use std::thread;

    #[test]
    fn test_isolation_between_types() {
        let logs = RecordLogs::default();
        logs.record_log("READ", "r1");
        logs.record_log("UPDATE", "u1");
        logs.record_log("READ", "r2");

        assert_eq!(logs.len("READ"), 2);
        assert_eq!(logs.len("UPDATE"), 1);
        assert_eq!(logs.len("SCAN"), 0);
        assert_eq!(logs.names(), vec!["READ".to_string(), "UPDATE".to_string()]);
    }

    #[test]
    fn test_concurrent_appends_and_creation() {
        let logs = Arc::new(RecordLogs::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let logs = Arc::clone(&logs);
                thread::spawn(move || {
                    for i in 0..100 {
                        let op = if i % 2 == 0 { "READ" } else { "UPDATE" };
                        logs.record_log(op, &format!("{t}-{i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(logs.len("READ"), 400);
        assert_eq!(logs.len("UPDATE"), 400);
        assert_eq!(logs.names().len(), 2);
    }

    #[test]
    fn test_export_format_and_order() {
        let logs = RecordLogs::default();
        logs.record_log("UPDATE", "u1");
        logs.record_log("READ", "r1");
        logs.record_log("READ", "r2");

        let mut exporter = TextExporter::new(Vec::new());
        logs.export_record_logs(&mut exporter).unwrap();
        let out = String::from_utf8(exporter.into_inner()).unwrap();

        assert_eq!(
            out,
            "[READ], size, 2\n[READ], r1\n[READ], r2\n[UPDATE], size, 1\n[UPDATE], u1\n"
        );
    }

    #[test]
    fn test_counting_kind_keeps_no_lines() {
        let logs = RecordLogs::new(RecordLogConfig { kind: RecordLogKind::Count });
        for i in 0..5 {
            logs.record_log("INSERT", &format!("line{i}"));
        }
        assert_eq!(logs.len("INSERT"), 5);

        let mut exporter = TextExporter::new(Vec::new());
        logs.export_record_logs(&mut exporter).unwrap();
        let out = String::from_utf8(exporter.into_inner()).unwrap();
        assert_eq!(out, "[INSERT], size, 5\n");
    }
}
