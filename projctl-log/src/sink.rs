//! Log sinks.
//!
//! Records are always delivered synchronously; sinks must not block for long.

use std::sync::{Arc, Mutex};

use crate::logger::{Level, Record};

/// Destination for log records.
pub trait Sink: Send + Sync {
    fn log(&self, record: &Record);
}

/// Forwards records to `tracing` under the `projctl` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn log(&self, record: &Record) {
        let fields = record.render_fields();
        let error = record.error.as_deref().unwrap_or("");
        match record.level {
            Level::Error => {
                tracing::error!(target: "projctl", logger = %record.logger, error = %error, fields = %fields, "{}", record.message)
            }
            Level::Warn => {
                tracing::warn!(target: "projctl", logger = %record.logger, fields = %fields, "{}", record.message)
            }
            Level::Info => {
                tracing::info!(target: "projctl", logger = %record.logger, fields = %fields, "{}", record.message)
            }
            Level::Debug => {
                tracing::debug!(target: "projctl", logger = %record.logger, fields = %fields, "{}", record.message)
            }
        }
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl Sink for NoopSink {
    fn log(&self, _record: &Record) {}
}

/// Keeps records in memory for later inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<Record>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records received so far.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Records whose message equals `message`.
    pub fn with_message(&self, message: &str) -> Vec<Record> {
        self.records()
            .into_iter()
            .filter(|r| r.message == message)
            .collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl Sink for RecordingSink {
    fn log(&self, record: &Record) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
    }
}

/// Fans each record out to several sinks in order.
#[derive(Default, Clone)]
pub struct MuxSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl MuxSink {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn Sink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Sink for MuxSink {
    fn log(&self, record: &Record) {
        for sink in &self.sinks {
            sink.log(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Logger;

    #[test]
    fn test_mux_delivers_to_all_sinks() {
        let first = Arc::new(RecordingSink::new());
        let second = Arc::new(RecordingSink::new());
        let mux = MuxSink::new(vec![first.clone(), second.clone()]);
        assert_eq!(mux.len(), 2);

        let log = Logger::new(Arc::new(mux)).with_name("mux");
        log.info("hello", &[("k", "v")]);

        assert_eq!(first.records(), second.records());
        assert_eq!(first.records().len(), 1);
        assert_eq!(first.records()[0].logger, "mux");
    }

    #[test]
    fn test_empty_mux_is_silent() {
        let mux = MuxSink::default();
        assert!(mux.is_empty());
        Logger::new(Arc::new(mux)).info("nobody listens", &[]);
    }

    #[test]
    fn test_recording_sink_filter_and_clear() {
        let sink = Arc::new(RecordingSink::new());
        let log = Logger::new(sink.clone());
        log.info("a", &[]);
        log.info("b", &[]);
        log.info("a", &[]);

        assert_eq!(sink.with_message("a").len(), 2);
        sink.clear();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_tracing_and_noop_sinks_accept_records() {
        Logger::tracing().with_name("t").error(&std::io::Error::other("e"), "m", &[]);
        Logger::noop().info("dropped", &[]);
    }
}
