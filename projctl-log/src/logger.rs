//! Logger context and log records.

use std::fmt;
use std::sync::Arc;

use crate::sink::{NoopSink, Sink, TracingSink};

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structured log event as handed to a [`Sink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: Level,
    /// Slash-joined logger name, empty for the root logger.
    pub logger: String,
    pub message: String,
    pub error: Option<String>,
    /// Key/value pairs in insertion order: logger values first, then call-site values.
    pub fields: Vec<(String, String)>,
}

impl Record {
    /// Look up the last value recorded for `key`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Render the fields as `"key"="value"` pairs separated by spaces.
    pub fn render_fields(&self) -> String {
        let mut out = String::new();
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&format!("\"{}\"=\"{}\"", k, v));
        }
        out
    }

    /// Render the whole record on one line, logger name first.
    pub fn render(&self) -> String {
        let mut out = self.logger.clone();
        out.push_str(&format!(" \"level\"=\"{}\" \"msg\"=\"{}\"", self.level, self.message));
        if let Some(err) = &self.error {
            out.push_str(&format!(" \"error\"=\"{}\"", err));
        }
        if !self.fields.is_empty() {
            out.push(' ');
            out.push_str(&self.render_fields());
        }
        out
    }
}

/// Structured logger handle.
///
/// Cloning is cheap; `with_name` and `with_values` return new loggers and leave
/// the receiver untouched.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn Sink>,
    name: String,
    values: Vec<(String, String)>,
}

impl Logger {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self {
            sink,
            name: String::new(),
            values: Vec::new(),
        }
    }

    /// Logger that forwards to `tracing`.
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    /// Logger that drops everything.
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopSink))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a name segment. Nested names are joined with `/`.
    pub fn with_name(&self, name: &str) -> Self {
        let name = if self.name.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.name, name)
        };
        Self {
            sink: Arc::clone(&self.sink),
            name,
            values: self.values.clone(),
        }
    }

    /// Attach key/value pairs that are included in every record of the returned logger.
    pub fn with_values(&self, values: &[(&str, &str)]) -> Self {
        let mut merged = self.values.clone();
        merged.extend(values.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        Self {
            sink: Arc::clone(&self.sink),
            name: self.name.clone(),
            values: merged,
        }
    }

    pub fn info(&self, message: &str, values: &[(&str, &str)]) {
        self.log(Level::Info, message, None, values);
    }

    pub fn debug(&self, message: &str, values: &[(&str, &str)]) {
        self.log(Level::Debug, message, None, values);
    }

    pub fn warn(&self, message: &str, values: &[(&str, &str)]) {
        self.log(Level::Warn, message, None, values);
    }

    pub fn error(&self, err: &dyn std::error::Error, message: &str, values: &[(&str, &str)]) {
        self.log(Level::Error, message, Some(err.to_string()), values);
    }

    fn log(&self, level: Level, message: &str, error: Option<String>, values: &[(&str, &str)]) {
        let mut fields = self.values.clone();
        fields.extend(values.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self.sink.log(&Record {
            level,
            logger: self.name.clone(),
            message: message.to_string(),
            error,
            fields,
        });
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("values", &self.values)
            .finish()
    }
}
