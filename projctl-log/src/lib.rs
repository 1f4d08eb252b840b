//! projctl diagnostics library
//!
//! Leveled, key/value structured log records routed through pluggable sinks.
//! A [`Logger`] is an explicit context value: callers derive child loggers that
//! carry correlation fields instead of relying on global logger state.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use projctl_log::{Logger, RecordingSink};
//!
//! let sink = Arc::new(RecordingSink::new());
//! let log = Logger::new(sink.clone()).with_name("controller");
//! let log = log.with_values(&[("owner", "team-a/stream")]);
//! log.info("Applying resources", &[("count", "3")]);
//!
//! assert_eq!(sink.records()[0].render(), r#"controller "level"="info" "msg"="Applying resources" "owner"="team-a/stream" "count"="3""#);
//! ```

mod logger;
mod sink;

pub use logger::{Level, Logger, Record};
pub use sink::{MuxSink, NoopSink, RecordingSink, Sink, TracingSink};
