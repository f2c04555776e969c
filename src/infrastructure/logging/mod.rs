//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - Pretty or JSON formatting on stderr
//! - `RUST_LOG` directives layered over the configured level
//! - Optional rolling JSON log files via tracing-appender

pub mod logger;

pub use logger::{parse_log_level, LoggerImpl};
