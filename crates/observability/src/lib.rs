//! # oase-observability
//!
//! Structured Logging via tracing-subscriber fuer Relay und Client.

pub mod logging;

pub use logging::{
    log_format_gueltig, log_level_gueltig, logging_initialisieren, LogAusgabe, LogFormat,
    LoggingKonfiguration,
};
