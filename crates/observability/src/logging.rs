//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `OASE_LOG_LEVEL`: Filter-Direktive (trace/debug/info/warn/error oder
//!   `oase_relay=debug,info`), ueberschreibt die Konfiguration
//! - `OASE_LOG_FORMAT`: Format (text/json), ueberschreibt die Konfiguration
//!
//! Der Client schreibt nach stderr, damit der Chat auf stdout ungestoert bleibt.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Level
pub const ENV_LOG_LEVEL: &str = "OASE_LOG_LEVEL";

/// Umgebungsvariable fuer das Log-Format
pub const ENV_LOG_FORMAT: &str = "OASE_LOG_FORMAT";

/// Ausgabeformat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parsen(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Ziel der Log-Ausgabe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogAusgabe {
    #[default]
    Stdout,
    Stderr,
}

/// `[logging]`-Abschnitt der Konfiguration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingKonfiguration {
    /// Log-Level (trace/debug/info/warn/error)
    pub level: String,
    /// Ausgabeformat
    pub format: LogFormat,
    #[serde(skip)]
    pub ausgabe: LogAusgabe,
}

impl Default for LoggingKonfiguration {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
            ausgabe: LogAusgabe::Stdout,
        }
    }
}

/// Initialisiert das Logging-System.
///
/// Umgebungsvariablen haben Vorrang vor `konfiguration`. Ein zweiter
/// Aufruf im selben Prozess wird ignoriert.
pub fn logging_initialisieren(konfiguration: &LoggingKonfiguration) {
    let level = level_waehlen(std::env::var(ENV_LOG_LEVEL).ok(), &konfiguration.level);
    let format = format_waehlen(std::env::var(ENV_LOG_FORMAT).ok(), konfiguration.format);

    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));

    let ergebnis = match (format, konfiguration.ausgabe) {
        (LogFormat::Json, LogAusgabe::Stdout) => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        (LogFormat::Json, LogAusgabe::Stderr) => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .try_init(),
        (LogFormat::Text, LogAusgabe::Stdout) => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        (LogFormat::Text, LogAusgabe::Stderr) => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if ergebnis.is_err() {
        tracing::debug!("Logging war bereits initialisiert");
    }
}

fn level_waehlen(aus_env: Option<String>, konfiguriert: &str) -> String {
    aus_env
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| konfiguriert.to_string())
}

fn format_waehlen(aus_env: Option<String>, konfiguriert: LogFormat) -> LogFormat {
    aus_env
        .as_deref()
        .and_then(LogFormat::parsen)
        .unwrap_or(konfiguriert)
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    LogFormat::parsen(format).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_gueltige_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level));
        }
    }

    #[test]
    fn log_level_ungueltige_werte() {
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO")); // Gross-/Kleinschreibung
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn log_format_werte() {
        assert!(log_format_gueltig("text"));
        assert!(log_format_gueltig("json"));
        assert!(!log_format_gueltig("xml"));
        assert!(!log_format_gueltig("JSON"));
    }

    #[test]
    fn umgebung_hat_vorrang() {
        assert_eq!(level_waehlen(Some("debug".into()), "info"), "debug");
        assert_eq!(level_waehlen(None, "warn"), "warn");
        assert_eq!(level_waehlen(Some("  ".into()), "warn"), "warn");

        assert_eq!(format_waehlen(Some("json".into()), LogFormat::Text), LogFormat::Json);
        assert_eq!(format_waehlen(None, LogFormat::Json), LogFormat::Json);
        // Unbekanntes Format in der Umgebung wird ignoriert
        assert_eq!(format_waehlen(Some("xml".into()), LogFormat::Text), LogFormat::Text);
    }

    #[test]
    fn konfiguration_aus_toml() {
        let k: LoggingKonfiguration =
            toml::from_str("level = \"debug\"\nformat = \"json\"").unwrap();
        assert_eq!(k.level, "debug");
        assert_eq!(k.format, LogFormat::Json);
        assert_eq!(k.ausgabe, LogAusgabe::Stdout);

        let leer: LoggingKonfiguration = toml::from_str("").unwrap();
        assert_eq!(leer, LoggingKonfiguration::default());
    }

    #[test]
    fn doppelte_initialisierung_ist_harmlos() {
        let k = LoggingKonfiguration {
            ausgabe: LogAusgabe::Stderr,
            ..Default::default()
        };
        logging_initialisieren(&k);
        logging_initialisieren(&k);
    }
}
