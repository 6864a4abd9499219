//! Fehlertypen fuer den Relay

use thiserror::Error;

/// Fehlertyp fuer den Relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// Auth-Hash passt nicht zum bestehenden Raum
    #[error("Authentifizierung fehlgeschlagen")]
    AuthFehlgeschlagen,

    /// Ungueltige Relay-Konfiguration
    #[error("Ungueltige Konfiguration: {0}")]
    Konfiguration(String),
}

/// Result-Typ fuer den Relay
pub type RelayResult<T> = Result<T, RelayError>;
