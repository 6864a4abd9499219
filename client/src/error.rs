//! Fehlertypen des Clients

use oase_crypto::CryptoError;
use oase_protocol::ProtocolError;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Der Relay hat den Beitritt mit `0x00` abgelehnt
    #[error("Ungueltiges Passwort fuer diesen Raum")]
    UngueltigesPasswort,

    /// Ein empfangener Frame liess sich nicht authentifizieren
    #[error("Integritaetspruefung fehlgeschlagen, Verbindung wird beendet")]
    Integritaet,

    #[error("Protokollfehler: {0}")]
    Protokoll(#[from] ProtocolError),

    #[error("Kryptografie-Fehler: {0}")]
    Krypto(CryptoError),
}

impl From<CryptoError> for ClientError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Integritaet => Self::Integritaet,
            CryptoError::Io(e) => Self::Io(e),
            andere => Self::Krypto(andere),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integritaet_wird_eigener_fehler() {
        assert!(matches!(
            ClientError::from(CryptoError::Integritaet),
            ClientError::Integritaet
        ));
        assert!(matches!(
            ClientError::from(CryptoError::Tls("x".into())),
            ClientError::Krypto(CryptoError::Tls(_))
        ));
    }
}
