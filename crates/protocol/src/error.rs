//! Fehlertypen fuer das Wire-Protokoll

use thiserror::Error;

/// Result-Alias fuer oase-protocol
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Fehler beim Lesen oder Schreiben des Wire-Formats
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame zu gross: {laenge} Bytes (Maximum: {maximum} Bytes)")]
    FrameZuGross { laenge: usize, maximum: usize },

    #[error("Ungueltiger Raum-Code im Handshake: {0}")]
    UngueltigerRaumCode(#[from] oase_core::CoreError),

    #[error("Unbekannte Handshake-Antwort: 0x{0:02x}")]
    UnbekannteAntwort(u8),
}

impl ProtocolError {
    /// Gibt true zurueck wenn der Fehler ein regulaeres Verbindungsende ist
    ///
    /// EOF, Reset und Broken Pipe gelten als "Peer hat getrennt",
    /// nicht als Fehler.
    pub fn ist_getrennt(&self) -> bool {
        match self {
            Self::Io(e) => ist_getrennt(e),
            _ => false,
        }
    }
}

/// Prueft ob ein IO-Fehler ein regulaeres Verbindungsende bedeutet
pub fn ist_getrennt(e: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        e.kind(),
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
    )
}
