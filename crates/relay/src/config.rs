//! Laufzeit-Parameter des Relays

use std::time::Duration;

use oase_protocol::DEFAULT_MAX_FRAME_SIZE;

use crate::error::{RelayError, RelayResult};
use crate::registry::DEFAULT_WARTESCHLANGE;

/// Parameter fuer Registry, Peer-Sessions und Accept-Loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayKonfiguration {
    /// Maximale Ciphertext-Groesse eines Frames in Bytes
    pub max_frame_groesse: usize,
    /// Warteschlangen-Groesse pro Mitglied
    pub warteschlange: usize,
    /// Zeit fuer TLS- und Beitritts-Handshake
    pub handshake_timeout: Duration,
}

impl Default for RelayKonfiguration {
    fn default() -> Self {
        Self {
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
            warteschlange: DEFAULT_WARTESCHLANGE,
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

impl RelayKonfiguration {
    pub fn validieren(&self) -> RelayResult<()> {
        if self.max_frame_groesse == 0 {
            return Err(RelayError::Konfiguration(
                "max_frame_groesse muss groesser als 0 sein".into(),
            ));
        }
        if self.max_frame_groesse > u32::MAX as usize {
            return Err(RelayError::Konfiguration(
                "max_frame_groesse passt nicht in das 4-Byte-Laengenfeld".into(),
            ));
        }
        if self.warteschlange == 0 {
            return Err(RelayError::Konfiguration(
                "warteschlange muss groesser als 0 sein".into(),
            ));
        }
        if self.handshake_timeout.is_zero() {
            return Err(RelayError::Konfiguration(
                "handshake_timeout muss groesser als 0 sein".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_ist_gueltig() {
        let k = RelayKonfiguration::default();
        assert!(k.validieren().is_ok());
        assert_eq!(k.max_frame_groesse, 64 * 1024);
        assert_eq!(k.warteschlange, 64);
    }

    #[test]
    fn nullwerte_sind_ungueltig() {
        let k = RelayKonfiguration {
            warteschlange: 0,
            ..Default::default()
        };
        assert!(matches!(k.validieren(), Err(RelayError::Konfiguration(_))));

        let k = RelayKonfiguration {
            max_frame_groesse: 0,
            ..Default::default()
        };
        assert!(k.validieren().is_err());

        let k = RelayKonfiguration {
            handshake_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(k.validieren().is_err());
    }
}
