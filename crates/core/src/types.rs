//! Identifikations- und Authentifizierungstypen
//!
//! `UserId` ist eine fortlaufende Nummer: das Relay vergibt sie streng
//! monoton unter dem Registry-Lock und verwendet sie nie wieder.

use std::fmt;

use crate::error::{CoreError, CoreResult};

/// Laenge des Auth-Hashes in Bytes (SHA-256)
pub const AUTH_HASH_LAENGE: usize = 32;

/// Vom Relay vergebene Mitglieds-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

impl UserId {
    /// Gibt die innere Nummer zurueck
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Passwort-abgeleiteter Digest, mit dem das Relay die Raum-Zugehoerigkeit prueft
///
/// Der Hash verraet weder Passwort noch Raum-Schluessel. Debug gibt ihn
/// nicht aus, damit er nicht in Logs landet.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AuthHash([u8; AUTH_HASH_LAENGE]);

impl AuthHash {
    pub fn new(bytes: [u8; AUTH_HASH_LAENGE]) -> Self {
        Self(bytes)
    }

    /// Erstellt einen Hash aus einem Slice beliebiger Laenge
    pub fn aus_slice(bytes: &[u8]) -> CoreResult<Self> {
        let arr: [u8; AUTH_HASH_LAENGE] =
            bytes
                .try_into()
                .map_err(|_| CoreError::UngueltigeHashLaenge {
                    erwartet: AUTH_HASH_LAENGE,
                    erhalten: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; AUTH_HASH_LAENGE] {
        &self.0
    }
}

impl fmt::Debug for AuthHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthHash([REDACTED])")
    }
}
