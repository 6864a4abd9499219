//! Raum-Verschluesselung mit AES-256-GCM
//!
//! Jeder Frame bekommt eine frische zufaellige 12-Byte-Nonce aus dem
//! Betriebssystem-RNG. Der Schluessel verlaesst den Client nie; der Relay
//! sieht nur den Auth-Hash.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce as AesNonce,
};
use oase_core::{AuthHash, RoomCode};
use oase_protocol::{Frame, NONCE_LAENGE};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{self, KdfParameter};

/// Laenge des AEAD-Tags, das an jeden Ciphertext angehaengt wird
pub const TAG_LAENGE: usize = 16;

/// Schluessel-Kontext eines Raums
///
/// Wird einmal pro Beitritt aus Passwort und Raum-Code abgeleitet.
pub struct CipherContext {
    cipher: Aes256Gcm,
    auth_hash: AuthHash,
}

impl CipherContext {
    /// Leitet den Kontext ab und verwirft das Passwort
    ///
    /// Das Passwort wird konsumiert und beim Drop genullt.
    pub fn ableiten(
        passwort: Zeroizing<Vec<u8>>,
        code: &RoomCode,
        parameter: KdfParameter,
    ) -> CryptoResult<Self> {
        let abgeleitet = kdf::ableiten(&passwort, code, parameter)?;
        drop(passwort);

        let key = Key::<Aes256Gcm>::from_slice(abgeleitet.schluessel.as_slice());
        Ok(Self {
            cipher: Aes256Gcm::new(key),
            auth_hash: abgeleitet.auth_hash,
        })
    }

    /// Auth-Hash fuer den Beitritts-Handshake
    pub fn auth_hash(&self) -> AuthHash {
        self.auth_hash
    }

    /// Verschluesselt einen Klartext zu einem Frame
    pub fn versiegeln(&self, klartext: &[u8]) -> CryptoResult<Frame> {
        let mut nonce = [0u8; NONCE_LAENGE];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(AesNonce::from_slice(&nonce), klartext)
            .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

        Ok(Frame::new(nonce, ciphertext))
    }

    /// Entschluesselt einen Frame
    ///
    /// # Fehler
    /// `CryptoError::Integritaet` wenn Nonce oder Ciphertext veraendert wurden
    /// oder der Frame unter einem anderen Schluessel versiegelt wurde.
    pub fn oeffnen(&self, frame: &Frame) -> CryptoResult<Zeroizing<Vec<u8>>> {
        self.cipher
            .decrypt(AesNonce::from_slice(frame.nonce()), &frame.ciphertext()[..])
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::Integritaet)
    }
}

impl std::fmt::Debug for CipherContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherContext")
            .field("cipher", &"[REDACTED]")
            .field("auth_hash", &self.auth_hash)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
