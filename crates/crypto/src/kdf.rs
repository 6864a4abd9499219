//! Schluesselableitung aus Raum-Code und Passwort
//!
//! ## Ablauf
//! ```text
//! salt     = SHA-256(raum_code)
//! material = Argon2id(passwort, salt)            64 Bytes
//! key      = material[0..32]                     AES-256-GCM
//! auth     = SHA-256("oase-auth-v1" || material[32..64])
//! ```
//!
//! Alle Clients eines Raums muessen identische Parameter verwenden, sonst
//! passen weder Schluessel noch Auth-Hash zusammen. Die Parallelitaet ist
//! deshalb fest und haengt nicht von der Maschine ab.

use argon2::{Algorithm, Argon2, Params, Version};
use oase_core::{AuthHash, RoomCode};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

/// Laenge des AES-256-Schluessels
pub const SCHLUESSEL_LAENGE: usize = 32;

/// Domain-Separation fuer den Auth-Hash
const AUTH_KONTEXT: &[u8] = b"oase-auth-v1";

/// Argon2id-Parameter
///
/// Standardwerte:
/// - Speicher: 64 MiB
/// - Iterationen: 1
/// - Parallelismus: 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParameter {
    pub speicher_kib: u32,
    pub iterationen: u32,
    pub parallelitaet: u32,
}

impl Default for KdfParameter {
    fn default() -> Self {
        Self {
            speicher_kib: 64 * 1024,
            iterationen: 1,
            parallelitaet: 1,
        }
    }
}

impl KdfParameter {
    /// Billige Parameter fuer Tests; niemals fuer echte Raeume
    pub fn schnell() -> Self {
        Self {
            speicher_kib: 64,
            iterationen: 1,
            parallelitaet: 1,
        }
    }
}

/// Ergebnis der Ableitung
pub(crate) struct Abgeleitet {
    pub schluessel: Zeroizing<[u8; SCHLUESSEL_LAENGE]>,
    pub auth_hash: AuthHash,
}

/// Leitet Schluessel und Auth-Hash ab
pub(crate) fn ableiten(
    passwort: &[u8],
    code: &RoomCode,
    parameter: KdfParameter,
) -> CryptoResult<Abgeleitet> {
    let salt = Sha256::digest(code.as_bytes());

    let params = Params::new(
        parameter.speicher_kib,
        parameter.iterationen,
        parameter.parallelitaet,
        Some(2 * SCHLUESSEL_LAENGE),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut material = Zeroizing::new([0u8; 2 * SCHLUESSEL_LAENGE]);
    argon2
        .hash_password_into(passwort, &salt, &mut material[..])
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let mut schluessel = Zeroizing::new([0u8; SCHLUESSEL_LAENGE]);
    schluessel.copy_from_slice(&material[..SCHLUESSEL_LAENGE]);

    let mut hasher = Sha256::new();
    hasher.update(AUTH_KONTEXT);
    hasher.update(&material[SCHLUESSEL_LAENGE..]);
    let auth_hash = AuthHash::new(hasher.finalize().into());

    Ok(Abgeleitet {
        schluessel,
        auth_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> RoomCode {
        RoomCode::parsen(s).unwrap()
    }

    #[test]
    fn ableitung_ist_deterministisch() {
        let a = ableiten(b"Passwort!123", &code("abc-def-ghi"), KdfParameter::schnell()).unwrap();
        let b = ableiten(b"Passwort!123", &code("abc-def-ghi"), KdfParameter::schnell()).unwrap();
        assert_eq!(*a.schluessel, *b.schluessel);
        assert_eq!(a.auth_hash, b.auth_hash);
    }

    #[test]
    fn auth_hash_ist_nicht_der_schluessel() {
        let a = ableiten(b"Passwort!123", &code("abc-def-ghi"), KdfParameter::schnell()).unwrap();
        assert_ne!(a.auth_hash.as_bytes(), &*a.schluessel);
    }

    #[test]
    fn anderer_code_anderer_schluessel() {
        let a = ableiten(b"Passwort!123", &code("abc-def-ghi"), KdfParameter::schnell()).unwrap();
        let b = ableiten(b"Passwort!123", &code("abc-def-ghj"), KdfParameter::schnell()).unwrap();
        assert_ne!(*a.schluessel, *b.schluessel);
        assert_ne!(a.auth_hash, b.auth_hash);
    }

    #[test]
    fn anderes_passwort_anderer_auth_hash() {
        let a = ableiten(b"Passwort!123", &code("abc-def-ghi"), KdfParameter::schnell()).unwrap();
        let b = ableiten(b"Passwort!124", &code("abc-def-ghi"), KdfParameter::schnell()).unwrap();
        assert_ne!(a.auth_hash, b.auth_hash);
    }

    #[test]
    fn ungueltige_parameter_werden_gemeldet() {
        let params = KdfParameter {
            speicher_kib: 1,
            iterationen: 0,
            parallelitaet: 1,
        };
        let ergebnis = ableiten(b"x", &code("abc-def-ghi"), params);
        assert!(matches!(ergebnis, Err(CryptoError::KeyDerivation(_))));
    }

    #[test]
    fn standard_parameter() {
        let p = KdfParameter::default();
        assert_eq!(p.speicher_kib, 65536);
        assert_eq!(p.iterationen, 1);
        assert_eq!(p.parallelitaet, 1);
    }
}
