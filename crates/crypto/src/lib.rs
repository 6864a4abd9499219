//! # oase-crypto
//!
//! Kryptografie fuer Oase.
//!
//! ## Module
//! - `kdf` - Argon2id-Ableitung von Raum-Schluessel und Auth-Hash
//! - `cipher` - AES-256-GCM Versiegeln/Oeffnen von Frames (nur Client)
//! - `richtlinie` - Passwort-Richtlinie fuer neue Raeume
//! - `tls` - Transport-Verschluesselung zwischen Client und Relay
//! - `error` - Fehlertypen

pub mod cipher;
pub mod error;
pub mod kdf;
pub mod richtlinie;
pub mod tls;

// Bequeme Re-Exports
pub use cipher::{CipherContext, TAG_LAENGE};
pub use error::{CryptoError, CryptoResult};
pub use kdf::KdfParameter;
pub use richtlinie::{PasswortRichtlinie, Verstoss};
pub use tls::{
    acceptor_aus_dateien, acceptor_aus_pem, connector, selbstsigniertes_zertifikat, server_name,
    SelbstsigniertesZertifikat, ServerPruefung,
};
