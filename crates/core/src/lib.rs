//! oase-core - Gemeinsame Typen fuer Oase
//!
//! Enthaelt die Werttypen, die Server und Client gleichermassen benutzen:
//! den Raum-Code, die User-ID des Relays und den Auth-Hash des Beitritts.

pub mod code;
pub mod error;
pub mod types;

pub use code::{RoomCode, CODE_ALPHABET, CODE_LAENGE, CODE_TRENNZEICHEN};
pub use error::{CoreError, CoreResult};
pub use types::{AuthHash, UserId, AUTH_HASH_LAENGE};
