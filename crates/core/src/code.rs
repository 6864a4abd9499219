//! Raum-Code - kurzer, menschenlesbarer Bezeichner eines Chat-Raums
//!
//! ## Format
//! ```text
//! abc-def-ghi
//! ^^^ ^^^ ^^^   Kleinbuchstaben a-z
//!    ^   ^      Trennzeichen '-' an Position 3 und 7
//! ```
//!
//! Der Code ist gleichzeitig Salt-Material fuer die Schluesselableitung
//! und wird deshalb immer als exakt 11 Bytes uebertragen.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Laenge eines Raum-Codes in Bytes (auch auf dem Wire)
pub const CODE_LAENGE: usize = 11;

/// Trennzeichen zwischen den Bloecken
pub const CODE_TRENNZEICHEN: u8 = b'-';

/// Erlaubte Zeichen ausserhalb der Trennpositionen
pub const CODE_ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Blockgroesse zwischen zwei Trennzeichen
const BLOCK_GROESSE: usize = 3;

fn ist_trennposition(i: usize) -> bool {
    i % (BLOCK_GROESSE + 1) == BLOCK_GROESSE
}

/// Validierter Raum-Code
///
/// Unveraenderlicher Werttyp; wird als Schluessel der Raum-Tabelle verwendet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode([u8; CODE_LAENGE]);

impl RoomCode {
    /// Erzeugt einen neuen zufaelligen Raum-Code
    ///
    /// Jede Nicht-Trennposition wird gleichverteilt aus dem Alphabet gezogen.
    pub fn generieren() -> Self {
        Self::generieren_mit(&mut rand::thread_rng())
    }

    /// Wie [`RoomCode::generieren`], aber mit einer uebergebenen RNG
    pub fn generieren_mit<R: Rng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; CODE_LAENGE];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = if ist_trennposition(i) {
                CODE_TRENNZEICHEN
            } else {
                CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]
            };
        }
        Self(bytes)
    }

    /// Validiert Rohbytes (z.B. direkt vom Socket)
    ///
    /// Prueft zuerst die Gesamtlaenge, dann jede Position einzeln.
    pub fn aus_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != CODE_LAENGE {
            return Err(CoreError::UngueltigerRaumCode(format!(
                "falsche Laenge: {} statt {}",
                bytes.len(),
                CODE_LAENGE
            )));
        }

        let mut code = [0u8; CODE_LAENGE];
        for (i, &b) in bytes.iter().enumerate() {
            let gueltig = if ist_trennposition(i) {
                b == CODE_TRENNZEICHEN
            } else {
                b.is_ascii_lowercase()
            };
            if !gueltig {
                return Err(CoreError::UngueltigerRaumCode(format!(
                    "unerwartetes Zeichen an Position {i}"
                )));
            }
            code[i] = b;
        }
        Ok(Self(code))
    }

    /// Parst die Textform `xxx-xxx-xxx`
    pub fn parsen(s: &str) -> CoreResult<Self> {
        Self::aus_bytes(s.as_bytes())
    }

    /// Gibt die Wire-Darstellung zurueck
    pub fn as_bytes(&self) -> &[u8; CODE_LAENGE] {
        &self.0
    }

    /// Gibt den Code als &str zurueck
    pub fn as_str(&self) -> &str {
        // Nur ASCII-Kleinbuchstaben und '-' moeglich
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parsen(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parsen(&s)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.as_str().to_string()
    }
}
