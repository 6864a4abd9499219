//! Passwort-Richtlinie fuer neue Raeume
//!
//! Die Pruefung ist nur ein Hinweis an den Benutzer: wer einem bestehenden
//! Raum beitritt, muss dessen Passwort verwenden, egal wie schwach es ist.

use thiserror::Error;

/// Ein einzelner Verstoss gegen die Richtlinie
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Verstoss {
    #[error("mindestens {0} Zeichen erforderlich")]
    ZuKurz(usize),
    #[error("hoechstens {0} Zeichen erlaubt")]
    ZuLang(usize),
    #[error("mindestens {0} Grossbuchstabe(n) erforderlich")]
    Grossbuchstaben(usize),
    #[error("mindestens {0} Kleinbuchstabe(n) erforderlich")]
    Kleinbuchstaben(usize),
    #[error("mindestens {0} Ziffer(n) erforderlich")]
    Ziffern(usize),
    #[error("mindestens {0} Sonderzeichen erforderlich")]
    Sonderzeichen(usize),
}

/// Mindestanforderungen an ein Raum-Passwort
///
/// Laengen werden in Bytes gemessen, die Zeichenklassen pro Unicode-Zeichen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswortRichtlinie {
    pub grossbuchstaben: usize,
    pub kleinbuchstaben: usize,
    pub ziffern: usize,
    pub sonderzeichen: usize,
    pub min_laenge: usize,
    pub max_laenge: usize,
}

impl Default for PasswortRichtlinie {
    fn default() -> Self {
        Self {
            grossbuchstaben: 1,
            kleinbuchstaben: 1,
            ziffern: 1,
            sonderzeichen: 1,
            min_laenge: 12,
            max_laenge: 64,
        }
    }
}

impl PasswortRichtlinie {
    /// Liefert alle Verstoesse; leer bedeutet erfuellt
    pub fn pruefen(&self, passwort: &[u8]) -> Vec<Verstoss> {
        let text = String::from_utf8_lossy(passwort);
        let (mut gross, mut klein, mut ziffern, mut sonder) = (0, 0, 0, 0);
        for c in text.chars() {
            if c.is_uppercase() {
                gross += 1;
            } else if c.is_lowercase() {
                klein += 1;
            } else if c.is_numeric() {
                ziffern += 1;
            } else if !c.is_whitespace() && !c.is_control() && !c.is_alphabetic() {
                sonder += 1;
            }
        }

        let mut verstoesse = Vec::new();
        if passwort.len() < self.min_laenge {
            verstoesse.push(Verstoss::ZuKurz(self.min_laenge));
        }
        if passwort.len() > self.max_laenge {
            verstoesse.push(Verstoss::ZuLang(self.max_laenge));
        }
        if gross < self.grossbuchstaben {
            verstoesse.push(Verstoss::Grossbuchstaben(self.grossbuchstaben));
        }
        if klein < self.kleinbuchstaben {
            verstoesse.push(Verstoss::Kleinbuchstaben(self.kleinbuchstaben));
        }
        if ziffern < self.ziffern {
            verstoesse.push(Verstoss::Ziffern(self.ziffern));
        }
        if sonder < self.sonderzeichen {
            verstoesse.push(Verstoss::Sonderzeichen(self.sonderzeichen));
        }
        verstoesse
    }

    pub fn erfuellt(&self, passwort: &[u8]) -> bool {
        self.pruefen(passwort).is_empty()
    }
}
