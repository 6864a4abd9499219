//! Fehlertypen fuer die gemeinsamen Oase-Typen

use thiserror::Error;

/// Result-Alias fuer oase-core
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Fehler beim Erzeugen oder Validieren der Basistypen
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Ungueltiger Raum-Code: {0}")]
    UngueltigerRaumCode(String),

    #[error("Ungueltige Auth-Hash-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeHashLaenge { erwartet: usize, erhalten: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = CoreError::UngueltigerRaumCode("falsche Laenge".into());
        assert_eq!(e.to_string(), "Ungueltiger Raum-Code: falsche Laenge");
    }

    #[test]
    fn hash_laengen_fehler() {
        let e = CoreError::UngueltigeHashLaenge {
            erwartet: 32,
            erhalten: 5,
        };
        assert!(e.to_string().contains("erwartet 32"));
        assert!(e.to_string().contains("erhalten 5"));
    }
}
