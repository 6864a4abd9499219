//! Ausgabe im Terminal
//!
//! Der Prompt `<name>> ` steht immer in der letzten Zeile. Kommt eine
//! Nachricht herein, wird der Prompt geloescht, die Nachricht ausgegeben
//! und der Prompt neu gezeichnet.

use std::io::{self, Write};

/// Ziel fuer empfangene Nachrichten
pub trait Anzeige: Send {
    /// Zeigt eine entschluesselte Nachricht an
    fn nachricht_anzeigen(&mut self, text: &str) -> io::Result<()>;

    /// Signalisiert, dass die naechste Eingabezeile erwartet wird
    fn eingabe_erwartet(&mut self) -> io::Result<()>;
}

/// Anzeige auf einem `Write` (normalerweise stdout)
pub struct TerminalAnzeige<W> {
    ausgabe: W,
    prompt: String,
}

impl<W: Write + Send> TerminalAnzeige<W> {
    pub fn neu(ausgabe: W, benutzername: &str) -> Self {
        Self {
            ausgabe,
            prompt: format!("{benutzername}> "),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    fn prompt_loeschen(&mut self) -> io::Result<()> {
        for _ in self.prompt.chars() {
            self.ausgabe.write_all(b"\x08 \x08")?;
        }
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.ausgabe
    }
}

impl<W: Write + Send> Anzeige for TerminalAnzeige<W> {
    fn nachricht_anzeigen(&mut self, text: &str) -> io::Result<()> {
        self.prompt_loeschen()?;
        writeln!(self.ausgabe, "{text}")?;
        self.ausgabe.write_all(self.prompt.as_bytes())?;
        self.ausgabe.flush()
    }

    fn eingabe_erwartet(&mut self) -> io::Result<()> {
        self.ausgabe.write_all(self.prompt.as_bytes())?;
        self.ausgabe.flush()
    }
}
