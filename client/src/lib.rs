//! oase-client - Terminal-Chat fuer Oase
//!
//! ## Module
//! - `session` - Beitritt und Sende-/Empfangsschleifen
//! - `terminal` - Prompt und Ausgabe
//! - `verbindung` - TLS-Verbindung zum Relay
//! - `error` - Fehlertypen

pub mod error;
pub mod session;
pub mod terminal;
pub mod verbindung;

pub use error::{ClientError, ClientResult};
pub use session::{ClientSession, SitzungsEnde, STANDARD_BENUTZERNAME};
pub use terminal::{Anzeige, TerminalAnzeige};
pub use verbindung::verbinden;
