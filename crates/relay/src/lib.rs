//! oase-relay - Raum-Relay fuer Oase
//!
//! Der Relay kennt weder Passwoerter noch Schluessel. Er prueft nur, ob ein
//! Beitretender denselben Auth-Hash wie die bisherigen Mitglieder liefert,
//! und verteilt danach opake Frames an alle anderen Mitglieder des Raums.
//!
//! ## Module
//! - `registry` - Raeume, Mitglieder und Zustellung
//! - `peer` - Zustandsmaschine einer einzelnen Verbindung
//! - `server` - Accept-Loop, TLS und geordneter Shutdown

pub mod config;
pub mod error;
pub mod peer;
pub mod registry;
pub mod server;
pub mod shutdown;

pub use config::RelayKonfiguration;
pub use error::{RelayError, RelayResult};
pub use peer::{PeerSession, PeerZustand, SitzungsEnde};
pub use registry::{MemberEvent, RoomRegistry, Session, DEFAULT_WARTESCHLANGE};
pub use server::RelayServer;
pub use shutdown::shutdown_abwarten;
