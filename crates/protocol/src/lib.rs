//! oase-protocol - Wire-Protokoll zwischen Client und Relay
//!
//! Zwei Phasen pro Verbindung: der Beitritts-Handshake ([`handshake`])
//! und danach ausschliesslich verschluesselte Frames ([`wire`]).

pub mod error;
pub mod handshake;
pub mod wire;

pub use error::{ist_getrennt, ProtocolError, ProtocolResult};
pub use handshake::{JoinAnfrage, JoinAntwort, ANTWORT_ABGELEHNT, ANTWORT_ANGENOMMEN};
pub use wire::{read_frame, write_frame, Frame, FrameCodec, DEFAULT_MAX_FRAME_SIZE, NONCE_LAENGE};
