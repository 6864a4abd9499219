//! Beitritts-Handshake
//!
//! Strikter Zwei-Nachrichten-Austausch vor dem Frame-Modus:
//!
//! ```text
//! Client                                   Relay
//!   |-- Raum-Code (11 Bytes) ------------->|
//!   |-- Auth-Hash (32 Bytes) ------------->|
//!   |<------------- Antwort (1 Byte) ------|   0x01 = angenommen, 0x00 = abgelehnt
//! ```
//!
//! Danach wechselt die Verbindung in beide Richtungen dauerhaft in den
//! Frame-Modus (siehe [`crate::wire`]). Es gibt keine Wiederholungen.

use oase_core::{AuthHash, RoomCode, AUTH_HASH_LAENGE, CODE_LAENGE};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, ProtocolResult};

/// Antwort-Byte fuer einen erfolgreichen Beitritt
pub const ANTWORT_ANGENOMMEN: u8 = 0x01;

/// Antwort-Byte fuer einen abgelehnten Beitritt
pub const ANTWORT_ABGELEHNT: u8 = 0x00;

/// Gesamtlaenge der Beitrittsanfrage auf dem Wire
pub const JOIN_ANFRAGE_LAENGE: usize = CODE_LAENGE + AUTH_HASH_LAENGE;

// ---------------------------------------------------------------------------
// Anfrage
// ---------------------------------------------------------------------------

/// Beitrittsanfrage des Clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinAnfrage {
    pub code: RoomCode,
    pub auth_hash: AuthHash,
}

impl JoinAnfrage {
    pub fn new(code: RoomCode, auth_hash: AuthHash) -> Self {
        Self { code, auth_hash }
    }

    /// Wire-Darstellung: Code gefolgt vom Hash
    pub fn zu_bytes(&self) -> [u8; JOIN_ANFRAGE_LAENGE] {
        let mut buf = [0u8; JOIN_ANFRAGE_LAENGE];
        buf[..CODE_LAENGE].copy_from_slice(self.code.as_bytes());
        buf[CODE_LAENGE..].copy_from_slice(self.auth_hash.as_bytes());
        buf
    }

    /// Schreibt die Anfrage und flusht den Writer
    pub async fn senden<W>(&self, writer: &mut W) -> ProtocolResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.zu_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Liest eine Anfrage vom Socket
    ///
    /// Der Code wird validiert bevor der Hash gelesen wird; ein ungueltiger
    /// Code liefert `ProtocolError::UngueltigerRaumCode`.
    pub async fn lesen<R>(reader: &mut R) -> ProtocolResult<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut code_buf = [0u8; CODE_LAENGE];
        reader.read_exact(&mut code_buf).await?;
        let code = RoomCode::aus_bytes(&code_buf)?;

        let mut hash_buf = [0u8; AUTH_HASH_LAENGE];
        reader.read_exact(&mut hash_buf).await?;

        Ok(Self {
            code,
            auth_hash: AuthHash::new(hash_buf),
        })
    }
}

// ---------------------------------------------------------------------------
// Antwort
// ---------------------------------------------------------------------------

/// Ergebnis des Beitritts, wie es der Relay meldet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinAntwort {
    Angenommen,
    Abgelehnt,
}

impl JoinAntwort {
    pub fn als_byte(self) -> u8 {
        match self {
            Self::Angenommen => ANTWORT_ANGENOMMEN,
            Self::Abgelehnt => ANTWORT_ABGELEHNT,
        }
    }

    pub fn aus_byte(byte: u8) -> ProtocolResult<Self> {
        match byte {
            ANTWORT_ANGENOMMEN => Ok(Self::Angenommen),
            ANTWORT_ABGELEHNT => Ok(Self::Abgelehnt),
            andere => Err(ProtocolError::UnbekannteAntwort(andere)),
        }
    }

    pub async fn senden<W>(self, writer: &mut W) -> ProtocolResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&[self.als_byte()]).await?;
        writer.flush().await?;
        Ok(())
    }

    pub async fn lesen<R>(reader: &mut R) -> ProtocolResult<Self>
    where
        R: AsyncRead + Unpin,
    {
        let byte = reader.read_u8().await?;
        Self::aus_byte(byte)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn test_anfrage() -> JoinAnfrage {
        JoinAnfrage::new(
            RoomCode::parsen("abc-def-ghi").unwrap(),
            AuthHash::new([0x5A; AUTH_HASH_LAENGE]),
        )
    }

    #[test]
    fn anfrage_layout() {
        let bytes = test_anfrage().zu_bytes();
        assert_eq!(bytes.len(), 43);
        assert_eq!(&bytes[..11], b"abc-def-ghi");
        assert!(bytes[11..].iter().all(|&b| b == 0x5A));
    }

    #[tokio::test]
    async fn anfrage_ueber_duplex() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let anfrage = test_anfrage();

        anfrage.senden(&mut client).await.unwrap();
        let gelesen = JoinAnfrage::lesen(&mut server).await.unwrap();
        assert_eq!(gelesen, anfrage);
    }

    #[tokio::test]
    async fn ungueltiger_code_wird_vor_dem_hash_abgelehnt() {
        // Nur der Code liegt an; der Hash wuerde nie kommen
        let mut cursor = io::Cursor::new(b"abcd-de-ghi".to_vec());
        let fehler = JoinAnfrage::lesen(&mut cursor).await.unwrap_err();
        assert!(matches!(fehler, ProtocolError::UngueltigerRaumCode(_)));
    }

    #[tokio::test]
    async fn abgeschnittene_anfrage_ist_getrennt() {
        let mut daten = b"abc-def-ghi".to_vec();
        daten.extend_from_slice(&[0u8; 10]);
        let mut cursor = io::Cursor::new(daten);
        let fehler = JoinAnfrage::lesen(&mut cursor).await.unwrap_err();
        assert!(fehler.ist_getrennt());
    }

    #[tokio::test]
    async fn antwort_bytes() {
        let mut buf = Vec::new();
        JoinAntwort::Angenommen.senden(&mut buf).await.unwrap();
        JoinAntwort::Abgelehnt.senden(&mut buf).await.unwrap();
        assert_eq!(buf, vec![0x01, 0x00]);

        let mut cursor = io::Cursor::new(buf);
        assert_eq!(
            JoinAntwort::lesen(&mut cursor).await.unwrap(),
            JoinAntwort::Angenommen
        );
        assert_eq!(
            JoinAntwort::lesen(&mut cursor).await.unwrap(),
            JoinAntwort::Abgelehnt
        );
    }

    #[test]
    fn unbekanntes_antwort_byte() {
        assert!(matches!(
            JoinAntwort::aus_byte(0x7F),
            Err(ProtocolError::UnbekannteAntwort(0x7F))
        ));
    }
}
