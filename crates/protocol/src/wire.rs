//! Wire-Format fuer verschluesselte Frames
//!
//! Nach dem Handshake besteht der Datenstrom in beide Richtungen nur noch
//! aus Frames. Der Relay behandelt den Ciphertext als opake Bytes.
//!
//! ## Frame-Format
//!
//! ```text
//! +------ 12 Bytes ------+--- 4 Bytes ---+----...----+
//! | Nonce                | Laenge (BE)   | Ciphertext|
//! +----------------------+---------------+----...----+
//! ```
//!
//! Die Laenge zaehlt nur die Ciphertext-Bytes. Frames oberhalb der
//! konfigurierten Maximalgroesse (Standard: 64 KiB) werden abgelehnt.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProtocolError, ProtocolResult};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Ciphertext-Groesse (64 KiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Laenge der AEAD-Nonce
pub const NONCE_LAENGE: usize = 12;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Nonce plus Laengen-Feld
pub const HEADER_LAENGE: usize = NONCE_LAENGE + LENGTH_FIELD_SIZE;

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Ein verschluesselter Frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    nonce: [u8; NONCE_LAENGE],
    ciphertext: Bytes,
}

impl Frame {
    pub fn new(nonce: [u8; NONCE_LAENGE], ciphertext: impl Into<Bytes>) -> Self {
        Self {
            nonce,
            ciphertext: ciphertext.into(),
        }
    }

    pub fn nonce(&self) -> &[u8; NONCE_LAENGE] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &Bytes {
        &self.ciphertext
    }

    /// Groesse des Frames inklusive Header
    pub fn wire_laenge(&self) -> usize {
        HEADER_LAENGE + self.ciphertext.len()
    }

    /// Haengt die Wire-Darstellung an `dst` an
    pub fn kodieren_in(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_laenge());
        dst.put_slice(&self.nonce);
        dst.put_u32(self.ciphertext.len() as u32);
        dst.put_slice(&self.ciphertext);
    }

    /// Komplette Wire-Darstellung als Bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_laenge());
        self.kodieren_in(&mut buf);
        buf.freeze()
    }
}

fn groesse_pruefen(laenge: usize, maximum: usize) -> ProtocolResult<()> {
    if laenge > maximum {
        return Err(ProtocolError::FrameZuGross { laenge, maximum });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer den Frame-Modus
///
/// Der Relay liest damit Frames vom Socket (`FramedRead`), der Client
/// benutzt ihn in beide Richtungen.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler Ciphertext-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LAENGE {
            return Ok(None);
        }

        // Laenge lesen ohne den Buffer zu veraendern
        let laenge = u32::from_be_bytes([
            src[NONCE_LAENGE],
            src[NONCE_LAENGE + 1],
            src[NONCE_LAENGE + 2],
            src[NONCE_LAENGE + 3],
        ]) as usize;

        groesse_pruefen(laenge, self.max_frame_size)?;

        let gesamt = HEADER_LAENGE + laenge;
        if src.len() < gesamt {
            src.reserve(gesamt - src.len());
            return Ok(None);
        }

        let mut nonce = [0u8; NONCE_LAENGE];
        src.copy_to_slice(&mut nonce);
        src.advance(LENGTH_FIELD_SIZE);
        let ciphertext = src.split_to(laenge).freeze();

        Ok(Some(Frame { nonce, ciphertext }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        groesse_pruefen(item.ciphertext.len(), self.max_frame_size)?;
        item.kodieren_in(dst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen fuer direktes async Lesen/Schreiben
// ---------------------------------------------------------------------------

/// Liest einen einzelnen Frame aus einem `AsyncRead`
///
/// # Fehler
/// - `Io(UnexpectedEof)` wenn die Verbindung mitten im Frame getrennt wird
/// - `FrameZuGross` wenn die angekuendigte Laenge das Maximum uebersteigt
pub async fn read_frame<R>(reader: &mut R, max_frame_size: usize) -> ProtocolResult<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut nonce = [0u8; NONCE_LAENGE];
    reader.read_exact(&mut nonce).await?;
    let laenge = reader.read_u32().await? as usize;

    groesse_pruefen(laenge, max_frame_size)?;

    let mut ciphertext = vec![0u8; laenge];
    reader.read_exact(&mut ciphertext).await?;

    Ok(Frame::new(nonce, ciphertext))
}

/// Schreibt einen einzelnen Frame und flusht den Writer
pub async fn write_frame<W>(
    writer: &mut W,
    frame: &Frame,
    max_frame_size: usize,
) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
{
    groesse_pruefen(frame.ciphertext.len(), max_frame_size)?;
    writer.write_all(&frame.to_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
