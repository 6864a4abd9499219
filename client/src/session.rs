//! Client-Sitzung in einem Raum
//!
//! Ablauf:
//! 1. `beitreten` schickt Raum-Code und Auth-Hash und wertet das Antwort-Byte aus
//! 2. `ausfuehren` laesst Netzwerk- und Eingabe-Schleife nebeneinander laufen,
//!    bis eine Seite endet, ein Fehler auftritt oder abgebrochen wird
//!
//! Ein Frame, der sich nicht authentifizieren laesst, beendet die Sitzung
//! mit `ClientError::Integritaet`.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use oase_core::RoomCode;
use oase_crypto::CipherContext;
use oase_protocol::{Frame, FrameCodec, JoinAnfrage, JoinAntwort, DEFAULT_MAX_FRAME_SIZE};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{FramedRead, FramedWrite};
use zeroize::Zeroizing;

use crate::error::{ClientError, ClientResult};
use crate::terminal::Anzeige;

/// Name, wenn keiner angegeben wurde
pub const STANDARD_BENUTZERNAME: &str = "anonymous";

/// Obergrenze fuer das geordnete Schliessen der Schreibseite
pub const SCHLIESSEN_TIMEOUT: Duration = Duration::from_secs(1);

/// Grund fuer ein regulaeres Sitzungsende
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitzungsEnde {
    /// Der Relay hat die Verbindung geschlossen
    ServerGetrennt,
    /// Die lokale Eingabe ist versiegt (EOF auf stdin)
    EingabeBeendet,
    /// Abbruch von aussen (Ctrl-C, SIGTERM)
    Abgebrochen,
}

/// Beigetretene Sitzung
pub struct ClientSession<S> {
    stream: S,
    cipher: CipherContext,
    benutzername: String,
    max_frame_groesse: usize,
}

impl<S> ClientSession<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    /// Fuehrt den Beitritts-Handshake durch
    ///
    /// # Fehler
    /// `ClientError::UngueltigesPasswort` bei `0x00`, `ClientError::Protokoll`
    /// bei jedem anderen unerwarteten Byte.
    pub async fn beitreten(
        mut stream: S,
        code: RoomCode,
        cipher: CipherContext,
        benutzername: impl Into<String>,
    ) -> ClientResult<Self> {
        JoinAnfrage::new(code, cipher.auth_hash())
            .senden(&mut stream)
            .await?;

        match JoinAntwort::lesen(&mut stream).await? {
            JoinAntwort::Angenommen => {
                tracing::info!(raum = %code, "Raum beigetreten");
                Ok(Self {
                    stream,
                    cipher,
                    benutzername: benutzername.into(),
                    max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
                })
            }
            JoinAntwort::Abgelehnt => {
                tracing::warn!(raum = %code, "Beitritt abgelehnt");
                Err(ClientError::UngueltigesPasswort)
            }
        }
    }

    pub fn benutzername(&self) -> &str {
        &self.benutzername
    }

    /// Laeuft bis Relay, Eingabe oder `abbruch` die Sitzung beenden
    ///
    /// Netzwerk- und Eingabe-Schleife laufen als getrennte Futures, ein
    /// blockiertes Senden haelt also weder den Empfang noch den Abbruch auf.
    /// Jede Eingabezeile wird mit `"<name>> "` versehen, versiegelt und
    /// gesendet. Empfangene Frames werden geoeffnet und an `anzeige`
    /// uebergeben. Die Schreibseite wird hoechstens `SCHLIESSEN_TIMEOUT`
    /// lang geordnet geschlossen.
    pub async fn ausfuehren<A: Anzeige>(
        self,
        mut eingabe: mpsc::Receiver<String>,
        anzeige: A,
        mut abbruch: watch::Receiver<bool>,
    ) -> ClientResult<SitzungsEnde> {
        let Self {
            stream,
            cipher,
            benutzername,
            max_frame_groesse,
        } = self;

        let (lese, schreib) = tokio::io::split(stream);
        let mut frames = FramedRead::new(lese, FrameCodec::with_max_size(max_frame_groesse));
        let mut senke = FramedWrite::new(schreib, FrameCodec::with_max_size(max_frame_groesse));
        let anzeige = Mutex::new(anzeige);

        let ergebnis = {
            let netz = netz_schleife(&mut frames, &cipher, &anzeige);
            let senden =
                eingabe_schleife(&mut eingabe, &mut senke, &cipher, &benutzername, &anzeige);
            tokio::select! {
                ende = netz => ende,
                ende = senden => ende,
                _ = abbruch_abwarten(&mut abbruch) => Ok(SitzungsEnde::Abgebrochen),
            }
        };

        match tokio::time::timeout(SCHLIESSEN_TIMEOUT, senke.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(fehler = %e, "Schreibseite nicht sauber geschlossen"),
            Err(_) => tracing::debug!("Relay nimmt nichts mehr an - Verbindung wird hart getrennt"),
        }

        match &ergebnis {
            Ok(ende) => tracing::info!(ende = ?ende, "Sitzung beendet"),
            Err(e) => tracing::warn!(fehler = %e, "Sitzung mit Fehler beendet"),
        }
        ergebnis
    }
}

impl<S> std::fmt::Debug for ClientSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("benutzername", &self.benutzername)
            .field("cipher", &self.cipher)
            .finish()
    }
}

/// Empfangene Frames oeffnen und anzeigen, bis der Relay trennt
async fn netz_schleife<R, A>(
    frames: &mut FramedRead<R, FrameCodec>,
    cipher: &CipherContext,
    anzeige: &Mutex<A>,
) -> ClientResult<SitzungsEnde>
where
    R: AsyncRead + Unpin,
    A: Anzeige,
{
    loop {
        match frames.next().await {
            Some(Ok(frame)) => {
                let klartext = cipher.oeffnen(&frame)?;
                let text = String::from_utf8_lossy(&klartext[..]);
                anzeige.lock().nachricht_anzeigen(&text)?;
            }
            Some(Err(e)) if e.ist_getrennt() => return Ok(SitzungsEnde::ServerGetrennt),
            Some(Err(e)) => return Err(e.into()),
            None => return Ok(SitzungsEnde::ServerGetrennt),
        }
    }
}

/// Eingabezeilen versiegeln und senden, bis die Eingabe versiegt
async fn eingabe_schleife<W, A>(
    eingabe: &mut mpsc::Receiver<String>,
    senke: &mut FramedWrite<W, FrameCodec>,
    cipher: &CipherContext,
    benutzername: &str,
    anzeige: &Mutex<A>,
) -> ClientResult<SitzungsEnde>
where
    W: AsyncWrite + Unpin,
    A: Anzeige,
{
    while let Some(zeile) = eingabe.recv().await {
        let zeile = zeile.trim_end_matches(|c| c == '\r' || c == '\n');
        if !zeile.is_empty() {
            let frame = zeile_versiegeln(cipher, benutzername, zeile)?;
            if let Err(e) = senke.send(frame).await {
                if e.ist_getrennt() {
                    return Ok(SitzungsEnde::ServerGetrennt);
                }
                return Err(e.into());
            }
        }
        anzeige.lock().eingabe_erwartet()?;
    }
    Ok(SitzungsEnde::EingabeBeendet)
}

fn zeile_versiegeln(
    cipher: &CipherContext,
    benutzername: &str,
    zeile: &str,
) -> ClientResult<Frame> {
    let klartext = Zeroizing::new(format!("{benutzername}> {zeile}"));
    Ok(cipher.versiegeln(klartext.as_bytes())?)
}

/// Wartet auf `true`; ein gedroppter Sender gilt nicht als Abbruch
async fn abbruch_abwarten(abbruch: &mut watch::Receiver<bool>) {
    if abbruch.wait_for(|aktiv| *aktiv).await.is_err() {
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
