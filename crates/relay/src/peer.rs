//! Peer-Session - verwaltet eine einzelne Client-Verbindung
//!
//! Jede Verbindung bekommt eine `PeerSession` in einem eigenen tokio-Task.
//! Nach dem Beitritt laufen zwei Schleifen nebenlaeufig:
//! - Ingest: Frames vom Socket lesen und an die anderen Mitglieder verteilen
//! - Relay: Frames aus der eigenen Warteschlange auf den Socket schreiben
//!
//! ## State Machine
//! ```text
//! Verbindend -> Authentifizierend -> Beigetreten -> Verlassend -> Geschlossen
//!                      |                                              ^
//!                      +---------------- Ablehnung / Fehler ----------+
//! ```
//!
//! Endet eine der beiden Schleifen oder kommt das Shutdown-Signal, wird die
//! Mitgliedschaft genau einmal beendet und die Schreibseite geschlossen.

use futures_util::StreamExt;
use oase_protocol::{ist_getrennt, FrameCodec, JoinAnfrage, JoinAntwort, ProtocolError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::watch;
use tokio_util::codec::FramedRead;

use crate::config::RelayKonfiguration;
use crate::registry::{MemberEvent, RoomRegistry, Session};
use crate::shutdown::shutdown_abwarten;

/// Obergrenze fuer das geordnete Schliessen der Schreibseite
pub const SCHLIESSEN_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Zustand und Ergebnis
// ---------------------------------------------------------------------------

/// Zustand der Peer-Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerZustand {
    Verbindend,
    Authentifizierend,
    Beigetreten,
    Verlassend,
    Geschlossen,
}

/// Warum eine Peer-Session geendet hat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitzungsEnde {
    /// Auth-Hash passte nicht zum Raum; `0x00` wurde gesendet
    HandshakeAbgelehnt,
    /// Strukturell ungueltiger Raum-Code; `0x00` wurde gesendet
    UngueltigerCode,
    /// Handshake nicht rechtzeitig abgeschlossen
    HandshakeTimeout,
    /// Peer hat die Verbindung geschlossen (EOF, Reset)
    VerbindungGetrennt,
    /// Zu grosser Frame oder anderes kaputtes Wire-Format
    ProtokollVerletzung,
    /// Mitgliedschaft wurde von aussen beendet
    AusRaumEntfernt,
    /// Server faehrt herunter
    ServerShutdown,
    /// Sonstiger IO-Fehler
    Transportfehler(String),
}

// ---------------------------------------------------------------------------
// PeerSession
// ---------------------------------------------------------------------------

/// Verarbeitet eine einzelne Verbindung
pub struct PeerSession {
    registry: Arc<RoomRegistry>,
    konfiguration: RelayKonfiguration,
    peer_addr: SocketAddr,
    zustand: PeerZustand,
}

impl PeerSession {
    /// Erstellt eine neue PeerSession
    pub fn neu(
        registry: Arc<RoomRegistry>,
        konfiguration: RelayKonfiguration,
        peer_addr: SocketAddr,
    ) -> Self {
        Self {
            registry,
            konfiguration,
            peer_addr,
            zustand: PeerZustand::Verbindend,
        }
    }

    pub fn zustand(&self) -> PeerZustand {
        self.zustand
    }

    /// Fuehrt Handshake und Frame-Relay bis zum Verbindungsende aus
    ///
    /// Funktioniert mit jedem bidirektionalen Stream (TCP, TLS, In-Memory).
    pub async fn verarbeiten<S>(
        &mut self,
        stream: S,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> SitzungsEnde
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let peer = self.peer_addr;
        tracing::debug!(peer = %peer, "Neue Verbindung");

        let (mut leser, mut schreiber) = tokio::io::split(stream);

        self.zustand = PeerZustand::Authentifizierend;
        let session = tokio::select! {
            ergebnis = self.handshake(&mut leser, &mut schreiber) => ergebnis,
            _ = shutdown_abwarten(&mut shutdown_rx) => Err(SitzungsEnde::ServerShutdown),
        };
        let session = match session {
            Ok(session) => session,
            Err(ende) => {
                tracing::debug!(peer = %peer, grund = ?ende, "Handshake beendet");
                self.schliessen(schreiber).await;
                return ende;
            }
        };

        self.zustand = PeerZustand::Beigetreten;
        let ende = self
            .frames_weiterleiten(&session, leser, &mut schreiber, &mut shutdown_rx)
            .await;

        self.zustand = PeerZustand::Verlassend;
        self.registry.verlassen(&session);
        tracing::info!(
            peer = %peer,
            raum = %session.code(),
            user_id = %session.user_id(),
            grund = ?ende,
            "Peer getrennt"
        );

        self.schliessen(schreiber).await;
        ende
    }

    /// Liest die Beitrittsanfrage und beantwortet sie
    async fn handshake<S>(
        &self,
        leser: &mut ReadHalf<S>,
        schreiber: &mut WriteHalf<S>,
    ) -> Result<Session, SitzungsEnde>
    where
        S: AsyncRead + AsyncWrite,
    {
        let peer = self.peer_addr;
        let frist = self.konfiguration.handshake_timeout;
        let anfrage = match tokio::time::timeout(frist, JoinAnfrage::lesen(leser)).await {
            Err(_) => {
                tracing::warn!(peer = %peer, "Handshake-Timeout");
                return Err(SitzungsEnde::HandshakeTimeout);
            }
            Ok(Ok(anfrage)) => anfrage,
            Ok(Err(ProtocolError::UngueltigerRaumCode(e))) => {
                tracing::warn!(peer = %peer, fehler = %e, "Protokollverletzung im Handshake");
                let _ = JoinAntwort::Abgelehnt.senden(schreiber).await;
                return Err(SitzungsEnde::UngueltigerCode);
            }
            Ok(Err(e)) => return Err(lesefehler_einordnen(e)),
        };

        let session = match self.registry.beitreten(anfrage.code, anfrage.auth_hash) {
            Ok(session) => session,
            Err(_) => {
                tracing::warn!(peer = %peer, raum = %anfrage.code, "Beitritt abgelehnt");
                let _ = JoinAntwort::Abgelehnt.senden(schreiber).await;
                return Err(SitzungsEnde::HandshakeAbgelehnt);
            }
        };

        if let Err(e) = JoinAntwort::Angenommen.senden(schreiber).await {
            self.registry.verlassen(&session);
            return Err(lesefehler_einordnen(e));
        }

        tracing::info!(
            peer = %peer,
            raum = %session.code(),
            user_id = %session.user_id(),
            "Peer beigetreten"
        );
        Ok(session)
    }

    /// Ingest- und Relay-Schleife bis eine Seite endet
    async fn frames_weiterleiten<S>(
        &self,
        session: &Session,
        leser: ReadHalf<S>,
        schreiber: &mut WriteHalf<S>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> SitzungsEnde
    where
        S: AsyncRead + AsyncWrite,
    {
        let registry = &self.registry;
        let mut frames = FramedRead::new(
            leser,
            FrameCodec::with_max_size(self.konfiguration.max_frame_groesse),
        );

        let ingest = async {
            loop {
                match frames.next().await {
                    Some(Ok(frame)) => {
                        registry.an_andere_senden(session, frame.to_bytes());
                    }
                    Some(Err(e)) => return lesefehler_einordnen(e),
                    None => return SitzungsEnde::VerbindungGetrennt,
                }
            }
        };

        let relay = async {
            loop {
                match registry.empfangen(session).await {
                    MemberEvent::Payload(bytes) => {
                        let geschrieben = async {
                            schreiber.write_all(&bytes).await?;
                            schreiber.flush().await
                        };
                        if let Err(e) = geschrieben.await {
                            return io_fehler_einordnen(e);
                        }
                    }
                    MemberEvent::Left => return SitzungsEnde::AusRaumEntfernt,
                }
            }
        };

        tokio::select! {
            ende = ingest => ende,
            ende = relay => ende,
            _ = shutdown_abwarten(shutdown_rx) => SitzungsEnde::ServerShutdown,
        }
    }

    /// Schliesst die Schreibseite, hoechstens `SCHLIESSEN_TIMEOUT` lang
    ///
    /// Ein Peer, der nicht mehr liest, kann den Shutdown (TLS close_notify,
    /// ausstehende Records) unbegrenzt blockieren. Danach wird der Stream
    /// ohne weiteres Warten gedroppt.
    async fn schliessen<S>(&mut self, mut schreiber: WriteHalf<S>)
    where
        S: AsyncWrite,
    {
        let frist = self.konfiguration.handshake_timeout.min(SCHLIESSEN_TIMEOUT);
        match tokio::time::timeout(frist, schreiber.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::trace!(
                    peer = %self.peer_addr,
                    fehler = %e,
                    "Shutdown der Schreibseite fehlgeschlagen"
                );
            }
            Err(_) => {
                tracing::debug!(
                    peer = %self.peer_addr,
                    "Peer liest nicht - Verbindung wird hart getrennt"
                );
            }
        }
        drop(schreiber);
        self.zustand = PeerZustand::Geschlossen;
    }
}

fn lesefehler_einordnen(e: ProtocolError) -> SitzungsEnde {
    match e {
        ProtocolError::Io(e) => io_fehler_einordnen(e),
        ProtocolError::FrameZuGross { laenge, maximum } => {
            tracing::warn!(laenge, maximum, "Frame zu gross - Verbindung wird getrennt");
            SitzungsEnde::ProtokollVerletzung
        }
        andere => {
            tracing::warn!(fehler = %andere, "Protokollverletzung");
            SitzungsEnde::ProtokollVerletzung
        }
    }
}

fn io_fehler_einordnen(e: std::io::Error) -> SitzungsEnde {
    if ist_getrennt(&e) {
        SitzungsEnde::VerbindungGetrennt
    } else {
        tracing::warn!(fehler = %e, "Transportfehler");
        SitzungsEnde::Transportfehler(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
