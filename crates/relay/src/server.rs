//! TCP-Listener - akzeptiert Verbindungen und startet Peer-Sessions
//!
//! Der `RelayServer` nimmt einen gebundenen `TcpListener` entgegen und
//! startet fuer jede eingehende Verbindung einen eigenen tokio-Task mit
//! einer `PeerSession`. TLS wird im Peer-Task ausgehandelt, damit ein
//! langsamer Handshake die Accept-Loop nicht blockiert.
//!
//! ## Shutdown
//! Beim Shutdown-Signal endet die Accept-Loop, danach wartet der Server
//! auf alle Peer-Tasks. Erst dann wird der Listener freigegeben.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;

use crate::config::RelayKonfiguration;
use crate::peer::{PeerSession, SitzungsEnde};
use crate::registry::RoomRegistry;
use crate::shutdown::shutdown_abwarten;

/// Relay-Server
pub struct RelayServer {
    registry: Arc<RoomRegistry>,
    konfiguration: RelayKonfiguration,
    tls: Option<TlsAcceptor>,
}

impl RelayServer {
    /// Erstellt einen neuen RelayServer mit frischer Registry
    ///
    /// Ohne `tls` laeuft der Relay im Klartext-TCP (nur fuer Tests).
    pub fn neu(konfiguration: RelayKonfiguration, tls: Option<TlsAcceptor>) -> Self {
        let registry = Arc::new(RoomRegistry::neu(konfiguration.warteschlange));
        Self {
            registry,
            konfiguration,
            tls,
        }
    }

    /// Gemeinsame Registry (fuer Abfragen von aussen)
    pub fn registry(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.registry)
    }

    /// Akzeptiert Verbindungen bis `shutdown_rx` `true` meldet
    ///
    /// Kehrt erst zurueck, wenn alle Peer-Tasks beendet sind.
    pub async fn starten(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let lokale_addr = listener.local_addr()?;
        tracing::info!(
            adresse = %lokale_addr,
            tls = self.tls.is_some(),
            "Relay gestartet"
        );

        let mut peers = JoinSet::new();

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");
                            peers.spawn(self.peer_task(stream, peer_addr, shutdown_rx.clone()));
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                }

                // Beendete Peer-Tasks einsammeln
                Some(ergebnis) = peers.join_next() => {
                    if let Err(e) = ergebnis {
                        tracing::error!(fehler = %e, "Peer-Task abgebrochen");
                    }
                }

                // Shutdown-Signal
                _ = shutdown_abwarten(&mut shutdown_rx) => {
                    tracing::info!(offene_peers = peers.len(), "Relay: Shutdown-Signal empfangen");
                    break;
                }
            }
        }

        while let Some(ergebnis) = peers.join_next().await {
            if let Err(e) = ergebnis {
                tracing::error!(fehler = %e, "Peer-Task abgebrochen");
            }
        }
        drop(listener);

        tracing::info!(raeume = self.registry.raum_anzahl(), "Relay gestoppt");
        Ok(())
    }

    /// Baut den Task fuer eine einzelne Verbindung
    fn peer_task(
        &self,
        stream: TcpStream,
        peer_addr: SocketAddr,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> impl std::future::Future<Output = SitzungsEnde> + Send + 'static {
        let mut peer = PeerSession::neu(
            Arc::clone(&self.registry),
            self.konfiguration.clone(),
            peer_addr,
        );
        let tls = self.tls.clone();
        let timeout = self.konfiguration.handshake_timeout;

        async move {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht gesetzt");
            }

            let Some(acceptor) = tls else {
                return peer.verarbeiten(stream, shutdown_rx).await;
            };

            let handshake = tokio::time::timeout(timeout, acceptor.accept(stream));
            let tls_stream = tokio::select! {
                ergebnis = handshake => ergebnis,
                _ = shutdown_abwarten(&mut shutdown_rx) => return SitzungsEnde::ServerShutdown,
            };

            match tls_stream {
                Ok(Ok(tls_stream)) => peer.verarbeiten(tls_stream, shutdown_rx).await,
                Ok(Err(e)) => {
                    tracing::warn!(peer = %peer_addr, fehler = %e, "TLS-Handshake fehlgeschlagen");
                    SitzungsEnde::Transportfehler(e.to_string())
                }
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "TLS-Handshake-Timeout");
                    SitzungsEnde::HandshakeTimeout
                }
            }
        }
    }
}

impl std::fmt::Debug for RelayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayServer")
            .field("konfiguration", &self.konfiguration)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}
