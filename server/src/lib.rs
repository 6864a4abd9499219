//! oase-server - Bibliotheks-Root
//!
//! Verbindet Konfiguration, TLS-Material und Signal-Behandlung mit dem
//! Relay aus `oase_relay`. Der Einstiegspunkt in `main.rs` ist nur noch
//! Kommandozeile und Logging.

pub mod config;
pub mod signal;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use config::ServerConfig;
use oase_relay::RelayServer;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Haelt die validierte Konfiguration bis zum Binden
pub struct Server {
    pub config: ServerConfig,
}

/// Server mit gebundenem Listener und geladenem TLS-Material
pub struct GebundenerServer {
    relay: RelayServer,
    listener: TcpListener,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Validiert die Konfiguration, laedt TLS und bindet den Listener
    ///
    /// Alle Konfigurationsfehler treten hier auf, bevor ein Socket offen ist.
    pub async fn binden(self) -> Result<GebundenerServer> {
        let tls = self.config.validieren()?;
        let relay_konfiguration = self.config.relay_konfiguration();

        let acceptor = oase_crypto::acceptor_aus_dateien(&tls.zertifikat, &tls.schluessel)
            .with_context(|| {
                format!(
                    "TLS-Material nicht ladbar ({}, {})",
                    tls.zertifikat.display(),
                    tls.schluessel.display()
                )
            })?;

        let adresse = &self.config.netzwerk.bind_adresse;
        let listener = TcpListener::bind(adresse)
            .await
            .with_context(|| format!("Bind auf '{adresse}' fehlgeschlagen"))?;

        Ok(GebundenerServer {
            relay: RelayServer::neu(relay_konfiguration, Some(acceptor)),
            listener,
        })
    }

    /// Bindet und laeuft bis Ctrl-C oder SIGTERM
    pub async fn starten(self) -> Result<()> {
        let signal = signal::ShutdownSignal::installieren()
            .context("Signal-Handler nicht installierbar")?;
        let gebunden = self.binden().await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            match signal.abwarten().await {
                Ok(name) => {
                    tracing::info!(signal = name, "Shutdown-Signal empfangen");
                    let _ = shutdown_tx.send(true);
                }
                // Ohne Signal kein Shutdown, der Relay laeuft weiter
                Err(e) => {
                    tracing::error!(fehler = %e, "Warten auf Shutdown-Signal fehlgeschlagen");
                }
            }
        });

        gebunden.laufen(shutdown_rx).await
    }
}

impl GebundenerServer {
    /// Tatsaechlich gebundene Adresse (relevant bei Port 0)
    pub fn lokale_adresse(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Faehrt den Relay bis `shutdown_rx` `true` meldet
    pub async fn laufen(self, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        self.relay
            .starten(self.listener, shutdown_rx)
            .await
            .context("Relay beendet mit Fehler")?;
        tracing::info!("Server beendet");
        Ok(())
    }
}
