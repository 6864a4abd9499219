//! Oase Server - Einstiegspunkt
//!
//! Laedt die Konfiguration, uebernimmt Kommandozeilen-Werte, initialisiert
//! das Logging und startet den Relay.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use oase_server::config::{ServerConfig, Ueberschreibungen};
use oase_server::Server;

/// Oase Relay-Server
#[derive(Debug, Parser)]
#[command(name = "oase-server", version, about)]
struct Argumente {
    /// Listen-Adresse, z.B. 0.0.0.0:8888
    #[arg(long)]
    addr: Option<String>,

    /// PEM-Zertifikatskette
    #[arg(long = "tls-cert")]
    tls_cert: Option<PathBuf>,

    /// PEM-Schluessel
    #[arg(long = "tls-key")]
    tls_key: Option<PathBuf>,

    /// Konfigurationsdatei
    #[arg(long, env = "OASE_CONFIG", default_value = "oase.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let argumente = Argumente::parse();

    let mut config = ServerConfig::laden(&argumente.config)?;
    config.ueberschreiben(Ueberschreibungen {
        bind_adresse: argumente.addr,
        tls_zertifikat: argumente.tls_cert,
        tls_schluessel: argumente.tls_key,
    });

    oase_observability::logging_initialisieren(&config.logging);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %argumente.config,
        adresse = %config.netzwerk.bind_adresse,
        "Oase Server wird initialisiert"
    );

    Server::neu(config).starten().await
}
