//! TLS-Verbindung zum Relay

use oase_crypto::ServerPruefung;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

use crate::error::ClientResult;

/// Trennt den Host-Teil von `host:port` bzw. `[v6]:port`
pub fn host_teil(adresse: &str) -> &str {
    let host = match adresse.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => adresse,
    };
    host.trim_start_matches('[').trim_end_matches(']')
}

/// Baut TCP und TLS zum Relay auf
pub async fn verbinden(
    adresse: &str,
    pruefung: &ServerPruefung,
) -> ClientResult<TlsStream<TcpStream>> {
    let connector = oase_crypto::connector(pruefung)?;
    let name = oase_crypto::server_name(host_teil(adresse))?;

    tracing::info!(adresse = adresse, "Verbinde mit Relay");
    let tcp = TcpStream::connect(adresse).await?;
    tcp.set_nodelay(true)?;

    let tls = connector.connect(name, tcp).await?;
    tracing::info!(adresse = adresse, "TLS-Verbindung hergestellt");
    Ok(tls)
}
