//! Gemeinsames Shutdown-Signal
//!
//! Ein `watch::Sender<bool>` im Hauptprozess, beliebig viele Empfaenger in
//! Server und Peer-Sessions. `true` bedeutet: sofort beenden.

use tokio::sync::watch;

/// Wartet bis das Shutdown-Signal `true` ist
///
/// Wird der Sender ohne Signal gedroppt, kehrt die Funktion nie zurueck.
pub async fn shutdown_abwarten(shutdown_rx: &mut watch::Receiver<bool>) {
    if shutdown_rx.wait_for(|aktiv| *aktiv).await.is_err() {
        std::future::pending::<()>().await;
    }
}
