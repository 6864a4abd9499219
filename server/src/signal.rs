//! Prozess-Signale

use std::io;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Installierte Handler fuer Ctrl-C und (unter Unix) SIGTERM
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl ShutdownSignal {
    pub fn installieren() -> io::Result<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wartet auf das erste Signal und liefert seinen Namen
    pub async fn abwarten(mut self) -> io::Result<&'static str> {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.interrupt.recv() => Ok("SIGINT"),
                _ = self.terminate.recv() => Ok("SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            let _ = &mut self;
            tokio::signal::ctrl_c().await.map(|_| "Ctrl-C")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn handler_lassen_sich_installieren() {
        assert!(ShutdownSignal::installieren().is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigterm_wird_erkannt() {
        let signal = ShutdownSignal::installieren().unwrap();
        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let name = tokio::time::timeout(Duration::from_secs(5), signal.abwarten())
            .await
            .expect("SIGTERM nicht angekommen")
            .unwrap();
        assert_eq!(name, "SIGTERM");
    }
}
