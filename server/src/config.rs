//! Server-Konfiguration
//!
//! Wird aus einer TOML-Datei geladen. Fehlende Felder erhalten Standardwerte,
//! eine fehlende Datei ergibt die vollstaendige Standardkonfiguration.
//! Kommandozeilen-Argumente ueberschreiben die Datei (siehe `main.rs`).

use std::path::PathBuf;
use std::time::Duration;

use oase_observability::{log_level_gueltig, LoggingKonfiguration};
use oase_relay::RelayKonfiguration;
use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub netzwerk: NetzwerkEinstellungen,
    pub relay: RelayEinstellungen,
    pub logging: LoggingKonfiguration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Adresse und Port fuer den TLS-Listener
    pub bind_adresse: String,
    /// PEM-Zertifikatskette
    pub tls_zertifikat: Option<PathBuf>,
    /// PEM-Schluessel (PKCS#8, PKCS#1 oder SEC1)
    pub tls_schluessel: Option<PathBuf>,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0:8888".into(),
            tls_zertifikat: None,
            tls_schluessel: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEinstellungen {
    /// Maximale Ciphertext-Groesse pro Frame in Bytes
    pub max_frame_groesse: usize,
    /// Ausgehende Warteschlange pro Raum-Mitglied
    pub warteschlange: usize,
    /// Sekunden bis ein unangemeldeter Peer getrennt wird
    pub handshake_timeout_sek: u64,
}

impl Default for RelayEinstellungen {
    fn default() -> Self {
        let relay = RelayKonfiguration::default();
        Self {
            max_frame_groesse: relay.max_frame_groesse,
            warteschlange: relay.warteschlange,
            handshake_timeout_sek: relay.handshake_timeout.as_secs(),
        }
    }
}

/// Werte von der Kommandozeile, die die Datei ueberschreiben
#[derive(Debug, Clone, Default)]
pub struct Ueberschreibungen {
    pub bind_adresse: Option<String>,
    pub tls_zertifikat: Option<PathBuf>,
    pub tls_schluessel: Option<PathBuf>,
}

/// Pfade zum TLS-Material nach erfolgreicher Validierung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPfade {
    pub zertifikat: PathBuf,
    pub schluessel: PathBuf,
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei
    ///
    /// Falls die Datei nicht existiert, werden Standardwerte verwendet.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Uebernimmt gesetzte Kommandozeilen-Werte
    pub fn ueberschreiben(&mut self, ueber: Ueberschreibungen) {
        if let Some(adresse) = ueber.bind_adresse {
            self.netzwerk.bind_adresse = adresse;
        }
        if let Some(pfad) = ueber.tls_zertifikat {
            self.netzwerk.tls_zertifikat = Some(pfad);
        }
        if let Some(pfad) = ueber.tls_schluessel {
            self.netzwerk.tls_schluessel = Some(pfad);
        }
    }

    /// Prueft die zusammengefuehrte Konfiguration vor dem Binden
    pub fn validieren(&self) -> anyhow::Result<TlsPfade> {
        if self.netzwerk.bind_adresse.trim().is_empty() {
            anyhow::bail!("netzwerk.bind_adresse darf nicht leer sein");
        }
        let zertifikat = self
            .netzwerk
            .tls_zertifikat
            .clone()
            .ok_or_else(|| {
                anyhow::anyhow!("TLS-Zertifikat fehlt (--tls-cert oder netzwerk.tls_zertifikat)")
            })?;
        let schluessel = self
            .netzwerk
            .tls_schluessel
            .clone()
            .ok_or_else(|| {
                anyhow::anyhow!("TLS-Schluessel fehlt (--tls-key oder netzwerk.tls_schluessel)")
            })?;

        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Ungueltiger Log-Level: '{}'", self.logging.level);
        }

        self.relay_konfiguration()
            .validieren()
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        Ok(TlsPfade {
            zertifikat,
            schluessel,
        })
    }

    /// Laufzeit-Parameter fuer `oase_relay`
    pub fn relay_konfiguration(&self) -> RelayKonfiguration {
        RelayKonfiguration {
            max_frame_groesse: self.relay.max_frame_groesse,
            warteschlange: self.relay.warteschlange,
            handshake_timeout: Duration::from_secs(self.relay.handshake_timeout_sek),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oase_observability::LogFormat;
    use std::io::Write;

    fn mit_tls() -> ServerConfig {
        let mut cfg = ServerConfig::default();
        cfg.ueberschreiben(Ueberschreibungen {
            tls_zertifikat: Some("cert.pem".into()),
            tls_schluessel: Some("key.pem".into()),
            ..Default::default()
        });
        cfg
    }

    #[test]
    fn standardwerte() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.netzwerk.bind_adresse, "0.0.0.0:8888");
        assert_eq!(cfg.relay.max_frame_groesse, 64 * 1024);
        assert_eq!(cfg.relay.warteschlange, 64);
        assert_eq!(cfg.relay.handshake_timeout_sek, 10);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn ohne_tls_ist_ungueltig() {
        let err = ServerConfig::default().validieren().unwrap_err();
        assert!(err.to_string().contains("TLS-Zertifikat"));

        let mut cfg = ServerConfig::default();
        cfg.netzwerk.tls_zertifikat = Some("cert.pem".into());
        let err = cfg.validieren().unwrap_err();
        assert!(err.to_string().contains("TLS-Schluessel"));
    }

    #[test]
    fn mit_tls_ist_gueltig() {
        let pfade = mit_tls().validieren().unwrap();
        assert_eq!(pfade.zertifikat, PathBuf::from("cert.pem"));
        assert_eq!(pfade.schluessel, PathBuf::from("key.pem"));
    }

    #[test]
    fn nullwerte_werden_abgelehnt() {
        let mut cfg = mit_tls();
        cfg.relay.warteschlange = 0;
        assert!(cfg.validieren().is_err());

        let mut cfg = mit_tls();
        cfg.relay.max_frame_groesse = 0;
        assert!(cfg.validieren().is_err());

        let mut cfg = mit_tls();
        cfg.logging.level = "laut".into();
        assert!(cfg.validieren().is_err());
    }

    #[test]
    fn kommandozeile_ueberschreibt_datei() {
        let mut cfg: ServerConfig = toml::from_str(
            r#"
            [netzwerk]
            bind_adresse = "127.0.0.1:9000"
            tls_zertifikat = "/etc/oase/cert.pem"
            "#,
        )
        .unwrap();
        cfg.ueberschreiben(Ueberschreibungen {
            bind_adresse: Some("[::]:7000".into()),
            tls_schluessel: Some("/tmp/key.pem".into()),
            ..Default::default()
        });
        assert_eq!(cfg.netzwerk.bind_adresse, "[::]:7000");
        assert_eq!(
            cfg.netzwerk.tls_zertifikat,
            Some(PathBuf::from("/etc/oase/cert.pem"))
        );
        assert_eq!(cfg.netzwerk.tls_schluessel, Some(PathBuf::from("/tmp/key.pem")));
    }

    #[test]
    fn laden_aus_datei() {
        let mut datei = tempfile::NamedTempFile::new().unwrap();
        write!(
            datei,
            r#"
            [relay]
            warteschlange = 16
            handshake_timeout_sek = 3

            [logging]
            level = "debug"
            format = "json"
            "#
        )
        .unwrap();

        let cfg = ServerConfig::laden(datei.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.relay.warteschlange, 16);
        assert_eq!(cfg.relay.max_frame_groesse, 64 * 1024);
        assert_eq!(cfg.logging.format, LogFormat::Json);

        let relay = cfg.relay_konfiguration();
        assert_eq!(relay.handshake_timeout, Duration::from_secs(3));
        assert_eq!(relay.warteschlange, 16);
    }

    #[test]
    fn fehlende_datei_ergibt_standard() {
        let cfg = ServerConfig::laden("/gibt/es/nicht/oase.toml").unwrap();
        assert_eq!(cfg.netzwerk.bind_adresse, "0.0.0.0:8888");
    }

    #[test]
    fn kaputtes_toml_ist_fehler() {
        let mut datei = tempfile::NamedTempFile::new().unwrap();
        write!(datei, "[relay\nwarteschlange = ").unwrap();
        let err = ServerConfig::laden(datei.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Konfigurationsfehler"));
    }
}
