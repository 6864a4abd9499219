//! Oase Client - Einstiegspunkt
//!
//! Prueft die Argumente, fragt das Passwort ab, leitet den Raum-Schluessel
//! ab und startet die Sitzung. Logs gehen nach stderr, der Chat nach stdout.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use oase_client::{
    verbinden, Anzeige, ClientError, ClientSession, SitzungsEnde, TerminalAnzeige,
    STANDARD_BENUTZERNAME,
};
use oase_core::RoomCode;
use oase_crypto::{CipherContext, KdfParameter, PasswortRichtlinie, ServerPruefung};
use oase_observability::{LogAusgabe, LoggingKonfiguration};
use tokio::sync::{mpsc, watch};
use zeroize::Zeroizing;

/// Ende-zu-Ende verschluesselter Terminal-Chat
#[derive(Debug, Parser)]
#[command(name = "oase", version, about)]
struct Argumente {
    /// Relay-Adresse, z.B. oase.example.org:8888
    #[arg(long)]
    addr: String,

    /// Raum-Code (xxx-xxx-xxx)
    #[arg(long)]
    room: String,

    /// Angezeigter Name
    #[arg(long, default_value = STANDARD_BENUTZERNAME)]
    user: String,

    /// Zusaetzliches CA- oder selbstsigniertes Zertifikat (PEM)
    #[arg(long = "ca-cert", conflicts_with = "insecure")]
    ca_cert: Option<PathBuf>,

    /// Server-Zertifikat nicht pruefen
    #[arg(long)]
    insecure: bool,
}

impl Argumente {
    fn server_pruefung(&self) -> Result<ServerPruefung> {
        if self.insecure {
            return Ok(ServerPruefung::Keine);
        }
        match &self.ca_cert {
            Some(pfad) => {
                let pem = std::fs::read(pfad)
                    .with_context(|| format!("CA-Zertifikat '{}' nicht lesbar", pfad.display()))?;
                Ok(ServerPruefung::ZusaetzlicheCa(pem))
            }
            None => Ok(ServerPruefung::WebPki),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let argumente = Argumente::parse();

    oase_observability::logging_initialisieren(&LoggingKonfiguration {
        level: "warn".into(),
        ausgabe: LogAusgabe::Stderr,
        ..Default::default()
    });

    let code = RoomCode::parsen(&argumente.room).context("Ungueltiger Raum-Code")?;
    let pruefung = argumente.server_pruefung()?;

    let passwort = passwort_abfragen()?;
    let cipher = tokio::task::spawn_blocking(move || {
        CipherContext::ableiten(passwort, &code, KdfParameter::default())
    })
    .await
    .context("Schluesselableitung abgebrochen")?
    .context("Schluesselableitung fehlgeschlagen")?;

    let stream = verbinden(&argumente.addr, &pruefung)
        .await
        .with_context(|| format!("Verbindung zu '{}' fehlgeschlagen", argumente.addr))?;

    let session = match ClientSession::beitreten(stream, code, cipher, argumente.user.clone()).await
    {
        Ok(session) => session,
        Err(e @ ClientError::UngueltigesPasswort) => return Err(e.into()),
        Err(e) => return Err(e).context("Beitritt fehlgeschlagen"),
    };

    let (abbruch_tx, abbruch_rx) = watch::channel(false);
    tokio::spawn(async move {
        if abbruch_signal().await.is_ok() {
            let _ = abbruch_tx.send(true);
        }
    });

    let mut anzeige = TerminalAnzeige::neu(std::io::stdout(), &argumente.user);
    anzeige.eingabe_erwartet()?;

    let ende = session
        .ausfuehren(eingabe_lesen(), anzeige, abbruch_rx)
        .await?;

    match ende {
        SitzungsEnde::ServerGetrennt => eprintln!("\nVerbindung vom Relay getrennt"),
        SitzungsEnde::EingabeBeendet | SitzungsEnde::Abgebrochen => eprintln!(),
    }
    Ok(())
}

/// Liest das Passwort ohne Echo und warnt bei schwachen Passwoertern
fn passwort_abfragen() -> Result<Zeroizing<Vec<u8>>> {
    let eingabe = Zeroizing::new(
        rpassword::prompt_password("Passwort: ").context("Passwort nicht lesbar")?,
    );
    let passwort = Zeroizing::new(eingabe.as_bytes().to_vec());
    drop(eingabe);

    let verstoesse = PasswortRichtlinie::default().pruefen(&passwort);
    if !verstoesse.is_empty() {
        eprintln!("Warnung: Passwort erfuellt die Richtlinie fuer neue Raeume nicht:");
        for verstoss in &verstoesse {
            eprintln!("  - {verstoss}");
        }
    }
    Ok(passwort)
}

/// Liest stdin zeilenweise in einem eigenen Thread
fn eingabe_lesen() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for zeile in std::io::stdin().lock().lines() {
            let Ok(zeile) = zeile else { break };
            if tx.blocking_send(zeile).is_err() {
                break;
            }
        }
    });
    rx
}

async fn abbruch_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            ergebnis = tokio::signal::ctrl_c() => ergebnis,
            _ = sigterm.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
