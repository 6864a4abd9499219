//! Zwei Clients chatten ueber einen echten Relay

use std::time::Duration;

use oase_client::{Anzeige, ClientError, ClientSession, SitzungsEnde};
use oase_core::RoomCode;
use oase_crypto::{CipherContext, KdfParameter};
use oase_relay::{RelayKonfiguration, RelayServer};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use zeroize::Zeroizing;

struct Sammler(mpsc::UnboundedSender<String>);

impl Anzeige for Sammler {
    fn nachricht_anzeigen(&mut self, text: &str) -> std::io::Result<()> {
        let _ = self.0.send(text.to_string());
        Ok(())
    }

    fn eingabe_erwartet(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn kontext(passwort: &str, code: &RoomCode) -> CipherContext {
    CipherContext::ableiten(
        Zeroizing::new(passwort.as_bytes().to_vec()),
        code,
        KdfParameter::schnell(),
    )
    .unwrap()
}

struct Teilnehmer {
    eingabe: mpsc::Sender<String>,
    angezeigt: mpsc::UnboundedReceiver<String>,
    handle: tokio::task::JoinHandle<oase_client::ClientResult<SitzungsEnde>>,
}

async fn teilnehmen(
    adresse: std::net::SocketAddr,
    code: RoomCode,
    passwort: &str,
    name: &str,
    abbruch: watch::Receiver<bool>,
) -> Result<Teilnehmer, ClientError> {
    let stream = TcpStream::connect(adresse).await?;
    let session = ClientSession::beitreten(stream, code, kontext(passwort, &code), name).await?;

    let (eingabe, eingabe_rx) = mpsc::channel(8);
    let (angezeigt_tx, angezeigt) = mpsc::unbounded_channel();
    let handle = tokio::spawn(session.ausfuehren(eingabe_rx, Sammler(angezeigt_tx), abbruch));
    Ok(Teilnehmer {
        eingabe,
        angezeigt,
        handle,
    })
}

async fn naechste(t: &mut Teilnehmer) -> String {
    tokio::time::timeout(Duration::from_secs(2), t.angezeigt.recv())
        .await
        .expect("Nachricht erwartet")
        .expect("Anzeige-Kanal offen")
}

#[tokio::test]
async fn drei_teilnehmer_und_ein_falsches_passwort() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let adresse = listener.local_addr().unwrap();
    let server = RelayServer::neu(RelayKonfiguration::default(), None);
    let registry = server.registry();
    let (relay_stop, relay_rx) = watch::channel(false);
    let relay = tokio::spawn(server.starten(listener, relay_rx));

    let code = RoomCode::generieren();
    let (abbruch_tx, abbruch_rx) = watch::channel(false);

    let mut alice = teilnehmen(adresse, code, "Wuesten#Oase1", "alice", abbruch_rx.clone())
        .await
        .unwrap();
    let mut bob = teilnehmen(adresse, code, "Wuesten#Oase1", "bob", abbruch_rx.clone())
        .await
        .unwrap();
    let mut carol = teilnehmen(adresse, code, "Wuesten#Oase1", "carol", abbruch_rx.clone())
        .await
        .unwrap();

    let eve = teilnehmen(adresse, code, "Falsches#Pass2", "eve", abbruch_rx.clone()).await;
    assert!(matches!(eve, Err(ClientError::UngueltigesPasswort)));
    assert_eq!(registry.mitglieder_anzahl(&code), 3);

    alice.eingabe.send("hallo zusammen".into()).await.unwrap();
    assert_eq!(naechste(&mut bob).await, "alice> hallo zusammen");
    assert_eq!(naechste(&mut carol).await, "alice> hallo zusammen");

    bob.eingabe.send("hi alice".into()).await.unwrap();
    assert_eq!(naechste(&mut alice).await, "bob> hi alice");
    assert_eq!(naechste(&mut carol).await, "bob> hi alice");

    // Kein Echo an den Absender
    assert!(alice.angezeigt.try_recv().is_err());

    // Bob verlaesst den Raum, die anderen bleiben
    drop(bob.eingabe);
    assert_eq!(bob.handle.await.unwrap().unwrap(), SitzungsEnde::EingabeBeendet);

    carol.eingabe.send("noch da?".into()).await.unwrap();
    assert_eq!(naechste(&mut alice).await, "carol> noch da?");

    abbruch_tx.send(true).unwrap();
    for t in [alice, carol] {
        let ende = tokio::time::timeout(Duration::from_secs(2), t.handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(ende, SitzungsEnde::Abgebrochen);
    }

    relay_stop.send(true).unwrap();
    relay.await.unwrap().unwrap();
    assert!(!registry.raum_existiert(&code));
}

#[tokio::test]
async fn relay_shutdown_beendet_clients() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let adresse = listener.local_addr().unwrap();
    let server = RelayServer::neu(RelayKonfiguration::default(), None);
    let (relay_stop, relay_rx) = watch::channel(false);
    let relay = tokio::spawn(server.starten(listener, relay_rx));

    let code = RoomCode::generieren();
    let (_abbruch_tx, abbruch_rx) = watch::channel(false);
    let t = teilnehmen(adresse, code, "Wuesten#Oase1", "alice", abbruch_rx)
        .await
        .unwrap();

    relay_stop.send(true).unwrap();
    relay.await.unwrap().unwrap();

    let ende = tokio::time::timeout(Duration::from_secs(2), t.handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(ende, SitzungsEnde::ServerGetrennt);
    drop(t.eingabe);
}
