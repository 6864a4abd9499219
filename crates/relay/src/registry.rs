//! Raum-Registry - einzige Stelle, die Raum-Zustand veraendert
//!
//! Die Registry haelt alle Raeume hinter einem einzigen Reader/Writer-Lock.
//! Beitritt und Verlassen nehmen den Write-Lock, der Broadcast-Pfad nur den
//! Read-Lock.
//!
//! ## Zustellung
//! Jedes Mitglied hat eine begrenzte Warteschlange (`MemberEvent`). Der
//! Broadcast stellt mit `try_send` zu und wartet nie unter dem Lock; ist die
//! Warteschlange eines langsamen Mitglieds voll, wird der Frame fuer genau
//! dieses Mitglied verworfen. Andere Mitglieder und Raeume bleiben unberuehrt.

use bytes::Bytes;
use oase_core::{AuthHash, RoomCode, UserId};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{RelayError, RelayResult};

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standard-Groesse der Warteschlange pro Mitglied
pub const DEFAULT_WARTESCHLANGE: usize = 64;

// ---------------------------------------------------------------------------
// Typen
// ---------------------------------------------------------------------------

/// Ereignis in der Warteschlange eines Mitglieds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberEvent {
    /// Kompletter Frame eines anderen Mitglieds, unveraendert
    Payload(Bytes),
    /// Das Mitglied hat den Raum verlassen; die Relay-Schleife endet
    Left,
}

/// Mitgliedschafts-Handle einer Peer-Session
///
/// Nicht klonbar: genau eine Peer-Session besitzt es. `verlassen` wird
/// ueber ein atomares Flag hoechstens einmal wirksam.
#[derive(Debug)]
pub struct Session {
    code: RoomCode,
    user_id: UserId,
    verlassen: AtomicBool,
}

impl Session {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn ist_verlassen(&self) -> bool {
        self.verlassen.load(Ordering::Acquire)
    }
}

struct Member {
    tx: mpsc::Sender<MemberEvent>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<MemberEvent>>>,
}

struct Room {
    auth_hash: AuthHash,
    members: HashMap<UserId, Member>,
}

struct RegistryState {
    raeume: HashMap<RoomCode, Room>,
    /// Zuletzt vergebene ID; 0 wird nie vergeben
    letzte_user_id: u64,
}

// ---------------------------------------------------------------------------
// RoomRegistry
// ---------------------------------------------------------------------------

/// Verwaltet Raeume und ihre Mitglieder
///
/// Wird als `Arc<RoomRegistry>` in Server und Peer-Sessions injiziert.
pub struct RoomRegistry {
    state: RwLock<RegistryState>,
    warteschlange: usize,
}

impl RoomRegistry {
    /// Erstellt eine leere Registry
    pub fn neu(warteschlange: usize) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                raeume: HashMap::new(),
                letzte_user_id: 0,
            }),
            warteschlange: warteschlange.max(1),
        }
    }

    /// Tritt einem Raum bei oder erstellt ihn
    ///
    /// Existiert der Raum, muss der Auth-Hash exakt passen; bei Abweichung
    /// bleibt die Registry unveraendert. Erstellen, Pruefen und Einfuegen
    /// laufen unter demselben Write-Lock.
    pub fn beitreten(&self, code: RoomCode, auth_hash: AuthHash) -> RelayResult<Session> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let raum = match state.raeume.entry(code) {
            Entry::Occupied(eintrag) => {
                if eintrag.get().auth_hash != auth_hash {
                    tracing::warn!(raum = %code, "Beitritt abgelehnt: Auth-Hash passt nicht");
                    return Err(RelayError::AuthFehlgeschlagen);
                }
                eintrag.into_mut()
            }
            Entry::Vacant(eintrag) => {
                tracing::info!(raum = %code, "Raum erstellt");
                eintrag.insert(Room {
                    auth_hash,
                    members: HashMap::new(),
                })
            }
        };

        state.letzte_user_id += 1;
        let user_id = UserId(state.letzte_user_id);

        let (tx, rx) = mpsc::channel(self.warteschlange);
        raum.members.insert(
            user_id,
            Member {
                tx,
                rx: Arc::new(tokio::sync::Mutex::new(rx)),
            },
        );

        tracing::info!(
            raum = %code,
            user_id = %user_id,
            mitglieder = raum.members.len(),
            "Mitglied beigetreten"
        );

        Ok(Session {
            code,
            user_id,
            verlassen: AtomicBool::new(false),
        })
    }

    /// Entfernt das Mitglied aus seinem Raum
    ///
    /// Idempotent: nur der erste Aufruf pro Session wirkt und liefert `true`.
    /// Die Warteschlange des Mitglieds bekommt `Left` und wird geschlossen;
    /// ein leerer Raum wird geloescht und sein Code ist wieder frei.
    pub fn verlassen(&self, session: &Session) -> bool {
        if session.verlassen.swap(true, Ordering::AcqRel) {
            return false;
        }

        let mut state = self.state.write();
        let Some(raum) = state.raeume.get_mut(&session.code) else {
            return true;
        };

        if let Some(member) = raum.members.remove(&session.user_id) {
            // Bei voller Warteschlange reicht das Schliessen beim Drop
            let _ = member.tx.try_send(MemberEvent::Left);
        }

        tracing::info!(
            raum = %session.code,
            user_id = %session.user_id,
            mitglieder = raum.members.len(),
            "Mitglied hat den Raum verlassen"
        );

        if raum.members.is_empty() {
            state.raeume.remove(&session.code);
            tracing::info!(raum = %session.code, "Raum geloescht");
        }
        true
    }

    /// Stellt einen Frame allen anderen Mitgliedern des Raums zu
    ///
    /// Gibt die Anzahl erfolgreicher Zustellungen zurueck. Der Absender
    /// bekommt seinen eigenen Frame nie.
    pub fn an_andere_senden(&self, session: &Session, payload: Bytes) -> usize {
        if session.ist_verlassen() {
            return 0;
        }

        let state = self.state.read();
        let Some(raum) = state.raeume.get(&session.code) else {
            return 0;
        };

        let mut zugestellt = 0;
        for (user_id, member) in &raum.members {
            if *user_id == session.user_id {
                continue;
            }
            match member.tx.try_send(MemberEvent::Payload(payload.clone())) {
                Ok(()) => zugestellt += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        raum = %session.code,
                        user_id = %user_id,
                        "Warteschlange voll - Frame verworfen"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(user_id = %user_id, "Warteschlange geschlossen");
                }
            }
        }
        zugestellt
    }

    /// Wartet auf das naechste Ereignis fuer dieses Mitglied
    ///
    /// Liefert `Left`, sobald das Mitglied nicht mehr im Raum ist.
    /// Cancel-safe: ein abgebrochener Aufruf verliert kein Ereignis.
    pub async fn empfangen(&self, session: &Session) -> MemberEvent {
        let rx = {
            let state = self.state.read();
            let member = state
                .raeume
                .get(&session.code)
                .and_then(|raum| raum.members.get(&session.user_id));
            match member {
                Some(member) => Arc::clone(&member.rx),
                None => return MemberEvent::Left,
            }
        };

        let mut rx = rx.lock().await;
        rx.recv().await.unwrap_or(MemberEvent::Left)
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    pub fn raum_existiert(&self, code: &RoomCode) -> bool {
        self.state.read().raeume.contains_key(code)
    }

    /// Anzahl Mitglieder eines Raums (0 wenn er nicht existiert)
    pub fn mitglieder_anzahl(&self, code: &RoomCode) -> usize {
        self.state
            .read()
            .raeume
            .get(code)
            .map(|raum| raum.members.len())
            .unwrap_or(0)
    }

    pub fn raum_anzahl(&self) -> usize {
        self.state.read().raeume.len()
    }

    pub fn warteschlange(&self) -> usize {
        self.warteschlange
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::neu(DEFAULT_WARTESCHLANGE)
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("raeume", &self.raum_anzahl())
            .field("warteschlange", &self.warteschlange)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn code(s: &str) -> RoomCode {
        RoomCode::parsen(s).unwrap()
    }

    fn hash(b: u8) -> AuthHash {
        AuthHash::new([b; 32])
    }

    async fn naechstes(registry: &RoomRegistry, session: &Session) -> MemberEvent {
        tokio::time::timeout(Duration::from_secs(1), registry.empfangen(session))
            .await
            .expect("Ereignis erwartet")
    }

    async fn nichts_wartet(registry: &RoomRegistry, session: &Session) -> bool {
        tokio::time::timeout(Duration::from_millis(50), registry.empfangen(session))
            .await
            .is_err()
    }

    #[test]
    fn falscher_hash_wird_abgelehnt_ohne_folgen() {
        let registry = RoomRegistry::default();
        let raum = code("abc-def-ghi");

        let _a = registry.beitreten(raum, hash(1)).unwrap();
        let ergebnis = registry.beitreten(raum, hash(2));
        assert!(matches!(ergebnis, Err(RelayError::AuthFehlgeschlagen)));
        assert_eq!(registry.mitglieder_anzahl(&raum), 1);

        // Der urspruengliche Hash gilt weiterhin
        let b = registry.beitreten(raum, hash(1)).unwrap();
        assert_eq!(registry.mitglieder_anzahl(&raum), 2);
        assert_eq!(b.code(), &raum);
    }

    #[test]
    fn raum_lebenszyklus() {
        let registry = RoomRegistry::default();
        let raum = code("abc-def-ghi");
        assert!(!registry.raum_existiert(&raum));

        let a = registry.beitreten(raum, hash(1)).unwrap();
        let b = registry.beitreten(raum, hash(1)).unwrap();
        assert!(registry.raum_existiert(&raum));
        assert_eq!(registry.mitglieder_anzahl(&raum), 2);

        assert!(registry.verlassen(&a));
        assert!(registry.raum_existiert(&raum));
        assert_eq!(registry.mitglieder_anzahl(&raum), 1);

        assert!(registry.verlassen(&b));
        assert!(!registry.raum_existiert(&raum));
        assert_eq!(registry.raum_anzahl(), 0);
    }

    #[test]
    fn code_ist_nach_dem_letzten_mitglied_wieder_frei() {
        let registry = RoomRegistry::default();
        let raum = code("abc-def-ghi");

        let a = registry.beitreten(raum, hash(1)).unwrap();
        registry.verlassen(&a);

        // Neuer Raum mit anderem Hash
        let b = registry.beitreten(raum, hash(9)).unwrap();
        assert!(registry.beitreten(raum, hash(1)).is_err());
        registry.verlassen(&b);
    }

    #[test]
    fn verlassen_ist_idempotent() {
        let registry = RoomRegistry::default();
        let raum = code("abc-def-ghi");
        let a = registry.beitreten(raum, hash(1)).unwrap();
        let _b = registry.beitreten(raum, hash(1)).unwrap();

        assert!(registry.verlassen(&a));
        assert!(!registry.verlassen(&a));
        assert!(a.ist_verlassen());
        assert_eq!(registry.mitglieder_anzahl(&raum), 1);
    }

    #[test]
    fn user_ids_werden_nie_wiederverwendet() {
        let registry = RoomRegistry::default();
        let raum = code("abc-def-ghi");
        let a = registry.beitreten(raum, hash(1)).unwrap();
        let id_a = a.user_id();
        registry.verlassen(&a);

        let b = registry.beitreten(raum, hash(1)).unwrap();
        let c = registry.beitreten(code("xyz-xyz-xyz"), hash(2)).unwrap();
        assert!(b.user_id() > id_a);
        assert!(c.user_id() > b.user_id());
    }

    #[tokio::test]
    async fn broadcast_erreicht_alle_ausser_absender() {
        let registry = RoomRegistry::default();
        let raum = code("abc-def-ghi");
        let a = registry.beitreten(raum, hash(1)).unwrap();
        let b = registry.beitreten(raum, hash(1)).unwrap();
        let c = registry.beitreten(raum, hash(1)).unwrap();

        let payload = Bytes::from_static(b"frame-von-a");
        assert_eq!(registry.an_andere_senden(&a, payload.clone()), 2);

        assert_eq!(naechstes(&registry, &b).await, MemberEvent::Payload(payload.clone()));
        assert_eq!(naechstes(&registry, &c).await, MemberEvent::Payload(payload));
        assert!(nichts_wartet(&registry, &a).await);
    }

    #[tokio::test]
    async fn broadcast_bleibt_im_raum() {
        let registry = RoomRegistry::default();
        let a = registry.beitreten(code("aaa-aaa-aaa"), hash(1)).unwrap();
        let fremd = registry.beitreten(code("bbb-bbb-bbb"), hash(1)).unwrap();

        assert_eq!(registry.an_andere_senden(&a, Bytes::from_static(b"x")), 0);
        assert!(nichts_wartet(&registry, &fremd).await);
    }

    #[tokio::test]
    async fn reihenfolge_eines_absenders_bleibt_erhalten() {
        let registry = RoomRegistry::default();
        let raum = code("abc-def-ghi");
        let a = registry.beitreten(raum, hash(1)).unwrap();
        let b = registry.beitreten(raum, hash(1)).unwrap();

        for i in 0..10u8 {
            registry.an_andere_senden(&a, Bytes::from(vec![i]));
        }
        for i in 0..10u8 {
            assert_eq!(
                naechstes(&registry, &b).await,
                MemberEvent::Payload(Bytes::from(vec![i]))
            );
        }
    }

    #[tokio::test]
    async fn leerer_payload_ist_kein_verlassen() {
        let registry = RoomRegistry::default();
        let raum = code("abc-def-ghi");
        let a = registry.beitreten(raum, hash(1)).unwrap();
        let b = registry.beitreten(raum, hash(1)).unwrap();

        registry.an_andere_senden(&a, Bytes::new());
        assert_eq!(naechstes(&registry, &b).await, MemberEvent::Payload(Bytes::new()));
    }

    #[tokio::test]
    async fn verlassen_weckt_wartende_relay_schleife() {
        let registry = Arc::new(RoomRegistry::default());
        let raum = code("abc-def-ghi");
        let a = Arc::new(registry.beitreten(raum, hash(1)).unwrap());

        let wartend = {
            let registry = Arc::clone(&registry);
            let a = Arc::clone(&a);
            tokio::spawn(async move { registry.empfangen(&a).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        registry.verlassen(&a);
        let ereignis = tokio::time::timeout(Duration::from_secs(1), wartend)
            .await
            .expect("Relay-Schleife muss aufwachen")
            .unwrap();
        assert_eq!(ereignis, MemberEvent::Left);

        // Danach immer Left
        assert_eq!(registry.empfangen(&a).await, MemberEvent::Left);
        assert_eq!(registry.an_andere_senden(&a, Bytes::from_static(b"x")), 0);
    }

    #[tokio::test]
    async fn volle_warteschlange_verwirft_nur_fuer_den_langsamen() {
        let registry = RoomRegistry::neu(2);
        let raum = code("abc-def-ghi");
        let a = registry.beitreten(raum, hash(1)).unwrap();
        let langsam = registry.beitreten(raum, hash(1)).unwrap();
        let schnell = registry.beitreten(raum, hash(1)).unwrap();

        for i in 0..5u8 {
            registry.an_andere_senden(&a, Bytes::from(vec![i]));
            // Der schnelle Empfaenger leert seine Warteschlange sofort
            assert_eq!(
                naechstes(&registry, &schnell).await,
                MemberEvent::Payload(Bytes::from(vec![i]))
            );
        }

        // Der langsame hat nur die ersten beiden bekommen
        for i in 0..2u8 {
            assert_eq!(
                naechstes(&registry, &langsam).await,
                MemberEvent::Payload(Bytes::from(vec![i]))
            );
        }
        assert!(nichts_wartet(&registry, &langsam).await);
    }
}
