use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::TripError,
    models::{placeholder_image_url, Trip, TripDraft},
    slot::KeyValueSlot,
};

/// Slot key holding the whole serialized trip collection.
pub const STORAGE_KEY: &str = "roamEasyTrips";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Uninitialized,
    Loading,
    Ready,
}

struct Inner {
    trips: Vec<Trip>,
    readiness: Readiness,
}

enum SlotWrite {
    Save(String),
    Flush(oneshot::Sender<()>),
}

// One dedicated thread owns all slot writes, so they never run on an async
// worker or under the store lock, and land in the order they were queued.
fn spawn_slot_writer(slot: Arc<dyn KeyValueSlot>) -> mpsc::UnboundedSender<SlotWrite> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while let Some(job) = rx.blocking_recv() {
            match job {
                SlotWrite::Save(raw) => {
                    if let Err(e) = slot.set(STORAGE_KEY, &raw) {
                        warn!("⚠️ Failed to save trips to storage: {}", e);
                    }
                }
                SlotWrite::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    });
    tx
}

/// The authoritative trip collection, mirrored to a durable slot on every mutation.
///
/// Until [`TripStore::load`] has finished, reads behave as if the store were
/// empty and mutations fail with [`TripError::NotReady`]; nothing is queued and
/// nothing is written to the slot.
///
/// Slot writes are fire-and-forget: each mutation snapshots the collection and
/// hands it to a background writer. [`TripStore::flush`] waits for them.
pub struct TripStore {
    slot: Arc<dyn KeyValueSlot>,
    writer: mpsc::UnboundedSender<SlotWrite>,
    inner: RwLock<Inner>,
}

impl TripStore {
    pub fn new(slot: Arc<dyn KeyValueSlot>) -> Self {
        Self {
            writer: spawn_slot_writer(slot.clone()),
            slot,
            inner: RwLock::new(Inner { trips: Vec::new(), readiness: Readiness::Uninitialized }),
        }
    }

    /// Resolves once every slot write queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.writer.send(SlotWrite::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Reads the slot once. A missing or unparsable value is a cold start with no trips.
    /// Later calls do nothing.
    pub fn load(&self) {
        {
            let mut inner = self.inner.write();
            if inner.readiness != Readiness::Uninitialized {
                return;
            }
            inner.readiness = Readiness::Loading;
        }

        let trips = self.read_slot();
        let mut inner = self.inner.write();
        info!("📂 Trip store ready with {} trips", trips.len());
        inner.trips = trips;
        inner.readiness = Readiness::Ready;
    }

    fn read_slot(&self) -> Vec<Trip> {
        match self.slot.get(STORAGE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("⚠️ Stored trips are unreadable, starting empty: {}", e);
                Vec::new()
            }),
            Ok(None) => {
                info!("No stored trips found, starting empty");
                Vec::new()
            }
            Err(e) => {
                warn!("⚠️ Failed to load trips from storage, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.inner.read().readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness() == Readiness::Ready
    }

    pub fn list(&self) -> Vec<Trip> {
        let inner = self.inner.read();
        if inner.readiness != Readiness::Ready {
            return Vec::new();
        }
        inner.trips.clone()
    }

    pub fn get_by_id(&self, trip_id: &str) -> Option<Trip> {
        let inner = self.inner.read();
        if inner.readiness != Readiness::Ready {
            return None;
        }
        inner.trips.iter().find(|t| t.id == trip_id).cloned()
    }

    pub fn add(&self, draft: TripDraft) -> Result<Trip, TripError> {
        self.mutate(|trips| {
            let image_url = match draft.image_url.as_deref() {
                Some(url) if !url.is_empty() => url.to_string(),
                _ => placeholder_image_url(&draft.name),
            };
            let mut trip = draft.into_trip(Uuid::new_v4().to_string(), None);
            trip.image_url = Some(image_url);
            info!("➕ Added trip '{}' ({})", trip.name, trip.id);
            trips.push(trip.clone());
            Ok(trip)
        })
    }

    /// Full replace of the record with `trip.id`; fields absent from `trip` are not carried over.
    pub fn update(&self, trip: Trip) -> Result<Trip, TripError> {
        self.mutate(|trips| {
            let existing = trips
                .iter_mut()
                .find(|t| t.id == trip.id)
                .ok_or_else(|| TripError::NotFound(trip.id.clone()))?;
            *existing = trip.clone();
            info!("✏️ Updated trip {}", trip.id);
            Ok(trip)
        })
    }

    pub fn delete(&self, trip_id: &str) -> Result<Trip, TripError> {
        self.mutate(|trips| {
            let idx = trips
                .iter()
                .position(|t| t.id == trip_id)
                .ok_or_else(|| TripError::NotFound(trip_id.to_string()))?;
            info!("🗑️ Deleted trip {}", trip_id);
            Ok(trips.remove(idx))
        })
    }

    pub fn set_ai_summary(&self, trip_id: &str, summary: String) -> Result<Trip, TripError> {
        self.mutate(|trips| {
            let trip = trips
                .iter_mut()
                .find(|t| t.id == trip_id)
                .ok_or_else(|| TripError::NotFound(trip_id.to_string()))?;
            trip.ai_summary = Some(summary);
            Ok(trip.clone())
        })
    }

    // Snapshots are queued while the write lock is held, so the writer sees them
    // in mutation order. A failed mutation queues nothing.
    fn mutate<T>(&self, op: impl FnOnce(&mut Vec<Trip>) -> Result<T, TripError>) -> Result<T, TripError> {
        let mut inner = self.inner.write();
        if inner.readiness != Readiness::Ready {
            return Err(TripError::NotReady);
        }
        let out = op(&mut inner.trips)?;
        match serde_json::to_string(&inner.trips) {
            Ok(raw) => {
                if self.writer.send(SlotWrite::Save(raw)).is_err() {
                    warn!("⚠️ Slot writer has stopped, trips not saved");
                }
            }
            Err(e) => warn!("⚠️ Failed to serialize trips: {}", e),
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{MemorySlot, SlotError};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    /// Records every write and can be switched to fail reads or writes.
    #[derive(Default)]
    struct RecordingSlot {
        initial: Option<String>,
        writes: Mutex<Vec<String>>,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl KeyValueSlot for RecordingSlot {
        fn get(&self, key: &str) -> Result<Option<String>, SlotError> {
            if self.fail_reads {
                return Err(SlotError::Io {
                    key: key.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "storage unavailable"),
                });
            }
            Ok(self.initial.clone())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), SlotError> {
            if self.fail_writes {
                return Err(SlotError::Io {
                    key: key.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "quota exceeded"),
                });
            }
            self.writes.lock().push(value.to_string());
            Ok(())
        }
    }

    fn ready_store() -> (TripStore, Arc<MemorySlot>) {
        let slot = Arc::new(MemorySlot::default());
        let store = TripStore::new(slot.clone());
        store.load();
        (store, slot)
    }

    fn stored(slot: &MemorySlot) -> Vec<Trip> {
        serde_json::from_str(&slot.get(STORAGE_KEY).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn add_assigns_id_placeholder_and_empty_activities() {
        let (store, _) = ready_store();
        let trip = store.add(TripDraft::named("Rome Trip", &["Rome"])).unwrap();
        assert!(!trip.id.is_empty());
        assert!(trip.image_url.as_deref().unwrap().contains("Rome%20Trip"));
        assert!(trip.activities.is_empty());
        assert_eq!(store.get_by_id(&trip.id), Some(trip));
    }

    #[tokio::test]
    async fn add_keeps_given_image_and_appends_in_order() {
        let (store, slot) = ready_store();
        let mut draft = TripDraft::named("Kyoto", &["Kyoto"]);
        draft.image_url = Some("https://example.com/kyoto.png".into());
        let first = store.add(draft).unwrap();
        let second = store.add(TripDraft::named("Oslo", &["Oslo"])).unwrap();
        assert_eq!(first.image_url.as_deref(), Some("https://example.com/kyoto.png"));
        assert_ne!(first.id, second.id);
        let names: Vec<_> = store.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Kyoto", "Oslo"]);
        store.flush().await;
        assert_eq!(stored(&slot), store.list());
    }

    #[tokio::test]
    async fn update_is_full_replace() {
        let (store, slot) = ready_store();
        let mut draft = TripDraft::named("Paris", &["Paris"]);
        draft.notes = Some("bring umbrella".into());
        let trip = store.add(draft).unwrap();

        let replacement = TripDraft::named("Paris & Lyon", &["Paris", "Lyon"]).into_trip(trip.id.clone(), None);
        store.update(replacement.clone()).unwrap();

        let got = store.get_by_id(&trip.id).unwrap();
        assert_eq!(got, replacement);
        assert_eq!(got.notes, None);
        assert_eq!(got.image_url, None);
        store.flush().await;
        assert_eq!(stored(&slot), vec![replacement]);
    }

    #[tokio::test]
    async fn unknown_ids_are_reported_and_change_nothing() {
        let slot = Arc::new(RecordingSlot::default());
        let store = TripStore::new(slot.clone());
        store.load();
        store.add(TripDraft::named("Rome Trip", &["Rome"])).unwrap();
        store.flush().await;
        let writes_before = slot.writes.lock().len();

        let ghost = TripDraft::named("Ghost", &["Nowhere"]).into_trip("missing".into(), None);
        assert!(matches!(store.update(ghost), Err(TripError::NotFound(id)) if id == "missing"));
        assert!(matches!(store.delete("missing"), Err(TripError::NotFound(_))));
        assert!(matches!(store.set_ai_summary("missing", "x".into()), Err(TripError::NotFound(_))));

        assert_eq!(store.list().len(), 1);
        store.flush().await;
        assert_eq!(slot.writes.lock().len(), writes_before);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one() {
        let (store, slot) = ready_store();
        let a = store.add(TripDraft::named("Rome Trip", &["Rome"])).unwrap();
        let b = store.add(TripDraft::named("Oslo Trip", &["Oslo"])).unwrap();
        let removed = store.delete(&a.id).unwrap();
        assert_eq!(removed, a);
        assert_eq!(store.get_by_id(&a.id), None);
        assert_eq!(store.list(), vec![b.clone()]);
        store.flush().await;
        assert_eq!(stored(&slot), vec![b]);
    }

    #[test]
    fn set_ai_summary_patches_only_summary() {
        let (store, _) = ready_store();
        let mut draft = TripDraft::named("Paris", &["Paris"]);
        draft.activities = Some(vec!["Louvre".into()]);
        draft.start_date = Some("2024-06-05".into());
        let before = store.add(draft).unwrap();

        let after = store.set_ai_summary(&before.id, "A wonderful Paris trip.".into()).unwrap();
        assert_eq!(after.ai_summary.as_deref(), Some("A wonderful Paris trip."));
        assert_eq!(Trip { ai_summary: None, ..after }, before);
    }

    #[tokio::test]
    async fn nothing_is_read_or_written_before_load() {
        let slot = Arc::new(RecordingSlot {
            initial: Some(r#"[{"id":"a","name":"Lisbon","destinations":["Lisbon"]}]"#.into()),
            ..Default::default()
        });
        let store = TripStore::new(slot.clone());
        assert_eq!(store.readiness(), Readiness::Uninitialized);
        assert!(store.list().is_empty());
        assert_eq!(store.get_by_id("a"), None);
        assert!(matches!(store.add(TripDraft::named("Rome Trip", &["Rome"])), Err(TripError::NotReady)));
        assert!(matches!(store.delete("a"), Err(TripError::NotReady)));
        store.flush().await;
        assert!(slot.writes.lock().is_empty());

        store.load();
        assert!(store.is_ready());
        assert_eq!(store.list().len(), 1);
        store.flush().await;
        assert!(slot.writes.lock().is_empty());
    }

    #[test]
    fn load_happens_once() {
        let slot = Arc::new(MemorySlot::default());
        let store = TripStore::new(slot.clone());
        store.load();
        store.add(TripDraft::named("Rome Trip", &["Rome"])).unwrap();
        slot.set(STORAGE_KEY, "[]").unwrap();
        store.load();
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn unparsable_slot_is_a_cold_start() {
        let slot = Arc::new(MemorySlot::with_value(STORAGE_KEY, "{not json"));
        let store = TripStore::new(slot);
        store.load();
        assert!(store.is_ready());
        assert!(store.list().is_empty());
    }

    #[test]
    fn failed_read_is_a_cold_start() {
        let slot = Arc::new(RecordingSlot {
            initial: Some(r#"[{"id":"a","name":"Lisbon"}]"#.into()),
            fail_reads: true,
            ..Default::default()
        });
        let store = TripStore::new(slot);
        store.load();
        assert!(store.is_ready());
        assert!(store.list().is_empty());
        assert!(store.add(TripDraft::named("Rome Trip", &["Rome"])).is_ok());
    }

    #[tokio::test]
    async fn failed_writes_keep_in_memory_state() {
        let slot = Arc::new(RecordingSlot { fail_writes: true, ..Default::default() });
        let store = TripStore::new(slot.clone());
        store.load();
        let trip = store.add(TripDraft::named("Rome Trip", &["Rome"])).unwrap();
        store.flush().await;
        assert!(slot.writes.lock().is_empty());
        assert_eq!(store.get_by_id(&trip.id), Some(trip));
    }

    #[tokio::test]
    async fn mutations_do_not_wait_for_the_slot() {
        /// Holds every write until released.
        struct GatedSlot {
            gate: Mutex<()>,
            writes: Mutex<usize>,
        }

        impl KeyValueSlot for GatedSlot {
            fn get(&self, _key: &str) -> Result<Option<String>, SlotError> {
                Ok(None)
            }

            fn set(&self, _key: &str, _value: &str) -> Result<(), SlotError> {
                let _open = self.gate.lock();
                *self.writes.lock() += 1;
                Ok(())
            }
        }

        let slot = Arc::new(GatedSlot { gate: Mutex::new(()), writes: Mutex::new(0) });
        let store = TripStore::new(slot.clone());
        store.load();

        let closed = slot.gate.lock();
        let trip = store.add(TripDraft::named("Rome Trip", &["Rome"])).unwrap();
        assert_eq!(store.get_by_id(&trip.id), Some(trip.clone()));
        store.delete(&trip.id).unwrap();
        assert_eq!(*slot.writes.lock(), 0);
        drop(closed);

        store.flush().await;
        assert_eq!(*slot.writes.lock(), 2);
    }

    #[tokio::test]
    async fn writes_follow_mutation_order() {
        let slot = Arc::new(RecordingSlot::default());
        let store = TripStore::new(slot.clone());
        store.load();
        let trip = store.add(TripDraft::named("Rome Trip", &["Rome"])).unwrap();
        store.set_ai_summary(&trip.id, "sunny".into()).unwrap();
        store.delete(&trip.id).unwrap();
        store.flush().await;

        let writes = slot.writes.lock();
        assert_eq!(writes.len(), 3);
        assert!(!writes[0].contains("aiSummary"));
        assert!(writes[1].contains(r#""aiSummary":"sunny""#));
        assert_eq!(writes[2], "[]");
    }

    #[test]
    fn collection_round_trips_through_json() {
        let (store, _) = ready_store();
        let mut draft = TripDraft::named("Paris", &["Paris", "Nice"]);
        draft.start_date = Some("2024-06-05T00:00:00.000Z".into());
        draft.notes = Some("Great trip".into());
        draft.budget = Some("moderate".into());
        let trip = store.add(draft).unwrap();
        store.set_ai_summary(&trip.id, "Lovely.".into()).unwrap();
        store.add(TripDraft::named("Oslo", &["Oslo"])).unwrap();

        let trips = store.list();
        let raw = serde_json::to_string(&trips).unwrap();
        let back: Vec<Trip> = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, trips);
    }
}
