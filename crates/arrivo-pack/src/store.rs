//! # Stores
//!
//! Trait seams over the durable records, with in-memory implementations.
//! Real persistence (encrypted local storage) is an external collaborator;
//! everything in this workspace talks through these traits so the engine
//! runs against test doubles and whatever backend the host app wires in.
//!
//! Relation invariants (pack → entry info, snapshot → pack) are enforced by
//! the owning services, which always load the parent before writing the
//! child.

use std::collections::HashMap;

use parking_lot::RwLock;

use arrivo_core::{DestinationId, EntryInfoId, EntryPackId, SnapshotId, TravelerPayload, UserId};

use crate::entry::EntryInfo;
use crate::pack::EntryPack;
use crate::snapshot::EntryPackSnapshot;

/// Durable storage of entry preparation records, keyed by id.
pub trait EntryInfoStore: Send + Sync {
    fn get(&self, id: EntryInfoId) -> Option<EntryInfo>;
    fn upsert(&self, entry: EntryInfo);
    fn list(&self) -> Vec<EntryInfo>;
}

/// Durable storage of entry packs, keyed by id, with the pack→entry
/// relation queryable in both directions.
pub trait EntryPackStore: Send + Sync {
    fn get(&self, id: EntryPackId) -> Option<EntryPack>;
    fn find_by_entry(&self, entry_info_id: EntryInfoId) -> Option<EntryPack>;
    fn upsert(&self, pack: EntryPack);
    fn list(&self) -> Vec<EntryPack>;
}

/// Durable storage of snapshots, keyed by id.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, id: SnapshotId) -> Option<EntryPackSnapshot>;
    fn insert(&self, snapshot: EntryPackSnapshot);
    /// Remove and return the record. Part of whole-unit snapshot deletion.
    fn remove(&self, id: SnapshotId) -> Option<EntryPackSnapshot>;
    /// Most recent snapshot for a pack, by creation time.
    fn latest_for_pack(&self, pack_id: EntryPackId) -> Option<EntryPackSnapshot>;
    /// How many snapshots a pack has accumulated (drives versioning).
    fn count_for_pack(&self, pack_id: EntryPackId) -> u32;
}

/// Handler invoked synchronously with the mutated payload.
pub type DataChangedHandler = Box<dyn Fn(&TravelerPayload) + Send + Sync>;

/// Opaque handle returned by [`ProfileStore::on_data_changed`]; pass it
/// back to [`ProfileStore::unsubscribe`] to stop receiving notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(pub u64);

/// The external profile store, as this core consumes it: the source of
/// submission-ready payloads and of data-mutation notifications.
pub trait ProfileStore: Send + Sync {
    /// The live traveler payload for one (user, destination) pair.
    fn traveler_payload(
        &self,
        user_id: UserId,
        destination_id: DestinationId,
    ) -> Option<TravelerPayload>;

    /// Subscribe to data mutations. Handlers run synchronously with a
    /// snapshot of the changed payload.
    fn on_data_changed(&self, handler: DataChangedHandler) -> SubscriptionToken;

    /// Drop a subscription. Unknown tokens are ignored.
    fn unsubscribe(&self, token: SubscriptionToken);
}

// ── In-memory implementations ────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryEntryInfoStore {
    records: RwLock<HashMap<EntryInfoId, EntryInfo>>,
}

impl InMemoryEntryInfoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntryInfoStore for InMemoryEntryInfoStore {
    fn get(&self, id: EntryInfoId) -> Option<EntryInfo> {
        self.records.read().get(&id).cloned()
    }

    fn upsert(&self, entry: EntryInfo) {
        self.records.write().insert(entry.entry_info_id, entry);
    }

    fn list(&self) -> Vec<EntryInfo> {
        self.records.read().values().cloned().collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEntryPackStore {
    records: RwLock<HashMap<EntryPackId, EntryPack>>,
}

impl InMemoryEntryPackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntryPackStore for InMemoryEntryPackStore {
    fn get(&self, id: EntryPackId) -> Option<EntryPack> {
        self.records.read().get(&id).cloned()
    }

    fn find_by_entry(&self, entry_info_id: EntryInfoId) -> Option<EntryPack> {
        self.records
            .read()
            .values()
            .find(|p| p.entry_info_id == entry_info_id)
            .cloned()
    }

    fn upsert(&self, pack: EntryPack) {
        self.records.write().insert(pack.entry_pack_id, pack);
    }

    fn list(&self) -> Vec<EntryPack> {
        self.records.read().values().cloned().collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    records: RwLock<HashMap<SnapshotId, EntryPackSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn get(&self, id: SnapshotId) -> Option<EntryPackSnapshot> {
        self.records.read().get(&id).cloned()
    }

    fn insert(&self, snapshot: EntryPackSnapshot) {
        self.records.write().insert(snapshot.snapshot_id, snapshot);
    }

    fn remove(&self, id: SnapshotId) -> Option<EntryPackSnapshot> {
        self.records.write().remove(&id)
    }

    fn latest_for_pack(&self, pack_id: EntryPackId) -> Option<EntryPackSnapshot> {
        self.records
            .read()
            .values()
            .filter(|s| s.entry_pack_id == pack_id)
            .max_by_key(|s| s.created_at)
            .cloned()
    }

    fn count_for_pack(&self, pack_id: EntryPackId) -> u32 {
        self.records
            .read()
            .values()
            .filter(|s| s.entry_pack_id == pack_id)
            .count() as u32
    }
}

/// In-memory profile store, primarily a test double for the drift monitor
/// and snapshot service.
#[derive(Default)]
pub struct InMemoryProfileStore {
    payloads: RwLock<HashMap<(UserId, DestinationId), TravelerPayload>>,
    handlers: RwLock<HashMap<u64, DataChangedHandler>>,
    next_token: RwLock<u64>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload and notify subscribers, the way the real profile
    /// store does on every data mutation.
    pub fn put(&self, payload: TravelerPayload) {
        self.payloads
            .write()
            .insert((payload.user_id, payload.destination_id), payload.clone());
        // Handlers run outside the payload lock; they may read back.
        for handler in self.handlers.read().values() {
            handler(&payload);
        }
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn traveler_payload(
        &self,
        user_id: UserId,
        destination_id: DestinationId,
    ) -> Option<TravelerPayload> {
        self.payloads.read().get(&(user_id, destination_id)).cloned()
    }

    fn on_data_changed(&self, handler: DataChangedHandler) -> SubscriptionToken {
        let mut next = self.next_token.write();
        let token = *next;
        *next += 1;
        self.handlers.write().insert(token, handler);
        SubscriptionToken(token)
    }

    fn unsubscribe(&self, token: SubscriptionToken) {
        self.handlers.write().remove(&token.0);
    }
}
