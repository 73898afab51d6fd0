//! # arrivo-pack — Durable entry-pack records
//!
//! The data layer under the lifecycle engine:
//!
//! - [`entry`] — the mutable [`EntryInfo`] preparation record and the
//!   [`EntryStatus`] transition rules.
//! - [`pack`] — the [`EntryPack`] aggregate binding one entry to its
//!   append-only submission history.
//! - [`snapshot`] — write-once [`EntryPackSnapshot`]s plus the
//!   [`SnapshotService`] that freezes traveler data and copies fund-photo
//!   files into pack-scoped storage.
//! - [`diff`] — the pure [`calculate_diff`] comparison used to detect
//!   drift between a snapshot and live data.
//! - [`audit`] — the append-only [`AuditLog`].
//! - [`store`] — store traits with in-memory implementations; persistence
//!   backends live outside this workspace.

pub mod audit;
pub mod diff;
pub mod entry;
pub mod error;
pub mod pack;
pub mod snapshot;
pub mod store;

pub use audit::{AuditEvent, AuditEventType, AuditLog, AuditSubject};
pub use diff::{calculate_diff, ChangeType, DataDiff, FieldChange};
pub use entry::{EntryInfo, EntryStatus, FundPhotoRef};
pub use error::PackError;
pub use pack::EntryPack;
pub use snapshot::{
    EntryPackSnapshot, PhotoCopyStatus, PhotoManifestEntry, SnapshotReason, SnapshotService,
};
pub use store::{
    DataChangedHandler, EntryInfoStore, EntryPackStore, InMemoryEntryInfoStore,
    InMemoryEntryPackStore, InMemoryProfileStore, InMemorySnapshotStore, ProfileStore,
    SnapshotStore, SubscriptionToken,
};
