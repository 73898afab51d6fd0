//! # Status Change Events
//!
//! Synchronous fan-out of committed status transitions. The lifecycle
//! manager emits one [`StatusChange`] per committed transition, after the
//! audit event is written; notification surfaces (badges, reminders,
//! resubmission prompts) subscribe here instead of polling the stores.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use arrivo_core::{EntryInfoId, EntryPackId, Timestamp};
use arrivo_pack::EntryStatus;

/// One committed entry status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub entry_info_id: EntryInfoId,
    /// Absent for pre-pack transitions (`incomplete -> ready`).
    pub entry_pack_id: Option<EntryPackId>,
    pub from: EntryStatus,
    pub to: EntryStatus,
    pub at: Timestamp,
}

/// Handler invoked synchronously after a transition commits.
pub type StatusChangeHandler = Box<dyn Fn(&StatusChange) + Send + Sync>;

/// Opaque handle for dropping a [`StatusEvents`] subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventToken(pub u64);

/// Subscription registry for status transitions.
///
/// Handlers run on the thread that committed the transition, while no
/// store locks are held. A handler that needs to do real work should hand
/// off to its own executor.
#[derive(Default)]
pub struct StatusEvents {
    handlers: RwLock<HashMap<u64, StatusChangeHandler>>,
    next_token: RwLock<u64>,
}

impl StatusEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: StatusChangeHandler) -> EventToken {
        let mut next = self.next_token.write();
        let token = *next;
        *next += 1;
        self.handlers.write().insert(token, handler);
        EventToken(token)
    }

    /// Drop a subscription. Unknown tokens are ignored.
    pub fn unsubscribe(&self, token: EventToken) {
        self.handlers.write().remove(&token.0);
    }

    /// Deliver one transition to every subscriber, in no particular order.
    pub fn emit(&self, change: &StatusChange) {
        tracing::debug!(
            entry = %change.entry_info_id,
            from = %change.from,
            to = %change.to,
            "status change emitted"
        );
        for handler in self.handlers.read().values() {
            handler(change);
        }
    }
}
