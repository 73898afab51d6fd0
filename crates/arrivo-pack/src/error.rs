//! Errors for the record layer.

use thiserror::Error;

use arrivo_core::{AttemptId, EntryInfoId, EntryPackId, SnapshotId, StateTransitionError};

/// Errors from pack, snapshot, and store operations.
#[derive(Error, Debug)]
pub enum PackError {
    #[error("entry info {0} not found")]
    EntryInfoNotFound(EntryInfoId),

    #[error("entry pack {0} not found")]
    PackNotFound(EntryPackId),

    #[error("snapshot {0} not found")]
    SnapshotNotFound(SnapshotId),

    /// Only terminal-success attempts may enter a pack's history.
    #[error("attempt {0} is not a successful submission")]
    AttemptNotSuccessful(AttemptId),

    /// Refused status transition; all records left unchanged.
    #[error(transparent)]
    State(#[from] StateTransitionError),

    /// Filesystem failure that is fatal to the operation (photo-copy
    /// failures are not — those degrade into manifest placeholders).
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),
}
