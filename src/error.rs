// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::RecordId;
use thiserror::Error;

/// Failures reported by the remote-store collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    /// Network, rate limit, and other retriable conditions. Never retried
    /// automatically; the user re-triggers the action.
    #[error("transient remote failure: {0}")]
    Transient(String),
    /// Stale id on the remote side. Benign for delete, upsert for update.
    #[error("'{0}' not found on remote")]
    NotFound(String),
}

/// Failures surfaced to the caller of a session operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("remote write failed for '{record_id}': {source}")]
    Remote {
        record_id: RecordId,
        #[source]
        source: RemoteError,
    },
    /// Undo arrived after the grace window finalized the delete.
    #[error("undo window closed for '{0}'")]
    UndoWindowClosed(RecordId),
    /// The record has no remote-assigned id yet and cannot be addressed.
    #[error("record has no remote-assigned id yet")]
    Unaddressable,
}
