//! Trust record persistence
//!
//! ```text
//! TrustLedger ──publish──► PersistTrigger ──notify──► SnapshotWriter ──► SnapshotStore
//!                                                     (debounced)        (atomic JSON files)
//! ```
//!
//! Snapshots are loaded once at startup before any event is handled.

mod snapshot;
mod writer;

pub use snapshot::SnapshotStore;
pub use writer::{PersistTrigger, SnapshotWriter};
