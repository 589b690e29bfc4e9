pub mod connectivity;
pub mod controller;
pub mod error;
pub mod merge;
pub mod pending;
pub mod remote;
pub mod scheduler;
pub mod shared;

#[cfg(test)]
pub(crate) mod fake;

pub use connectivity::{probe_loop, Connectivity};
pub use controller::{CounterController, LoadState};
pub use error::SyncError;
pub use merge::{merge, progress, DisplayCounters};
pub use pending::{FilePendingStore, MemoryPendingStore, PendingLedger, PendingStore};
pub use remote::{CounterRemote, HttpRemote};
pub use scheduler::{Reconciler, SyncOutcome, TriggerPolicy};
pub use shared::ClientState;
