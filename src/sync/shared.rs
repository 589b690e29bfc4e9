use super::connectivity::Connectivity;
use super::merge::{merge, DisplayCounters};
use super::pending::PendingLedger;
use crate::models::Counters;
use std::{
    io,
    sync::{Arc, PoisonError, RwLock},
};
use tokio::sync::Notify;

/// Client-side state shared by the controller and the reconciler.
pub struct ClientState {
    pending: PendingLedger,
    counters: RwLock<Option<Counters>>,
    session: RwLock<Option<String>>,
    taps: Notify,
    connectivity: Arc<Connectivity>,
}

impl ClientState {
    pub fn new(pending: PendingLedger) -> Self {
        Self {
            pending,
            counters: RwLock::new(None),
            session: RwLock::new(None),
            taps: Notify::new(),
            connectivity: Arc::new(Connectivity::new(true)),
        }
    }

    pub fn pending(&self) -> u64 {
        self.pending.get()
    }

    /// Persists one tap and wakes anything waiting on tap activity.
    pub fn record_tap(&self) -> io::Result<u64> {
        let amount = self.pending.increment()?;
        self.taps.notify_one();
        Ok(amount)
    }

    /// Installs counters the server returned for a flush of `sent` taps and
    /// removes those taps from pending in the same step. Readers of
    /// [`display`](Self::display) never see one without the other.
    pub fn apply_confirmed(&self, counters: Counters, sent: u64) -> io::Result<u64> {
        let mut mirrored = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        *mirrored = Some(counters);
        self.pending.settle(sent)
    }

    pub fn counters(&self) -> Option<Counters> {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_counters(&self, counters: Counters) {
        *self.counters.write().unwrap_or_else(PoisonError::into_inner) = Some(counters);
    }

    pub fn clear_counters(&self) {
        *self.counters.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Merged view, or `None` until authoritative counters have been loaded.
    pub fn display(&self) -> Option<DisplayCounters> {
        let mirrored = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        mirrored
            .as_ref()
            .map(|counters| merge(counters, self.pending()))
    }

    pub fn session(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_session(&self, session: String) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn take_session(&self) -> Option<String> {
        self.session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Drops `rejected` if it is still the installed session. A session
    /// installed while the rejected request was in flight is kept.
    pub fn invalidate_session(&self, rejected: &str) -> bool {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if session.as_deref() == Some(rejected) {
            *session = None;
            return true;
        }
        false
    }

    pub fn tap_signal(&self) -> &Notify {
        &self.taps
    }

    pub fn connectivity(&self) -> &Arc<Connectivity> {
        &self.connectivity
    }
}
