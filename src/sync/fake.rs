use super::error::SyncError;
use super::remote::CounterRemote;
use crate::models::{Counters, TargetsRequest};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tokio::sync::{Notify, Semaphore};

/// In-process stand-in for the server, with hooks to fail, revoke and hold
/// requests in flight.
#[derive(Default)]
pub struct FakeRemote {
    counters: Mutex<Counters>,
    failures: Mutex<VecDeque<SyncError>>,
    revoked: AtomicBool,
    gate: Option<Arc<Semaphore>>,
    entered: Notify,
    apply_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl FakeRemote {
    pub const SESSION: &'static str = "session-1";

    /// Every `apply_delta` waits for a matching [`FakeRemote::release`].
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn with_counters(counters: Counters) -> Self {
        Self {
            counters: Mutex::new(counters),
            ..Self::default()
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn fail_next(&self, err: SyncError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn revoke_sessions(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    pub fn restore_sessions(&self) {
        self.revoked.store(false, Ordering::SeqCst);
    }

    pub fn counters(&self) -> Counters {
        self.counters.lock().unwrap().clone()
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub async fn wait_for_call(&self) {
        self.entered.notified().await;
    }

    fn check(&self, session: &str) -> Result<(), SyncError> {
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        if self.revoked.load(Ordering::SeqCst) || session != Self::SESSION {
            return Err(SyncError::Unauthenticated);
        }
        Ok(())
    }
}

impl CounterRemote for FakeRemote {
    async fn fetch_counters(&self, session: &str) -> Result<Counters, SyncError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check(session)?;
        Ok(self.counters())
    }

    async fn apply_delta(&self, session: &str, delta: u64) -> Result<Counters, SyncError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(gate) = self.gate.clone() {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.check(session)?;

        let mut counters = self.counters.lock().unwrap();
        counters.daily_count += delta;
        counters.total_count += delta;
        Ok(counters.clone())
    }

    async fn update_targets(
        &self,
        session: &str,
        targets: TargetsRequest,
    ) -> Result<Counters, SyncError> {
        self.check(session)?;
        let mut counters = self.counters.lock().unwrap();
        counters.daily_target = targets.daily_target;
        counters.final_target = targets.final_target;
        Ok(counters.clone())
    }

    async fn probe(&self) -> bool {
        true
    }
}
