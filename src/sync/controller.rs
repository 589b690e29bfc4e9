use super::error::SyncError;
use super::merge::{merge, DisplayCounters};
use super::remote::CounterRemote;
use super::shared::ClientState;
use crate::models::TargetsRequest;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub enum LoadState {
    Ready(DisplayCounters),
    /// No valid session; the caller should route to sign-in.
    Unauthenticated,
    /// The server could not be reached. Carries the last known view, if any.
    Offline {
        last_known: Option<DisplayCounters>,
        error: SyncError,
    },
}

/// Entry point for user actions. Taps never wait on the network; flushing
/// them is the reconciler's job.
pub struct CounterController<R> {
    remote: Arc<R>,
    state: Arc<ClientState>,
}

impl<R: CounterRemote> CounterController<R> {
    pub fn new(remote: Arc<R>, state: Arc<ClientState>) -> Self {
        Self { remote, state }
    }

    pub fn state(&self) -> &Arc<ClientState> {
        &self.state
    }

    pub async fn on_load(&self) -> LoadState {
        let pending = self.state.pending();
        let Some(session) = self.state.session() else {
            return LoadState::Unauthenticated;
        };

        match self.remote.fetch_counters(&session).await {
            Ok(counters) => {
                self.state.connectivity().report(true);
                let display = merge(&counters, self.state.pending());
                self.state.set_counters(counters);
                info!(pending, "counters loaded");
                LoadState::Ready(display)
            }
            Err(SyncError::Unauthenticated) => {
                self.state.invalidate_session(&session);
                self.state.clear_counters();
                LoadState::Unauthenticated
            }
            Err(error) => {
                if matches!(error, SyncError::Offline(_)) {
                    self.state.connectivity().report(false);
                }
                warn!(pending, "failed to load counters: {error}");
                LoadState::Offline {
                    last_known: self.state.display(),
                    error,
                }
            }
        }
    }

    /// Records one tap durably before returning. The view is `None` until
    /// counters have been loaded at least once.
    pub fn on_tap(&self) -> Result<Option<DisplayCounters>, SyncError> {
        self.state.record_tap()?;
        Ok(self.state.display())
    }

    pub async fn on_settings_save(
        &self,
        daily_target: u64,
        final_target: u64,
    ) -> Result<DisplayCounters, SyncError> {
        if daily_target == 0 || final_target == 0 {
            return Err(SyncError::InvalidInput("targets must be positive"));
        }
        let session = self.state.session().ok_or(SyncError::Unauthenticated)?;

        let targets = TargetsRequest {
            daily_target,
            final_target,
        };
        match self.remote.update_targets(&session, targets).await {
            Ok(counters) => {
                let display = merge(&counters, self.state.pending());
                self.state.set_counters(counters);
                info!(daily_target, final_target, "targets updated");
                Ok(display)
            }
            Err(SyncError::Unauthenticated) => {
                self.state.invalidate_session(&session);
                Err(SyncError::Unauthenticated)
            }
            Err(err) => Err(err),
        }
    }

    /// Installs a fresh session and loads against it. Pending taps recorded
    /// while signed out are flushed by the next reconciliation.
    pub async fn sign_in(&self, session: String) -> LoadState {
        self.state.set_session(session);
        self.on_load().await
    }

    /// Forgets the session and the mirrored counters. Pending taps stay on disk.
    pub fn sign_out(&self) -> Option<String> {
        self.state.clear_counters();
        self.state.take_session()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Counters;
    use crate::sync::fake::FakeRemote;
    use crate::sync::pending::{MemoryPendingStore, PendingLedger};

    fn build(pending: u64, remote: FakeRemote) -> (Arc<FakeRemote>, CounterController<FakeRemote>) {
        let remote = Arc::new(remote);
        let ledger = PendingLedger::new(MemoryPendingStore::new(pending));
        let state = Arc::new(ClientState::new(ledger));
        (Arc::clone(&remote), CounterController::new(remote, state))
    }

    fn seeded() -> FakeRemote {
        FakeRemote::with_counters(Counters {
            daily_count: 10,
            total_count: 500,
            last_active_date: "2026-03-10".to_string(),
            daily_target: 100,
            final_target: 1000,
        })
    }

    #[tokio::test]
    async fn load_without_session_does_not_fabricate_counters() {
        let (remote, controller) = build(0, seeded());
        assert!(matches!(controller.on_load().await, LoadState::Unauthenticated));
        assert_eq!(remote.fetch_calls(), 0);
        assert!(controller.state().counters().is_none());
    }

    #[tokio::test]
    async fn load_merges_pending_taps() {
        let (_, controller) = build(2, seeded());
        let LoadState::Ready(display) = controller.sign_in(FakeRemote::SESSION.to_string()).await
        else {
            panic!("expected counters");
        };
        assert_eq!(display.daily, 12);
        assert_eq!(display.total, 502);
        assert!(!display.is_synced());
    }

    #[tokio::test]
    async fn rejected_session_on_load_routes_to_sign_in() {
        let (_, controller) = build(3, seeded());
        let load = controller.sign_in("expired".to_string()).await;
        assert!(matches!(load, LoadState::Unauthenticated));
        assert!(controller.state().session().is_none());
        assert_eq!(controller.state().pending(), 3);
    }

    #[tokio::test]
    async fn offline_load_keeps_last_known_view() {
        let (remote, controller) = build(0, seeded());
        controller.sign_in(FakeRemote::SESSION.to_string()).await;
        remote.fail_next(SyncError::Offline("timed out".to_string()));

        let LoadState::Offline { last_known, .. } = controller.on_load().await else {
            panic!("expected offline state");
        };
        assert_eq!(last_known.unwrap().total, 500);
        assert!(!controller.state().connectivity().is_online());
    }

    #[tokio::test]
    async fn tap_is_local_and_immediate() {
        let (remote, controller) = build(0, seeded());
        controller.sign_in(FakeRemote::SESSION.to_string()).await;

        let display = controller.on_tap().unwrap().unwrap();
        assert_eq!(display.daily, 11);
        assert_eq!(display.total, 501);
        assert_eq!(display.pending, 1);
        assert_eq!(remote.apply_calls(), 0);
    }

    #[tokio::test]
    async fn tap_before_load_is_still_recorded() {
        let (_, controller) = build(0, seeded());
        assert!(controller.on_tap().unwrap().is_none());
        assert_eq!(controller.state().pending(), 1);
    }

    #[tokio::test]
    async fn settings_reject_non_positive_targets_before_io() {
        let (remote, controller) = build(0, seeded());
        controller.sign_in(FakeRemote::SESSION.to_string()).await;

        let err = controller.on_settings_save(0, 50).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidInput(_)));
        assert_eq!(remote.counters().final_target, 1000);

        let display = controller.on_settings_save(108, 100_000).await.unwrap();
        assert_eq!(display.daily_target, 108);
        assert_eq!(display.final_target, 100_000);
        assert_eq!(remote.counters().daily_target, 108);
    }

    #[tokio::test]
    async fn sign_out_keeps_pending() {
        let (_, controller) = build(0, seeded());
        controller.sign_in(FakeRemote::SESSION.to_string()).await;
        controller.on_tap().unwrap();

        assert_eq!(controller.sign_out().as_deref(), Some(FakeRemote::SESSION));
        assert!(controller.state().display().is_none());
        assert_eq!(controller.state().pending(), 1);
    }
}
