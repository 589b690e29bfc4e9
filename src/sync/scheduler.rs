//! Flushes pending taps to the server.
//!
//! Attempts are fired by a fixed interval, by the server becoming reachable
//! again and, under [`TriggerPolicy::Debounced`], by a quiet window after the
//! last tap. At most one attempt is in flight; triggers that fire meanwhile
//! are dropped.

use super::error::SyncError;
use super::remote::CounterRemote;
use super::shared::ClientState;
use std::{
    future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::watch,
    time::{sleep_until, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPolicy {
    /// Flush only on the interval and on reconnect.
    Interval,
    /// Also flush once taps have been quiet for the given window.
    Debounced(Duration),
}

impl TriggerPolicy {
    fn debounce_window(self) -> Option<Duration> {
        match self {
            TriggerPolicy::Interval => None,
            TriggerPolicy::Debounced(window) => Some(window),
        }
    }
}

#[derive(Debug)]
pub enum SyncOutcome {
    /// Another attempt was already in flight.
    Busy,
    /// Nothing pending; no request was made.
    Empty,
    /// No session installed; waiting for a sign-in.
    NoSession,
    Synced { sent: u64, remaining: u64 },
    /// The server rejected the session. It has been dropped and pending taps kept.
    Unauthenticated,
    Failed(SyncError),
}

/// Clears the in-flight flag when dropped, including when the attempt's
/// future is dropped mid-request.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Reconciler<R> {
    remote: Arc<R>,
    state: Arc<ClientState>,
    in_flight: AtomicBool,
}

impl<R: CounterRemote> Reconciler<R> {
    pub fn new(remote: Arc<R>, state: Arc<ClientState>) -> Self {
        Self {
            remote,
            state,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// One reconciliation attempt. Subtracts exactly what the server
    /// confirmed, so taps recorded while the request was out survive.
    pub async fn attempt(&self) -> SyncOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("sync attempt already in flight");
            return SyncOutcome::Busy;
        };

        let sent = self.state.pending();
        if sent == 0 {
            return SyncOutcome::Empty;
        }
        let Some(session) = self.state.session() else {
            debug!(pending = sent, "no session, holding pending taps");
            return SyncOutcome::NoSession;
        };

        match self.remote.apply_delta(&session, sent).await {
            Ok(counters) => {
                self.state.connectivity().report(true);
                match self.state.apply_confirmed(counters, sent) {
                    Ok(remaining) => {
                        info!(sent, remaining, "pending taps synced");
                        SyncOutcome::Synced { sent, remaining }
                    }
                    Err(err) => SyncOutcome::Failed(SyncError::Storage(err)),
                }
            }
            Err(SyncError::Unauthenticated) => {
                if self.state.invalidate_session(&session) {
                    warn!(pending = sent, "session rejected, sync paused until sign-in");
                }
                SyncOutcome::Unauthenticated
            }
            Err(err) => {
                if matches!(err, SyncError::Offline(_)) {
                    self.state.connectivity().report(false);
                }
                warn!(pending = sent, "sync attempt failed: {err}");
                SyncOutcome::Failed(err)
            }
        }
    }

    /// Drives attempts until `shutdown` changes or its sender is dropped.
    /// Attempts run inline, so an in-flight request always finishes and
    /// settles before this returns.
    pub async fn run(
        self: Arc<Self>,
        policy: TriggerPolicy,
        every: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut online = self.state.connectivity().subscribe();
        let window = policy.debounce_window();
        let mut deadline: Option<Instant> = None;

        info!(?policy, every_secs = every.as_secs_f64(), "sync scheduler started");
        loop {
            let quiet = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = ticker.tick() => {}
                changed = online.changed() => {
                    if changed.is_err() || !*online.borrow_and_update() {
                        continue;
                    }
                    debug!("reconnected, flushing pending taps");
                }
                _ = self.state.tap_signal().notified(), if window.is_some() => {
                    deadline = window.map(|window| Instant::now() + window);
                    continue;
                }
                _ = quiet, if deadline.is_some() => {
                    deadline = None;
                }
                _ = shutdown.changed() => break,
            }

            self.attempt().await;
        }
        info!("sync scheduler stopped");
    }
}
