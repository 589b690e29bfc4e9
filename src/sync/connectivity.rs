use super::remote::CounterRemote;
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, time::MissedTickBehavior};
use tracing::info;

/// Last known reachability of the server, published to whoever listens for
/// the offline to online transition.
#[derive(Debug)]
pub struct Connectivity {
    tx: watch::Sender<bool>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Records an observation. Returns true only when it flips offline to online.
    pub fn report(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        match (changed, online) {
            (true, true) => info!("server reachable again"),
            (true, false) => info!("server unreachable, taps will queue locally"),
            _ => {}
        }
        changed && online
    }
}

/// Pings the server every `every` and feeds the result into `connectivity`.
pub async fn probe_loop<R: CounterRemote>(
    remote: Arc<R>,
    connectivity: Arc<Connectivity>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let online = remote.probe().await;
                connectivity.report(online);
            }
            _ = shutdown.changed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_offline_to_online_counts_as_coming_back() {
        let connectivity = Connectivity::new(true);
        assert!(!connectivity.report(true));
        assert!(!connectivity.report(false));
        assert!(!connectivity.is_online());
        assert!(connectivity.report(true));
        assert!(connectivity.is_online());
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let connectivity = Connectivity::new(false);
        let mut rx = connectivity.subscribe();
        connectivity.report(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }
}
