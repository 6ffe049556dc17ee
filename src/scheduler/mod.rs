//! Poll scheduler: periodic probing of every monitored address.

mod retention;

pub use retention::*;

use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::address::ServerAddress;
use crate::config::BindingSource;
use crate::db::{StatusObservation, Store};
use crate::probe::StatusProbe;

/// Cap on in-flight probes within one tick.
const MAX_CONCURRENT_PROBES: usize = 5;

/// Executes one poll cycle: snapshot the bindings, deduplicate the flagged
/// addresses, probe each at most once and record the outcome.
pub struct Poller {
    store: Arc<Store>,
    probe: StatusProbe,
    bindings: Arc<dyn BindingSource>,
    tick_lock: tokio::sync::Mutex<()>,
}

impl Poller {
    pub fn new(store: Arc<Store>, probe: StatusProbe, bindings: Arc<dyn BindingSource>) -> Self {
        Self {
            store,
            probe,
            bindings,
            tick_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one poll cycle. Never raises: every failure is logged and
    /// absorbed so the schedule continues. Single-flight; a call that
    /// arrives while a cycle is running returns immediately.
    pub async fn poll_once(&self) {
        let _guard = match self.tick_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("poll cycle still running, skipping");
                return;
            }
        };

        let addresses = self.bindings.snapshot().monitored_addresses();
        if addresses.is_empty() {
            tracing::debug!("no monitored servers this cycle");
            return;
        }
        tracing::debug!("polling {} server(s)", addresses.len());

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_PROBES));
        let mut tasks = JoinSet::new();
        for address in addresses {
            let probe = self.probe.clone();
            let store = self.store.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                probe_and_record(&probe, &store, address).await;
            });
        }

        // One address failing (even panicking) must not abort the rest.
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("probe task failed: {e}");
            }
        }
    }
}

async fn probe_and_record(probe: &StatusProbe, store: &Store, address: ServerAddress) {
    // Jitter so a large cycle doesn't fire every probe at the same instant.
    let jitter = rand::random::<u64>() % 100;
    tokio::time::sleep(Duration::from_millis(jitter)).await;

    let checked_at = Utc::now();
    let started = Instant::now();
    let observation = match probe.probe(&address).await {
        Ok(doc) => {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            StatusObservation::online(&address, checked_at, doc.online_count, elapsed_ms)
        }
        Err(e) => {
            tracing::debug!("probe failed for {address}: {e}");
            StatusObservation::offline(&address, checked_at, e.to_string())
        }
    };

    if let Err(e) = store.append(&observation) {
        tracing::error!("failed to record observation for {address}: {e}");
    }
}

/// Fixed-interval driver for the [`Poller`].
///
/// The loop awaits each cycle before sleeping again, so an overrunning
/// cycle delays the next tick rather than overlapping it.
pub struct PollScheduler {
    poller: Arc<Poller>,
    interval: Duration,
    stop: Mutex<Option<broadcast::Sender<()>>>,
}

impl PollScheduler {
    pub fn new(poller: Arc<Poller>, interval: Duration) -> Self {
        Self {
            poller,
            interval,
            stop: Mutex::new(None),
        }
    }

    /// Start the background polling task. The first cycle runs immediately.
    pub fn start(&self) {
        let (tx, mut rx) = broadcast::channel(1);
        *self.stop.lock().unwrap() = Some(tx);

        let poller = self.poller.clone();
        let period = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = rx.recv() => break,
                    _ = interval.tick() => poller.poll_once().await,
                }
            }
            tracing::info!("poll scheduler stopped");
        });
    }

    /// Signal the background task to stop after the in-flight cycle.
    pub fn stop(&self) {
        if let Some(tx) = self.stop.lock().unwrap().as_ref() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BindingSnapshot;
    use crate::probe::{ProbeError, StatusDocument, StatusPinger};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::NamedTempFile;

    struct StaticBindings(BindingSnapshot);

    impl BindingSource for StaticBindings {
        fn snapshot(&self) -> BindingSnapshot {
            self.0.clone()
        }
    }

    fn snapshot(entries: &[(&str, &str, &str)], flags: &[(&str, bool)]) -> BindingSnapshot {
        let mut bindings: HashMap<String, HashMap<String, String>> = HashMap::new();
        for (scope, name, address) in entries {
            bindings
                .entry(scope.to_string())
                .or_default()
                .insert(name.to_string(), address.to_string());
        }
        let monitor_flags = flags
            .iter()
            .map(|(address, flag)| (address.to_string(), *flag))
            .collect();
        BindingSnapshot {
            bindings,
            monitor_flags,
        }
    }

    /// Pinger that fails for hosts listed in `down`, counting every call.
    struct ScriptedPinger {
        down: Vec<String>,
        calls: AtomicUsize,
    }

    impl ScriptedPinger {
        fn new(down: &[&str]) -> Self {
            Self {
                down: down.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StatusPinger for ScriptedPinger {
        async fn ping(&self, host: &str, _port: u16) -> Result<StatusDocument, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down.iter().any(|h| h == host) {
                return Err(ProbeError::Other("connection refused".into()));
            }
            Ok(StatusDocument {
                online_count: 7,
                max_count: 20,
                version_name: "1.21".into(),
                protocol: 767,
                description: "test".into(),
            })
        }
    }

    fn poller(
        store: &Arc<Store>,
        pinger: Arc<ScriptedPinger>,
        bindings: BindingSnapshot,
    ) -> Poller {
        Poller::new(
            store.clone(),
            StatusProbe::new(pinger, Duration::from_secs(5)),
            Arc::new(StaticBindings(bindings)),
        )
    }

    fn recent(store: &Store, address: &ServerAddress) -> Vec<StatusObservation> {
        store
            .query_since(address, Utc::now() - ChronoDuration::hours(1))
            .unwrap()
    }

    #[tokio::test]
    async fn shared_address_is_probed_once_per_cycle() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Arc::new(Store::new(tmp.path()).unwrap());
        let pinger = Arc::new(ScriptedPinger::new(&[]));

        // Two scopes bind different names to the same address.
        let bindings = snapshot(
            &[
                ("111", "Lobby", "mc.example.com:25565"),
                ("222", "Main", "mc.example.com:25565"),
            ],
            &[("mc.example.com:25565", true)],
        );

        poller(&store, pinger.clone(), bindings).poll_once().await;

        assert_eq!(pinger.calls.load(Ordering::SeqCst), 1);
        let rows = recent(&store, &ServerAddress::new("mc.example.com", 25565));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].online_players, Some(7));
        assert!(rows[0].response_time_ms.is_some());
    }

    #[tokio::test]
    async fn one_failing_address_does_not_block_the_rest() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Arc::new(Store::new(tmp.path()).unwrap());
        let pinger = Arc::new(ScriptedPinger::new(&["down.example.com"]));

        let bindings = snapshot(
            &[
                ("111", "Down", "down.example.com"),
                ("111", "Up", "up.example.com"),
            ],
            &[("down.example.com", true), ("up.example.com", true)],
        );

        poller(&store, pinger.clone(), bindings).poll_once().await;

        let down = recent(&store, &ServerAddress::new("down.example.com", 25565));
        assert_eq!(down.len(), 1);
        assert_eq!(down[0].online_players, None);
        assert!(down[0]
            .error
            .as_deref()
            .unwrap()
            .contains("connection refused"));

        let up = recent(&store, &ServerAddress::new("up.example.com", 25565));
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].online_players, Some(7));
    }

    #[tokio::test]
    async fn unflagged_addresses_are_not_probed() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Arc::new(Store::new(tmp.path()).unwrap());
        let pinger = Arc::new(ScriptedPinger::new(&[]));

        let bindings = snapshot(
            &[
                ("111", "Off", "off.example.com"),
                ("111", "Unlisted", "unlisted.example.com"),
            ],
            &[("off.example.com", false)],
        );

        poller(&store, pinger.clone(), bindings).poll_once().await;

        assert_eq!(pinger.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.stats().unwrap().total_records, 0);
    }
}
