//! The facade the host command layer talks to.

use chrono::{Duration as ChronoDuration, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use crate::address::ServerAddress;
use crate::chart::ChartRenderer;
use crate::config::BindingSource;
use crate::db::{StatusObservation, Store, StoreError, StoreStats};
use crate::probe::{ProbeError, StatusDocument, StatusProbe};
use crate::scheduler::{Poller, PurgeReport, RetentionError, RetentionManager};
use crate::stats::{summarize, Summary};

/// Bundles the store, probe client, poller, retention manager and chart
/// renderer behind the operations the host exposes as commands.
pub struct StatusMonitor {
    store: Arc<Store>,
    probe: StatusProbe,
    poller: Arc<Poller>,
    retention: RetentionManager,
    charts: ChartRenderer,
}

impl StatusMonitor {
    pub fn new(
        store: Arc<Store>,
        probe: StatusProbe,
        bindings: Arc<dyn BindingSource>,
        charts: ChartRenderer,
    ) -> Self {
        let poller = Arc::new(Poller::new(store.clone(), probe.clone(), bindings));
        let retention = RetentionManager::new(store.clone());
        Self {
            store,
            probe,
            poller,
            retention,
            charts,
        }
    }

    /// Handle to the poller, for wiring up a [`crate::scheduler::PollScheduler`].
    pub fn poller(&self) -> Arc<Poller> {
        self.poller.clone()
    }

    /// Live one-shot status query, bypassing the history store. Probe
    /// failures come back as typed errors for the caller to present as an
    /// "unreachable" result.
    pub async fn probe_now(&self, address: &ServerAddress) -> Result<StatusDocument, ProbeError> {
        self.probe.probe(address).await
    }

    /// All observations for the address within the last `hours` hours,
    /// ascending by time.
    pub fn query_history(
        &self,
        address: &ServerAddress,
        hours: u32,
    ) -> Result<Vec<StatusObservation>, StoreError> {
        let since = Utc::now() - ChronoDuration::hours(i64::from(hours));
        self.store.query_since(address, since)
    }

    /// Aggregated statistics over the last `hours` hours.
    pub fn summarize_history(
        &self,
        address: &ServerAddress,
        hours: u32,
    ) -> Result<Summary, StoreError> {
        Ok(summarize(&self.query_history(address, hours)?))
    }

    /// Render a status chart for the window. `Ok(None)` means there is no
    /// chart to show (empty history, or rendering failed); store errors
    /// still propagate.
    pub fn render_chart(
        &self,
        name: &str,
        address: &ServerAddress,
        hours: u32,
    ) -> Result<Option<PathBuf>, StoreError> {
        let history = self.query_history(address, hours)?;
        Ok(self.charts.render(name, address, hours, &history))
    }

    /// Delete history older than `retention_days` days.
    pub fn purge_old_data(&self, retention_days: i64) -> Result<PurgeReport, RetentionError> {
        self.retention.purge(retention_days)
    }

    /// Global store summary.
    pub fn store_stats(&self) -> Result<StoreStats, StoreError> {
        self.store.stats()
    }

    /// Run one poll cycle now. Single-flight: re-entry while a cycle runs
    /// is a no-op.
    pub async fn poll_once(&self) {
        self.poller.poll_once().await;
    }
}
