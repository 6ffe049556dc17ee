//! Configuration: environment settings plus the externally-owned binding
//! table and monitor flags.
//!
//! Bindings and flags are written by the host layer; this crate only ever
//! reads point-in-time snapshots of them.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::address::ServerAddress;

/// Engine settings loaded from environment variables with defaults.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Path to the SQLite database file (default: "craftwatch.db")
    pub db_path: String,
    /// Directory chart images are written to (default: "charts")
    pub chart_dir: String,
    /// Path to the JSON bindings document (default: "bindings.json")
    pub bindings_path: String,
    /// Poll interval in seconds (default: 300)
    pub poll_interval_secs: u64,
    /// Per-probe timeout in seconds (default: 5)
    pub probe_timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            db_path: "craftwatch.db".to_string(),
            chart_dir: "charts".to_string(),
            bindings_path: "bindings.json".to_string(),
            poll_interval_secs: 300,
            probe_timeout_secs: 5,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CRAFTWATCH_DB_PATH`: database file path
    /// - `CRAFTWATCH_CHART_DIR`: chart output directory
    /// - `CRAFTWATCH_BINDINGS_PATH`: bindings document path
    /// - `CRAFTWATCH_POLL_INTERVAL_SECS`: poll interval
    /// - `CRAFTWATCH_PROBE_TIMEOUT_SECS`: per-probe timeout
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(path) = env::var("CRAFTWATCH_DB_PATH") {
            cfg.db_path = path;
        }
        if let Ok(dir) = env::var("CRAFTWATCH_CHART_DIR") {
            cfg.chart_dir = dir;
        }
        if let Ok(path) = env::var("CRAFTWATCH_BINDINGS_PATH") {
            cfg.bindings_path = path;
        }
        if let Ok(secs) = env::var("CRAFTWATCH_POLL_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                cfg.poll_interval_secs = secs;
            }
        }
        if let Ok(secs) = env::var("CRAFTWATCH_PROBE_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                cfg.probe_timeout_secs = secs;
            }
        }

        cfg
    }
}

/// Point-in-time view of the binding table and monitor flags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BindingSnapshot {
    /// scope -> server name -> address string
    #[serde(default)]
    pub bindings: HashMap<String, HashMap<String, String>>,
    /// address string -> monitored. Flags are address-scoped: one flag
    /// covers every name/scope bound to that address.
    #[serde(default)]
    pub monitor_flags: HashMap<String, bool>,
}

impl BindingSnapshot {
    /// Whether an address string is flagged for monitoring. Absent means no.
    pub fn is_monitored(&self, address: &str) -> bool {
        self.monitor_flags.get(address).copied().unwrap_or(false)
    }

    /// The deduplicated set of addresses currently flagged for monitoring
    /// across all scopes. Malformed binding entries are skipped with a log;
    /// one bad row must not take the poll cycle down.
    pub fn monitored_addresses(&self) -> Vec<ServerAddress> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (scope, servers) in &self.bindings {
            for (name, raw) in servers {
                if !self.is_monitored(raw) {
                    continue;
                }
                match raw.parse::<ServerAddress>() {
                    Ok(address) => {
                        if seen.insert(address.clone()) {
                            out.push(address);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("skipping binding {name} in scope {scope}: {e}");
                    }
                }
            }
        }
        out
    }
}

/// Source of binding snapshots.
pub trait BindingSource: Send + Sync {
    fn snapshot(&self) -> BindingSnapshot;
}

/// JSON-file-backed binding source.
///
/// The file is re-read on every snapshot so edits by the host layer are
/// picked up on the next poll cycle; a missing or unreadable file reads as
/// an empty snapshot.
pub struct FileBindings {
    path: PathBuf,
}

impl FileBindings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BindingSource for FileBindings {
    fn snapshot(&self) -> BindingSnapshot {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("no bindings at {}: {e}", self.path.display());
                return BindingSnapshot::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("malformed bindings at {}: {e}", self.path.display());
                BindingSnapshot::default()
            }
        }
    }
}
