//! craftwatch - game server status monitoring and history engine.
//!
//! Periodically probes the game servers flagged for monitoring, persists
//! every observation to an append-only SQLite history, and answers
//! historical queries over that data: ranged lookups, aggregated
//! statistics and chart generation. The surrounding chat/command layer is
//! an external collaborator; it supplies the binding table and monitor
//! flags and calls the [`service::StatusMonitor`] facade.

pub mod address;
pub mod chart;
pub mod config;
pub mod db;
pub mod probe;
pub mod scheduler;
pub mod service;
pub mod stats;

pub use address::{validate_name, AddressFormatError, ServerAddress, DEFAULT_PORT};
pub use chart::ChartRenderer;
pub use config::{BindingSnapshot, BindingSource, FileBindings, MonitorConfig};
pub use db::{ServerStatus, StatusObservation, Store, StoreError, StoreStats};
pub use probe::{CraftPinger, ProbeError, StatusDocument, StatusPinger, StatusProbe};
pub use scheduler::{PollScheduler, Poller, PurgeReport, RetentionError, RetentionManager};
pub use service::StatusMonitor;
pub use stats::{summarize, Summary};
