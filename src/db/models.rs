//! History store model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::ServerAddress;

/// Whether a probe found the server reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Offline,
}

impl ServerStatus {
    pub fn is_online(self) -> bool {
        matches!(self, ServerStatus::Online)
    }
}

/// One point-in-time observation of a server, as persisted.
///
/// Rows are append-only: the poll cycle writes exactly one per address and
/// nothing ever updates them in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusObservation {
    pub checked_at: DateTime<Utc>,
    pub host: String,
    pub port: u16,
    /// Player count reported by the server; absent when the probe failed
    /// before any player data was parsed.
    pub online_players: Option<i64>,
    /// Measured probe latency; absent when no response was measured.
    pub response_time_ms: Option<f64>,
    pub status: ServerStatus,
    /// Failure description, present only for offline observations.
    pub error: Option<String>,
}

impl StatusObservation {
    pub fn online(
        address: &ServerAddress,
        checked_at: DateTime<Utc>,
        online_players: i64,
        response_time_ms: f64,
    ) -> Self {
        Self {
            checked_at,
            host: address.host.clone(),
            port: address.port,
            online_players: Some(online_players),
            response_time_ms: Some(response_time_ms),
            status: ServerStatus::Online,
            error: None,
        }
    }

    pub fn offline(
        address: &ServerAddress,
        checked_at: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            checked_at,
            host: address.host.clone(),
            port: address.port,
            online_players: None,
            response_time_ms: None,
            status: ServerStatus::Offline,
            error: Some(error.into()),
        }
    }
}

/// Global summary of the observation table.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_records: i64,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    pub size_bytes: i64,
}
