//! Status probe client.
//!
//! The game-server ping itself is an external capability behind the
//! [`StatusPinger`] trait; this module enforces the per-probe timeout and
//! maps every failure into a closed error taxonomy.

mod pinger;

pub use pinger::CraftPinger;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::address::ServerAddress;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("probe failed: {0}")]
    Other(String),
}

/// Status document returned by a successful probe.
#[derive(Debug, Clone, Serialize)]
pub struct StatusDocument {
    pub online_count: i64,
    pub max_count: i64,
    pub version_name: String,
    pub protocol: i64,
    pub description: String,
}

/// The external ping capability: given (host, port), return a status
/// document or fail with a typed error.
#[async_trait]
pub trait StatusPinger: Send + Sync {
    async fn ping(&self, host: &str, port: u16) -> Result<StatusDocument, ProbeError>;
}

/// Probe client wrapping a [`StatusPinger`] with a bounded timeout.
///
/// Performs no retry; each caller decides whether to retry or record the
/// failure.
#[derive(Clone)]
pub struct StatusProbe {
    pinger: Arc<dyn StatusPinger>,
    timeout: Duration,
}

impl StatusProbe {
    pub fn new(pinger: Arc<dyn StatusPinger>, timeout: Duration) -> Self {
        Self { pinger, timeout }
    }

    /// Issue one status query against the address.
    pub async fn probe(&self, address: &ServerAddress) -> Result<StatusDocument, ProbeError> {
        match tokio::time::timeout(self.timeout, self.pinger.ping(&address.host, address.port))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowPinger;

    #[async_trait]
    impl StatusPinger for SlowPinger {
        async fn ping(&self, _host: &str, _port: u16) -> Result<StatusDocument, ProbeError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(ProbeError::Other("unreachable".into()))
        }
    }

    struct FlatPinger;

    #[async_trait]
    impl StatusPinger for FlatPinger {
        async fn ping(&self, _host: &str, _port: u16) -> Result<StatusDocument, ProbeError> {
            Ok(StatusDocument {
                online_count: 3,
                max_count: 20,
                version_name: "1.21".into(),
                protocol: 767,
                description: "A Minecraft Server".into(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_pinger_becomes_timeout() {
        let probe = StatusProbe::new(Arc::new(SlowPinger), Duration::from_millis(100));
        let err = probe
            .probe(&ServerAddress::new("mc.example.com", 25565))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Timeout(_)));
    }

    #[tokio::test]
    async fn successful_probe_returns_document() {
        let probe = StatusProbe::new(Arc::new(FlatPinger), Duration::from_secs(5));
        let doc = probe
            .probe(&ServerAddress::new("mc.example.com", 25565))
            .await
            .unwrap();
        assert_eq!(doc.online_count, 3);
        assert_eq!(doc.max_count, 20);
    }
}
