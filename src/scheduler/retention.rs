//! Retention manager: bulk deletion of history past a cutoff age.

use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::db::{Store, StoreError, StoreStats};

pub const MIN_RETENTION_DAYS: i64 = 1;
pub const MAX_RETENTION_DAYS: i64 = 365;

#[derive(Error, Debug)]
pub enum RetentionError {
    #[error("retention days must be between 1 and 365, got {0}")]
    InvalidDays(i64),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a purge, with store stats captured before and after.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    pub deleted: u64,
    pub before: StoreStats,
    pub after: StoreStats,
}

/// Deletes observations older than a retention cutoff.
pub struct RetentionManager {
    store: Arc<Store>,
}

impl RetentionManager {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Delete everything older than `retention_days` days. A run that finds
    /// nothing to delete reports `deleted = 0`; it is not an error.
    pub fn purge(&self, retention_days: i64) -> Result<PurgeReport, RetentionError> {
        if !(MIN_RETENTION_DAYS..=MAX_RETENTION_DAYS).contains(&retention_days) {
            return Err(RetentionError::InvalidDays(retention_days));
        }

        let before = self.store.stats()?;
        let cutoff = Utc::now() - ChronoDuration::days(retention_days);
        let deleted = self.store.purge_older_than(cutoff)?;
        let after = self.store.stats()?;

        tracing::info!("purged {deleted} observation(s) older than {retention_days} day(s)");
        Ok(PurgeReport {
            deleted,
            before,
            after,
        })
    }
}
