//! Request quota enforcement.
//!
//! Per-device and global ceilings over a trailing 24-hour window, derived
//! from the request log at every check. A rejection is terminal for that
//! request; the requester may ask again later and is re-evaluated fresh.

use crate::alerts::OperatorAlerts;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Reply sent when a quota ceiling is exceeded.
pub const QUOTA_EXCEEDED_TEXT: &str = "Too many requests today, try again tomorrow";

/// Append-only log of served requests; the quota counters are recomputed
/// from it on every check.
#[async_trait]
pub trait RequestLog: Send + Sync {
    /// Record one served request together with the raw provider response.
    async fn record(&self, device: &str, feed_name: &str, response: &str) -> Result<()>;

    /// Requests from `device` recorded at or after `since`.
    async fn count_for_device_since(&self, device: &str, since: DateTime<Utc>) -> Result<u64>;

    /// All requests recorded at or after `since`.
    async fn count_since(&self, since: DateTime<Utc>) -> Result<u64>;
}

#[derive(Debug, Clone)]
struct LogEntry {
    device: String,
    #[allow(dead_code)]
    feed_name: String,
    recorded_at: DateTime<Utc>,
}

/// Process-local request log. A host that needs the log to survive restarts
/// provides its own [`RequestLog`] over durable storage.
#[derive(Debug, Default)]
pub struct InMemoryRequestLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl InMemoryRequestLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestLog for InMemoryRequestLog {
    async fn record(&self, device: &str, feed_name: &str, _response: &str) -> Result<()> {
        self.entries.lock().push(LogEntry {
            device: device.to_string(),
            feed_name: feed_name.to_string(),
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    async fn count_for_device_since(&self, device: &str, since: DateTime<Utc>) -> Result<u64> {
        Ok(self
            .entries
            .lock()
            .iter()
            .filter(|e| e.device == device && e.recorded_at >= since)
            .count() as u64)
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<u64> {
        Ok(self
            .entries
            .lock()
            .iter()
            .filter(|e| e.recorded_at >= since)
            .count() as u64)
    }
}

/// Outcome of a quota check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaDecision {
    Ok,
    Rejected { message: String },
}

/// Enforces the request ceilings and alerts the operator on abuse.
pub struct QuotaGuard {
    log: Arc<dyn RequestLog>,
    alerts: Arc<dyn OperatorAlerts>,
    max_per_device_per_day: u64,
    max_per_day: u64,
}

impl QuotaGuard {
    pub fn new(
        log: Arc<dyn RequestLog>,
        alerts: Arc<dyn OperatorAlerts>,
        max_per_device_per_day: u64,
        max_per_day: u64,
    ) -> Self {
        Self {
            log,
            alerts,
            max_per_device_per_day,
            max_per_day,
        }
    }

    /// Check whether `device` may make another request right now.
    ///
    /// The limit-th request within the window is still served; the one after
    /// it is rejected.
    pub async fn check(&self, device: &str) -> Result<QuotaDecision> {
        let since = Utc::now() - Duration::days(1);

        let device_count = self.log.count_for_device_since(device, since).await?;
        if device_count > self.max_per_device_per_day {
            warn!(device, count = device_count, "per-device quota exceeded");
            self.alerts
                .notify(
                    &format!("too many requests from {device}"),
                    &format!("{device_count} requests today from {device}"),
                )
                .await;
            return Ok(QuotaDecision::Rejected {
                message: QUOTA_EXCEEDED_TEXT.to_string(),
            });
        }

        let total_count = self.log.count_since(since).await?;
        if total_count > self.max_per_day {
            warn!(count = total_count, "global quota exceeded");
            self.alerts
                .notify("too many requests", &format!("{total_count} requests today"))
                .await;
            return Ok(QuotaDecision::Rejected {
                message: QUOTA_EXCEEDED_TEXT.to_string(),
            });
        }

        Ok(QuotaDecision::Ok)
    }
}
