//! Publication Queue
//!
//! Owns at most one in-flight publication per feed name and guarantees
//! eventual delivery: a failed attempt schedules a retry after a fixed delay
//! plus random jitter, forever, with an operator alert on every failure.
//!
//! The dedup check and the insert happen under one lock with no await point
//! in between, so two concurrent requests for the same feed can never both
//! enqueue.

use crate::capacity::CapacityManager;
use crate::ledger::LedgerPoster;
use crate::alerts::OperatorAlerts;
use crate::types::{FactPayload, FeedName, PublicationStatus, QueuedPublication};
use anyhow::Result;
use parking_lot::Mutex;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

struct QueueInner {
    queued: Mutex<HashMap<FeedName, QueuedPublication>>,
    capacity: Arc<CapacityManager>,
    poster: Arc<dyn LedgerPoster>,
    alerts: Arc<dyn OperatorAlerts>,
    address: String,
    retry_delay: Duration,
    retry_jitter_max: Duration,
    post_timestamp: bool,
}

/// Handle to the publication queue; cheap to clone.
#[derive(Clone)]
pub struct PublicationQueue {
    inner: Arc<QueueInner>,
}

impl PublicationQueue {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        capacity: Arc<CapacityManager>,
        poster: Arc<dyn LedgerPoster>,
        alerts: Arc<dyn OperatorAlerts>,
        address: impl Into<String>,
        retry_delay: Duration,
        retry_jitter_max: Duration,
        post_timestamp: bool,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                queued: Mutex::new(HashMap::new()),
                capacity,
                poster,
                alerts,
                address: address.into(),
                retry_delay,
                retry_jitter_max,
                post_timestamp,
            }),
        }
    }

    /// Enqueue `payload` for publication under `feed_name` and start
    /// delivering it. Idempotent: returns false without side effects when a
    /// publication for this feed is already queued.
    pub fn submit(&self, feed_name: FeedName, payload: FactPayload) -> bool {
        {
            let mut queued = self.inner.queued.lock();
            if queued.contains_key(&feed_name) {
                info!(feed_name = %feed_name, "already queued");
                return false;
            }
            queued.insert(
                feed_name.clone(),
                QueuedPublication {
                    feed_name: feed_name.clone(),
                    payload,
                    status: PublicationStatus::Pending,
                },
            );
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_delivery(feed_name).await;
        });
        true
    }

    /// Payload of the queued publication for `feed_name`, if any. Used by
    /// the fact cache to serve duplicate requests from the in-flight record.
    pub fn queued_payload(&self, feed_name: &str) -> Option<FactPayload> {
        self.inner
            .queued
            .lock()
            .get(feed_name)
            .map(|record| record.payload.clone())
    }

    /// Status of the queued publication for `feed_name`, if any.
    pub fn status(&self, feed_name: &str) -> Option<PublicationStatus> {
        self.inner
            .queued
            .lock()
            .get(feed_name)
            .map(|record| record.status)
    }

    /// Number of publications currently queued.
    pub fn len(&self) -> usize {
        self.inner.queued.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queued.lock().is_empty()
    }
}

impl QueueInner {
    /// Deliver one feed until the ledger accepts it. Attempts within one
    /// feed are strictly sequential; different feeds run on independent
    /// tasks.
    async fn run_delivery(self: Arc<Self>, feed_name: FeedName) {
        loop {
            let payload = {
                let mut queued = self.queued.lock();
                let Some(record) = queued.get_mut(&feed_name) else {
                    // Removed out from under us; nothing left to deliver.
                    warn!(feed_name = %feed_name, "queued publication disappeared");
                    return;
                };
                record.status = PublicationStatus::Publishing;
                record.payload.clone()
            };

            match self.attempt(&feed_name, &payload).await {
                Ok(()) => {
                    self.queued.lock().remove(&feed_name);
                    info!(feed_name = %feed_name, "data feed posted, awaiting stability");
                    return;
                }
                Err(err) => {
                    error!(feed_name = %feed_name, error = %err, "posting failed, will retry");
                    self.alerts
                        .posting_problem(&format!("posting {feed_name} failed: {err:#}"))
                        .await;

                    if let Some(record) = self.queued.lock().get_mut(&feed_name) {
                        record.status = PublicationStatus::RetryScheduled;
                    }
                    tokio::time::sleep(self.retry_delay + self.jitter()).await;
                }
            }
        }
    }

    /// One publication attempt. The output plan is computed fresh each time:
    /// capacity may have changed since the last attempt.
    async fn attempt(&self, feed_name: &str, payload: &FactPayload) -> Result<()> {
        let outputs = self.capacity.plan_outputs().await?;

        let mut datafeed = payload.to_datafeed(feed_name);
        if self.post_timestamp {
            datafeed.insert(
                "timestamp".to_string(),
                Value::from(chrono::Utc::now().timestamp_millis()),
            );
        }

        self.poster
            .post_data_feed(&self.address, &outputs, datafeed)
            .await?;
        Ok(())
    }

    fn jitter(&self) -> Duration {
        let max_millis = self.retry_jitter_max.as_millis() as u64;
        if max_millis == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_millis))
    }
}
