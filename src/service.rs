//! Oracle service wiring.
//!
//! Builds the whole pipeline out of injected collaborators and dispatches
//! the three inbound event kinds: a device pairing, a chat text, and the
//! ledger's stability signal. One `Oracle` lives for the whole process.

use crate::alerts::OperatorAlerts;
use crate::cache::FactCache;
use crate::capacity::CapacityManager;
use crate::config::OracleConfig;
use crate::interest::InterestIndex;
use crate::ledger::{LedgerPoster, LedgerReader};
use crate::messenger::Messenger;
use crate::notify::NotificationDispatcher;
use crate::provider::FlightStatusProvider;
use crate::publication::PublicationQueue;
use crate::quota::{QuotaGuard, RequestLog};
use crate::resolver::{help_text, FactResolver};
use crate::types::DeviceAddress;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// External collaborators injected at startup.
pub struct Collaborators {
    pub ledger: Arc<dyn LedgerReader>,
    pub poster: Arc<dyn LedgerPoster>,
    pub provider: Arc<dyn FlightStatusProvider>,
    pub messenger: Arc<dyn Messenger>,
    pub alerts: Arc<dyn OperatorAlerts>,
    pub request_log: Arc<dyn RequestLog>,
}

/// Inbound events the oracle reacts to.
#[derive(Debug, Clone)]
pub enum OracleEvent {
    /// A new device paired with the oracle.
    Paired { device: DeviceAddress },
    /// A chat text from a paired device.
    Text { device: DeviceAddress, text: String },
    /// A batch of our units became stable on the ledger.
    UnitsBecameStable { units: Vec<String> },
}

pub struct Oracle {
    resolver: FactResolver,
    dispatcher: NotificationDispatcher,
    messenger: Arc<dyn Messenger>,
}

impl Oracle {
    /// Wire the pipeline. `address` is the oracle's single posting address,
    /// read from the host wallet.
    pub fn new(config: &OracleConfig, address: impl Into<String>, collab: Collaborators) -> Self {
        let address = address.into();
        let interest = Arc::new(InterestIndex::new());

        let capacity = Arc::new(CapacityManager::new(
            Arc::clone(&collab.ledger),
            Arc::clone(&collab.alerts),
            address.clone(),
            config.witnessing_cost,
            config.min_available_witnessings,
        ));
        let queue = PublicationQueue::new(
            capacity,
            collab.poster,
            Arc::clone(&collab.alerts),
            address.clone(),
            config.retry_delay(),
            config.retry_jitter_max(),
            config.post_timestamp,
        );
        let cache = FactCache::new(
            queue.clone(),
            Arc::clone(&collab.ledger),
            Arc::clone(&interest),
            address.clone(),
        );
        let quota = QuotaGuard::new(
            Arc::clone(&collab.request_log),
            Arc::clone(&collab.alerts),
            config.max_requests_per_device_per_day,
            config.max_requests_per_day,
        );
        let resolver = FactResolver::new(
            cache,
            quota,
            collab.provider,
            queue,
            Arc::clone(&interest),
            collab.request_log,
            collab.alerts,
            config.taxi_in_time(),
            config.max_flight_age_days,
            config.disruption_sentinel,
        );
        let dispatcher =
            NotificationDispatcher::new(collab.ledger, interest, Arc::clone(&collab.messenger));

        info!(address = %address, "oracle pipeline ready");
        Self {
            resolver,
            dispatcher,
            messenger: collab.messenger,
        }
    }

    /// Dispatch one inbound event.
    pub async fn handle_event(&self, event: OracleEvent) -> Result<()> {
        match event {
            OracleEvent::Paired { device } => self.handle_paired(&device).await,
            OracleEvent::Text { device, text } => self.handle_text(&device, &text).await,
            OracleEvent::UnitsBecameStable { units } => {
                self.dispatcher.handle_units_became_stable(&units).await
            }
        }
    }

    async fn handle_paired(&self, device: &str) -> Result<()> {
        let today = chrono::Utc::now().date_naive();
        self.messenger.send_text(device, &help_text(today)).await
    }

    async fn handle_text(&self, device: &str, text: &str) -> Result<()> {
        let reply = self.resolver.resolve(device, text).await;
        self.messenger.send_text(device, &reply).await
    }

    /// Consume events until the channel closes. Event handling errors are
    /// logged and do not stop the loop.
    pub async fn run(&self, mut events: mpsc::Receiver<OracleEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(err) = self.handle_event(event).await {
                error!(error = %err, "failed to handle oracle event");
            }
        }
        info!("oracle event channel closed, shutting down");
    }
}
