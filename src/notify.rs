//! Confirmation notifications.
//!
//! Triggered by the ledger's stability signal: resolves the affected feed
//! names, drains the interest index, and tells every waiting requester once
//! that their fact is now usable.

use crate::interest::InterestIndex;
use crate::ledger::LedgerReader;
use crate::messenger::Messenger;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub struct NotificationDispatcher {
    ledger: Arc<dyn LedgerReader>,
    interest: Arc<InterestIndex>,
    messenger: Arc<dyn Messenger>,
}

impl NotificationDispatcher {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        interest: Arc<InterestIndex>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            ledger,
            interest,
            messenger,
        }
    }

    /// Handle a batch of units that just became stable.
    ///
    /// Feeds nobody asked about (or whose waiters were already notified) are
    /// skipped silently. A send failure to one device does not stop the
    /// others, but those waiters are already drained; the message is not
    /// re-queued.
    pub async fn handle_units_became_stable(&self, units: &[String]) -> Result<()> {
        let feed_names = self.ledger.feed_names_for_units(units).await?;

        for feed_name in feed_names {
            let Some(devices) = self.interest.drain(&feed_name) else {
                continue;
            };
            info!(feed_name = %feed_name, waiters = devices.len(), "feed became stable");

            let text = format!(
                "The data about your flight {feed_name} is now in the database, you can unlock your contract."
            );
            for device in devices {
                if let Err(err) = self.messenger.send_text(&device, &text).await {
                    warn!(feed_name = %feed_name, device = %device, error = %err, "failed to notify requester");
                }
            }
        }
        Ok(())
    }
}
