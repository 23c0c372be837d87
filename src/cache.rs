//! Fact Cache
//!
//! Read-through lookup of previously computed facts. A hit comes either from
//! the in-memory publication queue (fact computed, broadcast pending) or from
//! the ledger's durable store. Any hit that is not yet stable registers the
//! requester in the interest index as a side effect, so the requester is told
//! exactly once when the fact confirms.
//!
//! This is what collapses duplicate requests for one feed into a single
//! computation and a single publication.

use crate::interest::InterestIndex;
use crate::ledger::LedgerReader;
use crate::publication::PublicationQueue;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// A cached fact and whether it is already final on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFact {
    pub value: i64,
    pub remark: Option<String>,
    pub is_stable: bool,
}

pub struct FactCache {
    queue: PublicationQueue,
    ledger: Arc<dyn LedgerReader>,
    interest: Arc<InterestIndex>,
    address: String,
}

impl FactCache {
    pub fn new(
        queue: PublicationQueue,
        ledger: Arc<dyn LedgerReader>,
        interest: Arc<InterestIndex>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            ledger,
            interest,
            address: address.into(),
        }
    }

    /// Look up `feed_name` for `device`.
    ///
    /// Checks the publication queue first (no await between the check and the
    /// interest registration), then the ledger. Returns `None` when the fact
    /// has never been computed.
    pub async fn lookup(&self, feed_name: &str, device: &str) -> Result<Option<CachedFact>> {
        if let Some(payload) = self.queue.queued_payload(feed_name) {
            self.interest.register(feed_name, device);
            debug!(feed_name, device, "served from publication queue");
            return Ok(Some(CachedFact {
                value: payload.value,
                remark: payload.remark,
                is_stable: false,
            }));
        }

        match self.ledger.read_data_feed(&self.address, feed_name).await? {
            Some(fact) => {
                if !fact.is_stable {
                    self.interest.register(feed_name, device);
                }
                debug!(feed_name, device, stable = fact.is_stable, "served from ledger");
                Ok(Some(CachedFact {
                    value: fact.value,
                    remark: fact.remark,
                    is_stable: fact.is_stable,
                }))
            }
            None => Ok(None),
        }
    }
}
