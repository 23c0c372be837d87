//! Core domain types shared across the publication pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of a data feed on the ledger, e.g. `"BA950-2017-03-01"`.
///
/// Derived deterministically from the flight designator and the normalized
/// departure date; the ledger treats each feed name as write-once.
pub type FeedName = String;

/// Chat address of the requester asking about a fact.
pub type DeviceAddress = String;

/// Suffix appended to a feed name to form the companion remark feed.
pub const REMARK_SUFFIX: &str = "-remark";

/// The fact value plus its optional free-text remark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactPayload {
    /// Delay in minutes (negative = early), or the disruption sentinel.
    pub value: i64,
    /// Qualifier such as `"runway"`, `"canceled"`, `"diverted"`.
    pub remark: Option<String>,
}

impl FactPayload {
    pub fn new(value: i64, remark: Option<String>) -> Self {
        Self { value, remark }
    }

    /// Render the payload as the data-feed map carried by the posted
    /// transaction: `{feed: value}` plus `{feed-remark: remark}` when a
    /// remark exists.
    pub fn to_datafeed(&self, feed_name: &str) -> serde_json::Map<String, Value> {
        let mut datafeed = serde_json::Map::new();
        datafeed.insert(feed_name.to_string(), Value::from(self.value));
        if let Some(remark) = &self.remark {
            datafeed.insert(
                format!("{feed_name}{REMARK_SUFFIX}"),
                Value::from(remark.clone()),
            );
        }
        datafeed
    }
}

/// Lifecycle of an in-memory queued publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicationStatus {
    /// Created, first delivery attempt not started yet.
    Pending,
    /// A delivery attempt is in flight.
    Publishing,
    /// Last attempt failed; a retry timer is running.
    RetryScheduled,
}

/// In-memory record of a fact awaiting successful broadcast.
///
/// At most one of these exists per feed name; the record is removed as soon
/// as the transaction is accepted for broadcast. Ledger-level confirmation is
/// tracked separately through the interest index.
#[derive(Debug, Clone)]
pub struct QueuedPublication {
    pub feed_name: FeedName,
    pub payload: FactPayload,
    pub status: PublicationStatus,
}

/// One output of an outgoing publication transaction.
///
/// An amount of zero means "remainder": the composer sends all change there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub amount: u64,
    pub address: String,
}

impl Output {
    /// The pass-through change output every publication carries.
    pub fn passthrough(address: impl Into<String>) -> Self {
        Self {
            amount: 0,
            address: address.into(),
        }
    }
}
