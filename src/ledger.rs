//! Ledger Access Abstraction
//!
//! This module defines the traits that abstract the DAG ledger for the
//! publication pipeline. By operating at the domain level (facts, outputs,
//! payload maps) rather than exposing raw ledger queries, these traits enable:
//! - Testing with mock implementations
//! - Swapping ledger clients without changing pipeline logic
//! - Clear separation between pipeline and ledger concerns
//!
//! Consensus, stabilization and signing all live behind these seams.

use crate::types::{FeedName, Output};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A data-feed value already recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFact {
    pub value: i64,
    pub remark: Option<String>,
    /// Whether the unit carrying the feed is final (no longer reorderable).
    pub is_stable: bool,
}

/// Typed failure of a publication attempt.
///
/// All variants are transient from the pipeline's point of view: the queue
/// retries them indefinitely.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PostError {
    #[error("not enough funds: {0}")]
    NotEnoughFunds(String),

    #[error("transaction composition failed: {0}")]
    Composition(String),

    #[error("broadcast failed: {0}")]
    Network(String),
}

/// Read-side ledger access: recorded feeds and spendable outputs.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Look up a data feed (and its companion remark feed) posted by
    /// `address`. Returns `None` when nothing is recorded under `feed_name`.
    async fn read_data_feed(&self, address: &str, feed_name: &str) -> Result<Option<StoredFact>>;

    /// Count stable, unspent outputs on `address` with amount >= `min_amount`.
    async fn count_large_stable_outputs(&self, address: &str, min_amount: u64) -> Result<u64>;

    /// Total of stable, unspent outputs below `below_amount` plus accrued
    /// witnessing and header commissions on `address`.
    async fn sum_small_outputs_and_commissions(
        &self,
        address: &str,
        below_amount: u64,
    ) -> Result<u64>;

    /// Amount of the single largest stable, unspent output on `address`
    /// with amount >= `min_amount`, if any.
    async fn largest_stable_output(&self, address: &str, min_amount: u64) -> Result<Option<u64>>;

    /// Feed names carried by the given units. Used to translate a "units
    /// became stable" signal into the facts that just confirmed.
    async fn feed_names_for_units(&self, units: &[String]) -> Result<Vec<FeedName>>;
}

/// Write-side ledger access: compose, sign and broadcast one data-feed
/// transaction.
#[async_trait]
pub trait LedgerPoster: Send + Sync {
    /// Post `datafeed` from `paying_address`, structuring the transaction
    /// with `outputs`. Success means the transaction was accepted for
    /// broadcast; ledger-level confirmation arrives later as a stability
    /// signal.
    async fn post_data_feed(
        &self,
        paying_address: &str,
        outputs: &[Output],
        datafeed: serde_json::Map<String, Value>,
    ) -> std::result::Result<(), PostError>;
}
