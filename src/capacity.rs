//! Capacity Manager
//!
//! Keeps the oracle able to afford publications. Available capacity is the
//! count of stable outputs that each cover one publication, plus an estimate
//! of how many more the small outputs and accrued commissions add up to.
//! When capacity runs low, `plan_outputs` splits the largest eligible output
//! in two so that one large output does not starve future small postings.
//!
//! This is advisory maintenance: a publication is never blocked because the
//! split could not be planned.

use crate::alerts::OperatorAlerts;
use crate::ledger::LedgerReader;
use crate::types::Output;
use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

pub struct CapacityManager {
    ledger: Arc<dyn LedgerReader>,
    alerts: Arc<dyn OperatorAlerts>,
    address: String,
    witnessing_cost: u64,
    min_available: u64,
    /// Cached availability count, decremented on every read and refreshed
    /// from the ledger once it falls to the threshold.
    available_estimate: Mutex<i64>,
}

impl CapacityManager {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        alerts: Arc<dyn OperatorAlerts>,
        address: impl Into<String>,
        witnessing_cost: u64,
        min_available: u64,
    ) -> Self {
        Self {
            ledger,
            alerts,
            address: address.into(),
            witnessing_cost,
            min_available,
            available_estimate: Mutex::new(0),
        }
    }

    /// How many publications the address can still afford.
    ///
    /// Decrements the cached estimate and answers from it while it stays
    /// above the threshold; otherwise recounts from the ledger. The estimate
    /// may drift low between refreshes, which only makes refreshes happen
    /// sooner.
    pub async fn available_witnessings(&self) -> Result<i64> {
        {
            let mut estimate = self.available_estimate.lock();
            *estimate -= 1;
            if *estimate > self.min_available as i64 {
                return Ok(*estimate);
            }
        }

        let large = self
            .ledger
            .count_large_stable_outputs(&self.address, self.witnessing_cost)
            .await?;
        let small_total = self
            .ledger
            .sum_small_outputs_and_commissions(&self.address, self.witnessing_cost)
            .await?;
        let paid_by_small = (small_total as f64 / self.witnessing_cost as f64).round() as i64;
        let count = large as i64 + paid_by_small;

        *self.available_estimate.lock() = count;
        debug!(count, "refreshed available witnessings from ledger");
        Ok(count)
    }

    /// Structure the outputs of the next publication transaction.
    ///
    /// Always starts with a pass-through change output. When capacity is low
    /// and a stable output worth at least two publications exists, a second
    /// output carrying half of it is added so the transaction splits it.
    pub async fn plan_outputs(&self) -> Result<Vec<Output>> {
        let mut outputs = vec![Output::passthrough(&self.address)];

        let count = self.available_witnessings().await?;
        if count > self.min_available as i64 {
            return Ok(outputs);
        }

        match self
            .ledger
            .largest_stable_output(&self.address, 2 * self.witnessing_cost)
            .await?
        {
            None => {
                self.alerts
                    .posting_problem(&format!(
                        "only {count} spendable outputs left, and can't add more"
                    ))
                    .await;
                Ok(outputs)
            }
            Some(amount) => {
                info!(amount, "splitting largest output to restore capacity");
                outputs.push(Output {
                    amount: amount.div_ceil(2),
                    address: self.address.clone(),
                });
                Ok(outputs)
            }
        }
    }
}
