//! Shared mocks and fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use flight_oracle::ledger::{LedgerPoster, LedgerReader, PostError, StoredFact};
use flight_oracle::provider::{FlightQuery, FlightStatusProvider, ProviderError, ProviderResponse};
use flight_oracle::{Collaborators, Messenger, OperatorAlerts, Output};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const ORACLE_ADDRESS: &str = "ORACLE_ADDRESS";

/// In-memory ledger double with scriptable balances and recorded feeds.
#[derive(Default)]
pub struct MockLedger {
    pub facts: Mutex<HashMap<String, StoredFact>>,
    pub large_output_count: Mutex<u64>,
    pub small_output_total: Mutex<u64>,
    pub largest_output: Mutex<Option<u64>>,
    pub unit_feeds: Mutex<HashMap<String, Vec<String>>>,
    pub refresh_calls: Mutex<u64>,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_fact(&self, feed_name: &str, value: i64, remark: Option<&str>, stable: bool) {
        self.facts.lock().insert(
            feed_name.to_string(),
            StoredFact {
                value,
                remark: remark.map(str::to_string),
                is_stable: stable,
            },
        );
    }

    pub fn map_unit(&self, unit: &str, feed_names: &[&str]) {
        self.unit_feeds.lock().insert(
            unit.to_string(),
            feed_names.iter().map(|s| s.to_string()).collect(),
        );
    }
}

#[async_trait]
impl LedgerReader for MockLedger {
    async fn read_data_feed(
        &self,
        _address: &str,
        feed_name: &str,
    ) -> anyhow::Result<Option<StoredFact>> {
        Ok(self.facts.lock().get(feed_name).cloned())
    }

    async fn count_large_stable_outputs(
        &self,
        _address: &str,
        _min_amount: u64,
    ) -> anyhow::Result<u64> {
        *self.refresh_calls.lock() += 1;
        Ok(*self.large_output_count.lock())
    }

    async fn sum_small_outputs_and_commissions(
        &self,
        _address: &str,
        _below_amount: u64,
    ) -> anyhow::Result<u64> {
        Ok(*self.small_output_total.lock())
    }

    async fn largest_stable_output(
        &self,
        _address: &str,
        min_amount: u64,
    ) -> anyhow::Result<Option<u64>> {
        let largest = *self.largest_output.lock();
        Ok(largest.filter(|amount| *amount >= min_amount))
    }

    async fn feed_names_for_units(&self, units: &[String]) -> anyhow::Result<Vec<String>> {
        let map = self.unit_feeds.lock();
        Ok(units
            .iter()
            .flat_map(|unit| map.get(unit).cloned().unwrap_or_default())
            .collect())
    }
}

/// One posting attempt that succeeded.
#[derive(Debug, Clone)]
pub struct PostedFeed {
    pub outputs: Vec<Output>,
    pub datafeed: serde_json::Map<String, serde_json::Value>,
}

/// Poster double: fails the first `fail_attempts` posts, records the rest.
#[derive(Default)]
pub struct MockPoster {
    pub fail_attempts: Mutex<u64>,
    pub attempts: Mutex<u64>,
    pub posted: Mutex<Vec<PostedFeed>>,
}

impl MockPoster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_first(attempts: u64) -> Arc<Self> {
        let poster = Self::default();
        *poster.fail_attempts.lock() = attempts;
        Arc::new(poster)
    }

    pub fn attempt_count(&self) -> u64 {
        *self.attempts.lock()
    }

    pub fn posted_count(&self) -> usize {
        self.posted.lock().len()
    }
}

#[async_trait]
impl LedgerPoster for MockPoster {
    async fn post_data_feed(
        &self,
        _paying_address: &str,
        outputs: &[Output],
        datafeed: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), PostError> {
        *self.attempts.lock() += 1;
        {
            let mut remaining = self.fail_attempts.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(PostError::NotEnoughFunds("mock: wallet empty".to_string()));
            }
        }
        self.posted.lock().push(PostedFeed {
            outputs: outputs.to_vec(),
            datafeed,
        });
        Ok(())
    }
}

/// Records every outbound chat message.
#[derive(Default)]
pub struct MockMessenger {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl MockMessenger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages_to(&self, device: &str) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(to, _)| to == device)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send_text(&self, device: &str, text: &str) -> anyhow::Result<()> {
        self.sent.lock().push((device.to_string(), text.to_string()));
        Ok(())
    }
}

/// Records operator alerts.
#[derive(Default)]
pub struct MockAlerts {
    pub posting_problems: Mutex<Vec<String>>,
    pub notifications: Mutex<Vec<(String, String)>>,
}

impl MockAlerts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn posting_problem_count(&self) -> usize {
        self.posting_problems.lock().len()
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.lock().len()
    }
}

#[async_trait]
impl OperatorAlerts for MockAlerts {
    async fn posting_problem(&self, message: &str) {
        self.posting_problems.lock().push(message.to_string());
    }

    async fn notify(&self, subject: &str, body: &str) {
        self.notifications
            .lock()
            .push((subject.to_string(), body.to_string()));
    }
}

/// Provider double returning a scripted raw body (or error) for every query.
#[derive(Default)]
pub struct MockProvider {
    pub response: Mutex<Option<Result<String, ProviderError>>>,
    pub calls: Mutex<u64>,
}

impl MockProvider {
    pub fn returning(raw: &str) -> Arc<Self> {
        let provider = Self::default();
        *provider.response.lock() = Some(Ok(raw.to_string()));
        Arc::new(provider)
    }

    pub fn failing(error: ProviderError) -> Arc<Self> {
        let provider = Self::default();
        *provider.response.lock() = Some(Err(error));
        Arc::new(provider)
    }

    pub fn call_count(&self) -> u64 {
        *self.calls.lock()
    }
}

#[async_trait]
impl FlightStatusProvider for MockProvider {
    async fn fetch_statuses(
        &self,
        _query: &FlightQuery,
    ) -> Result<ProviderResponse, ProviderError> {
        *self.calls.lock() += 1;
        match self.response.lock().clone() {
            Some(Ok(raw)) => ProviderResponse::from_raw(raw),
            Some(Err(err)) => Err(err),
            None => Err(ProviderError::Fetch("mock: no response scripted".to_string())),
        }
    }
}

/// Everything a test needs to drive and observe the pipeline.
pub struct Harness {
    pub ledger: Arc<MockLedger>,
    pub poster: Arc<MockPoster>,
    pub provider: Arc<MockProvider>,
    pub messenger: Arc<MockMessenger>,
    pub alerts: Arc<MockAlerts>,
}

impl Harness {
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            ledger: self.ledger.clone(),
            poster: self.poster.clone(),
            provider: self.provider.clone(),
            messenger: self.messenger.clone(),
            alerts: self.alerts.clone(),
            request_log: Arc::new(flight_oracle::InMemoryRequestLog::new()),
        }
    }
}

pub fn harness_with_provider(provider: Arc<MockProvider>) -> Harness {
    let ledger = MockLedger::new();
    // Ample capacity by default so output planning stays pass-through.
    *ledger.large_output_count.lock() = 500;
    Harness {
        ledger,
        poster: MockPoster::new(),
        provider,
        messenger: MockMessenger::new(),
        alerts: MockAlerts::new(),
    }
}

/// A flight date inside the queryable window: request text plus the derived
/// feed name.
pub fn recent_flight(designator: &str) -> (String, String) {
    let date = yesterday();
    let text = format!("{designator} {}", date.format("%d.%m.%Y"));
    let feed_name = format!("{designator}-{}", date.format("%Y-%m-%d"));
    (text, feed_name)
}

pub fn yesterday() -> NaiveDate {
    Utc::now().date_naive() - chrono::Duration::days(1)
}

/// Raw provider body for a landed flight.
pub fn landed_body(planned_utc: &str, actual_gate_utc: &str) -> String {
    format!(
        r#"{{"flightStatuses": [{{
            "status": "L",
            "operationalTimes": {{
                "publishedArrival": {{"dateUtc": "{planned_utc}"}},
                "actualGateArrival": {{"dateUtc": "{actual_gate_utc}"}}
            }}
        }}]}}"#
    )
}

/// Raw provider body carrying only a status code.
pub fn status_body(status: &str) -> String {
    format!(r#"{{"flightStatuses": [{{"status": "{status}"}}]}}"#)
}

/// Poll until `condition` holds. Under a paused clock the sleeps
/// auto-advance, so this also drives pending retry timers.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached in time");
}
