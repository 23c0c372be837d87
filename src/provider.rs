//! External flight-status provider.
//!
//! Defines the provider seam plus the real FlightStats client. The response
//! document is deserialized leniently: every field the pipeline reads is
//! optional, and shape problems surface as typed errors rather than panics.

use async_trait::async_trait;
use serde::Deserialize;

/// A normalized flight-status request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightQuery {
    /// Two-character carrier code, e.g. `"BA"`.
    pub airline: String,
    /// Flight number, digits with an optional trailing letter.
    pub flight_number: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Provider failures. All are terminal for the current request: flight data
/// availability is a fact, not a transient infrastructure condition.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("flightstats request failed: {0}")]
    Fetch(String),

    #[error("unparseable flightstats response: {0}")]
    Malformed(String),
}

/// One candidate timestamp inside `operationalTimes`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTime {
    pub date_utc: Option<String>,
}

/// The `operationalTimes` block of a landed flight, with candidate fields in
/// the provider's priority order.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperationalTimes {
    pub published_arrival: Option<ProviderTime>,
    pub scheduled_gate_arrival: Option<ProviderTime>,
    pub actual_gate_arrival: Option<ProviderTime>,
    pub estimated_gate_arrival: Option<ProviderTime>,
    pub actual_runway_arrival: Option<ProviderTime>,
    pub estimated_runway_arrival: Option<ProviderTime>,
}

/// One entry of `flightStatuses[]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightStatus {
    /// Status code: `L` landed, `S` scheduled, `A` active, `U` unknown,
    /// `DN` data needed, `NO` not operational, `C`/`D`/`R` disruption.
    #[serde(default)]
    pub status: String,
    pub operational_times: Option<OperationalTimes>,
}

/// Error body the provider returns instead of statuses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderErrorBody {
    pub error_message: Option<String>,
}

/// Top-level response document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightStatusDocument {
    pub error: Option<ProviderErrorBody>,
    pub flight_statuses: Option<Vec<FlightStatus>>,
}

/// A fetched response: parsed document plus the raw body for the request log
/// and operator alerts.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub raw: String,
    pub document: FlightStatusDocument,
}

impl ProviderResponse {
    /// Parse a raw response body.
    pub fn from_raw(raw: String) -> Result<Self, ProviderError> {
        let document: FlightStatusDocument =
            serde_json::from_str(&raw).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        Ok(Self { raw, document })
    }
}

/// Flight-status lookup seam.
#[async_trait]
pub trait FlightStatusProvider: Send + Sync {
    async fn fetch_statuses(&self, query: &FlightQuery) -> Result<ProviderResponse, ProviderError>;
}

/// FlightStats `flex` API client.
#[derive(Debug, Clone)]
pub struct FlightstatsClient {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_key: String,
}

impl FlightstatsClient {
    pub fn new(base_url: String, app_id: String, app_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            app_id,
            app_key,
        }
    }

    fn status_url(&self, query: &FlightQuery) -> String {
        format!(
            "{}/{}/{}/dep/{}/{}/{}?appId={}&appKey={}&utc=false",
            self.base_url,
            query.airline,
            query.flight_number,
            query.year,
            query.month,
            query.day,
            self.app_id,
            self.app_key,
        )
    }
}

#[async_trait]
impl FlightStatusProvider for FlightstatsClient {
    async fn fetch_statuses(&self, query: &FlightQuery) -> Result<ProviderResponse, ProviderError> {
        let url = self.status_url(query);
        tracing::info!(
            airline = %query.airline,
            flight_number = %query.flight_number,
            "requesting flight status"
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Fetch(format!("status={status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Fetch(e.to_string()))?;
        tracing::debug!(body = %body, "flight status response");

        ProviderResponse::from_raw(body)
    }
}
