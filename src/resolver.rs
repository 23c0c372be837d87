//! Fact Resolver
//!
//! Orchestrates one request end to end: parse, cache check, quota check,
//! provider fetch, delay computation, publication enqueue, reply. Every
//! terminal outcome is a plain-text reply for the requester; transient
//! publication failures never surface here (the queue retries them and the
//! requester is told they will be notified on confirmation).

use crate::alerts::OperatorAlerts;
use crate::cache::FactCache;
use crate::delay::{compute_arrival_delay, DelayError};
use crate::interest::InterestIndex;
use crate::parse::{parse_request, ParseError};
use crate::provider::{FlightQuery, FlightStatusProvider, ProviderError};
use crate::publication::PublicationQueue;
use crate::quota::{QuotaDecision, QuotaGuard, RequestLog};
use crate::types::FactPayload;
use chrono::{Datelike, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct FactResolver {
    cache: FactCache,
    quota: QuotaGuard,
    provider: Arc<dyn FlightStatusProvider>,
    queue: PublicationQueue,
    interest: Arc<InterestIndex>,
    request_log: Arc<dyn RequestLog>,
    alerts: Arc<dyn OperatorAlerts>,
    taxi_in: chrono::Duration,
    max_flight_age_days: i64,
    disruption_sentinel: i64,
}

impl FactResolver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: FactCache,
        quota: QuotaGuard,
        provider: Arc<dyn FlightStatusProvider>,
        queue: PublicationQueue,
        interest: Arc<InterestIndex>,
        request_log: Arc<dyn RequestLog>,
        alerts: Arc<dyn OperatorAlerts>,
        taxi_in: chrono::Duration,
        max_flight_age_days: i64,
        disruption_sentinel: i64,
    ) -> Self {
        Self {
            cache,
            quota,
            provider,
            queue,
            interest,
            request_log,
            alerts,
            taxi_in,
            max_flight_age_days,
            disruption_sentinel,
        }
    }

    /// Resolve one inbound text from `device` into the reply to send back.
    pub async fn resolve(&self, device: &str, text: &str) -> String {
        let text = text.trim();
        let today = Utc::now().date_naive();

        if text.eq_ignore_ascii_case("help") {
            return help_text(today);
        }

        let request = match parse_request(text, today, self.max_flight_age_days) {
            Ok(request) => request,
            Err(err) => return self.parse_error_text(err, today),
        };

        let feed_name = request.feed_name();
        let full_flight = format!(
            "{}{} on {}",
            request.airline,
            request.flight_number,
            request.date.format("%d.%m.%Y")
        );
        let browser_url = browser_url(&request.airline, &request.flight_number, request.date);
        info!(device, feed_name = %feed_name, "resolving flight request");

        // Cache check: collapses duplicate requests into the one in-flight
        // computation and registers interest in pending facts.
        match self.cache.lookup(&feed_name, device).await {
            Ok(Some(fact)) => {
                return delay_text(fact.value, fact.remark.as_deref(), fact.is_stable, &browser_url);
            }
            Ok(None) => {}
            Err(err) => {
                error!(feed_name = %feed_name, error = %err, "ledger lookup failed");
                return "Failed to look up existing data, please try again later.".to_string();
            }
        }

        match self.quota.check(device).await {
            Ok(QuotaDecision::Ok) => {}
            Ok(QuotaDecision::Rejected { message }) => return message,
            Err(err) => {
                error!(device, error = %err, "quota check failed");
                return "Failed to look up existing data, please try again later.".to_string();
            }
        }

        let query = FlightQuery {
            airline: request.airline.clone(),
            flight_number: request.flight_number.clone(),
            year: request.date.year(),
            month: request.date.month(),
            day: request.date.day(),
        };
        let response = match self.provider.fetch_statuses(&query).await {
            Ok(response) => response,
            Err(ProviderError::Fetch(err)) => {
                self.alerts
                    .posting_problem(&format!(
                        "getting flightstats data for {full_flight} failed: {err}"
                    ))
                    .await;
                return "Failed to fetch flightstats data.".to_string();
            }
            Err(ProviderError::Malformed(err)) => {
                self.alerts
                    .posting_problem(&format!(
                        "bad data from flightstats for {full_flight}: {err}"
                    ))
                    .await;
                return "Bad data from flightstats.".to_string();
            }
        };

        if let Err(err) = self
            .request_log
            .record(device, &feed_name, &response.raw)
            .await
        {
            warn!(feed_name = %feed_name, error = %err, "failed to record request");
        }

        let document = &response.document;
        if let Some(error_body) = &document.error {
            if let Some(message) = &error_body.error_message {
                self.alerts
                    .posting_problem(&format!("error from flightstats: {}", response.raw))
                    .await;
                return format!("Error from flightstats: {message}");
            }
        }

        let Some(statuses) = &document.flight_statuses else {
            self.alerts
                .posting_problem(&format!("no statuses: {}", response.raw))
                .await;
            return "Bad data from flightstats.".to_string();
        };
        let Some(last_status) = statuses.last() else {
            return "No information about this flight.".to_string();
        };

        match last_status.status.as_str() {
            "S" | "A" => return "The flight has not finished yet.".to_string(),
            "U" | "DN" => {
                return "Flightstats doesn't know anything about this flight.".to_string()
            }
            "NO" => return "The flight is not operational.".to_string(),
            "L" => {}
            // C, R, D: no arrival timestamps exist, publish the sentinel.
            disrupted => {
                let payload = FactPayload::new(
                    self.disruption_sentinel,
                    Some(status_remark(disrupted)),
                );
                self.enqueue(&feed_name, device, payload);
                return format!(
                    "The flight was canceled, diverted, or redirected.  This counts as large delay.\n\n\
                     The data will be added into the database, I'll let you know when it is confirmed \
                     and you are able to unlock your contract.\n\n{browser_url}"
                );
            }
        }

        let Some(times) = &last_status.operational_times else {
            self.alerts
                .posting_problem(&format!("no planned arrival for {full_flight}"))
                .await;
            return "Unable to determine planned arrival date.".to_string();
        };

        let delay = match compute_arrival_delay(times, self.taxi_in) {
            Ok(delay) => delay,
            Err(DelayError::MissingPlannedArrival) => {
                self.alerts
                    .posting_problem(&format!("no planned arrival for {full_flight}"))
                    .await;
                return "Unable to determine planned arrival date.".to_string();
            }
            Err(DelayError::MissingActualArrival) => {
                self.alerts
                    .posting_problem(&format!("no actual arrival for {full_flight}"))
                    .await;
                return "Unable to determine actual arrival date.".to_string();
            }
            Err(err @ DelayError::BadTimestamp(_)) => {
                // Provider contract violation. Refuse loudly: a wrong fact on
                // the ledger is irreversible.
                error!(feed_name = %feed_name, error = %err, "invalid timestamp in provider response");
                self.alerts
                    .posting_problem(&format!("bad arrival timestamp for {full_flight}: {err}"))
                    .await;
                return "Failed to process flight data.".to_string();
            }
        };

        let payload = FactPayload::new(delay.minutes, delay.remark.clone());
        self.enqueue(&feed_name, device, payload);
        delay_text(delay.minutes, delay.remark.as_deref(), false, &browser_url)
    }

    /// Register the requester for confirmation and hand the fact to the
    /// publication queue.
    fn enqueue(&self, feed_name: &str, device: &str, payload: FactPayload) {
        self.interest.register(feed_name, device);
        self.queue.submit(feed_name.to_string(), payload);
    }

    fn parse_error_text(&self, err: ParseError, today: NaiveDate) -> String {
        match err {
            ParseError::NoTokens => format!(
                "This doesn't look like flight number and date.  {}",
                instruction(today)
            ),
            ParseError::NoDate => format!("Can't find a valid date.  {}", instruction(today)),
            ParseError::NoFlight => {
                format!("Can't find a valid flight number.  {}", instruction(today))
            }
            ParseError::InvalidDate => {
                format!("Looks like the date is not valid.  {}", instruction(today))
            }
            ParseError::FutureDate => {
                "The date must be in the past.  Only finished flights can be queried.".to_string()
            }
            ParseError::TooOld => format!(
                "The flight must be less than {} days ago.",
                self.max_flight_age_days
            ),
        }
    }
}

/// Greeting sent when a new device pairs with the oracle.
pub fn help_text(today: NaiveDate) -> String {
    format!(
        "This oracle can query the status of any flight finished less than 1 week ago \
         and post its delay status to the database.  You can use this data to unlock a \
         smart contract.  Type the flight number and date in DD.MM.YYYY format, e.g.\n\nBA950 {}",
        example_date(today)
    )
}

fn instruction(today: NaiveDate) -> String {
    format!(
        "Please type the flight number and date in DD.MM.YYYY format, e.g. BA950 {}",
        example_date(today)
    )
}

fn example_date(today: NaiveDate) -> String {
    (today - chrono::Duration::days(1)).format("%d.%m.%Y").to_string()
}

fn browser_url(airline: &str, flight_number: &str, date: NaiveDate) -> String {
    format!(
        "http://www.flightstats.com/go/FlightStatus/flightStatusByFlight.do?\
         airline={airline}&flightNumber={flight_number}&departureDate={}",
        date.format("%Y-%m-%d")
    )
}

/// Spell out a disruption status code for the remark feed.
fn status_remark(status: &str) -> String {
    match status {
        "C" => "canceled".to_string(),
        "D" => "diverted".to_string(),
        "R" => "redirected".to_string(),
        other => other.to_string(),
    }
}

/// User-visible delay text, matching the published fact.
fn delay_text(delay: i64, remark: Option<&str>, in_db: bool, browser_url: &str) -> String {
    let est_text = match remark {
        Some("runway") => " (estimated based on runway arrival time)".to_string(),
        Some(other) => format!(" ({other})"),
        None => String::new(),
    };

    let mut text = if delay > 0 {
        format!("Arrival delay was {delay} minutes{est_text}.")
    } else if delay < 0 {
        format!("The flight arrived {} minutes early{est_text}.", -delay)
    } else {
        format!("The flight arrived exactly on time{est_text}.")
    };

    text.push_str(if in_db {
        "\n\nThe data is already in the database, you can unlock your smart contract now."
    } else {
        "\n\nThe data will be added into the database, I'll let you know when it is confirmed and you are able to unlock your contract."
    });
    text.push_str("\n\n");
    text.push_str(browser_url);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_text_phrasing() {
        let url = "http://example";
        assert!(delay_text(23, None, false, url).starts_with("Arrival delay was 23 minutes."));
        assert!(delay_text(-7, None, true, url)
            .starts_with("The flight arrived 7 minutes early."));
        assert!(delay_text(0, None, true, url)
            .starts_with("The flight arrived exactly on time."));
    }

    #[test]
    fn delay_text_remarks() {
        let url = "http://example";
        assert!(delay_text(5, Some("runway"), false, url)
            .contains("(estimated based on runway arrival time)"));
        assert!(delay_text(10_000, Some("canceled"), false, url).contains("(canceled)"));
    }

    #[test]
    fn delay_text_confirmation_suffix() {
        let url = "http://example";
        let stable = delay_text(1, None, true, url);
        assert!(stable.contains("already in the database"));
        assert!(stable.ends_with(url));

        let pending = delay_text(1, None, false, url);
        assert!(pending.contains("I'll let you know when it is confirmed"));
    }

    #[test]
    fn instruction_uses_yesterday_as_example() {
        let today = NaiveDate::from_ymd_opt(2017, 3, 2).unwrap();
        assert!(instruction(today).ends_with("BA950 01.03.2017"));
        assert!(help_text(today).ends_with("BA950 01.03.2017"));
    }

    #[test]
    fn disruption_remarks_spelled_out() {
        assert_eq!(status_remark("C"), "canceled");
        assert_eq!(status_remark("D"), "diverted");
        assert_eq!(status_remark("R"), "redirected");
        assert_eq!(status_remark("X"), "X");
    }
}
