//! Arrival delay computation.
//!
//! Picks the planned and actual arrival timestamps out of the provider's
//! `operationalTimes` block in priority order, applies the taxi-in
//! adjustment for runway times, and returns the delay in whole minutes.
//!
//! Timestamps are validated explicitly: a field that is present but does not
//! parse is an invariant violation (the provider contract promises ISO 8601
//! UTC), surfaced as [`DelayError::BadTimestamp`] rather than a wrong fact.

use crate::provider::{OperationalTimes, ProviderTime};
use chrono::{DateTime, Utc};

/// Remark attached when the actual arrival is estimated from runway times.
pub const RUNWAY_REMARK: &str = "runway";

/// A computed arrival delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalDelay {
    /// Minutes late (negative = early).
    pub minutes: i64,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DelayError {
    #[error("no planned arrival time in response")]
    MissingPlannedArrival,

    #[error("no actual arrival time in response")]
    MissingActualArrival,

    #[error("unparseable arrival timestamp: {0:?}")]
    BadTimestamp(String),
}

fn parse_time(time: &ProviderTime) -> Result<Option<DateTime<Utc>>, DelayError> {
    let Some(raw) = &time.date_utc else {
        return Ok(None);
    };
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|_| DelayError::BadTimestamp(raw.clone()))?;
    Ok(Some(parsed.with_timezone(&Utc)))
}

fn first_time(
    candidates: &[&Option<ProviderTime>],
) -> Result<Option<(usize, DateTime<Utc>)>, DelayError> {
    for (index, candidate) in candidates.iter().enumerate() {
        if let Some(time) = candidate {
            if let Some(parsed) = parse_time(time)? {
                return Ok(Some((index, parsed)));
            }
        }
    }
    Ok(None)
}

/// Compute the arrival delay of a landed flight.
///
/// Planned arrival: published arrival, else scheduled gate arrival. Actual
/// arrival: actual gate, else estimated gate, else actual runway, else
/// estimated runway; runway times get `taxi_in` added and the `"runway"`
/// remark.
pub fn compute_arrival_delay(
    times: &OperationalTimes,
    taxi_in: chrono::Duration,
) -> Result<ArrivalDelay, DelayError> {
    let planned = first_time(&[&times.published_arrival, &times.scheduled_gate_arrival])?
        .ok_or(DelayError::MissingPlannedArrival)?
        .1;

    let (source, mut actual) = first_time(&[
        &times.actual_gate_arrival,
        &times.estimated_gate_arrival,
        &times.actual_runway_arrival,
        &times.estimated_runway_arrival,
    ])?
    .ok_or(DelayError::MissingActualArrival)?;

    // Indices 2 and 3 are runway times: add taxi-in to approximate the gate.
    let remark = if source >= 2 {
        actual += taxi_in;
        Some(RUNWAY_REMARK.to_string())
    } else {
        None
    };

    let delta_ms = (actual - planned).num_milliseconds();
    let minutes = (delta_ms as f64 / 60_000.0).round() as i64;

    Ok(ArrivalDelay { minutes, remark })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(raw: &str) -> Option<ProviderTime> {
        Some(ProviderTime {
            date_utc: Some(raw.to_string()),
        })
    }

    fn taxi_in() -> chrono::Duration {
        chrono::Duration::minutes(15)
    }

    #[test]
    fn gate_arrival_delay() {
        let times = OperationalTimes {
            published_arrival: time("2017-03-01T10:00:00.000Z"),
            actual_gate_arrival: time("2017-03-01T10:23:00.000Z"),
            ..Default::default()
        };
        let delay = compute_arrival_delay(&times, taxi_in()).unwrap();
        assert_eq!(delay.minutes, 23);
        assert_eq!(delay.remark, None);
    }

    #[test]
    fn early_arrival_is_negative() {
        let times = OperationalTimes {
            published_arrival: time("2017-03-01T10:00:00.000Z"),
            actual_gate_arrival: time("2017-03-01T09:48:00.000Z"),
            ..Default::default()
        };
        let delay = compute_arrival_delay(&times, taxi_in()).unwrap();
        assert_eq!(delay.minutes, -12);
    }

    #[test]
    fn scheduled_gate_fallback_for_planned() {
        let times = OperationalTimes {
            scheduled_gate_arrival: time("2017-03-01T10:00:00.000Z"),
            estimated_gate_arrival: time("2017-03-01T10:05:00.000Z"),
            ..Default::default()
        };
        let delay = compute_arrival_delay(&times, taxi_in()).unwrap();
        assert_eq!(delay.minutes, 5);
        assert_eq!(delay.remark, None);
    }

    #[test]
    fn runway_arrival_gets_taxi_in_and_remark() {
        let times = OperationalTimes {
            published_arrival: time("2017-03-01T10:00:00.000Z"),
            actual_runway_arrival: time("2017-03-01T10:10:00.000Z"),
            ..Default::default()
        };
        let delay = compute_arrival_delay(&times, taxi_in()).unwrap();
        assert_eq!(delay.minutes, 25);
        assert_eq!(delay.remark.as_deref(), Some(RUNWAY_REMARK));
    }

    #[test]
    fn gate_time_preferred_over_runway() {
        let times = OperationalTimes {
            published_arrival: time("2017-03-01T10:00:00.000Z"),
            actual_gate_arrival: time("2017-03-01T10:20:00.000Z"),
            actual_runway_arrival: time("2017-03-01T10:05:00.000Z"),
            ..Default::default()
        };
        let delay = compute_arrival_delay(&times, taxi_in()).unwrap();
        assert_eq!(delay.minutes, 20);
        assert_eq!(delay.remark, None);
    }

    #[test]
    fn missing_planned_arrival() {
        let times = OperationalTimes {
            actual_gate_arrival: time("2017-03-01T10:23:00.000Z"),
            ..Default::default()
        };
        assert_eq!(
            compute_arrival_delay(&times, taxi_in()).unwrap_err(),
            DelayError::MissingPlannedArrival
        );
    }

    #[test]
    fn missing_actual_arrival() {
        let times = OperationalTimes {
            published_arrival: time("2017-03-01T10:00:00.000Z"),
            ..Default::default()
        };
        assert_eq!(
            compute_arrival_delay(&times, taxi_in()).unwrap_err(),
            DelayError::MissingActualArrival
        );
    }

    #[test]
    fn garbage_timestamp_is_loud() {
        let times = OperationalTimes {
            published_arrival: time("not-a-timestamp"),
            actual_gate_arrival: time("2017-03-01T10:23:00.000Z"),
            ..Default::default()
        };
        assert_eq!(
            compute_arrival_delay(&times, taxi_in()).unwrap_err(),
            DelayError::BadTimestamp("not-a-timestamp".to_string())
        );
    }
}
