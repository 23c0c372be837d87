//! Inbound request parsing.
//!
//! Recognizes free text containing a `DD.MM.YYYY` date token and a flight
//! designator token, and validates the date against the queryable window.
//! Each failure maps to one instructive user-visible message, chosen by the
//! resolver.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d\d)\.(\d\d)\.(\d{4})").unwrap());

static FLIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z0-9]{2})\s*(\d{1,4}[A-Z]?)\b").unwrap());

/// A recognized and validated flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightRequest {
    pub airline: String,
    pub flight_number: String,
    pub date: NaiveDate,
}

impl FlightRequest {
    /// Deterministic feed name, e.g. `"BA950-2017-03-01"`.
    pub fn feed_name(&self) -> String {
        format!(
            "{}{}-{}",
            self.airline,
            self.flight_number,
            self.date.format("%Y-%m-%d")
        )
    }
}

/// Why a request text was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no date and no flight number found")]
    NoTokens,

    #[error("no date found")]
    NoDate,

    #[error("no flight number found")]
    NoFlight,

    #[error("date is not a valid calendar date")]
    InvalidDate,

    #[error("date is in the future")]
    FutureDate,

    #[error("flight is too old to query")]
    TooOld,
}

/// Extract and validate the flight designator and date from `text`.
///
/// `today` anchors the future/stale checks; `max_age_days` is the oldest
/// queryable flight. Matching is case-insensitive (the text is uppercased
/// first), and the date token is removed before matching the flight token so
/// that the year digits cannot be mistaken for a flight number.
pub fn parse_request(
    text: &str,
    today: NaiveDate,
    max_age_days: i64,
) -> Result<FlightRequest, ParseError> {
    let upper = text.trim().to_uppercase();

    let date_match = DATE_RE.captures(&upper);
    let without_date = match &date_match {
        Some(captures) => upper.replacen(&captures[0], "", 1),
        None => upper.clone(),
    };
    let flight_match = FLIGHT_RE.captures(&without_date);

    let (date_captures, flight_captures) = match (date_match, flight_match) {
        (None, None) => return Err(ParseError::NoTokens),
        (None, Some(_)) => return Err(ParseError::NoDate),
        (Some(_), None) => return Err(ParseError::NoFlight),
        (Some(date), Some(flight)) => (date, flight),
    };

    let day: u32 = date_captures[1].parse().map_err(|_| ParseError::InvalidDate)?;
    let month: u32 = date_captures[2].parse().map_err(|_| ParseError::InvalidDate)?;
    let year: i32 = date_captures[3].parse().map_err(|_| ParseError::InvalidDate)?;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(ParseError::InvalidDate)?;

    if date > today {
        return Err(ParseError::FutureDate);
    }
    if date < today - chrono::Duration::days(max_age_days) {
        return Err(ParseError::TooOld);
    }

    Ok(FlightRequest {
        airline: flight_captures[1].to_string(),
        flight_number: flight_captures[2].to_string(),
        date,
    })
}
