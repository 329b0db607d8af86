use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static CANONICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,3}[0-9]{2,4}$").expect("valid canonical flight regex"));

static EMBEDDED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2,3}[0-9]{2,4}\b").expect("valid embedded flight regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{0}` is not a flight number (expected 2-3 uppercase letters followed by 2-4 digits)")]
pub struct InvalidFlightNumber(pub String);

/// A flight identifier that passed the canonical pattern check.
///
/// Values only come from [`FlightNumber::parse`] (full, anchored match) or
/// [`FlightNumber::find_in`] (first whole-word match inside free text), so a
/// `FlightNumber` is always safe to use as a lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlightNumber(String);

impl FlightNumber {
    pub fn parse(value: &str) -> Result<Self, InvalidFlightNumber> {
        if CANONICAL.is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidFlightNumber(value.to_string()))
        }
    }

    /// First whole word of `text` shaped like a flight number. Case-sensitive;
    /// later candidates are ignored, and codes glued to other letters or
    /// digits do not count.
    pub fn find_in(text: &str) -> Option<Self> {
        EMBEDDED
            .find(text)
            .map(|found| Self(found.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlightNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FlightNumber {
    type Error = InvalidFlightNumber;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FlightNumber> for String {
    fn from(value: FlightNumber) -> Self {
        value.0
    }
}

pub fn contains_flight_number(text: &str) -> bool {
    EMBEDDED.is_match(text)
}
