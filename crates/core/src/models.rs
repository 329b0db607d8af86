use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flight_code::FlightNumber;

/// Status value the store boundary uses to signal "no such flight" without
/// raising an error.
pub const NOT_FOUND_STATUS: &str = "Not Found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub flight_number: String,
    pub departure_time: String,
    pub destination: String,
    pub status: String,
}

impl FlightRecord {
    pub fn new(
        flight_number: impl Into<String>,
        departure_time: impl Into<String>,
        destination: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            flight_number: flight_number.into(),
            departure_time: departure_time.into(),
            destination: destination.into(),
            status: status.into(),
        }
    }

    pub fn is_not_found_sentinel(&self) -> bool {
        self.status == NOT_FOUND_STATUS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    RemoteCompletion,
    PatternMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub raw_text: String,
    pub flight_number: Option<FlightNumber>,
    pub source: Option<ResolutionSource>,
}

impl ResolvedQuery {
    pub fn unresolved(raw_text: &str) -> Self {
        Self {
            raw_text: raw_text.to_string(),
            flight_number: None,
            source: None,
        }
    }

    pub fn resolved(raw_text: &str, flight_number: FlightNumber, source: ResolutionSource) -> Self {
        Self {
            raw_text: raw_text.to_string(),
            flight_number: Some(flight_number),
            source: Some(source),
        }
    }
}

/// Result of a single exact-match lookup, as seen by the reply composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(FlightRecord),
    Missing,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_data: Option<FlightRecord>,
}

impl ResponsePayload {
    pub fn text(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            flight_data: None,
        }
    }

    pub fn with_record(answer: impl Into<String>, record: FlightRecord) -> Self {
        Self {
            answer: answer.into(),
            flight_data: Some(record),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Farewell,
    Help,
    FlightQuery,
    OutOfDomain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub session_id: String,
    pub role: ChatRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn now(session_id: &str, role: ChatRole, content: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            at: Utc::now(),
        }
    }
}
