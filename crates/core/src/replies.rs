use crate::flight_code::FlightNumber;
use crate::models::{LookupOutcome, ResponsePayload};
use crate::FlightRecord;

pub const NO_FLIGHT_NUMBER_REPLY: &str = "No valid flight number found in your query. Please provide a flight number in the format like 'AI123' or 'EK500'.";

const AFFIRMATIVE: &[&str] = &["yes", "y", "sure", "yeah"];

/// Maps a resolution/lookup result to the user-facing payload. A record is
/// attached only for `LookupOutcome::Found` with a non-sentinel status.
pub fn compose_flight_reply(
    flight_number: Option<&FlightNumber>,
    outcome: LookupOutcome,
) -> ResponsePayload {
    let Some(flight_number) = flight_number else {
        return ResponsePayload::text(NO_FLIGHT_NUMBER_REPLY);
    };

    match outcome {
        LookupOutcome::Found(record) if !record.is_not_found_sentinel() => {
            let answer = format!(
                "Flight {} departs at {} to {}. Current status: {}.",
                record.flight_number, record.departure_time, record.destination, record.status
            );
            ResponsePayload::with_record(answer, record)
        }
        LookupOutcome::Found(_) | LookupOutcome::Missing | LookupOutcome::Failed => {
            ResponsePayload::text(not_found_reply(flight_number))
        }
    }
}

pub fn not_found_reply(flight_number: &FlightNumber) -> String {
    format!(
        "Flight {} not found in our database. Please check the flight number and try again.",
        flight_number
    )
}

pub fn describe_flight(record: &FlightRecord) -> String {
    format!(
        "Here are the complete details for Flight {}:\n- Departure Time: {}\n- Destination: {}\n- Current Status: {}",
        record.flight_number, record.departure_time, record.destination, record.status
    )
}

pub fn is_affirmative(reply: &str) -> bool {
    let reply = reply.trim().to_lowercase();
    AFFIRMATIVE.contains(&reply.as_str())
}
