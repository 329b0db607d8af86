use crate::flight_code::contains_flight_number;
use crate::models::Intent;

const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "greetings",
    "good morning",
    "good afternoon",
    "good evening",
];

const FAREWELLS: &[&str] = &["bye", "goodbye", "see you", "farewell", "exit", "quit"];

const HELP_QUERIES: &[&str] = &[
    "help",
    "what can you do",
    "how does this work",
    "instructions",
];

pub const GREETING_REPLY: &str = "Hello! I'm SkyBot, your flight information assistant. How can I help you today? You can ask me about flight status, departure times, or destinations.";

pub const FAREWELL_REPLY: &str =
    "Thank you for using SkyBot! Have a safe journey and a wonderful day. Goodbye!";

pub const HELP_REPLY: &str = "I can help you find information about flights. Try asking questions like:\n- When does Flight AI123 depart?\n- What is the status of Flight EK500?\n- Tell me about Flight LH789\nJust make sure to include a flight number in your question!";

pub const OUT_OF_DOMAIN_REPLY: &str = "I'm specialized in providing flight information. Please ask me about a specific flight by including the flight number (like AI123 or EK500) in your question.";

/// Keyword routing. Sets are checked greeting, farewell, help, in that order,
/// with plain substring matching, so "hello, flight AI123" is a greeting and
/// "which" counts as "hi".
pub fn classify_intent(text: &str) -> Intent {
    let lower = text.to_lowercase();

    if contains_any(&lower, GREETINGS) {
        return Intent::Greeting;
    }

    if contains_any(&lower, FAREWELLS) {
        return Intent::Farewell;
    }

    if contains_any(&lower, HELP_QUERIES) {
        return Intent::Help;
    }

    if looks_like_flight_query(text) {
        return Intent::FlightQuery;
    }

    Intent::OutOfDomain
}

pub fn looks_like_flight_query(text: &str) -> bool {
    text.to_lowercase().contains("flight") || contains_flight_number(text)
}

/// Fixed reply for every intent that does not need a lookup.
pub fn canned_reply(intent: Intent) -> Option<&'static str> {
    match intent {
        Intent::Greeting => Some(GREETING_REPLY),
        Intent::Farewell => Some(FAREWELL_REPLY),
        Intent::Help => Some(HELP_REPLY),
        Intent::OutOfDomain => Some(OUT_OF_DOMAIN_REPLY),
        Intent::FlightQuery => None,
    }
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
