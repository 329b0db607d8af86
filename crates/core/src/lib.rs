pub mod flight_code;
pub mod intent;
pub mod models;
pub mod replies;

pub use flight_code::{FlightNumber, InvalidFlightNumber};
pub use intent::{canned_reply, classify_intent, looks_like_flight_query};
pub use models::*;
pub use replies::{compose_flight_reply, describe_flight, is_affirmative};
