use skybot_core::FlightRecord;

/// The fixed sample batch written by `skybot seed`.
pub fn sample_flights() -> Vec<FlightRecord> {
    vec![
        FlightRecord::new("AI123", "08:00 AM", "Delhi", "Delayed"),
        FlightRecord::new("EK500", "10:30 AM", "Dubai", "On Time"),
        FlightRecord::new("LH789", "02:00 PM", "Frankfurt", "Boarding"),
        FlightRecord::new("EK900", "10:30 AM", "Kathmandu", "On Time"),
        FlightRecord::new("LH788", "09:00 PM", "Coimbatore", "Boarding"),
    ]
}
