use std::sync::Arc;

use skybot_core::{compose_flight_reply, FlightNumber, LookupOutcome, ResponsePayload};
use skybot_observability::AppMetrics;
use skybot_storage::FlightRepository;
use tracing::{debug, warn};

pub struct ResponseComposer<S> {
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
}

impl<S> ResponseComposer<S>
where
    S: FlightRepository,
{
    pub fn new(store: Arc<S>, metrics: Arc<AppMetrics>) -> Self {
        Self { store, metrics }
    }

    /// One store query per resolved number, none otherwise. Store failures
    /// are logged and answered like a miss.
    pub async fn compose(&self, flight_number: Option<&FlightNumber>) -> ResponsePayload {
        let outcome = match flight_number {
            Some(flight_number) => self.lookup(flight_number).await,
            None => LookupOutcome::Missing,
        };

        compose_flight_reply(flight_number, outcome)
    }

    async fn lookup(&self, flight_number: &FlightNumber) -> LookupOutcome {
        match self.store.find_flight(flight_number.as_str()).await {
            Ok(Some(doc)) => {
                let record = doc.into_record();
                if record.is_not_found_sentinel() {
                    self.metrics.inc_lookup_miss();
                    LookupOutcome::Missing
                } else {
                    self.metrics.inc_lookup_hit();
                    LookupOutcome::Found(record)
                }
            }
            Ok(None) => {
                self.metrics.inc_lookup_miss();
                debug!(flight_number = %flight_number, "flight not in store");
                LookupOutcome::Missing
            }
            Err(error) => {
                self.metrics.inc_store_error();
                warn!(
                    flight_number = %flight_number,
                    error = %format!("{error:#}"),
                    "flight lookup failed; answering as not found"
                );
                LookupOutcome::Failed
            }
        }
    }
}
