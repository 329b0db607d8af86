use std::sync::Arc;

use skybot_completion::{CompletionError, CompletionProvider};
use skybot_core::{FlightNumber, ResolutionSource, ResolvedQuery};
use skybot_observability::AppMetrics;
use tracing::debug;

pub const EXTRACTION_INSTRUCTION: &str =
    "Extract the flight number from the query and return ONLY the flight number.";

/// Turns free text into a flight number.
///
/// The completion reply is only trusted after a full, anchored pattern
/// match. When it fails that check the original text is searched instead and
/// the first embedded code wins.
pub struct IdentifierResolver<C> {
    completion: Arc<C>,
    metrics: Arc<AppMetrics>,
}

impl<C> IdentifierResolver<C>
where
    C: CompletionProvider,
{
    pub fn new(completion: Arc<C>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            completion,
            metrics,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.completion.provider_name()
    }

    /// Completion failures are returned as-is; there is no retry and no
    /// silent fallback to the pattern path.
    pub async fn resolve(&self, text: &str) -> Result<ResolvedQuery, CompletionError> {
        if text.trim().is_empty() {
            self.metrics.inc_unresolved();
            return Ok(ResolvedQuery::unresolved(text));
        }

        let reply = match self.completion.complete(EXTRACTION_INSTRUCTION, text).await {
            Ok(reply) => reply,
            Err(error) => {
                self.metrics.inc_completion_failure();
                return Err(error);
            }
        };

        if let Ok(flight_number) = FlightNumber::parse(reply.trim()) {
            self.metrics.inc_remote_resolution();
            debug!(flight_number = %flight_number, "flight number taken from completion");
            return Ok(ResolvedQuery::resolved(
                text,
                flight_number,
                ResolutionSource::RemoteCompletion,
            ));
        }

        if let Some(flight_number) = FlightNumber::find_in(text) {
            self.metrics.inc_pattern_fallback();
            debug!(
                flight_number = %flight_number,
                completion_reply_len = reply.len(),
                "completion reply rejected; flight number taken from pattern search"
            );
            return Ok(ResolvedQuery::resolved(
                text,
                flight_number,
                ResolutionSource::PatternMatch,
            ));
        }

        self.metrics.inc_unresolved();
        Ok(ResolvedQuery::unresolved(text))
    }
}
