mod bootstrap;
mod composer;
mod resolver;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use skybot_completion::CompletionProvider;
use skybot_core::{
    canned_reply, classify_intent, ChatRole, ChatTurn, FlightNumber, ResolvedQuery, ResponsePayload,
};
use skybot_observability::AppMetrics;
use skybot_storage::{ChatHistoryRepository, FlightRepository};
use tracing::{info, instrument, warn};

pub use bootstrap::{build_assistant, AssistantConfig};
pub use composer::ResponseComposer;
pub use resolver::{IdentifierResolver, EXTRACTION_INSTRUCTION};

pub struct FlightAssistant<S, C>
where
    S: FlightRepository + ChatHistoryRepository,
    C: CompletionProvider,
{
    resolver: IdentifierResolver<C>,
    composer: ResponseComposer<S>,
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
}

impl<S, C> FlightAssistant<S, C>
where
    S: FlightRepository + ChatHistoryRepository,
    C: CompletionProvider,
{
    pub fn new(store: Arc<S>, completion: Arc<C>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            resolver: IdentifierResolver::new(completion, metrics.clone()),
            composer: ResponseComposer::new(store.clone(), metrics.clone()),
            store,
            metrics,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<AppMetrics> {
        &self.metrics
    }

    pub fn completion_provider(&self) -> &'static str {
        self.resolver.provider_name()
    }

    /// Routes one message: canned replies for greeting/farewell/help and
    /// out-of-domain text, resolve-then-lookup for flight questions.
    ///
    /// Fails only when the completion call fails.
    #[instrument(skip(self, text))]
    pub async fn answer(&self, text: &str) -> Result<ResponsePayload> {
        let started = Instant::now();
        self.metrics.inc_request();

        let intent = classify_intent(text);
        let outcome = match canned_reply(intent) {
            Some(reply) => {
                self.metrics.inc_canned_reply();
                Ok(ResponsePayload::text(reply))
            }
            None => self.answer_flight_query(text).await,
        };

        self.metrics.observe_latency(started.elapsed());
        let payload = outcome?;
        info!(
            intent = ?intent,
            has_flight_data = payload.flight_data.is_some(),
            latency_ms = started.elapsed().as_millis(),
            "message answered"
        );

        Ok(payload)
    }

    /// Resolver then composer, skipping the keyword dispatch.
    pub async fn answer_flight_query(&self, text: &str) -> Result<ResponsePayload> {
        self.metrics.inc_flight_query();
        let resolved = self.resolve(text).await?;
        Ok(self.composer.compose(resolved.flight_number.as_ref()).await)
    }

    pub async fn resolve(&self, text: &str) -> Result<ResolvedQuery> {
        self.resolver
            .resolve(text)
            .await
            .context("flight number extraction failed")
    }

    pub async fn lookup(&self, flight_number: Option<&FlightNumber>) -> ResponsePayload {
        self.composer.compose(flight_number).await
    }

    /// [`Self::answer`] plus an append to the chat history. History is
    /// write-only; a failed append is logged and does not fail the turn.
    pub async fn converse(&self, session_id: &str, text: &str) -> Result<ResponsePayload> {
        self.record_turn(session_id, ChatRole::User, text).await;
        let payload = self.answer(text).await?;
        self.record_turn(session_id, ChatRole::Assistant, &payload.answer)
            .await;
        Ok(payload)
    }

    async fn record_turn(&self, session_id: &str, role: ChatRole, content: &str) {
        let turn = ChatTurn::now(session_id, role, content);
        if let Err(error) = self.store.append_turn(&turn).await {
            warn!(
                session_id = %session_id,
                role = role.as_str(),
                error = %format!("{error:#}"),
                "failed to append chat history"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::anyhow;
    use skybot_completion::{Completion, CompletionError};
    use skybot_core::intent::{FAREWELL_REPLY, GREETING_REPLY, OUT_OF_DOMAIN_REPLY};
    use skybot_core::FlightRecord;
    use skybot_storage::{sample_flights, MemoryStore, Store, StoredFlight};

    use super::*;

    struct FailingCompletion;

    impl CompletionProvider for FailingCompletion {
        fn provider_name(&self) -> &'static str {
            "failing"
        }

        async fn complete(&self, _system: &str, _user: &str) -> skybot_completion::Result<String> {
            Err(CompletionError::EmptyChoices)
        }
    }

    struct SlowFailingCompletion;

    impl CompletionProvider for SlowFailingCompletion {
        fn provider_name(&self) -> &'static str {
            "slow-failing"
        }

        async fn complete(&self, _system: &str, _user: &str) -> skybot_completion::Result<String> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(CompletionError::EmptyChoices)
        }
    }

    /// Flights are served, but every history write fails.
    struct ReadOnlyStore(MemoryStore);

    impl FlightRepository for ReadOnlyStore {
        async fn find_flight(&self, flight_number: &str) -> Result<Option<StoredFlight>> {
            self.0.find_flight(flight_number).await
        }

        async fn insert_flights(&self, records: &[FlightRecord]) -> Result<Vec<String>> {
            self.0.insert_flights(records).await
        }
    }

    impl ChatHistoryRepository for ReadOnlyStore {
        async fn append_turn(&self, _turn: &ChatTurn) -> Result<()> {
            Err(anyhow!("database is read-only"))
        }
    }

    async fn offline_assistant() -> FlightAssistant<Store, Completion> {
        FlightAssistant::new(
            Arc::new(Store::seeded_memory().await.unwrap()),
            Arc::new(Completion::offline()),
            AppMetrics::shared(),
        )
    }

    #[tokio::test]
    async fn greeting_wins_over_embedded_flight() {
        let assistant = offline_assistant().await;
        let payload = assistant
            .answer("hello, what about flight AI123")
            .await
            .unwrap();

        assert_eq!(payload.answer, GREETING_REPLY);
        assert!(payload.flight_data.is_none());
        assert_eq!(assistant.metrics().snapshot().flight_queries_total, 0);
    }

    #[tokio::test]
    async fn flight_question_reaches_the_store() {
        let assistant = offline_assistant().await;
        let payload = assistant
            .answer("When does Flight AI123 depart?")
            .await
            .unwrap();

        assert_eq!(
            payload.answer,
            "Flight AI123 departs at 08:00 AM to Delhi. Current status: Delayed."
        );
        assert_eq!(payload.flight_data.unwrap().destination, "Delhi");
    }

    #[tokio::test]
    async fn flight_word_without_code_gets_guidance() {
        let assistant = offline_assistant().await;
        let payload = assistant.answer("status of my flight?").await.unwrap();

        assert!(payload.answer.starts_with("No valid flight number found"));
    }

    #[tokio::test]
    async fn canned_branches() {
        let assistant = offline_assistant().await;
        assert_eq!(assistant.answer("bye").await.unwrap().answer, FAREWELL_REPLY);
        assert_eq!(
            assistant.answer("tell me a joke").await.unwrap().answer,
            OUT_OF_DOMAIN_REPLY
        );
    }

    #[tokio::test]
    async fn completion_failure_fails_the_request() {
        let assistant = FlightAssistant::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FailingCompletion),
            AppMetrics::shared(),
        );

        let error = assistant
            .answer("When does Flight AI123 depart?")
            .await
            .unwrap_err();
        assert!(error.downcast_ref::<CompletionError>().is_some());
        assert_eq!(assistant.metrics().snapshot().completion_failures_total, 1);

        // canned replies never touch the completion provider
        assert!(assistant.answer("help").await.is_ok());
    }

    #[tokio::test]
    async fn converse_records_both_turns() {
        let store = Arc::new(MemoryStore::new());
        let assistant =
            FlightAssistant::new(store.clone(), Arc::new(Completion::offline()), AppMetrics::shared());

        assistant.converse("session-1", "EK500?").await.unwrap();
        assert_eq!(store.history_len(), 2);
    }

    #[tokio::test]
    async fn history_failure_does_not_fail_the_turn() {
        let flights = MemoryStore::new();
        flights.insert_flights(&sample_flights()).await.unwrap();
        let assistant = FlightAssistant::new(
            Arc::new(ReadOnlyStore(flights)),
            Arc::new(Completion::offline()),
            AppMetrics::shared(),
        );

        let payload = assistant
            .converse("session-1", "When does Flight LH789 depart?")
            .await
            .unwrap();
        assert_eq!(
            payload.answer,
            "Flight LH789 departs at 02:00 PM to Frankfurt. Current status: Boarding."
        );
        assert!(payload.flight_data.is_some());
    }

    #[tokio::test]
    async fn latency_is_recorded_for_failed_requests() {
        let assistant = FlightAssistant::new(
            Arc::new(MemoryStore::new()),
            Arc::new(SlowFailingCompletion),
            AppMetrics::shared(),
        );

        assert!(assistant.answer("Where is EK500 going?").await.is_err());

        let snapshot = assistant.metrics().snapshot();
        assert_eq!(snapshot.requests_total, 1);
        assert!(snapshot.avg_latency_millis >= 20.0);
    }

    #[tokio::test]
    async fn failed_request_keeps_only_the_user_turn() {
        let store = Arc::new(MemoryStore::new());
        let assistant =
            FlightAssistant::new(store.clone(), Arc::new(FailingCompletion), AppMetrics::shared());

        assert!(assistant.converse("session-1", "EK500?").await.is_err());
        assert_eq!(store.history_len(), 1);
    }
}
