use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use skybot_completion::{Completion, CompletionConfig};
use skybot_observability::AppMetrics;
use skybot_storage::Store;
use tracing::info;

use crate::FlightAssistant;

/// Everything needed to construct a [`FlightAssistant`] against real
/// collaborators.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub completion: CompletionConfig,
    pub database_url: Option<String>,
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self> {
        let completion =
            CompletionConfig::from_env().context("invalid completion configuration")?;
        let database_url = env::var("SKYBOT_DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            completion,
            database_url,
        })
    }

    pub fn offline_in_memory() -> Self {
        Self {
            completion: CompletionConfig::offline(),
            database_url: None,
        }
    }
}

/// Opens the store and builds the completion client once. Any failure here
/// is a startup error.
pub async fn build_assistant(
    config: &AssistantConfig,
    metrics: Arc<AppMetrics>,
) -> Result<FlightAssistant<Store, Completion>> {
    let completion =
        Completion::from_config(&config.completion).context("failed to build completion client")?;

    let store = match config.database_url.as_deref() {
        Some(database_url) => Store::sqlite(database_url).await?,
        None => {
            info!("SKYBOT_DATABASE_URL not set; using in-memory store with sample flights");
            Store::seeded_memory().await?
        }
    };

    Ok(FlightAssistant::new(
        Arc::new(store),
        Arc::new(completion),
        metrics,
    ))
}
