mod config;
mod error;
mod together;

pub use config::{CompletionConfig, ProviderKind, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use error::{CompletionError, ConfigError, Result};
pub use together::TogetherClient;

/// A hosted (or local) text completion backend.
///
/// The reply is free text and must be treated as untrusted by callers.
pub trait CompletionProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Provider that never answers. Every reply is empty, so callers fall back
/// to their local extraction path.
#[derive(Debug, Clone, Default)]
pub struct OfflineCompletion;

impl CompletionProvider for OfflineCompletion {
    fn provider_name(&self) -> &'static str {
        "offline"
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        Ok(String::new())
    }
}

#[derive(Debug, Clone)]
pub enum Completion {
    Together(TogetherClient),
    Offline(OfflineCompletion),
}

impl Completion {
    pub fn offline() -> Self {
        Self::Offline(OfflineCompletion)
    }

    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        match config.provider {
            ProviderKind::Together => Ok(Self::Together(TogetherClient::new(config)?)),
            ProviderKind::Offline => Ok(Self::offline()),
        }
    }
}

impl CompletionProvider for Completion {
    fn provider_name(&self) -> &'static str {
        match self {
            Completion::Together(client) => client.provider_name(),
            Completion::Offline(client) => client.provider_name(),
        }
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        match self {
            Completion::Together(client) => client.complete(system, user).await,
            Completion::Offline(client) => client.complete(system, user).await,
        }
    }
}
