use std::env;

use crate::error::{ConfigError, Result};

pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo";
pub const DEFAULT_ENDPOINT: &str = "https://api.together.xyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Together,
    Offline,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "together" | "together-ai" | "togetherai" => Some(Self::Together),
            "offline" | "none" | "disabled" => Some(Self::Offline),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Together => "together",
            Self::Offline => "offline",
        }
    }
}

/// Settings for the remote completion collaborator.
///
/// Built once at startup and handed to the client constructor; a missing
/// credential is reported here rather than on the first request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: Option<u64>,
}

impl CompletionConfig {
    pub fn offline() -> Self {
        Self {
            provider: ProviderKind::Offline,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: None,
        }
    }

    pub fn together(api_key: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Together,
            api_key: Some(api_key.into()),
            ..Self::offline()
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Reads the `SKYBOT_COMPLETION_*` / `TOGETHER_API_KEY` variables through
    /// `lookup` and validates the result.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let provider = match non_empty("SKYBOT_COMPLETION_PROVIDER") {
            Some(value) => ProviderKind::parse(&value)
                .ok_or_else(|| ConfigError::UnsupportedProvider(value.clone()))?,
            None => ProviderKind::Together,
        };

        let timeout_secs = match non_empty("SKYBOT_COMPLETION_TIMEOUT_SECS") {
            Some(value) => Some(value.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidNumber {
                    var: "SKYBOT_COMPLETION_TIMEOUT_SECS",
                    reason: "expected whole seconds",
                }
            })?),
            None => None,
        };

        let config = Self {
            provider,
            api_key: non_empty("TOGETHER_API_KEY"),
            model: non_empty("SKYBOT_COMPLETION_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: non_empty("SKYBOT_COMPLETION_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider == ProviderKind::Offline {
            return Ok(());
        }

        if self.api_key.as_deref().map_or(true, |key| key.trim().is_empty()) {
            return Err(ConfigError::MissingVar("TOGETHER_API_KEY").into());
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel.into());
        }

        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidFormat {
                var: "SKYBOT_COMPLETION_ENDPOINT",
                reason: "must start with http:// or https://",
            }
            .into());
        }

        Ok(())
    }
}
