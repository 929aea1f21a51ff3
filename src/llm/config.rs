//! AI provider configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Model name meaning "whatever the provider's default is"
pub const DEFAULT_MODEL: &str = "default";

/// Remote chat-completion provider
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI-style chat completions
    OpenAi,
    /// Gemini generate-content API
    #[default]
    Gemini,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::OpenAi, Provider::Gemini];

    /// Display name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Gemini => "Gemini",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o",
            Provider::Gemini => "gemini-2.5-flash",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com",
            Provider::Gemini => "https://generativelanguage.googleapis.com",
        }
    }

    /// Environment variable consulted for an API key when none is stored
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            other => Err(format!("unknown AI provider: {other}")),
        }
    }
}

/// Configuration for the AI request client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Which provider to call
    pub provider: Provider,

    /// API key, never logged
    pub api_key: Option<String>,

    /// Model name, or `"default"` for the provider default
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens in the reply
    pub max_tokens: u32,

    /// Base URL override (proxies, self-hosted gateways)
    pub endpoint: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            endpoint: None,
        }
    }
}

impl AiConfig {
    /// Create a configuration for the given provider
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            ..Default::default()
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the base URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// The API key, if one is set and not blank
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Model actually sent to the provider
    pub fn resolved_model(&self) -> &str {
        let model = self.model.trim();
        if model.is_empty() || model == DEFAULT_MODEL {
            self.provider.default_model()
        } else {
            model
        }
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.endpoint
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    /// Fill the provider and key from the environment where they are unset.
    ///
    /// `MURMUR_PROVIDER` only applies while no key is stored, so a user's
    /// saved choice is never overridden.
    pub fn with_env_defaults(mut self) -> Self {
        self.apply_env(|name| std::env::var(name).ok());
        self
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.credential().is_some() {
            return;
        }
        if let Some(provider) = lookup("MURMUR_PROVIDER").and_then(|p| p.parse().ok()) {
            self.provider = provider;
        }
        if let Some(key) = lookup(self.provider.api_key_env()).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AiConfig::default();
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.model, "default");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 1000);
        assert!(config.credential().is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let config = AiConfig::new(Provider::OpenAi)
            .with_api_key("sk-test")
            .with_model("gpt-4o-mini")
            .with_temperature(0.2)
            .with_max_tokens(256)
            .with_endpoint("http://localhost:8080/");

        assert_eq!(config.credential(), Some("sk-test"));
        assert_eq!(config.resolved_model(), "gpt-4o-mini");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_default_model_resolves_per_provider() {
        assert_eq!(AiConfig::new(Provider::OpenAi).resolved_model(), "gpt-4o");
        assert_eq!(AiConfig::new(Provider::Gemini).resolved_model(), "gemini-2.5-flash");
    }

    #[test]
    fn test_blank_key_is_not_a_credential() {
        let config = AiConfig::default().with_api_key("   ");
        assert!(config.credential().is_none());
    }

    #[test]
    fn test_provider_parse_and_serde() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("gemini".parse::<Provider>().unwrap(), Provider::Gemini);
        assert!("claude".parse::<Provider>().is_err());

        assert_eq!(serde_json::to_string(&Provider::OpenAi).unwrap(), "\"openai\"");
        assert_eq!(serde_json::to_string(&Provider::Gemini).unwrap(), "\"gemini\"");
    }

    #[test]
    fn test_env_seeds_provider_and_key() {
        let mut config = AiConfig::default();
        config.apply_env(|name| match name {
            "MURMUR_PROVIDER" => Some("openai".to_string()),
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            _ => None,
        });
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.credential(), Some("sk-env"));
    }

    #[test]
    fn test_env_does_not_override_stored_key() {
        let mut config = AiConfig::new(Provider::Gemini).with_api_key("stored");
        config.apply_env(|name| match name {
            "MURMUR_PROVIDER" => Some("openai".to_string()),
            _ => Some("from-env".to_string()),
        });
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.credential(), Some("stored"));
    }
}
