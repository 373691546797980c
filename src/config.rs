//! Process configuration, loaded once at startup from the environment.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default `OpenRouter` API root.
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Default model identifier.
const DEFAULT_MODEL: &str = "meta-llama/llama-3.3-8b-instruct:free";
/// Default server port.
pub const DEFAULT_PORT: u16 = 10_000;

/// Configuration errors, all reported at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No non-blank provider credential configured.
    #[error("no provider credentials configured; set OPENROUTER_API_KEYS or OPENROUTER_API_KEY_PRIMARY")]
    NoCredentials,
    /// An environment value could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Environment key.
        key: String,
        /// Raw value.
        value: String,
    },
    /// A value is out of its allowed range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Base URL is not a valid URL.
    #[error("invalid provider base url: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion provider settings.
    pub provider: ProviderConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Per-client rate ceilings.
    pub rate_limit: RateLimitConfig,
    /// Per-mode generation defaults.
    pub prompt: PromptConfig,
}

/// Provider endpoint and credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API keys in failover priority order.
    #[serde(default, skip_serializing)]
    pub api_keys: Vec<String>,
    /// API root, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Sent as `HTTP-Referer`.
    pub site_url: String,
    /// Sent as `X-Title`.
    pub site_name: String,
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            site_url: format!("http://localhost:{DEFAULT_PORT}"),
            site_name: "Discussion Facilitator".to_string(),
            timeout_secs: 25,
        }
    }
}

impl ProviderConfig {
    /// Per-attempt timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Number of non-blank configured keys.
    #[must_use]
    pub fn usable_keys(&self) -> usize {
        self.api_keys.iter().filter(|k| !k.trim().is_empty()).count()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_keys", &format_args!("<{} redacted>", self.api_keys.len()))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("site_url", &self.site_url)
            .field("site_name", &self.site_name)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
    /// Origins allowed by CORS. Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Request ceilings per client identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per rolling day, all endpoints.
    pub daily: u32,
    /// Requests per rolling hour, all endpoints.
    pub hourly: u32,
    /// Chat requests per rolling minute.
    pub chat_per_minute: u32,
    /// Conclusion requests per rolling minute.
    pub conclusion_per_minute: u32,
    /// Seconds between sweeps of idle client state.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            daily: 200,
            hourly: 50,
            chat_per_minute: 15,
            conclusion_per_minute: 10,
            sweep_interval_secs: 300,
        }
    }
}

/// Sampling defaults for one mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationDefaults {
    /// Sampling temperature.
    pub temperature: f32,
    /// Token budget.
    pub max_tokens: u32,
    /// Nucleus sampling.
    pub top_p: f32,
    /// Frequency penalty.
    pub frequency_penalty: f32,
    /// Presence penalty.
    pub presence_penalty: f32,
}

/// Generation defaults for both modes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Chat facilitation.
    pub facilitate: GenerationDefaults,
    /// Conclusion generation.
    pub conclude: GenerationDefaults,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            facilitate: GenerationDefaults {
                temperature: 0.7,
                max_tokens: 1000,
                top_p: 0.9,
                frequency_penalty: 0.5,
                presence_penalty: 0.3,
            },
            conclude: GenerationDefaults {
                temperature: 0.3,
                max_tokens: 1200,
                top_p: 0.9,
                frequency_penalty: 0.2,
                presence_penalty: 0.1,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    ///
    /// Call `dotenvy::dotenv()` beforehand to pick up a `.env` file.
    ///
    /// # Errors
    /// Returns an error if a value cannot be parsed or fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns an error if a value cannot be parsed or fails validation.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = ProviderConfig {
            api_keys: api_keys_from(&get),
            base_url: get("OPENROUTER_BASE_URL").unwrap_or(defaults.provider.base_url),
            model: get("AI_MODEL").unwrap_or(defaults.provider.model),
            site_url: get("SITE_URL").unwrap_or(defaults.provider.site_url),
            site_name: get("SITE_NAME").unwrap_or(defaults.provider.site_name),
            timeout_secs: parse_or(&get, "PROVIDER_TIMEOUT_SECS", defaults.provider.timeout_secs)?,
        };

        let server = ServerConfig {
            port: parse_or(&get, "PORT", defaults.server.port)?,
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|raw| split_list(&raw))
                .unwrap_or(defaults.server.allowed_origins),
        };

        let limits = defaults.rate_limit;
        let rate_limit = RateLimitConfig {
            daily: parse_or(&get, "RATE_LIMIT_DAILY", limits.daily)?,
            hourly: parse_or(&get, "RATE_LIMIT_HOURLY", limits.hourly)?,
            chat_per_minute: parse_or(&get, "RATE_LIMIT_CHAT_PER_MINUTE", limits.chat_per_minute)?,
            conclusion_per_minute: parse_or(
                &get,
                "RATE_LIMIT_CONCLUSION_PER_MINUTE",
                limits.conclusion_per_minute,
            )?,
            sweep_interval_secs: parse_or(
                &get,
                "RATE_LIMIT_SWEEP_SECS",
                limits.sweep_interval_secs,
            )?,
        };

        let mut prompt = defaults.prompt;
        prompt.facilitate.temperature =
            parse_or(&get, "FACILITATE_TEMPERATURE", prompt.facilitate.temperature)?;
        prompt.facilitate.max_tokens =
            parse_or(&get, "FACILITATE_MAX_TOKENS", prompt.facilitate.max_tokens)?;
        prompt.conclude.temperature =
            parse_or(&get, "CONCLUDE_TEMPERATURE", prompt.conclude.temperature)?;
        prompt.conclude.max_tokens =
            parse_or(&get, "CONCLUDE_MAX_TOKENS", prompt.conclude.max_tokens)?;

        let config = Self {
            provider,
            server,
            rate_limit,
            prompt,
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the provider keys.
    #[must_use]
    pub fn with_api_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provider.api_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.provider.usable_keys() == 0 {
            return Err(ConfigError::NoCredentials);
        }

        Url::parse(&self.provider.base_url)?;

        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }

        if !(1..=120).contains(&self.provider.timeout_secs) {
            return Err(ConfigError::Invalid(
                "provider timeout must be between 1 and 120 seconds".to_string(),
            ));
        }

        let limits = &self.rate_limit;
        if limits.daily == 0
            || limits.hourly == 0
            || limits.chat_per_minute == 0
            || limits.conclusion_per_minute == 0
        {
            return Err(ConfigError::Invalid(
                "rate limit ceilings must be > 0".to_string(),
            ));
        }

        if limits.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "rate limit sweep interval must be > 0".to_string(),
            ));
        }

        validate_generation("facilitate", &self.prompt.facilitate)?;
        validate_generation("conclude", &self.prompt.conclude)?;

        Ok(())
    }
}

fn validate_generation(mode: &str, defaults: &GenerationDefaults) -> ConfigResult<()> {
    if !(0.0..=2.0).contains(&defaults.temperature) {
        return Err(ConfigError::Invalid(format!(
            "{mode}.temperature must be within 0..=2"
        )));
    }
    if !(0.0..=1.0).contains(&defaults.top_p) {
        return Err(ConfigError::Invalid(format!("{mode}.top_p must be within 0..=1")));
    }
    if defaults.max_tokens == 0 {
        return Err(ConfigError::Invalid(format!("{mode}.max_tokens must be > 0")));
    }
    Ok(())
}

/// `OPENROUTER_API_KEYS` wins; otherwise the named primary/secondary keys.
fn api_keys_from<F>(get: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(list) = get("OPENROUTER_API_KEYS") {
        return split_list(&list);
    }

    [
        "OPENROUTER_API_KEY_PRIMARY",
        "OPENROUTER_API_KEY_SECONDARY",
        "OPENROUTER_API_KEY",
    ]
    .into_iter()
    .filter_map(get)
    .collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> ConfigResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    get(key).map_or(Ok(default), |raw| {
        raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        })
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> ConfigResult<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_primary_secondary_keys() {
        let config = load(&[
            ("OPENROUTER_API_KEY_PRIMARY", "key-1"),
            ("OPENROUTER_API_KEY_SECONDARY", "key-2"),
        ]);
        let config = config.unwrap_or_else(|e| unreachable!("{e}"));

        assert_eq!(config.provider.api_keys, vec!["key-1", "key-2"]);
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.rate_limit, RateLimitConfig::default());
        assert!((config.prompt.conclude.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_key_list_takes_precedence() {
        let config = load(&[
            ("OPENROUTER_API_KEYS", "a, b ,,c"),
            ("OPENROUTER_API_KEY_PRIMARY", "ignored"),
        ])
        .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(config.provider.api_keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_missing_keys_fail_at_startup() {
        assert!(matches!(load(&[]), Err(ConfigError::NoCredentials)));
        assert!(matches!(
            load(&[("OPENROUTER_API_KEY_PRIMARY", "   ")]),
            Err(ConfigError::NoCredentials)
        ));
    }

    #[test]
    fn test_overrides_and_parse_errors() {
        let config = load(&[
            ("OPENROUTER_API_KEY", "k"),
            ("RATE_LIMIT_CHAT_PER_MINUTE", "3"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("CONCLUDE_MAX_TOKENS", "1500"),
        ])
        .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(config.rate_limit.chat_per_minute, 3);
        assert_eq!(config.server.allowed_origins.len(), 2);
        assert_eq!(config.prompt.conclude.max_tokens, 1500);

        assert!(matches!(
            load(&[("OPENROUTER_API_KEY", "k"), ("PORT", "eighty")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        assert!(matches!(
            load(&[("OPENROUTER_API_KEY", "k"), ("OPENROUTER_BASE_URL", "not a url")]),
            Err(ConfigError::Url(_))
        ));
        assert!(matches!(
            load(&[("OPENROUTER_API_KEY", "k"), ("FACILITATE_TEMPERATURE", "3.5")]),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            load(&[("OPENROUTER_API_KEY", "k"), ("RATE_LIMIT_HOURLY", "0")]),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = AppConfig::default().with_api_keys(["sk-live-123"]);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-live-123"));
    }
}
