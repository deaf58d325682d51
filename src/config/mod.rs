//! Adapter configuration (layered: code > env > config file).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use serde::Deserialize;

use crate::error::{BridgeError, Result};
use crate::provider::openai::DEFAULT_BASE_URL;
use crate::registry::DiscoveryFallback;
use crate::types::GenerationSettings;

pub const DEFAULT_MODEL: &str = "asi1-mini";
pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const ENV_API_KEY: &str = "MCP_BRIDGE_API_KEY";
const ENV_API_KEY_FALLBACK: &str = "ASI1_API_KEY";
const ENV_BASE_URL: &str = "MCP_BRIDGE_BASE_URL";
const ENV_MODEL: &str = "MCP_BRIDGE_MODEL";
const ENV_MAX_ITERATIONS: &str = "MCP_BRIDGE_MAX_ITERATIONS";
const ENV_TIMEOUT_SECS: &str = "MCP_BRIDGE_TIMEOUT_SECS";
const ENV_DISCOVERY_FALLBACK: &str = "MCP_BRIDGE_DISCOVERY_FALLBACK";

/// Immutable settings for one adapter instance.
///
/// ```
/// use mcp_bridge::config::AdapterConfig;
///
/// let config = AdapterConfig::builder()
///     .api_key("sk-test")
///     .model("asi1-mini")
///     .max_iterations(4)
///     .build();
/// assert_eq!(config.max_iterations(), 4);
/// ```
#[derive(Clone, Builder)]
pub struct AdapterConfig {
    #[builder(into)]
    api_key: String,
    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    base_url: String,
    #[builder(into, default = DEFAULT_MODEL.to_string())]
    model: String,
    #[builder(default = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    request_timeout: Duration,
    #[builder(default)]
    discovery_fallback: DiscoveryFallback,
    #[builder(default)]
    settings: GenerationSettings,
}

impl fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_iterations", &self.max_iterations)
            .field("request_timeout", &self.request_timeout)
            .field("discovery_fallback", &self.discovery_fallback)
            .field("settings", &self.settings)
            .finish()
    }
}

impl AdapterConfig {
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Maximum number of decision rounds per message.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Bound applied to every outbound call.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn discovery_fallback(&self) -> DiscoveryFallback {
        self.discovery_fallback
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Reject settings no adapter can run with.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(BridgeError::Configuration("API key is empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(BridgeError::Configuration("model is empty".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(BridgeError::Configuration("base URL is empty".into()));
        }
        if self.max_iterations == 0 {
            return Err(BridgeError::Configuration(
                "max_iterations must be at least 1".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(BridgeError::Configuration(
                "request timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Load the default config file (if present), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let file = match default_config_path() {
            Some(path) if path.exists() => ConfigLayer::from_file(&path)?,
            _ => ConfigLayer::default(),
        };
        let env = ConfigLayer::from_lookup(|key| std::env::var(key).ok())?;
        file.overlay(env).into_config()
    }

    /// Load from environment variables only.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        ConfigLayer::from_lookup(|key| std::env::var(key).ok())?.into_config()
    }

    /// Load from a TOML file only.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        ConfigLayer::from_file(path.as_ref())?.into_config()
    }

    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        ConfigLayer::from_toml_str(raw)?.into_config()
    }
}

/// Platform config location, e.g. `~/.config/mcp-bridge/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "mcp-bridge")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// One partially-specified source of settings.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ConfigLayer {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_iterations: Option<usize>,
    timeout_secs: Option<u64>,
    discovery_fallback: Option<DiscoveryFallback>,
    system_prompt: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl ConfigLayer {
    fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| BridgeError::Configuration(format!("invalid config: {e}")))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            api_key: lookup(ENV_API_KEY).or_else(|| lookup(ENV_API_KEY_FALLBACK)),
            base_url: lookup(ENV_BASE_URL),
            model: lookup(ENV_MODEL),
            max_iterations: parse_var(&lookup, ENV_MAX_ITERATIONS)?,
            timeout_secs: parse_var(&lookup, ENV_TIMEOUT_SECS)?,
            discovery_fallback: parse_var(&lookup, ENV_DISCOVERY_FALLBACK)?,
            ..Self::default()
        })
    }

    /// Values set in `upper` win.
    fn overlay(self, upper: Self) -> Self {
        Self {
            api_key: upper.api_key.or(self.api_key),
            base_url: upper.base_url.or(self.base_url),
            model: upper.model.or(self.model),
            max_iterations: upper.max_iterations.or(self.max_iterations),
            timeout_secs: upper.timeout_secs.or(self.timeout_secs),
            discovery_fallback: upper.discovery_fallback.or(self.discovery_fallback),
            system_prompt: upper.system_prompt.or(self.system_prompt),
            temperature: upper.temperature.or(self.temperature),
            max_tokens: upper.max_tokens.or(self.max_tokens),
        }
    }

    fn into_config(self) -> Result<AdapterConfig> {
        let api_key = self.api_key.ok_or_else(|| {
            BridgeError::Configuration(format!("missing API key (set {ENV_API_KEY})"))
        })?;
        let config = AdapterConfig {
            api_key,
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            request_timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            discovery_fallback: self.discovery_fallback.unwrap_or_default(),
            settings: GenerationSettings {
                system_prompt: self.system_prompt,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| BridgeError::Configuration(format!("invalid {key}={raw:?}: {e}")))
        })
        .transpose()
}
