//! Configuration parsing and validation for imgrelay.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Environment variable consulted when the config file carries no token.
pub const TOKEN_ENV_VAR: &str = "HUGGINGFACE_TOKEN";

/// Last-resort token value when nothing is configured.
///
/// The upstream API will reject it; it exists so the relay can start in an
/// unconfigured environment and surface the misconfiguration per request
/// instead of refusing to boot.
pub const PLACEHOLDER_TOKEN: &str = "YOUR_HF_TOKEN_HERE";

fn default_upstream_url() -> String {
    "https://api-inference.huggingface.co/models/black-forest-labs/FLUX.1-schnell".to_string()
}

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8080")
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Inference provider configuration with the token already resolved.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Inference endpoint URL
    pub url: String,
    /// Bearer token sent on every outbound request
    pub api_token: ApiToken,
}

/// Bearer token wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// The inner `SecretString` ensures the token value is:
/// - Zeroized in memory when dropped
/// - Never exposed via Debug or Display
/// - Only accessible via `.expose_secret()` (grep-auditable)
#[derive(Clone)]
pub struct ApiToken(SecretString);

impl ApiToken {
    /// Access the raw token value. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    /// True when the token is the unconfigured placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.expose_secret() == PLACEHOLDER_TOKEN
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for ApiToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiToken(SecretString::from(s)))
    }
}

impl From<String> for ApiToken {
    fn from(s: String) -> Self {
        ApiToken(SecretString::from(s))
    }
}

impl From<&str> for ApiToken {
    fn from(s: &str) -> Self {
        ApiToken(SecretString::from(s))
    }
}

/// How the bearer token was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenSource {
    /// Token was a literal string in config (no ${} references)
    Literal,
    /// Token contained ${VAR} references expanded from environment
    EnvExpanded,
    /// Token came from the `HUGGINGFACE_TOKEN` environment variable
    Env,
    /// Nothing configured; the placeholder is in effect
    Placeholder,
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Literal => write!(f, "config-literal"),
            TokenSource::EnvExpanded => write!(f, "env-expanded"),
            TokenSource::Env => write!(f, "env ({})", TOKEN_ENV_VAR),
            TokenSource::Placeholder => write!(f, "placeholder (unconfigured)"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Fallback `EnvFilter` directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "imgrelay=info,tower_http=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' not set: {message}")]
    EnvVar { var: String, message: String },
}

/// Raw upstream config deserialized directly from TOML.
/// api_token is `Option<String>` so it may contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
pub struct RawUpstreamConfig {
    #[serde(default = "default_upstream_url")]
    url: String,
    api_token: Option<String>,
}

impl Default for RawUpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            api_token: None,
        }
    }
}

/// Raw configuration deserialized directly from TOML.
/// The api_token value may contain `${VAR}` references not yet expanded.
#[derive(Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    upstream: RawUpstreamConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// The closure-based design makes this testable without touching global env state.
/// Supports multiple `${VAR}` in one string. Fails on first missing variable,
/// unclosed `${`, or empty variable name.
fn expand_env_vars_with<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            message: format!("Unclosed '${{' in config value: {}", input),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            message: format!(
                "Environment variable '{}' is not set (referenced in upstream.api_token)",
                var_name
            ),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Expand all `${VAR}` references in a string using real environment variables.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    expand_env_vars_with(input, |name| std::env::var(name).ok())
}

impl Config {
    /// Convert raw (deserialized) config to final config with token resolution.
    ///
    /// Resolution order:
    /// - `api_token` contains `${VAR}`: expand from environment, source = `EnvExpanded`
    /// - `api_token` is a literal string: wrap directly, source = `Literal`
    /// - `api_token` absent: read `HUGGINGFACE_TOKEN`, source = `Env`
    /// - nothing set: fall back to `PLACEHOLDER_TOKEN`, source = `Placeholder`
    pub fn from_raw(raw: RawConfig) -> Result<(Self, TokenSource), ConfigError> {
        let (api_token, source) = match raw.upstream.api_token {
            Some(ref raw_token) if raw_token.contains("${") => {
                let expanded = expand_env_vars(raw_token)?;
                (ApiToken::from(expanded), TokenSource::EnvExpanded)
            }
            Some(ref raw_token) => (ApiToken::from(raw_token.as_str()), TokenSource::Literal),
            None => match std::env::var(TOKEN_ENV_VAR) {
                Ok(value) => (ApiToken::from(value), TokenSource::Env),
                Err(_) => (ApiToken::from(PLACEHOLDER_TOKEN), TokenSource::Placeholder),
            },
        };

        let config = Config {
            server: raw.server,
            upstream: UpstreamConfig {
                url: raw.upstream.url,
                api_token,
            },
            logging: raw.logging,
        };
        config.validate()?;

        Ok((config, source))
    }

    /// Parse configuration from a TOML string with token resolution.
    pub fn parse_str(content: &str) -> Result<(Self, TokenSource), ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        Self::from_raw(raw)
    }

    /// Load configuration from a TOML file with token resolution.
    ///
    /// A missing file is not an error: the relay runs entirely on defaults
    /// plus the `HUGGINGFACE_TOKEN` environment variable.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, TokenSource), ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Self::from_raw(RawConfig::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse_str(&content)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.url.is_empty() {
            return Err(ConfigError::Validation(
                "upstream.url must not be empty".to_string(),
            ));
        }
        if self.server.listen.is_empty() {
            return Err(ConfigError::Validation(
                "server.listen must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig {
                url: default_upstream_url(),
                api_token: ApiToken::from(PLACEHOLDER_TOKEN),
            },
            logging: LoggingConfig::default(),
        }
    }
}
