//! # Application Configuration
//!
//! `weft.toml` plus environment overrides.
//!
//! ```toml
//! [engine.history]
//! max_snapshots = 50
//!
//! [engine.layout]
//! default = "hierarchical"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! api_key = "${WEFT_SECRET}"
//! rate_limit = 100
//! cors_origins = ["http://localhost:3000"]
//!
//! [log]
//! format = "json"
//! ```
//!
//! `${VAR}` references in the file are expanded before parsing. After
//! loading, `WEFT_API_KEY`, `WEFT_RATE_LIMIT`, `WEFT_CORS_ORIGINS` (comma
//! separated) and `WEFT_LOG_FORMAT` override the file values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use weft_core::{EngineConfig, WeftError};

/// Default request budget per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Everything the binary can be configured with.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// HTTP listener and its guards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer key required on every route but `/health`. Unset disables auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Requests per second; 0 disables rate limiting.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
    /// Allowed CORS origins. `["*"]` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
            rate_limit: default_rate_limit(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The API key, if one is set and non-empty.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// tracing-subscriber settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// `EnvFilter` directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_filter(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_rate_limit() -> u32 {
    DEFAULT_RATE_LIMIT
}

fn default_cors_origins() -> Vec<String> {
    [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_filter() -> String {
    "weft=info,weft_core=info,tower_http=debug".to_string()
}

// =============================================================================
// LOADING
// =============================================================================

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file is absent,
    /// then apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, WeftError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                WeftError::Io(format!("Cannot read config '{}': {e}", path.display()))
            })?;
            Self::parse(&expand_env_vars(&content))?
        } else {
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        config.engine.validate()?;
        Ok(config)
    }

    /// Parse TOML text.
    pub fn parse(content: &str) -> Result<Self, WeftError> {
        toml::from_str(content).map_err(|e| WeftError::Config(e.to_string()))
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, WeftError> {
        toml::to_string_pretty(self).map_err(|e| WeftError::Serialization(e.to_string()))
    }

    /// Apply `WEFT_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("WEFT_API_KEY") {
            self.server.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(raw) = lookup("WEFT_RATE_LIMIT") {
            match raw.trim().parse() {
                Ok(limit) => self.server.rate_limit = limit,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid WEFT_RATE_LIMIT"),
            }
        }
        if let Some(origins) = lookup("WEFT_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(format) = lookup("WEFT_LOG_FORMAT") {
            match format.trim().to_ascii_lowercase().as_str() {
                "json" => self.log.format = LogFormat::Json,
                "text" => self.log.format = LogFormat::Text,
                other => tracing::warn!(value = other, "Ignoring invalid WEFT_LOG_FORMAT"),
            }
        }
    }
}

/// Expand `${ENV_VAR}` references. Unset variables are left as written.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            match std::env::var(&name) {
                Ok(value) => result.push_str(&value),
                Err(_) => {
                    result.push_str("${");
                    result.push_str(&name);
                    result.push('}');
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

// =============================================================================
// TESTS
// =============================================================================
