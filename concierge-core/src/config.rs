use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::error::ConciergeError;

pub const DEFAULT_BROWSER_USE_URL: &str = "https://api.browser-use.com/api/v2";
pub const DEFAULT_TAVUS_URL: &str = "https://tavusapi.com/v2";
pub const DEFAULT_REPLICA_ID: &str = "r79e1c033f";

/// Environment variables recognized on top of the TOML file, and the config
/// key each one overrides.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("BROWSER_USE_API_KEY", "browser_use.api_key"),
    ("TAVUS_API_KEY", "tavus.api_key"),
    ("TAVUS_REPLICA_ID", "tavus.replica_id"),
    ("TAVUS_PERSONA_ID", "tavus.persona_id"),
    ("CONCIERGE_HOST", "http.host"),
    ("CONCIERGE_PORT", "http.port"),
];

#[derive(Debug, Deserialize, Clone)]
pub struct ConciergeConfig {
    #[serde(default)]
    pub http: HttpConfig,
    pub browser_use: BrowserUseConfig,
    pub tavus: TavusConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            static_dir: "static".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserUseConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Unset means no client-side timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TavusConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub base_url: String,
    #[serde(default)]
    pub replica_id: Option<String>,
    #[serde(default)]
    pub persona_id: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl ConciergeConfig {
    /// Load defaults, then `path` if it exists, then the process environment.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::load_with(path, |var| std::env::var(var).ok())
    }

    /// Same as [`ConciergeConfig::load`] with an explicit environment lookup.
    pub fn load_with<F>(path: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder()
            .set_default("http.host", "0.0.0.0")?
            .set_default("http.port", 8000)?
            .set_default("http.static_dir", "static")?
            .set_default("browser_use.base_url", DEFAULT_BROWSER_USE_URL)?
            .set_default("tavus.base_url", DEFAULT_TAVUS_URL)?
            .set_default("tavus.replica_id", DEFAULT_REPLICA_ID)?
            .add_source(File::with_name(path).required(false));

        for &(var, key) in ENV_OVERRIDES {
            builder = builder.set_override_option(key, lookup(var))?;
        }

        builder.build()?.try_deserialize()
    }

    /// The automation credential, which the server cannot start without.
    pub fn require_browser_use_key(&self) -> Result<&str, ConciergeError> {
        non_empty(&self.browser_use.api_key).ok_or_else(|| {
            ConciergeError::Configuration("BROWSER_USE_API_KEY is not set".to_string())
        })
    }

    pub fn tavus_api_key(&self) -> Option<&str> {
        non_empty(&self.tavus.api_key)
    }

    pub fn default_replica_id(&self) -> Option<&str> {
        non_empty(&self.tavus.replica_id)
    }

    pub fn default_persona_id(&self) -> Option<&str> {
        non_empty(&self.tavus.persona_id)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
