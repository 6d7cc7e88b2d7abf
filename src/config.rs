use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for client-board
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientBoardConfig {
    /// Hosted data/auth service
    pub remote: RemoteConfig,
    /// Public CNPJ lookup
    pub lookup: LookupConfig,
    /// Transient failure retry policy
    pub retry: RetryConfig,
    /// Client-side rate limiting
    pub rate_limit: RateLimitConfig,
    /// Local session persistence
    pub session: SessionConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Project URL, e.g. https://xyz.supabase.co (SUPABASE_URL fallback)
    pub url: String,
    /// Anonymous API key (SUPABASE_ANON_KEY fallback)
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LookupConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    /// How long a successful lookup is reused
    pub cache_ttl_seconds: u64,
    pub cache_capacity: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_capacity: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where the signed-in session is stored (JSON)
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (overridden by RUST_LOG)
    pub log_level: String,
    /// Emit JSON log lines instead of text
    pub json_logs: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: String::new(), // Set via client-board.toml or CLIENT_BOARD_REMOTE__URL
            api_key: None,
            timeout_seconds: 30,
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: "https://publica.cnpj.ws".to_string(),
            timeout_seconds: 10,
            cache_ttl_seconds: 3600,
            cache_capacity: 500,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
            burst_capacity: 10,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".client-board/session.json"),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: false,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.base_delay_ms))
    }

    /// Retries after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }
}

impl RemoteConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

impl ClientBoardConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (client-board.toml, .client-board-rc)
    /// 3. Environment variables (prefixed with CLIENT_BOARD_, nested with `__`)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as `load`, looking for configuration files under `dir`
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        let toml_path = dir.join("client-board.toml");
        if toml_path.exists() {
            builder = builder.add_source(File::from(toml_path));
        }

        let rc_path = dir.join(".client-board-rc");
        if rc_path.exists() {
            builder = builder.add_source(File::from(rc_path).format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("CLIENT_BOARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut loaded: ClientBoardConfig = builder.build()?.try_deserialize()?;

        // Hosted-service credentials are commonly exported under their own names
        if loaded.remote.url.trim().is_empty() {
            if let Ok(url) = std::env::var("SUPABASE_URL") {
                loaded.remote.url = url;
            }
        }
        if loaded.remote.api_key.is_none() {
            if let Ok(key) = std::env::var("SUPABASE_ANON_KEY") {
                loaded.remote.api_key = Some(key);
            }
        }

        Ok(loaded)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env from the working directory if it exists.
    ///
    /// Returns whether a file was read; runs before logging is set up, so the
    /// caller reports it.
    pub fn load_env_file() -> Result<bool> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_public_lookup() {
        let config = ClientBoardConfig::default();
        assert_eq!(config.lookup.base_url, "https://publica.cnpj.ws");
        assert_eq!(config.retry.max_retries(), 2);
        assert!(!config.remote.is_configured());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("client-board.toml"),
            "[remote]\nurl = \"https://demo.example.com\"\napi_key = \"anon\"\n\n[rate_limit]\nrequests_per_second = 2\n",
        )
        .unwrap();

        let config = ClientBoardConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.remote.url, "https://demo.example.com");
        assert!(config.remote.is_configured());
        assert_eq!(config.rate_limit.requests_per_second, 2);
        assert_eq!(config.rate_limit.burst_capacity, 10);
    }

    #[test]
    fn saved_file_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClientBoardConfig::default();
        config.session.path = PathBuf::from("elsewhere/session.json");
        config.save_to_file(dir.path().join("client-board.toml")).unwrap();

        let loaded = ClientBoardConfig::load_from(dir.path()).unwrap();
        assert_eq!(loaded.session.path, PathBuf::from("elsewhere/session.json"));
    }
}
