use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Route the relay is mounted on
    pub path: String,
    pub connect_timeout_seconds: u64,
    pub max_redirects: usize,
    /// Sent upstream when the client did not send a User-Agent
    pub default_user_agent: String,
    pub pool_idle_timeout_seconds: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            path: "/proxy".to_string(),
            connect_timeout_seconds: 10,
            max_redirects: 10,
            default_user_agent: "Mozilla/5.0".to_string(),
            pool_idle_timeout_seconds: 90,
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    #[must_use]
    pub const fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Client-side playback settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Relay endpoint stream URLs are wrapped with. `None` plays targets directly.
    pub relay_base: Option<String>,
    pub recovery: RecoveryConfig,
    pub adaptive: AdaptiveTuning,
    pub demux: DemuxTuning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub engine_error_backoff_ms: u64,
    pub ended_backoff_ms: u64,
    pub stalled_backoff_ms: u64,
    pub element_error_backoff_ms: u64,
    /// Multiplier applied per consecutive failure; 1.0 keeps the backoff fixed
    pub backoff_factor: f64,
    pub max_backoff_ms: u64,
    /// Consecutive failed recoveries before giving up; `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            engine_error_backoff_ms: 1000,
            ended_backoff_ms: 500,
            stalled_backoff_ms: 2000,
            element_error_backoff_ms: 1000,
            backoff_factor: 1.0,
            max_backoff_ms: 30_000,
            max_attempts: None,
        }
    }
}

/// Buffering options handed to the adaptive-manifest player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveTuning {
    pub enable_worker: bool,
    pub low_latency_mode: bool,
    pub max_buffer_length: u32,
    pub max_max_buffer_length: u32,
    pub back_buffer_length: u32,
}

impl Default for AdaptiveTuning {
    fn default() -> Self {
        Self {
            enable_worker: true,
            low_latency_mode: false,
            max_buffer_length: 30,
            max_max_buffer_length: 60,
            back_buffer_length: 10,
        }
    }
}

/// Buffering options handed to the transport-stream demuxing player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemuxTuning {
    pub enable_worker: bool,
    pub enable_stash_buffer: bool,
    /// KiB
    pub stash_initial_size: u32,
    pub live_buffer_latency_chasing: bool,
    pub auto_cleanup_source_buffer: bool,
    pub auto_cleanup_max_backward_duration: u32,
    pub auto_cleanup_min_backward_duration: u32,
}

impl Default for DemuxTuning {
    fn default() -> Self {
        Self {
            enable_worker: true,
            enable_stash_buffer: true,
            stash_initial_size: 512,
            live_buffer_latency_chasing: false,
            auto_cleanup_source_buffer: true,
            auto_cleanup_max_backward_duration: 20,
            auto_cleanup_min_backward_duration: 10,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided; it must exist)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(Path::new(path)).required(true));
        }

        // Override with environment variables (VIDRELAY_SERVER__HTTP_PORT, etc.)
        builder = builder.add_source(
            Environment::with_prefix("VIDRELAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Collect every configuration problem instead of stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.http_port == 0 {
            errors.push("server.http_port must be non-zero".to_string());
        }
        if !self.relay.path.starts_with('/') {
            errors.push(format!(
                "relay.path must start with '/', got '{}'",
                self.relay.path
            ));
        }
        if let Err(e) = http::HeaderValue::from_str(&self.relay.default_user_agent) {
            errors.push(format!("relay.default_user_agent is not a valid header value: {e}"));
        }
        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "warning" | "error"
        ) {
            errors.push(format!("logging.level '{}' is not a log level", self.logging.level));
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be 'json' or 'pretty', got '{}'",
                self.logging.format
            ));
        }
        if let Some(base) = &self.playback.relay_base {
            match url::Url::parse(base) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(format!(
                    "playback.relay_base must be http or https, got '{}'",
                    url.scheme()
                )),
                Err(e) => errors.push(format!("playback.relay_base is not a URL: {e}")),
            }
        }
        if self.playback.recovery.backoff_factor < 1.0 {
            errors.push("playback.recovery.backoff_factor must be >= 1.0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Get HTTP address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }
}
