//! # Configuration Management
//!
//! Centralized configuration for the interception layer.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides (`PACKET_INTERCEPT_*`)
//!
//! ## Verdict Wait
//! Transport threads block in `read` / `write` until the packet worker answers.
//! `worker.verdict_timeout` bounds how long listeners may take on one packet
//! once the worker picks it up (default 5 s); time spent queued behind other
//! packets is not counted. `0` waits forever and trusts listeners to be fast.

use crate::core::verdict::FaultPolicy;
use crate::error::{InterceptError, Result};
use crate::transport::mode::{ModeProbe, SymbolResolver, TransportMode, MODERN_MARKER};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default bound on how long a transport thread waits for a packet verdict
pub const DEFAULT_VERDICT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default cap on concurrent lifecycle threads
pub const DEFAULT_POOL_MAX_THREADS: usize = 512;

/// Idle lifecycle threads are reclaimed after this long
pub const DEFAULT_POOL_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct InterceptorConfig {
    /// Sequential packet worker
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Lifecycle (inject / eject) worker pool
    #[serde(default)]
    pub pool: PoolConfig,

    /// Transport library selection
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl InterceptorConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| InterceptError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| InterceptError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| InterceptError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(timeout) = std::env::var("PACKET_INTERCEPT_VERDICT_TIMEOUT_MS") {
            let val = timeout.parse::<u64>().map_err(|e| {
                InterceptError::ConfigError(format!("Invalid PACKET_INTERCEPT_VERDICT_TIMEOUT_MS: {e}"))
            })?;
            config.worker.verdict_timeout = Duration::from_millis(val);
        }

        if let Ok(policy) = std::env::var("PACKET_INTERCEPT_FAULT_POLICY") {
            config.worker.fault_policy = match policy.to_ascii_lowercase().as_str() {
                "forward" => FaultPolicy::Forward,
                "drop" => FaultPolicy::Drop,
                other => {
                    return Err(InterceptError::ConfigError(format!(
                        "Invalid PACKET_INTERCEPT_FAULT_POLICY: '{other}' (expected 'forward' or 'drop')"
                    )))
                }
            };
        }

        if let Ok(max) = std::env::var("PACKET_INTERCEPT_POOL_MAX_THREADS") {
            config.pool.max_threads = max.parse::<usize>().map_err(|e| {
                InterceptError::ConfigError(format!("Invalid PACKET_INTERCEPT_POOL_MAX_THREADS: {e}"))
            })?;
        }

        if let Ok(mode) = std::env::var("PACKET_INTERCEPT_TRANSPORT_MODE") {
            config.transport.mode = match mode.to_ascii_lowercase().as_str() {
                "auto" => ModeSetting::Auto,
                "legacy" => ModeSetting::Legacy,
                "modern" => ModeSetting::Modern,
                other => {
                    return Err(InterceptError::ConfigError(format!(
                        "Invalid PACKET_INTERCEPT_TRANSPORT_MODE: '{other}'"
                    )))
                }
            };
        }

        if let Ok(level) = std::env::var("PACKET_INTERCEPT_LOG_LEVEL") {
            config.logging.log_level = level.parse::<Level>().map_err(|e| {
                InterceptError::ConfigError(format!("Invalid PACKET_INTERCEPT_LOG_LEVEL: '{level}' ({e})"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| InterceptError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| InterceptError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.worker.validate());
        errors.extend(self.pool.validate());
        errors.extend(self.transport.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(InterceptError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Sequential packet worker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Name of the packet worker thread
    pub thread_name: String,

    /// Longest the listeners may take on one dequeued packet; zero waits forever
    #[serde(with = "duration_serde")]
    pub verdict_timeout: Duration,

    /// Verdict used when a listener fails on a packet event
    pub fault_policy: FaultPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: String::from("packet-worker"),
            verdict_timeout: DEFAULT_VERDICT_TIMEOUT,
            fault_policy: FaultPolicy::Drop,
        }
    }
}

impl WorkerConfig {
    /// `None` when the wait is unbounded
    pub fn verdict_wait(&self) -> Option<Duration> {
        if self.verdict_timeout.is_zero() {
            None
        } else {
            Some(self.verdict_timeout)
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.thread_name.is_empty() {
            errors.push("Worker thread name cannot be empty".to_string());
        }

        if !self.verdict_timeout.is_zero() {
            if self.verdict_timeout.as_millis() < 10 {
                errors.push("Verdict timeout too short (minimum: 10ms, or 0 to disable)".to_string());
            } else if self.verdict_timeout.as_secs() > 300 {
                errors.push("Verdict timeout too long (maximum: 300s)".to_string());
            }
        }

        errors
    }
}

/// Lifecycle worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Name prefix of lifecycle threads
    pub thread_name: String,

    /// Upper bound on concurrently running lifecycle tasks
    pub max_threads: usize,

    /// How long an idle lifecycle thread is kept
    #[serde(with = "duration_serde")]
    pub keep_alive: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            thread_name: String::from("lifecycle-pool"),
            max_threads: DEFAULT_POOL_MAX_THREADS,
            keep_alive: DEFAULT_POOL_KEEP_ALIVE,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.thread_name.is_empty() {
            errors.push("Pool thread name cannot be empty".to_string());
        }

        if self.max_threads == 0 {
            errors.push("Pool max threads must be greater than 0".to_string());
        } else if self.max_threads > 10_000 {
            errors.push(format!(
                "Pool max threads very high: {} (ensure system resources can support this)",
                self.max_threads
            ));
        }

        if self.keep_alive.as_millis() < 100 {
            errors.push("Pool keep-alive too short (minimum: 100ms)".to_string());
        }

        errors
    }
}

/// How the transport mode is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    /// Probe for the modern marker symbol
    #[default]
    Auto,
    Legacy,
    Modern,
}

impl ModeSetting {
    /// The forced mode, or `None` when the probe decides
    pub fn forced(self) -> Option<TransportMode> {
        match self {
            ModeSetting::Auto => None,
            ModeSetting::Legacy => Some(TransportMode::Legacy),
            ModeSetting::Modern => Some(TransportMode::Modern),
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    pub mode: ModeSetting,

    /// Symbol whose presence means the modern library is loaded
    pub marker_symbol: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: ModeSetting::Auto,
            marker_symbol: String::from(MODERN_MARKER),
        }
    }
}

impl TransportConfig {
    /// The forced mode, or the result of probing `resolver` for the marker
    pub fn resolve_mode<R: SymbolResolver>(&self, resolver: R) -> TransportMode {
        match self.mode.forced() {
            Some(mode) => mode,
            None => ModeProbe::with_marker(resolver, self.marker_symbol.clone()).mode(),
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.mode == ModeSetting::Auto && self.marker_symbol.trim().is_empty() {
            errors.push("Marker symbol cannot be empty when mode is 'auto'".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("packet-intercept"),
            log_level: Level::INFO,
            log_to_console: true,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.json_format && !self.log_to_console {
            errors.push("json_format has no effect when log_to_console is false".to_string());
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
