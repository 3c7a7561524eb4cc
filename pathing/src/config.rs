//! Runtime configuration.
//!
//! Load order: `PATHING_CONFIG_PATH`, then `config/pathing.toml` searched
//! from the current directory upwards, then the built-in example catalog.
//! Individual values can be overridden through `PATHING_*` env vars.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::{AgentParameters, RetryPolicy, Vec3};

pub const DEFAULT_CONFIG_PATH: &str = "config/pathing.toml";
const BUILTIN_CONFIG_TOML: &str = include_str!("../config/pathing.example.toml");

const MAX_ATTEMPTS_LIMIT: u32 = 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub poll_interval_ms: u64,
    pub attempt_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            attempt_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Frame tick for edge detection; 0 leaves ticking to the caller.
    pub frame_interval_ms: u64,
    pub default_goal: Vec3,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            default_goal: Vec3::new(58.727, 1.5, 25.179),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub latency_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self { latency_ms: 40 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathingConfig {
    pub engine: EngineConfig,
    pub retry: RetryPolicy,
    pub agent: AgentParameters,
    pub planner: PlannerConfig,
    pub provider: ProviderConfig,
}

impl PathingConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str::<Self>(content)?.normalized())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file, falling back to built-in defaults, then apply
    /// env overrides. Never fails; problems are logged.
    pub fn load() -> Self {
        let path = std::env::var("PATHING_CONFIG_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| find_default_config_path(DEFAULT_CONFIG_PATH));

        let mut config = match path {
            Some(path) => Self::load_from(&path).unwrap_or_else(|err| {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Failed to load pathing config; using built-in defaults"
                );
                Self::built_in()
            }),
            None => {
                tracing::debug!("No pathing config file found; using built-in defaults");
                Self::built_in()
            }
        };

        config.apply_env_overrides();
        config.normalized()
    }

    pub fn built_in() -> Self {
        Self::from_toml_str(BUILTIN_CONFIG_TOML).unwrap_or_else(|err| {
            tracing::error!(error = %err, "Failed to parse built-in pathing config");
            Self::default()
        })
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_number("PATHING_POLL_INTERVAL_MS") {
            self.engine.poll_interval_ms = value;
        }
        if let Some(value) = env_number("PATHING_ATTEMPT_TIMEOUT_MS") {
            self.engine.attempt_timeout_ms = value;
        }
        if let Some(value) = env_number("PATHING_MAX_ATTEMPTS") {
            self.retry.max_attempts = value;
        }
        if let Some(value) = env_number("PATHING_RETRY_DELAY_MS") {
            self.retry.inter_attempt_delay_ms = value;
        }
    }

    /// Clamp values into ranges the engine can work with.
    pub fn normalized(mut self) -> Self {
        self.engine.poll_interval_ms = self.engine.poll_interval_ms.max(1);
        self.engine.attempt_timeout_ms = self.engine.attempt_timeout_ms.max(1);
        self.retry.max_attempts = self.retry.max_attempts.clamp(1, MAX_ATTEMPTS_LIMIT);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.engine.poll_interval_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.engine.attempt_timeout_ms)
    }

    pub fn frame_interval(&self) -> Option<Duration> {
        (self.planner.frame_interval_ms > 0)
            .then(|| Duration::from_millis(self.planner.frame_interval_ms))
    }

    pub fn provider_latency(&self) -> Duration {
        Duration::from_millis(self.provider.latency_ms)
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable config override");
            None
        }
    }
}

fn find_default_config_path(relative_path: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;
    loop {
        let candidate = current.join(relative_path);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            break;
        }
    }
    None
}
