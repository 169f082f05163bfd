//! Configuration loading and validation.
//!
//! Precedence (lowest to highest):
//! 1. Programmatic defaults (`ChimeraConfig::default()`)
//! 2. `chimera.yaml` in the working directory (optional)
//! 3. `CHIMERA_*` environment variables, `__` separating nested keys
//!    (`CHIMERA_JUDGE__CHECK_TIMEOUT_MS=500`)

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::RoutingThresholds;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub niche: String,
    pub region: String,
    pub trend_window_hours: u32,
    pub min_relevance: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            niche: "fashion".to_string(),
            region: "ET".to_string(),
            trend_window_hours: 24,
            min_relevance: 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub auto_approve_threshold: f64,
    pub review_threshold: f64,
    pub check_timeout_ms: u64,
    /// Score used for a check that timed out or errored.
    pub neutral_score: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            auto_approve_threshold: 0.90,
            review_threshold: 0.70,
            check_timeout_ms: 2_000,
            neutral_score: 0.5,
        }
    }
}

impl JudgeConfig {
    pub fn thresholds(&self) -> RoutingThresholds {
        RoutingThresholds {
            auto_approve: self.auto_approve_threshold,
            review: self.review_threshold,
        }
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendsConfig {
    pub cache_ttl_secs: u64,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self { cache_ttl_secs: 300 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub count: usize,
    pub collaborator_timeout_ms: u64,
    /// Memory snippets retrieved per generation.
    pub memory_limit: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 4,
            collaborator_timeout_ms: 10_000,
            memory_limit: 5,
        }
    }
}

impl WorkerConfig {
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 2_000,
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
            max_attempts: self.max_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChimeraConfig {
    pub agent: AgentConfig,
    pub judge: JudgeConfig,
    pub trends: TrendsConfig,
    pub worker: WorkerConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid {field}: {value}. Must be within [0, 1]")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("review_threshold ({review}) must not exceed auto_approve_threshold ({auto})")]
    InvertedThresholds { review: f64, auto: f64 },

    #[error("invalid worker count: 0. At least one worker is required")]
    NoWorkers,

    #[error("invalid retry.max_attempts: 0. Must be at least 1")]
    NoAttempts,

    #[error("invalid retry.multiplier: {0}. Must be positive")]
    InvalidMultiplier(f64),

    #[error("invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load() -> Result<ChimeraConfig, ConfigError> {
        Self::load_from("chimera.yaml")
    }

    /// Defaults, then `path` (if present), then the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<ChimeraConfig, ConfigError> {
        let config: ChimeraConfig = Figment::new()
            .merge(Serialized::defaults(ChimeraConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("CHIMERA_").split("__"))
            .extract()?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &ChimeraConfig) -> Result<(), ConfigError> {
        for (field, value) in [
            ("agent.min_relevance", config.agent.min_relevance),
            ("judge.auto_approve_threshold", config.judge.auto_approve_threshold),
            ("judge.review_threshold", config.judge.review_threshold),
            ("judge.neutral_score", config.judge.neutral_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { field, value });
            }
        }

        if config.judge.review_threshold > config.judge.auto_approve_threshold {
            return Err(ConfigError::InvertedThresholds {
                review: config.judge.review_threshold,
                auto: config.judge.auto_approve_threshold,
            });
        }

        if config.worker.count == 0 {
            return Err(ConfigError::NoWorkers);
        }

        if config.retry.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }

        if config.retry.multiplier <= 0.0 || config.retry.multiplier.is_nan() {
            return Err(ConfigError::InvalidMultiplier(config.retry.multiplier));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_valid() {
        let config = ChimeraConfig::default();
        assert_eq!(config.judge.auto_approve_threshold, 0.90);
        assert_eq!(config.judge.review_threshold, 0.70);
        assert_eq!(config.trends.cache_ttl_secs, 300);
        assert_eq!(config.retry.max_attempts, 5);
        ConfigLoader::validate(&config).unwrap();
    }

    #[test]
    fn yaml_then_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "chimera.yaml",
                r"
agent:
  niche: streetwear
  min_relevance: 0.6
judge:
  check_timeout_ms: 750
worker:
  count: 2
",
            )?;
            jail.set_env("CHIMERA_WORKER__COUNT", "8");
            jail.set_env("CHIMERA_LOGGING__FORMAT", "json");

            let config = ConfigLoader::load().map_err(|e| e.to_string())?;

            assert_eq!(config.agent.niche, "streetwear");
            assert_eq!(config.agent.min_relevance, 0.6);
            assert_eq!(config.agent.region, "ET");
            assert_eq!(config.judge.check_timeout_ms, 750);
            assert_eq!(config.worker.count, 8);
            assert_eq!(config.logging.format, "json");
            Ok(())
        });
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::load().map_err(|e| e.to_string())?;
            assert_eq!(config, ChimeraConfig::default());
            Ok(())
        });
    }

    #[test]
    fn invalid_env_value_is_rejected_on_load() {
        Jail::expect_with(|jail| {
            jail.set_env("CHIMERA_JUDGE__REVIEW_THRESHOLD", "0.95");
            let err = ConfigLoader::load().unwrap_err();
            assert!(matches!(err, ConfigError::InvertedThresholds { .. }));
            Ok(())
        });
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut config = ChimeraConfig::default();
        config.judge.auto_approve_threshold = 1.2;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::OutOfUnitRange {
                field: "judge.auto_approve_threshold",
                ..
            })
        ));
    }

    #[test]
    fn rejects_zero_workers_and_attempts() {
        let mut config = ChimeraConfig::default();
        config.worker.count = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::NoWorkers)));

        let mut config = ChimeraConfig::default();
        config.retry.max_attempts = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::NoAttempts)));
    }

    #[test]
    fn rejects_unknown_log_settings() {
        let mut config = ChimeraConfig::default();
        config.logging.level = "verbose".into();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));

        let mut config = ChimeraConfig::default();
        config.logging.format = "xml".into();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }
}
