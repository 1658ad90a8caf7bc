//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Scope resolution engine tuning.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Resolved-audience cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
    /// Inspector binary settings.
    #[serde(default)]
    pub inspector: InspectorConfig,
}

/// Scope resolution engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Minimum number of family branches before resolution fans out with rayon.
    #[serde(default = "default_parallel_branch_threshold")]
    pub parallel_branch_threshold: usize,
    /// Whether inactive employees are excluded from every query.
    #[serde(default)]
    pub active_only: bool,
}

fn default_parallel_branch_threshold() -> usize {
    4
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_branch_threshold: default_parallel_branch_threshold(),
            active_only: false,
        }
    }
}

/// Resolved-audience cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached audiences.
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
    /// Time-to-live of a cached audience in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_capacity() -> u64 {
    256
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "cible=info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Inspector binary configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InspectorConfig {
    /// Path of the JSON fixture to load.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

fn default_snapshot_path() -> String {
    "fixtures/sample.json".to_string()
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("CIBLE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        let config = temp_env::with_vars_unset(
            [
                "CIBLE__ENGINE__PARALLEL_BRANCH_THRESHOLD",
                "CIBLE__ENGINE__ACTIVE_ONLY",
                "CIBLE__CACHE__TTL_SECS",
            ],
            AppConfig::load,
        )
        .unwrap();

        assert_eq!(config.engine.parallel_branch_threshold, 4);
        assert!(!config.engine.active_only);
        assert_eq!(config.cache.max_capacity, 256);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.log.level, "cible=info");
        assert_eq!(config.inspector.snapshot_path, "fixtures/sample.json");
    }

    #[test]
    fn test_environment_overrides() {
        let config = temp_env::with_vars(
            [
                ("CIBLE__ENGINE__PARALLEL_BRANCH_THRESHOLD", Some("8")),
                ("CIBLE__ENGINE__ACTIVE_ONLY", Some("true")),
                ("CIBLE__CACHE__TTL_SECS", Some("30")),
            ],
            AppConfig::load,
        )
        .unwrap();

        assert_eq!(config.engine.parallel_branch_threshold, 8);
        assert!(config.engine.active_only);
        assert_eq!(config.cache.ttl_secs, 30);
        assert_eq!(config.cache.max_capacity, 256);
    }
}
