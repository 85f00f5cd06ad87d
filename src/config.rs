//! Configuration (§6 External Interfaces, ambient stack)
//!
//! Hierarchical loading in the teacher's own order:
//! - `planner.toml` (base configuration)
//! - `planner.local.toml` (git-ignored local overrides)
//! - Environment variables (`PLANNER_` prefix)
//!
//! ```toml
//! # planner.toml
//! [options]
//! dynamic_reordering = true
//! predicate_pushdown = true
//!
//! [cache]
//! max_size = 1000
//! ttl_secs = 300
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ```bash
//! PLANNER_OPTIONS__DYNAMIC_REORDERING=false
//! PLANNER_CACHE__MAX_SIZE=4000
//! ```

use crate::cache::{CacheConfig, PlanCache};
use crate::options::{PlannerOptions, DEFAULT_TIME_ATTRIBUTES};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Top-level configuration file shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub options: OptionsConfig,
    #[serde(default)]
    pub cache: CacheFileConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Plan-shaping flags, mirroring [`PlannerOptions`]'s cache-key-affecting
/// fields plus the non-key tuning knobs a deployment still wants to set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    #[serde(default = "default_true")]
    pub dynamic_reordering: bool,
    #[serde(default = "default_true")]
    pub predicate_pushdown: bool,
    #[serde(default)]
    pub conditional_aggregate_rewriting: bool,
    #[serde(default)]
    pub subquery_decorrelation: bool,
    #[serde(default)]
    pub enable_cse: bool,
    #[serde(default = "default_true")]
    pub semantic_rewriting: bool,
    #[serde(default)]
    pub fine_grained_phases: bool,
    #[serde(default)]
    pub use_clause_based_planner: bool,
    /// 0 = unlimited.
    #[serde(default)]
    pub max_phases: usize,
    #[serde(default = "default_max_subquery_depth")]
    pub max_subquery_depth: usize,
    /// Extra time attributes, merged with [`DEFAULT_TIME_ATTRIBUTES`] rather
    /// than replacing it.
    #[serde(default)]
    pub extra_time_attributes: Vec<String>,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        OptionsConfig {
            dynamic_reordering: true,
            predicate_pushdown: true,
            conditional_aggregate_rewriting: false,
            subquery_decorrelation: false,
            enable_cse: false,
            semantic_rewriting: true,
            fine_grained_phases: false,
            use_clause_based_planner: false,
            max_phases: 0,
            max_subquery_depth: default_max_subquery_depth(),
            extra_time_attributes: Vec::new(),
        }
    }
}

/// Plan cache sizing, deserialized separately from [`CacheConfig`] since the
/// latter stores a `Duration` and config files speak plain seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheFileConfig {
    /// 0 disables the cache entirely.
    #[serde(default = "default_cache_size")]
    pub max_size: usize,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheFileConfig {
    fn default() -> Self {
        CacheFileConfig { max_size: default_cache_size(), ttl_secs: default_ttl_secs() }
    }
}

/// Logging configuration, consumed by the CLI entry point to initialize
/// `tracing-subscriber`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: default_log_level(), format: default_log_format() }
    }
}

fn default_true() -> bool {
    true
}
fn default_max_subquery_depth() -> usize {
    64
}
fn default_cache_size() -> usize {
    1000
}
fn default_ttl_secs() -> u64 {
    300
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            options: OptionsConfig::default(),
            cache: CacheFileConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from the default locations, merging
    /// `planner.toml`, `planner.local.toml`, then `PLANNER_*` env vars, in
    /// that precedence order.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("planner.toml"))
            .merge(Toml::file("planner.local.toml"))
            .merge(Env::prefixed("PLANNER_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path, still allowing env
    /// overrides on top.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("PLANNER_").split("__"))
            .extract()
    }

    /// Build a [`PlannerOptions`] from this config, plugging in the
    /// collaborators (statistics, registry) a config file can't express.
    /// `statistics`/`registry` keep [`PlannerOptions::default`]'s choices.
    pub fn to_options(&self) -> PlannerOptions {
        let mut time_attributes: HashSet<String> =
            DEFAULT_TIME_ATTRIBUTES.iter().map(|s| (*s).to_string()).collect();
        time_attributes.extend(self.options.extra_time_attributes.iter().cloned());

        let cache = if self.cache.max_size == 0 {
            None
        } else {
            Some(Arc::new(PlanCache::new(CacheConfig {
                max_size: self.cache.max_size,
                ttl: Duration::from_secs(self.cache.ttl_secs),
            })))
        };

        let defaults = PlannerOptions::default();
        PlannerOptions {
            dynamic_reordering: self.options.dynamic_reordering,
            predicate_pushdown: self.options.predicate_pushdown,
            conditional_aggregate_rewriting: self.options.conditional_aggregate_rewriting,
            subquery_decorrelation: self.options.subquery_decorrelation,
            enable_cse: self.options.enable_cse,
            semantic_rewriting: self.options.semantic_rewriting,
            fine_grained_phases: self.options.fine_grained_phases,
            max_phases: self.options.max_phases,
            use_clause_based_planner: self.options.use_clause_based_planner,
            statistics: defaults.statistics,
            registry: defaults.registry,
            cache,
            max_subquery_depth: self.options.max_subquery_depth,
            time_attributes: Arc::new(time_attributes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_planner_option_defaults() {
        let config = PlannerConfig::default();
        assert!(config.options.dynamic_reordering);
        assert!(config.options.predicate_pushdown);
        assert!(!config.options.subquery_decorrelation);
        assert_eq!(config.cache.max_size, 1000);
    }

    #[test]
    fn to_options_merges_extra_time_attributes_with_defaults() {
        let mut config = PlannerConfig::default();
        config.options.extra_time_attributes = vec![":custom/time".to_string()];
        let options = config.to_options();
        assert!(options.time_attributes.contains(":price/time"));
        assert!(options.time_attributes.contains(":custom/time"));
    }

    #[test]
    fn zero_cache_size_disables_cache() {
        let mut config = PlannerConfig::default();
        config.cache.max_size = 0;
        let options = config.to_options();
        assert!(options.cache.is_none());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = PlannerConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        assert!(toml_str.contains("[options]"));
        assert!(toml_str.contains("[cache]"));
    }
}
