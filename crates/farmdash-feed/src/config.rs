//! # Feed Configuration
//!
//! Loads engine tunables and feed settings from a TOML file and the
//! environment.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FARMDASH_FLAT_MARGIN_RATE=0.25                                     │
//! │     FARMDASH_DEFAULT_PERIOD=last30days                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/farmdash/feed.toml (Linux)                               │
//! │     ~/Library/Application Support/com.farmdash.dashboard/feed.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     30% margin, threshold 10, last7days, top 5, 7-day series           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # feed.toml
//! [engine]
//! flat_margin_rate = 0.30
//! low_stock_threshold = 10
//! default_period = "last7days"
//! top_n = 5
//! daily_series_window_days = 7
//! timestamp_fallback = "now"
//! utc_offset_minutes = -180
//!
//! [feed]
//! profit_strategy = "flat_margin"   # flat_margin | catalog_linked
//! ```
//!
//! Unlike dirty store data, a bad value here is a deployment bug: every
//! unparsable override and out-of-range option fails the load.

use farmdash_core::config::{EngineConfig, TimestampFallback};
use farmdash_core::period::Period;
use farmdash_core::report::{ProfitStrategy, ReportRequest};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{FeedError, FeedResult};

// =============================================================================
// Environment Variable Names
// =============================================================================

pub const ENV_FLAT_MARGIN_RATE: &str = "FARMDASH_FLAT_MARGIN_RATE";
pub const ENV_LOW_STOCK_THRESHOLD: &str = "FARMDASH_LOW_STOCK_THRESHOLD";
pub const ENV_DEFAULT_PERIOD: &str = "FARMDASH_DEFAULT_PERIOD";
pub const ENV_TOP_N: &str = "FARMDASH_TOP_N";
pub const ENV_DAILY_WINDOW_DAYS: &str = "FARMDASH_DAILY_WINDOW_DAYS";
pub const ENV_TIMESTAMP_FALLBACK: &str = "FARMDASH_TIMESTAMP_FALLBACK";
pub const ENV_UTC_OFFSET_MINUTES: &str = "FARMDASH_UTC_OFFSET_MINUTES";
pub const ENV_PROFIT_STRATEGY: &str = "FARMDASH_PROFIT_STRATEGY";

// =============================================================================
// Feed Settings
// =============================================================================

/// Settings for the live feed itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Profit strategy of the published sales report.
    #[serde(default = "default_profit_strategy")]
    pub profit_strategy: ProfitStrategy,
}

fn default_profit_strategy() -> ProfitStrategy {
    ProfitStrategy::FlatMargin
}

impl Default for FeedSettings {
    fn default() -> Self {
        FeedSettings {
            profit_strategy: default_profit_strategy(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete feed configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Metrics engine tunables.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Live feed settings.
    #[serde(default)]
    pub feed: FeedSettings,
}

impl FeedConfig {
    /// Loads configuration from file, then environment, then validates.
    ///
    /// ## Loading Order
    /// 1. Start with defaults
    /// 2. Override with TOML file (if exists)
    /// 3. Override with environment variables
    /// 4. Validate
    pub fn load(config_path: Option<PathBuf>) -> FeedResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading feed config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration, falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load feed config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> FeedResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| FeedError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FeedError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| FeedError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Saved feed config");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> FeedResult<()> {
        self.engine.validate()?;
        Ok(())
    }

    /// The sales report request the feed starts with.
    pub fn initial_request(&self) -> ReportRequest {
        ReportRequest::with_defaults(&self.engine, self.feed.profit_strategy)
    }

    /// Applies overrides from the process environment.
    fn apply_env_overrides(&mut self) -> FeedResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from any variable source.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> FeedResult<()> {
        if let Some(rate) = lookup(ENV_FLAT_MARGIN_RATE) {
            debug!(rate = %rate, "Overriding flat margin rate from environment");
            self.engine.flat_margin_rate = parse_var(ENV_FLAT_MARGIN_RATE, &rate)?;
        }

        if let Some(threshold) = lookup(ENV_LOW_STOCK_THRESHOLD) {
            self.engine.low_stock_threshold = parse_var(ENV_LOW_STOCK_THRESHOLD, &threshold)?;
        }

        if let Some(period) = lookup(ENV_DEFAULT_PERIOD) {
            debug!(period = %period, "Overriding default period from environment");
            self.engine.default_period = period.parse::<Period>()?;
        }

        if let Some(top_n) = lookup(ENV_TOP_N) {
            self.engine.top_n = parse_var(ENV_TOP_N, &top_n)?;
        }

        if let Some(days) = lookup(ENV_DAILY_WINDOW_DAYS) {
            self.engine.daily_series_window_days = parse_var(ENV_DAILY_WINDOW_DAYS, &days)?;
        }

        if let Some(policy) = lookup(ENV_TIMESTAMP_FALLBACK) {
            debug!(policy = %policy, "Overriding timestamp fallback from environment");
            self.engine.timestamp_fallback = policy.parse::<TimestampFallback>()?;
        }

        if let Some(minutes) = lookup(ENV_UTC_OFFSET_MINUTES) {
            self.engine.utc_offset_minutes = Some(parse_var(ENV_UTC_OFFSET_MINUTES, &minutes)?);
        }

        if let Some(strategy) = lookup(ENV_PROFIT_STRATEGY) {
            self.feed.profit_strategy = strategy.parse::<ProfitStrategy>()?;
        }

        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "farmdash", "dashboard")
            .map(|dirs| dirs.config_dir().join("feed.toml"))
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> FeedResult<T> {
    value.trim().parse().map_err(|_| {
        FeedError::InvalidConfig(format!("{} has an unreadable value: '{}'", name, value))
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("farmdash-feed-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_defaults() {
        let config = FeedConfig::default();
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.feed.profit_strategy, ProfitStrategy::FlatMargin);
        assert_eq!(config.initial_request().period, Period::Last7Days);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let env = vars(&[
            (ENV_FLAT_MARGIN_RATE, "0.25"),
            (ENV_LOW_STOCK_THRESHOLD, "3"),
            (ENV_DEFAULT_PERIOD, "30dias"),
            (ENV_TOP_N, "8"),
            (ENV_DAILY_WINDOW_DAYS, "30"),
            (ENV_TIMESTAMP_FALLBACK, "reject"),
            (ENV_UTC_OFFSET_MINUTES, "-180"),
            (ENV_PROFIT_STRATEGY, "catalog_linked"),
        ]);
        let mut config = FeedConfig::default();
        config.apply_overrides(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.engine.margin_rate().bps(), 2500);
        assert_eq!(config.engine.low_stock_threshold, 3);
        assert_eq!(config.engine.default_period, Period::Last30Days);
        assert_eq!(config.engine.top_n_limit(), 8);
        assert_eq!(config.engine.daily_series_window_days, 30);
        assert_eq!(config.engine.timestamp_fallback, TimestampFallback::Reject);
        assert_eq!(config.engine.utc_offset_minutes, Some(-180));
        assert_eq!(config.feed.profit_strategy, ProfitStrategy::CatalogLinked);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_overrides_are_errors() {
        let mut config = FeedConfig::default();
        let env = vars(&[(ENV_DEFAULT_PERIOD, "last8days")]);
        assert!(matches!(
            config.apply_overrides(|k| env.get(k).cloned()),
            Err(FeedError::Core(_))
        ));

        let env = vars(&[(ENV_TOP_N, "many")]);
        assert!(matches!(
            config.apply_overrides(|k| env.get(k).cloned()),
            Err(FeedError::InvalidConfig(_))
        ));

        let env = vars(&[(ENV_TOP_N, "-2")]);
        config.apply_overrides(|k| env.get(k).cloned()).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file() {
        let config: FeedConfig = toml::from_str(
            r#"
            [engine]
            top_n = 3
            default_period = "last90days"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.top_n_limit(), 3);
        assert_eq!(config.engine.default_period, Period::Last90Days);
        assert_eq!(config.engine.low_stock_threshold, 10);
        assert_eq!(config.feed, FeedSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("feed.toml");
        let mut config = FeedConfig::default();
        config.engine.low_stock_threshold = 4;
        config.feed.profit_strategy = ProfitStrategy::CatalogLinked;
        config.save(Some(path.clone())).unwrap();

        let loaded: FeedConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_or_default_on_broken_file() {
        let path = temp_path("broken.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[engine\ntop_n = ").unwrap();

        assert!(FeedConfig::load(Some(path.clone())).is_err());
        assert_eq!(
            FeedConfig::load_or_default(Some(path.clone())).engine.top_n,
            EngineConfig::default().top_n
        );
        let _ = std::fs::remove_file(&path);
    }
}
