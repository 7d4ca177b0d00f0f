//! Configuration management for the wagering engine
//!
//! Centralized configuration with validation, defaults, and environment
//! variable support. Timing values drive the round clocks; outcome ranges
//! drive the policies.

use crate::errors::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Recent-outcome history cap, oldest evicted on overflow
    pub history_cap: usize,
    pub crash: CrashConfig,
    pub color: ColorConfig,
    pub battle: BattleConfig,
}

/// Continuous-multiplier (crash) variant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashConfig {
    pub betting_window_secs: u64,
    pub cooldown_secs: u64,
    pub tick_ms: u64,
    /// Multiplier follows growth_base^elapsed_secs while the round unfolds
    pub growth_base: f64,
    pub min_multiplier: f64,
    pub max_multiplier: f64,
    /// Probability of an immediate 1.00x bust
    pub instant_bust_probability: f64,
    /// Above this many active bets the draw is restricted to the low range
    pub load_threshold: usize,
    pub constrained_max: f64,
}

/// Three-way color draw configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorConfig {
    pub betting_window_secs: u64,
    pub reveal_secs: u64,
    pub cooldown_secs: u64,
    pub tick_ms: u64,
    /// Fixed payout odds for a matching pick
    pub odds: f64,
}

/// Pooled battle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleConfig {
    pub betting_window_secs: u64,
    pub reveal_secs: u64,
    pub cooldown_secs: u64,
    pub tick_ms: u64,
    pub entry_fee: f64,
    /// Fraction of the pool retained by the house
    pub house_cut: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_cap: 20,
            crash: CrashConfig::default(),
            color: ColorConfig::default(),
            battle: BattleConfig::default(),
        }
    }
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            betting_window_secs: 6,
            cooldown_secs: 5,
            tick_ms: 50, // 20 Hz
            growth_base: 1.10,
            min_multiplier: 1.01,
            max_multiplier: 11.1,
            instant_bust_probability: 0.03,
            load_threshold: 15,
            constrained_max: 1.51,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            betting_window_secs: 15,
            reveal_secs: 3,
            cooldown_secs: 6,
            tick_ms: 1000,
            odds: 2.0,
        }
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            betting_window_secs: 20,
            reveal_secs: 3,
            cooldown_secs: 8,
            tick_ms: 1000,
            entry_fee: 50.0,
            house_cut: 0.10,
        }
    }
}

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> ConfigResult<EngineConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            EngineConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    /// Load configuration from TOML file
    fn load_from_file(&self, path: &str) -> ConfigResult<EngineConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::LoadFailed(format!("failed to parse TOML: {}", e)))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut EngineConfig) -> ConfigResult<()> {
        if let Ok(cap) = env::var("ENGINE_HISTORY_CAP") {
            config.history_cap = parse_env("ENGINE_HISTORY_CAP", &cap)?;
        }
        if let Ok(tick) = env::var("ENGINE_CRASH_TICK_MS") {
            config.crash.tick_ms = parse_env("ENGINE_CRASH_TICK_MS", &tick)?;
        }
        if let Ok(threshold) = env::var("ENGINE_CRASH_LOAD_THRESHOLD") {
            config.crash.load_threshold = parse_env("ENGINE_CRASH_LOAD_THRESHOLD", &threshold)?;
        }
        if let Ok(fee) = env::var("ENGINE_BATTLE_ENTRY_FEE") {
            config.battle.entry_fee = parse_env("ENGINE_BATTLE_ENTRY_FEE", &fee)?;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self, config: &EngineConfig) -> ConfigResult<()> {
        if config.history_cap == 0 {
            return Err(invalid("history_cap", "0", "history cap cannot be zero"));
        }

        let crash = &config.crash;
        if crash.tick_ms == 0 {
            return Err(invalid("crash.tick_ms", "0", "tick period cannot be zero"));
        }
        if crash.growth_base <= 1.0 {
            return Err(invalid(
                "crash.growth_base",
                &crash.growth_base.to_string(),
                "growth base must exceed 1.0",
            ));
        }
        if crash.min_multiplier >= crash.max_multiplier {
            return Err(invalid(
                "crash.min_multiplier",
                &crash.min_multiplier.to_string(),
                "minimum multiplier must be below the maximum",
            ));
        }
        if crash.constrained_max <= crash.min_multiplier || crash.constrained_max > crash.max_multiplier {
            return Err(invalid(
                "crash.constrained_max",
                &crash.constrained_max.to_string(),
                "constrained range must sit inside the full range",
            ));
        }
        if !(0.0..=1.0).contains(&crash.instant_bust_probability) {
            return Err(invalid(
                "crash.instant_bust_probability",
                &crash.instant_bust_probability.to_string(),
                "probability must be within [0, 1]",
            ));
        }

        if config.color.tick_ms == 0 {
            return Err(invalid("color.tick_ms", "0", "tick period cannot be zero"));
        }
        if config.color.odds <= 1.0 {
            return Err(invalid(
                "color.odds",
                &config.color.odds.to_string(),
                "odds must exceed 1.0",
            ));
        }

        let battle = &config.battle;
        if battle.tick_ms == 0 {
            return Err(invalid("battle.tick_ms", "0", "tick period cannot be zero"));
        }
        if battle.entry_fee <= 0.0 {
            return Err(invalid(
                "battle.entry_fee",
                &battle.entry_fee.to_string(),
                "entry fee must be positive",
            ));
        }
        if !(0.0..1.0).contains(&battle.house_cut) {
            return Err(invalid(
                "battle.house_cut",
                &battle.house_cut.to_string(),
                "house cut must be within [0, 1)",
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &EngineConfig, path: &str) -> ConfigResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::SaveFailed(format!("failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigError::SaveFailed(format!("failed to write to {}: {}", path, e)))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: &str) -> ConfigResult<T> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: "could not parse".to_string(),
    })
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        let loader = ConfigLoader::new();
        assert!(loader.validate(&config).is_ok());
        assert_eq!(config.crash.tick_ms, 50);
        assert_eq!(config.battle.entry_fee, 50.0);
    }

    #[test]
    fn test_validation_rejects_degenerate_values() {
        let loader = ConfigLoader::new();

        let mut config = EngineConfig::default();
        config.crash.tick_ms = 0;
        assert!(loader.validate(&config).is_err());

        let mut config = EngineConfig::default();
        config.crash.growth_base = 0.9;
        assert!(loader.validate(&config).is_err());

        let mut config = EngineConfig::default();
        config.crash.constrained_max = 20.0;
        assert!(loader.validate(&config).is_err());

        let mut config = EngineConfig::default();
        config.battle.house_cut = 1.0;
        assert!(loader.validate(&config).is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() -> ConfigResult<()> {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        let original = EngineConfig::default();
        let loader = ConfigLoader::new();
        loader.save(&original, path)?;

        let loaded = ConfigLoader::new().with_path(path).load()?;
        assert_eq!(loaded.history_cap, original.history_cap);
        assert_eq!(loaded.crash.load_threshold, original.crash.load_threshold);
        assert_eq!(loaded.color.odds, original.color.odds);

        Ok(())
    }
}
