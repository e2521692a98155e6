//! Configuration loading for the Crashline engine
//!
//! TOML file first, then `CRASHLINE_*` environment overrides, then validation.

use crate::config::{
    CrashlineConfig, GameSettings, HistoryConfig, OddsConfig, PlayerConfig, TimingConfig,
};
use crate::errors::{ConfigurationError, CrashlineResult};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> CrashlineResult<CrashlineConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            CrashlineConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    /// Load configuration from TOML file
    fn load_from_file(&self, path: &str) -> CrashlineResult<CrashlineConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e))
        })?;

        toml::from_str(&content)
            .map_err(|e| {
                ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into()
            })
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut CrashlineConfig) -> CrashlineResult<()> {
        if let Ok(currency) = env::var("CRASHLINE_CURRENCY") {
            config.game.currency = currency;
        }
        if let Some(min_bet) = parse_env("CRASHLINE_MIN_BET", "Invalid bet amount")? {
            config.game.min_bet = min_bet;
        }
        if let Some(max_bet) = parse_env("CRASHLINE_MAX_BET", "Invalid bet amount")? {
            config.game.max_bet = max_bet;
        }

        if let Some(countdown) = parse_env("CRASHLINE_COUNTDOWN_MS", "Invalid duration")? {
            config.timing.countdown_ms = countdown;
        }
        if let Some(tick) = parse_env("CRASHLINE_TICK_MS", "Invalid duration")? {
            config.timing.tick_interval_ms = tick;
        }
        if let Some(rate) = parse_env("CRASHLINE_GROWTH_RATE", "Invalid growth rate")? {
            config.timing.growth_rate = rate;
        }

        if let Some(edge) = parse_env("CRASHLINE_HOUSE_EDGE", "Invalid probability")? {
            config.odds.house_edge = edge;
        }

        if let Some(balance) = parse_env("CRASHLINE_BALANCE", "Invalid balance")? {
            config.player.balance = balance;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self, config: &CrashlineConfig) -> CrashlineResult<()> {
        Ok(config.validate()?)
    }

    /// Save configuration to file
    pub fn save(&self, config: &CrashlineConfig, path: &str) -> CrashlineResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| {
                ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e))
            })?;

        std::fs::write(path, toml_string)
            .map_err(|e| {
                ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into()
            })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_env<T: FromStr>(key: &str, reason: &str) -> CrashlineResult<Option<T>> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| {
                ConfigurationError::InvalidValue {
                    field: key.to_string(),
                    value,
                    reason: reason.to_string(),
                }
                .into()
            }),
        Err(_) => Ok(None),
    }
}

/// Builder pattern for creating configurations
pub struct ConfigBuilder {
    config: CrashlineConfig,
}

impl ConfigBuilder {
    /// Create a new config builder with defaults
    pub fn new() -> Self {
        Self {
            config: CrashlineConfig::default(),
        }
    }

    pub fn game(mut self, game: GameSettings) -> Self {
        self.config.game = game;
        self
    }

    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.config.timing = timing;
        self
    }

    pub fn odds(mut self, odds: OddsConfig) -> Self {
        self.config.odds = odds;
        self
    }

    pub fn history(mut self, history: HistoryConfig) -> Self {
        self.config.history = history;
        self
    }

    pub fn player(mut self, player: PlayerConfig) -> Self {
        self.config.player = player;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> CrashlineConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> CrashlineResult<()> {
    let config = CrashlineConfig::default();
    ConfigLoader::new().save(&config, path)
}
