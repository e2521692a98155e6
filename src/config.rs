//! Configuration management with validation and defaults
//!
//! Every value here is read once at startup and stays fixed for the
//! lifetime of an engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrashlineConfig {
    pub game: GameSettings,
    pub timing: TimingConfig,
    pub odds: OddsConfig,
    pub history: HistoryConfig,
    pub player: PlayerConfig,
}

/// Table limits and quick-bet presets
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameSettings {
    pub currency: String,
    pub min_bet: f64,
    pub max_bet: f64,
    pub default_bet: f64,
    pub bet_options: Vec<f64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            min_bet: 1.0,
            max_bet: 10_000.0,
            default_bet: 10.0,
            bet_options: vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 2000.0],
        }
    }
}

impl GameSettings {
    /// Largest stake the player can currently place
    pub fn max_bet_for(&self, balance: f64) -> f64 {
        balance.min(self.max_bet).max(0.0)
    }
}

/// Round lifecycle timing and multiplier growth
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay before the very first round after boot
    pub initial_delay_ms: u64,
    /// Betting window before takeoff
    pub countdown_ms: u64,
    /// Multiplier update interval while flying
    pub tick_interval_ms: u64,
    /// How long the crash stays on screen before reset
    pub crash_display_ms: u64,
    /// Pause between reset and the next countdown
    pub reset_delay_ms: u64,
    /// Multiplier gained per second of flight
    pub growth_rate: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            countdown_ms: 5000,
            tick_interval_ms: 50,
            crash_display_ms: 1000,
            reset_delay_ms: 2000,
            growth_rate: 0.1,
        }
    }
}

impl TimingConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn countdown(&self) -> Duration {
        Duration::from_millis(self.countdown_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn crash_display(&self) -> Duration {
        Duration::from_millis(self.crash_display_ms)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }
}

/// Crash point distribution parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OddsConfig {
    /// Probability of an instant 1.00x crash
    pub house_edge: f64,
    /// Probability of applying the outlier boost
    pub boost_chance: f64,
    /// Boosted value is `base * (1 + u * boost_scale)`
    pub boost_scale: f64,
    pub min_crash: f64,
    pub max_crash: f64,
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            house_edge: 0.05,
            boost_chance: 0.02,
            boost_scale: 10.0,
            min_crash: 1.01,
            max_crash: 200.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
    /// Seed the history with generated past rounds at boot
    pub prefill: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            prefill: true,
        }
    }
}

/// The local player
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    pub id: String,
    pub name: String,
    pub balance: f64,
    pub auto_cashout_enabled: bool,
    pub auto_cashout_target: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            id: "user123".to_string(),
            name: "Cosmic Player".to_string(),
            balance: 3000.0,
            auto_cashout_enabled: false,
            auto_cashout_target: 2.0,
        }
    }
}

/// Smallest auto-cashout target a player may set
pub const MIN_AUTO_CASHOUT: f64 = 1.01;

impl CrashlineConfig {
    /// Compressed timings for demos and quick local runs
    pub fn fast() -> Self {
        Self {
            timing: TimingConfig {
                initial_delay_ms: 100,
                countdown_ms: 1000,
                tick_interval_ms: 20,
                crash_display_ms: 300,
                reset_delay_ms: 500,
                growth_rate: 0.5,
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let game = &self.game;
        if !(game.min_bet > 0.0 && game.min_bet.is_finite()) {
            return Err(ConfigValidationError::InvalidValue(
                "game.min_bet must be a positive number".to_string(),
            ));
        }
        if !(game.max_bet >= game.min_bet && game.max_bet.is_finite()) {
            return Err(ConfigValidationError::LogicalInconsistency(
                "game.max_bet must be >= game.min_bet".to_string(),
            ));
        }
        if game.default_bet < game.min_bet || game.default_bet > game.max_bet {
            return Err(ConfigValidationError::LogicalInconsistency(
                "game.default_bet must lie within [min_bet, max_bet]".to_string(),
            ));
        }
        if game.currency.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired("game.currency".to_string()));
        }

        let timing = &self.timing;
        if timing.tick_interval_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "timing.tick_interval_ms must be > 0".to_string(),
            ));
        }
        if !(timing.growth_rate > 0.0 && timing.growth_rate.is_finite()) {
            return Err(ConfigValidationError::InvalidValue(
                "timing.growth_rate must be > 0".to_string(),
            ));
        }

        let odds = &self.odds;
        if !(0.0..1.0).contains(&odds.house_edge) {
            return Err(ConfigValidationError::InvalidValue(
                "odds.house_edge must be in [0, 1)".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&odds.boost_chance) || odds.boost_scale < 0.0 {
            return Err(ConfigValidationError::InvalidValue(
                "odds.boost_chance must be in [0, 1] and odds.boost_scale >= 0".to_string(),
            ));
        }
        let bounds_ok = odds.min_crash >= 1.0
            && odds.max_crash >= odds.min_crash
            && odds.max_crash.is_finite();
        if !bounds_ok {
            return Err(ConfigValidationError::LogicalInconsistency(
                "odds crash bounds must satisfy 1.0 <= min_crash <= max_crash".to_string(),
            ));
        }

        if self.history.capacity == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "history.capacity must be > 0".to_string(),
            ));
        }

        let player = &self.player;
        if player.id.is_empty() {
            return Err(ConfigValidationError::MissingRequired("player.id".to_string()));
        }
        if !(player.balance >= 0.0 && player.balance.is_finite()) {
            return Err(ConfigValidationError::InvalidValue(
                "player.balance must be >= 0".to_string(),
            ));
        }
        if !(player.auto_cashout_target >= MIN_AUTO_CASHOUT) {
            return Err(ConfigValidationError::InvalidValue(format!(
                "player.auto_cashout_target must be >= {}",
                MIN_AUTO_CASHOUT
            )));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
    #[error("Configuration logical inconsistency: {0}")]
    LogicalInconsistency(String),
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
