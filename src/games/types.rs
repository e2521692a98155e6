use crate::config::GameSettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of the current round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    /// Countdown running, bets accepted
    Waiting,
    /// Multiplier climbing, cashouts accepted
    Flying,
    /// Crash point reached, round resolving
    Crashed,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundState::Waiting => write!(f, "waiting"),
            RoundState::Flying => write!(f, "flying"),
            RoundState::Crashed => write!(f, "crashed"),
        }
    }
}

/// A single stake in the current round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bet {
    pub bet_id: Uuid,
    pub user_id: String,
    pub amount: f64,
    pub placed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashout_multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout: Option<f64>,
}

impl Bet {
    pub fn new(user_id: impl Into<String>, amount: f64) -> Self {
        Self {
            bet_id: Uuid::new_v4(),
            user_id: user_id.into(),
            amount,
            placed_at: Utc::now(),
            cashout_multiplier: None,
            payout: None,
        }
    }

    /// Still riding, not yet cashed out
    pub fn is_open(&self) -> bool {
        self.cashout_multiplier.is_none()
    }
}

/// Player account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub balance: f64,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, balance: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            balance,
        }
    }
}

/// Standing instruction to cash out at a threshold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AutoCashout {
    pub enabled: bool,
    pub target: f64,
}

impl Default for AutoCashout {
    fn default() -> Self {
        Self {
            enabled: false,
            target: 2.0,
        }
    }
}

/// Outcome of a finished round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundSummary {
    pub round_id: u64,
    pub crash_multiplier: f64,
    pub bets: usize,
    pub winners: usize,
    pub total_wagered: f64,
    pub total_paid_out: f64,
}

/// Notifications emitted by the round engine, in the order they happen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoundEvent {
    RoundStarted {
        round_id: u64,
        countdown_ms: u64,
    },
    Takeoff {
        round_id: u64,
    },
    MultiplierUpdated {
        round_id: u64,
        multiplier: f64,
    },
    BetPlaced {
        round_id: u64,
        bet: Bet,
        balance: f64,
    },
    CashedOut {
        round_id: u64,
        user_id: String,
        multiplier: f64,
        payout: f64,
        balance: f64,
        auto: bool,
    },
    Crashed {
        summary: RoundSummary,
    },
    RoundReset {
        next_round_id: u64,
    },
    AutoCashoutChanged {
        auto_cashout: AutoCashout,
    },
    Disposed,
}

/// Read-only view of the engine for rendering layers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSnapshot {
    pub state: RoundState,
    pub current_multiplier: f64,
    pub round_id: u64,
    /// Most recent first
    pub history: Vec<f64>,
    pub last_crash: f64,
    pub bets: Vec<Bet>,
    pub balance: f64,
    pub max_bet: f64,
    pub auto_cashout: AutoCashout,
    pub settings: GameSettings,
    pub disposed: bool,
}

/// Round to two decimal places (cents / hundredths of a multiplier)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a multiplier the way players see it, e.g. `2.00x`
pub fn format_multiplier(multiplier: f64) -> String {
    format!("{:.2}x", multiplier)
}

/// Format a currency amount for display
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}
