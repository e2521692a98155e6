//! Crashline - crash-game round engine
//!
//! A single-player crash game: each round counts down, takes off, and the
//! multiplier climbs until it hits a pre-drawn crash point. Players stake
//! during the countdown and must cash out before the crash.
//!
//! [`RoundStateMachine`] holds all game rules and runs on caller-supplied
//! instants. [`GameEngine`] drives it on tokio timers and exposes an
//! [`EngineHandle`] for commands plus a broadcast stream of [`RoundEvent`]s.

pub mod common;
pub mod config;
pub mod engine;
pub mod errors;
pub mod games;

pub use common::config::{ConfigBuilder, ConfigLoader};
pub use common::traits::CrashPointSource;
pub use config::CrashlineConfig;
pub use engine::{EngineCommand, EngineHandle, GameEngine, SpawnedEngine};
pub use errors::{BetError, CrashlineError, CrashlineResult, EngineError};
pub use games::{
    AutoCashout, Bet, CrashPointGenerator, EngineSnapshot, HistoryStore, RoundEvent, RoundState,
    RoundStateMachine, RoundSummary, ScriptedCrashPoints, User,
};
