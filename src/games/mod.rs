pub mod crash_point;
pub mod history;
pub mod ledger;
pub mod round;
pub mod types;

pub use crash_point::{CrashPointGenerator, ScriptedCrashPoints};
pub use history::HistoryStore;
pub use ledger::BetLedger;
pub use round::{RoundStateMachine, TimerKind};
pub use types::*;
