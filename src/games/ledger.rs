//! Per-round bet ledger
//!
//! The ledger is the only code that touches a player's balance: it debits
//! on placement and credits on cashout. A user may hold at most one open bet.

use crate::config::GameSettings;
use crate::errors::BetError;
use crate::games::types::{Bet, RoundState, RoundSummary, User};

#[derive(Debug, Clone)]
pub struct BetLedger {
    min_bet: f64,
    max_bet: f64,
    bets: Vec<Bet>,
}

impl BetLedger {
    pub fn new(settings: &GameSettings) -> Self {
        Self {
            min_bet: settings.min_bet,
            max_bet: settings.max_bet,
            bets: Vec::new(),
        }
    }

    /// Stake `amount` for `user`, returning the amount debited
    pub fn place_bet(
        &mut self,
        user: &mut User,
        amount: f64,
        state: RoundState,
    ) -> Result<f64, BetError> {
        if state != RoundState::Waiting {
            return Err(BetError::InvalidState {
                operation: "place a bet",
                state,
            });
        }

        self.check_amount(amount)?;

        if self.open_bet_for(&user.id).is_some() {
            return Err(BetError::DuplicateBet {
                user_id: user.id.clone(),
            });
        }

        if amount > user.balance {
            return Err(BetError::InsufficientFunds {
                amount,
                balance: user.balance,
            });
        }

        user.balance -= amount;
        self.bets.push(Bet::new(user.id.clone(), amount));

        tracing::debug!("Bet of {} placed by {}, balance now {}", amount, user.id, user.balance);
        Ok(amount)
    }

    /// Resolve the user's open bet at `multiplier`, returning the payout credited
    pub fn cashout(
        &mut self,
        user: &mut User,
        state: RoundState,
        multiplier: f64,
    ) -> Result<f64, BetError> {
        if state != RoundState::Flying {
            return Err(BetError::InvalidState {
                operation: "cash out",
                state,
            });
        }

        let bet = self
            .bets
            .iter_mut()
            .find(|bet| bet.user_id == user.id && bet.is_open())
            .ok_or_else(|| BetError::NoOpenBet {
                user_id: user.id.clone(),
            })?;

        let payout = bet.amount * multiplier;
        bet.cashout_multiplier = Some(multiplier);
        bet.payout = Some(payout);
        user.balance += payout;

        tracing::debug!("{} cashed out at {:.2}x for {}", user.id, multiplier, payout);
        Ok(payout)
    }

    pub fn open_bet_for(&self, user_id: &str) -> Option<&Bet> {
        self.bets.iter().find(|bet| bet.user_id == user_id && bet.is_open())
    }

    pub fn bets(&self) -> &[Bet] {
        &self.bets
    }

    pub fn clear(&mut self) {
        self.bets.clear();
    }

    /// Tally the round. Bets still open at the crash are losses.
    pub fn summary(&self, round_id: u64, crash_multiplier: f64) -> RoundSummary {
        RoundSummary {
            round_id,
            crash_multiplier,
            bets: self.bets.len(),
            winners: self.bets.iter().filter(|bet| !bet.is_open()).count(),
            total_wagered: self.bets.iter().map(|bet| bet.amount).sum(),
            total_paid_out: self.bets.iter().filter_map(|bet| bet.payout).sum(),
        }
    }

    fn check_amount(&self, amount: f64) -> Result<(), BetError> {
        let reason = if !amount.is_finite() || amount <= 0.0 {
            "must be a positive number".to_string()
        } else if amount < self.min_bet {
            format!("below minimum bet {}", self.min_bet)
        } else if amount > self.max_bet {
            format!("above maximum bet {}", self.max_bet)
        } else {
            return Ok(());
        };

        Err(BetError::InvalidAmount { amount, reason })
    }
}
