//! Round state machine
//!
//! Drives `Waiting -> Flying -> Crashed -> Waiting` from a single logical
//! timer slot. The machine never reads the clock itself: callers pass `now`
//! to [`RoundStateMachine::advance`], and each due timer fires at its own
//! scheduled deadline, so a run is fully determined by the crash point
//! source and the command sequence.
//!
//! Within one flying tick the order is fixed: multiplier update, then
//! auto-cashout, then the crash check.

use crate::common::traits::CrashPointSource;
use crate::config::{CrashlineConfig, GameSettings, TimingConfig, MIN_AUTO_CASHOUT};
use crate::errors::{BetError, CrashlineResult};
use crate::games::history::HistoryStore;
use crate::games::ledger::BetLedger;
use crate::games::types::{round2, AutoCashout, Bet, EngineSnapshot, RoundEvent, RoundState, User};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// What a pending timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// First round after boot
    InitialStart,
    /// Betting window closes, plane takes off
    Countdown,
    /// Recurring multiplier update while flying
    Tick,
    /// Crash shown, round is reset when this fires
    CrashDisplay,
    /// Pause after reset, next round starts when this fires
    ResetDelay,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledTimer {
    kind: TimerKind,
    deadline: Instant,
}

pub struct RoundStateMachine<S = Box<dyn CrashPointSource>> {
    timing: TimingConfig,
    settings: GameSettings,
    source: S,

    state: RoundState,
    current_multiplier: f64,
    target_multiplier: f64,
    round_id: u64,
    flight_started_at: Option<Instant>,

    // At most one timer is ever pending
    timer: Option<ScheduledTimer>,
    start_in_progress: bool,
    reset_pending: bool,
    disposed: bool,

    ledger: BetLedger,
    history: HistoryStore,
    last_crash: f64,
    player: User,
    auto_cashout: AutoCashout,
    auto_cashed_out: bool,

    events: Vec<RoundEvent>,
}

impl<S: CrashPointSource> RoundStateMachine<S> {
    /// Build an engine from a validated copy of `config`
    pub fn new(config: &CrashlineConfig, mut source: S) -> CrashlineResult<Self> {
        config.validate()?;

        let mut history = HistoryStore::new(config.history.capacity);
        if config.history.prefill {
            history.prefill(&mut source, config.history.capacity);
        }

        let player = &config.player;

        Ok(Self {
            timing: config.timing.clone(),
            settings: config.game.clone(),
            source,
            state: RoundState::Waiting,
            current_multiplier: 1.0,
            target_multiplier: 1.0,
            round_id: 1,
            flight_started_at: None,
            timer: None,
            start_in_progress: false,
            reset_pending: false,
            disposed: false,
            ledger: BetLedger::new(&config.game),
            last_crash: history.last_crash(),
            history,
            player: User::new(player.id.clone(), player.name.clone(), player.balance),
            auto_cashout: AutoCashout {
                enabled: player.auto_cashout_enabled,
                target: player.auto_cashout_target,
            },
            auto_cashed_out: false,
            events: Vec::new(),
        })
    }

    /// Schedule the first round after the configured initial delay
    pub fn boot(&mut self, now: Instant) {
        if self.disposed || self.timer.is_some() {
            return;
        }
        self.schedule(TimerKind::InitialStart, now + self.timing.initial_delay());
    }

    /// Deadline of the pending timer, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.map(|timer| timer.deadline)
    }

    pub fn pending_timer(&self) -> Option<TimerKind> {
        self.timer.map(|timer| timer.kind)
    }

    /// Fire every timer due at or before `now`, each at its own deadline
    pub fn advance(&mut self, now: Instant) {
        while let Some(timer) = self.timer {
            if self.disposed || timer.deadline > now {
                break;
            }
            self.timer = None;
            self.fire(timer.kind, timer.deadline);
        }
    }

    fn fire(&mut self, kind: TimerKind, at: Instant) {
        match kind {
            TimerKind::InitialStart | TimerKind::ResetDelay => self.start_new_round(at),
            TimerKind::Countdown => self.take_off(at),
            TimerKind::Tick => self.tick(at),
            TimerKind::CrashDisplay => self.reset(at),
        }
    }

    /// Begin a new round: draw the crash point and open the betting window
    ///
    /// Ignored while a countdown is already running or a flight is live.
    pub fn start_new_round(&mut self, now: Instant) {
        if self.disposed {
            return;
        }
        if self.start_in_progress {
            debug!("Countdown already active for round {}, skipping start", self.round_id);
            return;
        }
        if self.state == RoundState::Flying {
            warn!("Round {} is in flight, refusing to start a new round", self.round_id);
            return;
        }

        if self.reset_pending {
            self.reset_round();
        }
        self.cancel_timers();
        self.start_in_progress = true;

        let target = self.source.next_crash_point();
        self.target_multiplier = if target.is_finite() { target.max(1.0) } else { 1.0 };
        self.current_multiplier = 1.0;
        self.flight_started_at = None;
        self.state = RoundState::Waiting;

        info!("Round {} open for bets, takeoff in {}ms", self.round_id, self.timing.countdown_ms);
        self.events.push(RoundEvent::RoundStarted {
            round_id: self.round_id,
            countdown_ms: self.timing.countdown_ms,
        });

        self.schedule(TimerKind::Countdown, now + self.timing.countdown());
    }

    fn take_off(&mut self, at: Instant) {
        self.state = RoundState::Flying;
        self.start_in_progress = false;
        self.flight_started_at = Some(at);

        info!("Round {} took off", self.round_id);
        self.events.push(RoundEvent::Takeoff { round_id: self.round_id });

        self.schedule(TimerKind::Tick, at + self.timing.tick_interval());
    }

    fn tick(&mut self, at: Instant) {
        let Some(started) = self.flight_started_at else {
            return;
        };
        if self.state != RoundState::Flying {
            return;
        }

        let elapsed = at.saturating_duration_since(started).as_secs_f64();
        let multiplier = round2(1.0 + elapsed * self.timing.growth_rate);
        let crashed = multiplier >= self.target_multiplier;

        self.current_multiplier = if crashed { self.target_multiplier } else { multiplier };
        trace!("Round {} at {:.2}x", self.round_id, self.current_multiplier);
        self.events.push(RoundEvent::MultiplierUpdated {
            round_id: self.round_id,
            multiplier: self.current_multiplier,
        });

        self.evaluate_auto_cashout();

        if crashed {
            self.crash(at);
        } else {
            self.schedule(TimerKind::Tick, at + self.timing.tick_interval());
        }
    }

    fn evaluate_auto_cashout(&mut self) {
        if !self.auto_cashout.enabled
            || self.auto_cashed_out
            || self.current_multiplier < self.auto_cashout.target
            || self.ledger.open_bet_for(&self.player.id).is_none()
        {
            return;
        }

        self.auto_cashed_out = true;
        match self.ledger.cashout(&mut self.player, self.state, self.current_multiplier) {
            Ok(payout) => {
                info!(
                    "Auto-cashout for {} at {:.2}x paid {:.2}",
                    self.player.id, self.current_multiplier, payout
                );
                self.push_cashout_event(payout, true);
            }
            Err(e) => warn!("Auto-cashout for {} failed: {}", self.player.id, e),
        }
    }

    fn crash(&mut self, at: Instant) {
        self.state = RoundState::Crashed;
        self.current_multiplier = self.target_multiplier;
        self.flight_started_at = None;
        self.reset_pending = true;

        if self.current_multiplier > 1.0 {
            self.last_crash = self.current_multiplier;
            self.history.record(self.current_multiplier);
        }

        let summary = self.ledger.summary(self.round_id, self.current_multiplier);
        info!(
            "Round {} crashed at {:.2}x ({} bets, {} cashed out)",
            self.round_id, self.current_multiplier, summary.bets, summary.winners
        );
        self.events.push(RoundEvent::Crashed { summary });

        self.schedule(TimerKind::CrashDisplay, at + self.timing.crash_display());
    }

    fn reset(&mut self, at: Instant) {
        self.reset_round();
        self.schedule(TimerKind::ResetDelay, at + self.timing.reset_delay());
    }

    fn reset_round(&mut self) {
        self.ledger.clear();
        self.round_id += 1;
        self.auto_cashed_out = false;
        self.current_multiplier = 1.0;
        self.reset_pending = false;

        debug!("Reset complete, next round is {}", self.round_id);
        self.events.push(RoundEvent::RoundReset {
            next_round_id: self.round_id,
        });
    }

    /// Stake `amount` for the local player, returning the amount debited
    pub fn place_bet(&mut self, amount: f64) -> Result<f64, BetError> {
        self.ensure_live("place a bet")?;

        let debit = self
            .ledger
            .place_bet(&mut self.player, amount, self.state)
            .inspect_err(|e| debug!("Bet rejected: {}", e))?;

        if let Some(bet) = self.ledger.open_bet_for(&self.player.id).cloned() {
            self.events.push(RoundEvent::BetPlaced {
                round_id: self.round_id,
                bet,
                balance: self.player.balance,
            });
        }
        Ok(debit)
    }

    /// Cash out the local player's open bet at the current multiplier
    pub fn cashout(&mut self) -> Result<f64, BetError> {
        self.ensure_live("cash out")?;

        let payout = self
            .ledger
            .cashout(&mut self.player, self.state, self.current_multiplier)
            .inspect_err(|e| debug!("Cashout rejected: {}", e))?;

        self.push_cashout_event(payout, false);
        Ok(payout)
    }

    pub fn set_auto_cashout(
        &mut self,
        enabled: bool,
        target: f64,
    ) -> Result<AutoCashout, BetError> {
        self.ensure_live("configure auto-cashout")?;

        if !target.is_finite() || target < MIN_AUTO_CASHOUT {
            return Err(BetError::InvalidAmount {
                amount: target,
                reason: format!("auto-cashout target must be at least {}", MIN_AUTO_CASHOUT),
            });
        }

        self.auto_cashout = AutoCashout { enabled, target };
        debug!("Auto-cashout {} at {:.2}x", if enabled { "enabled" } else { "disabled" }, target);
        self.events.push(RoundEvent::AutoCashoutChanged {
            auto_cashout: self.auto_cashout,
        });
        Ok(self.auto_cashout)
    }

    /// Cancel every pending timer and freeze the engine. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.cancel_timers();
        self.disposed = true;
        self.start_in_progress = false;

        info!("Round engine disposed during round {} ({})", self.round_id, self.state);
        self.events.push(RoundEvent::Disposed);
    }

    /// Take all events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<RoundEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            state: self.state,
            current_multiplier: self.current_multiplier,
            round_id: self.round_id,
            history: self.history.to_vec(),
            last_crash: self.last_crash,
            bets: self.ledger.bets().to_vec(),
            balance: self.player.balance,
            max_bet: self.max_bet(),
            auto_cashout: self.auto_cashout,
            settings: self.settings.clone(),
            disposed: self.disposed,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn current_multiplier(&self) -> f64 {
        self.current_multiplier
    }

    pub fn round_id(&self) -> u64 {
        self.round_id
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Unrounded multiplier of the most recent crash above 1.00x
    pub fn last_crash(&self) -> f64 {
        self.last_crash
    }

    pub fn bets(&self) -> &[Bet] {
        self.ledger.bets()
    }

    pub fn player(&self) -> &User {
        &self.player
    }

    pub fn max_bet(&self) -> f64 {
        self.settings.max_bet_for(self.player.balance)
    }

    pub fn auto_cashout(&self) -> AutoCashout {
        self.auto_cashout
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_live(&self, operation: &'static str) -> Result<(), BetError> {
        if self.disposed {
            return Err(BetError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn push_cashout_event(&mut self, payout: f64, auto: bool) {
        self.events.push(RoundEvent::CashedOut {
            round_id: self.round_id,
            user_id: self.player.id.clone(),
            multiplier: self.current_multiplier,
            payout,
            balance: self.player.balance,
            auto,
        });
    }

    fn schedule(&mut self, kind: TimerKind, deadline: Instant) {
        if let Some(previous) = self.timer.replace(ScheduledTimer { kind, deadline }) {
            warn!("Replacing pending {:?} timer with {:?}", previous.kind, kind);
        }
    }

    fn cancel_timers(&mut self) {
        if let Some(timer) = self.timer.take() {
            trace!("Cancelled pending {:?} timer", timer.kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CrashlineError;
    use crate::games::crash_point::ScriptedCrashPoints;
    use std::time::Duration;

    fn test_config(balance: f64) -> CrashlineConfig {
        let mut config = CrashlineConfig::default();
        config.player.balance = balance;
        config.history.prefill = false;
        config
    }

    fn engine(balance: f64, points: &[f64]) -> RoundStateMachine<ScriptedCrashPoints> {
        let source = ScriptedCrashPoints::new(points.to_vec());
        RoundStateMachine::new(&test_config(balance), source).unwrap()
    }

    fn at(t0: Instant, millis: u64) -> Instant {
        t0 + Duration::from_millis(millis)
    }

    /// Boot and open round 1 at t0 + 1s
    fn open_first_round(engine: &mut RoundStateMachine<ScriptedCrashPoints>, t0: Instant) {
        engine.boot(t0);
        engine.advance(at(t0, 1000));
        assert_eq!(engine.state(), RoundState::Waiting);
        assert_eq!(engine.pending_timer(), Some(TimerKind::Countdown));
    }

    fn states_of(events: &[RoundEvent]) -> Vec<&'static str> {
        events
            .iter()
            .filter_map(|event| match event {
                RoundEvent::RoundStarted { .. } => Some("waiting"),
                RoundEvent::Takeoff { .. } => Some("flying"),
                RoundEvent::Crashed { .. } => Some("crashed"),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_boot_schedules_initial_start() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[2.0]);

        engine.boot(t0);
        assert_eq!(engine.pending_timer(), Some(TimerKind::InitialStart));
        assert_eq!(engine.next_deadline(), Some(at(t0, 1000)));

        engine.advance(at(t0, 999));
        assert_eq!(engine.pending_timer(), Some(TimerKind::InitialStart));
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_bet_and_cashout_scenario() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[3.0]);
        open_first_round(&mut engine, t0);

        assert_eq!(engine.place_bet(10.0), Ok(10.0));
        assert_eq!(engine.player().balance, 90.0);
        assert_eq!(engine.bets().len(), 1);

        // Takeoff at 6s, 2.00x after ten seconds of flight
        engine.advance(at(t0, 6000));
        assert_eq!(engine.state(), RoundState::Flying);
        engine.advance(at(t0, 16_000));
        assert_eq!(engine.current_multiplier(), 2.0);

        let payout = engine.cashout().unwrap();
        assert_eq!(payout, 20.0);
        assert_eq!(engine.player().balance, 110.0);
        assert_eq!(engine.bets()[0].payout, Some(20.0));

        // Crash at 3.00x after twenty seconds, reset one second later
        engine.advance(at(t0, 26_000));
        assert_eq!(engine.state(), RoundState::Crashed);
        assert_eq!(engine.last_crash(), 3.0);
        assert_eq!(engine.round_id(), 1);

        engine.advance(at(t0, 27_000));
        assert_eq!(engine.round_id(), 2);
        assert!(engine.bets().is_empty());
        assert_eq!(engine.player().balance, 110.0);
        assert_eq!(engine.pending_timer(), Some(TimerKind::ResetDelay));

        engine.advance(at(t0, 29_000));
        assert_eq!(engine.state(), RoundState::Waiting);
        assert_eq!(engine.current_multiplier(), 1.0);
    }

    #[test]
    fn test_uncashed_bet_is_lost() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[1.5]);
        open_first_round(&mut engine, t0);

        engine.place_bet(25.0).unwrap();
        engine.advance(at(t0, 60_000));

        assert_eq!(engine.player().balance, 75.0);
        let crashed = engine
            .drain_events()
            .into_iter()
            .find_map(|event| match event {
                RoundEvent::Crashed { summary } => Some(summary),
                _ => None,
            })
            .unwrap();
        assert_eq!(crashed.total_wagered, 25.0);
        assert_eq!(crashed.total_paid_out, 0.0);
        assert_eq!(crashed.winners, 0);
    }

    #[test]
    fn test_state_order_over_many_rounds() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[1.0, 1.2, 2.5, 1.01, 4.0]);
        engine.boot(t0);
        engine.advance(at(t0, 300_000));

        let events = engine.drain_events();
        let states = states_of(&events);
        assert!(states.len() >= 15);
        for (i, state) in states.iter().enumerate() {
            assert_eq!(*state, ["waiting", "flying", "crashed"][i % 3]);
        }
    }

    #[test]
    fn test_multiplier_monotonic_and_ends_at_target() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[2.375]);
        open_first_round(&mut engine, t0);
        engine.drain_events();

        engine.advance(at(t0, 60_000));
        let readings: Vec<f64> = engine
            .drain_events()
            .into_iter()
            .take_while(|event| !matches!(event, RoundEvent::RoundReset { .. }))
            .filter_map(|event| match event {
                RoundEvent::MultiplierUpdated { multiplier, .. } => Some(multiplier),
                _ => None,
            })
            .collect();

        assert!(readings.len() > 100);
        assert!(readings.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(*readings.last().unwrap(), 2.375);
        assert_eq!(engine.history().last_crash(), 2.38);
        assert_eq!(engine.last_crash(), 2.375);
        assert_eq!(engine.snapshot().last_crash, 2.375);
    }

    #[test]
    fn test_instant_crash_not_recorded() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[1.0]);
        open_first_round(&mut engine, t0);

        engine.place_bet(10.0).unwrap();
        engine.advance(at(t0, 6050));

        assert_eq!(engine.state(), RoundState::Crashed);
        assert_eq!(engine.current_multiplier(), 1.0);
        assert!(engine.history().is_empty());
        assert_eq!(engine.last_crash(), 1.0);
        assert_eq!(engine.player().balance, 90.0);
    }

    #[test]
    fn test_history_bound_after_many_rounds() {
        let t0 = Instant::now();
        let points: Vec<f64> = (0..25).map(|i| 1.1 + i as f64 * 0.01).collect();
        let mut engine = engine(100.0, &points);
        engine.boot(t0);

        // Step timer by timer until the 25th round has been reset
        while engine.round_id() < 26 {
            let deadline = engine.next_deadline().unwrap();
            engine.advance(deadline);
        }

        let history = engine.history().to_vec();
        assert_eq!(history.len(), 20);
        assert_eq!(history[0], 1.34);
        assert_eq!(history[19], 1.15);
    }

    #[test]
    fn test_duplicate_bet_leaves_balance() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[2.0]);
        open_first_round(&mut engine, t0);

        engine.place_bet(10.0).unwrap();
        let err = engine.place_bet(10.0).unwrap_err();
        assert!(matches!(err, BetError::DuplicateBet { .. }));
        assert_eq!(engine.player().balance, 90.0);
    }

    #[test]
    fn test_insufficient_funds_and_wrong_state() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[2.0]);
        open_first_round(&mut engine, t0);

        assert!(matches!(
            engine.place_bet(200.0),
            Err(BetError::InsufficientFunds { .. })
        ));
        assert!(matches!(engine.cashout(), Err(BetError::InvalidState { .. })));
        assert_eq!(engine.player().balance, 100.0);
        assert_eq!(engine.max_bet(), 100.0);
    }

    #[test]
    fn test_auto_cashout_fires_once() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[5.0]);
        engine.set_auto_cashout(true, 2.0).unwrap();
        open_first_round(&mut engine, t0);

        engine.place_bet(10.0).unwrap();
        engine.advance(at(t0, 60_000));

        let cashouts: Vec<(f64, bool)> = engine
            .drain_events()
            .into_iter()
            .filter_map(|event| match event {
                RoundEvent::CashedOut { multiplier, auto, .. } => Some((multiplier, auto)),
                _ => None,
            })
            .collect();
        assert_eq!(cashouts, vec![(2.0, true)]);
        assert_eq!(engine.player().balance, 110.0);
    }

    #[test]
    fn test_auto_cashout_above_crash_is_not_honored() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[2.5]);
        engine.set_auto_cashout(true, 3.0).unwrap();
        open_first_round(&mut engine, t0);

        engine.place_bet(10.0).unwrap();
        engine.advance(at(t0, 60_000));

        assert_eq!(engine.player().balance, 90.0);
    }

    #[test]
    fn test_auto_cashout_at_crash_point_wins_same_tick() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[2.5]);
        engine.set_auto_cashout(true, 2.5).unwrap();
        open_first_round(&mut engine, t0);

        engine.place_bet(10.0).unwrap();
        engine.advance(at(t0, 60_000));

        let events = engine.drain_events();
        let cashout_index = events
            .iter()
            .position(|event| matches!(event, RoundEvent::CashedOut { auto: true, .. }))
            .unwrap();
        let crash_index = events
            .iter()
            .position(|event| matches!(event, RoundEvent::Crashed { .. }))
            .unwrap();
        assert!(cashout_index < crash_index);
        assert_eq!(engine.player().balance, 115.0);
    }

    #[test]
    fn test_auto_cashout_target_validation() {
        let mut engine = engine(100.0, &[2.0]);
        assert!(matches!(
            engine.set_auto_cashout(true, 1.0),
            Err(BetError::InvalidAmount { .. })
        ));
        assert!(engine.set_auto_cashout(false, f64::NAN).is_err());
        assert_eq!(engine.auto_cashout(), AutoCashout::default());
    }

    #[test]
    fn test_start_reentrancy_guard() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[2.0, 9.0]);
        open_first_round(&mut engine, t0);
        let deadline = engine.next_deadline();

        engine.start_new_round(at(t0, 1500));
        assert_eq!(engine.next_deadline(), deadline);
        assert_eq!(states_of(&engine.drain_events()), vec!["waiting"]);
        assert_eq!(engine.target_multiplier, 2.0);

        // Refused while flying as well
        engine.advance(at(t0, 6100));
        engine.start_new_round(at(t0, 6100));
        assert_eq!(engine.state(), RoundState::Flying);
        assert_eq!(engine.pending_timer(), Some(TimerKind::Tick));
    }

    #[test]
    fn test_start_after_crash_runs_owed_reset() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[1.5, 2.0]);
        open_first_round(&mut engine, t0);
        engine.place_bet(10.0).unwrap();

        engine.advance(at(t0, 11_000));
        assert_eq!(engine.state(), RoundState::Crashed);
        assert_eq!(engine.pending_timer(), Some(TimerKind::CrashDisplay));

        engine.start_new_round(at(t0, 11_100));
        assert_eq!(engine.state(), RoundState::Waiting);
        assert_eq!(engine.round_id(), 2);
        assert!(engine.bets().is_empty());
        assert_eq!(engine.pending_timer(), Some(TimerKind::Countdown));
        assert_eq!(engine.target_multiplier, 2.0);
    }

    #[test]
    fn test_dispose_is_idempotent_and_silences_timers() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[3.0]);
        open_first_round(&mut engine, t0);
        engine.advance(at(t0, 7000));
        engine.drain_events();

        engine.dispose();
        engine.dispose();
        assert!(engine.is_disposed());
        assert_eq!(engine.next_deadline(), None);

        let multiplier = engine.current_multiplier();
        engine.advance(at(t0, 100_000));
        engine.start_new_round(at(t0, 100_000));
        engine.boot(at(t0, 100_000));
        assert_eq!(engine.current_multiplier(), multiplier);
        assert_eq!(engine.next_deadline(), None);

        assert!(matches!(engine.cashout(), Err(BetError::InvalidState { .. })));
        assert_eq!(engine.drain_events(), vec![RoundEvent::Disposed]);
    }

    #[test]
    fn test_dispose_while_crashed_and_resetting() {
        let t0 = Instant::now();

        // Crashed, crash display pending
        let mut crashed = engine(100.0, &[1.5, 2.0]);
        open_first_round(&mut crashed, t0);
        crashed.advance(at(t0, 11_000));
        assert_eq!(crashed.pending_timer(), Some(TimerKind::CrashDisplay));
        crashed.drain_events();
        crashed.dispose();
        crashed.advance(at(t0, 60_000));
        assert_eq!(crashed.state(), RoundState::Crashed);
        assert_eq!(crashed.round_id(), 1);
        assert_eq!(crashed.drain_events(), vec![RoundEvent::Disposed]);

        // Reset done, next start pending
        let mut resetting = engine(100.0, &[1.5, 2.0]);
        open_first_round(&mut resetting, t0);
        resetting.advance(at(t0, 12_000));
        assert_eq!(resetting.pending_timer(), Some(TimerKind::ResetDelay));
        assert_eq!(resetting.round_id(), 2);
        resetting.drain_events();
        resetting.dispose();
        resetting.dispose();
        resetting.advance(at(t0, 60_000));
        assert_eq!(resetting.state(), RoundState::Crashed);
        assert_eq!(resetting.round_id(), 2);
        assert_eq!(resetting.next_deadline(), None);
        assert_eq!(resetting.drain_events(), vec![RoundEvent::Disposed]);
        assert!(matches!(resetting.place_bet(10.0), Err(BetError::InvalidState { .. })));
    }

    #[test]
    fn test_rejects_unrunnable_config() {
        let broken: [fn(&mut CrashlineConfig); 4] = [
            |config| config.timing.tick_interval_ms = 0,
            |config| config.timing.growth_rate = 0.0,
            |config| config.timing.growth_rate = f64::NAN,
            |config| config.history.capacity = 0,
        ];

        for breaks in broken {
            let mut config = test_config(100.0);
            breaks(&mut config);
            let result = RoundStateMachine::new(&config, ScriptedCrashPoints::new([2.0]));
            assert!(matches!(result, Err(CrashlineError::Configuration(_))));
        }
    }

    #[test]
    fn test_prefilled_history() {
        let mut config = test_config(100.0);
        config.history.prefill = true;
        config.history.capacity = 3;

        let source = ScriptedCrashPoints::new([1.5, 2.5, 3.5, 7.0]);
        let engine = RoundStateMachine::new(&config, source).unwrap();
        assert_eq!(engine.history().to_vec(), vec![3.5, 2.5, 1.5]);
        assert_eq!(engine.last_crash(), 3.5);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let t0 = Instant::now();
        let mut engine = engine(100.0, &[2.0]);
        open_first_round(&mut engine, t0);
        engine.place_bet(10.0).unwrap();

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.state, RoundState::Waiting);
        assert_eq!(snapshot.balance, 90.0);
        assert_eq!(snapshot.max_bet, 90.0);
        assert_eq!(snapshot.bets.len(), 1);
        assert_eq!(snapshot.round_id, 1);
        assert!(!snapshot.disposed);
    }
}
