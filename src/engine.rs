//! Async driver for the round state machine
//!
//! One tokio task owns the [`RoundStateMachine`]. It sleeps until the next
//! timer deadline, serves commands from [`EngineHandle`]s in between, and
//! publishes every [`RoundEvent`] on a broadcast channel. Because a single
//! task owns the machine, commands and timers never interleave.
//!
//! The engine is disposed when [`EngineHandle::shutdown`] is called or when
//! the last handle is dropped.

use crate::common::traits::CrashPointSource;
use crate::config::CrashlineConfig;
use crate::errors::{BetError, CrashlineResult, EngineError};
use crate::games::crash_point::CrashPointGenerator;
use crate::games::round::RoundStateMachine;
use crate::games::types::{AutoCashout, EngineSnapshot, RoundEvent};
use std::ops::ControlFlow;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 4096;

/// Requests served by the engine task
#[derive(Debug)]
pub enum EngineCommand {
    PlaceBet {
        amount: f64,
        reply: oneshot::Sender<Result<f64, BetError>>,
    },
    Cashout {
        reply: oneshot::Sender<Result<f64, BetError>>,
    },
    SetAutoCashout {
        enabled: bool,
        target: f64,
        reply: oneshot::Sender<Result<AutoCashout, BetError>>,
    },
    StartNewRound,
    Snapshot {
        reply: oneshot::Sender<EngineSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable client for a running engine
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
    events: broadcast::Sender<RoundEvent>,
}

/// A running engine: its handle and the task that resolves to the final snapshot
pub type SpawnedEngine = (EngineHandle, JoinHandle<EngineSnapshot>);

/// Spawns round engines onto the current tokio runtime
pub struct GameEngine;

impl GameEngine {
    /// Spawn an engine backed by an entropy-seeded crash point generator
    pub fn spawn_from_config(config: &CrashlineConfig) -> CrashlineResult<SpawnedEngine> {
        Self::spawn(config, CrashPointGenerator::from_entropy(config.odds.clone()))
    }

    /// Spawn an engine drawing crash points from `source`
    ///
    /// Fails without spawning anything if `config` does not validate.
    pub fn spawn<S>(config: &CrashlineConfig, source: S) -> CrashlineResult<SpawnedEngine>
    where
        S: CrashPointSource + 'static,
    {
        let machine = RoundStateMachine::new(config, source)?;

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        let task = tokio::spawn(run(machine, command_rx, event_tx.clone()));

        let handle = EngineHandle {
            commands: command_tx,
            events: event_tx,
        };
        Ok((handle, task))
    }
}

async fn run<S: CrashPointSource>(
    mut machine: RoundStateMachine<S>,
    mut commands: mpsc::Receiver<EngineCommand>,
    events: broadcast::Sender<RoundEvent>,
) -> EngineSnapshot {
    tracing::debug!("Round engine task started");
    machine.boot(Instant::now().into_std());
    publish(&mut machine, &events);

    loop {
        let deadline = machine.next_deadline();

        tokio::select! {
            command = commands.recv() => {
                machine.advance(Instant::now().into_std());
                let Some(command) = command else {
                    tracing::debug!("All engine handles dropped, shutting down");
                    break;
                };
                if handle_command(&mut machine, &events, command).is_break() {
                    break;
                }
            }
            _ = sleep_until(deadline) => {
                machine.advance(Instant::now().into_std());
            }
        }

        publish(&mut machine, &events);
    }

    machine.dispose();
    publish(&mut machine, &events);
    tracing::debug!("Round engine task stopped");
    machine.snapshot()
}

fn handle_command<S: CrashPointSource>(
    machine: &mut RoundStateMachine<S>,
    events: &broadcast::Sender<RoundEvent>,
    command: EngineCommand,
) -> ControlFlow<()> {
    let now = Instant::now().into_std();

    // A dropped reply receiver only means the caller stopped waiting
    match command {
        EngineCommand::PlaceBet { amount, reply } => {
            let _ = reply.send(machine.place_bet(amount));
        }
        EngineCommand::Cashout { reply } => {
            let _ = reply.send(machine.cashout());
        }
        EngineCommand::SetAutoCashout { enabled, target, reply } => {
            let _ = reply.send(machine.set_auto_cashout(enabled, target));
        }
        EngineCommand::StartNewRound => machine.start_new_round(now),
        EngineCommand::Snapshot { reply } => {
            let _ = reply.send(machine.snapshot());
        }
        EngineCommand::Shutdown { reply } => {
            machine.dispose();
            publish(machine, events);
            let _ = reply.send(());
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

fn publish<S: CrashPointSource>(
    machine: &mut RoundStateMachine<S>,
    events: &broadcast::Sender<RoundEvent>,
) {
    for event in machine.drain_events() {
        if events.send(event).is_err() {
            tracing::trace!("No subscribers for round event");
        }
    }
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

impl EngineHandle {
    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.events.subscribe()
    }

    pub async fn place_bet(&self, amount: f64) -> CrashlineResult<f64> {
        let result = self.request(|reply| EngineCommand::PlaceBet { amount, reply }).await?;
        Ok(result?)
    }

    pub async fn cashout(&self) -> CrashlineResult<f64> {
        let result = self.request(|reply| EngineCommand::Cashout { reply }).await?;
        Ok(result?)
    }

    pub async fn set_auto_cashout(
        &self,
        enabled: bool,
        target: f64,
    ) -> CrashlineResult<AutoCashout> {
        let result = self
            .request(|reply| EngineCommand::SetAutoCashout { enabled, target, reply })
            .await?;
        Ok(result?)
    }

    /// Ask the engine to open a new round now (ignored mid-countdown or mid-flight)
    pub async fn start_new_round(&self) -> CrashlineResult<()> {
        self.commands
            .send(EngineCommand::StartNewRound)
            .await
            .map_err(|_| EngineError::Stopped)?;
        Ok(())
    }

    pub async fn snapshot(&self) -> CrashlineResult<EngineSnapshot> {
        Ok(self.request(|reply| EngineCommand::Snapshot { reply }).await?)
    }

    /// Dispose the engine and stop its task. Safe to call more than once.
    pub async fn shutdown(&self) {
        if self.request(|reply| EngineCommand::Shutdown { reply }).await.is_err() {
            tracing::trace!("Engine already stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| EngineError::Stopped)?;
        response.await.map_err(|_| EngineError::Stopped)
    }
}
