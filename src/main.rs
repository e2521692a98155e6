//! Crashline CLI
//!
//! Runs the round engine in the terminal, optionally staking on every round.

use clap::Parser;
use crashline::common::config::generate_sample_config;
use crashline::games::{format_amount, format_multiplier};
use crashline::{
    CrashPointGenerator, CrashlineConfig, ConfigLoader, EngineHandle, GameEngine, RoundEvent,
};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "crashline")]
#[command(about = "Crash game round engine", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Write a sample configuration file to this path and exit
    #[arg(long)]
    generate_config: Option<String>,

    /// Use short countdown and delay timings
    #[arg(long)]
    fast: bool,

    /// Stop after this many rounds have crashed
    #[arg(long, default_value = "5")]
    rounds: u64,

    /// Stake placed at the start of every round
    #[arg(long)]
    bet: Option<f64>,

    /// Enable auto-cashout at this multiplier
    #[arg(long)]
    auto_cashout: Option<f64>,

    /// Seed the crash point generator for a reproducible session
    #[arg(long)]
    seed: Option<u64>,

    /// Print every event as a JSON line
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(path) = args.generate_config.as_deref() {
        generate_sample_config(path)?;
        info!("Sample configuration written to {}", path);
        return Ok(());
    }

    let mut loader = ConfigLoader::new();
    if let Some(path) = args.config.as_deref() {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if args.fast {
        config.timing = CrashlineConfig::fast().timing;
    }

    let (engine, task) = match args.seed {
        Some(seed) => {
            let generator = CrashPointGenerator::with_seed(seed, config.odds.clone());
            GameEngine::spawn(&config, generator)?
        }
        None => GameEngine::spawn_from_config(&config)?,
    };
    let mut events = engine.subscribe();

    info!(
        "Crashline started: balance {} {}, {} rounds",
        format_amount(config.player.balance),
        config.game.currency,
        args.rounds
    );

    if let Some(target) = args.auto_cashout {
        engine.set_auto_cashout(true, target).await?;
    }

    tokio::select! {
        _ = play(&engine, &mut events, &args) => {}
        _ = shutdown_signal() => info!("Interrupted, shutting down"),
    }

    engine.shutdown().await;
    let snapshot = task.await?;

    info!(
        "Final balance {} {} after round {}",
        format_amount(snapshot.balance),
        snapshot.settings.currency,
        snapshot.round_id
    );
    let recent: Vec<String> =
        snapshot.history.iter().take(5).map(|m| format_multiplier(*m)).collect();
    info!("Recent crashes: {}", recent.join(" "));

    Ok(())
}

async fn play(engine: &EngineHandle, events: &mut Receiver<RoundEvent>, args: &Args) {
    let mut crashed = 0;

    while crashed < args.rounds {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event stream lagged, skipped {} events", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        if args.json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to encode event: {}", e),
            }
        } else {
            print_event(&event);
        }

        match event {
            RoundEvent::RoundStarted { .. } => {
                if let Some(amount) = args.bet {
                    if let Err(e) = engine.place_bet(amount).await {
                        warn!("Bet rejected: {}", e);
                    }
                }
            }
            RoundEvent::Crashed { .. } => crashed += 1,
            RoundEvent::Disposed => break,
            _ => {}
        }
    }
}

fn print_event(event: &RoundEvent) {
    match event {
        RoundEvent::RoundStarted { round_id, countdown_ms } => {
            println!("Round {} starts in {:.1}s", round_id, *countdown_ms as f64 / 1000.0)
        }
        RoundEvent::Takeoff { round_id } => println!("Round {} is flying", round_id),
        RoundEvent::BetPlaced { bet, balance, .. } => {
            let (amount, balance) = (format_amount(bet.amount), format_amount(*balance));
            println!("Bet {} placed, balance {}", amount, balance)
        }
        RoundEvent::CashedOut {
            multiplier,
            payout,
            balance,
            auto,
            ..
        } => println!(
            "{}cashed out at {} for {}, balance {}",
            if *auto { "Auto-" } else { "" },
            format_multiplier(*multiplier),
            format_amount(*payout),
            format_amount(*balance)
        ),
        RoundEvent::Crashed { summary } => println!(
            "Crashed at {} ({} bets, {} winners)",
            format_multiplier(summary.crash_multiplier),
            summary.bets,
            summary.winners
        ),
        RoundEvent::AutoCashoutChanged { auto_cashout } => println!(
            "Auto-cashout {} at {}",
            if auto_cashout.enabled { "enabled" } else { "disabled" },
            format_multiplier(auto_cashout.target)
        ),
        RoundEvent::MultiplierUpdated { .. }
        | RoundEvent::RoundReset { .. }
        | RoundEvent::Disposed => {}
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
