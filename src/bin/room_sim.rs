// bin/room_sim.rs - Room Simulation Binary

use actix::prelude::*;
use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use fipa_room_agents::actor::{
    agent_status, shutdown_agents, start_role, ActorRegistry, ListActors, ShutdownReason,
};
use fipa_room_agents::config::SimulationConfig;
use fipa_room_agents::observability::{
    init_metrics, init_tracing, MetricsConfig, TracingConfig, TracingFormat,
};
use fipa_room_agents::platform::Platform;
use fipa_room_agents::room::{
    AgentRole, BuildingEnvironment, ConsoleCommand, DeviceController, EnvironmentHandle,
    RoomManager,
};

/// Room illuminance simulation
#[derive(Parser, Debug)]
#[command(name = "room-sim")]
#[command(author = "SavageS")]
#[command(version)]
#[command(about = "Room illuminance negotiation between FIPA agents", long_about = None)]
struct Args {
    /// Config file path (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, compact, json); overrides the config file
    #[arg(long)]
    log_format: Option<TracingFormat>,

    /// Enable metrics server
    #[arg(long)]
    metrics: bool,

    /// Metrics listen address
    #[arg(long, default_value = "0.0.0.0:9090")]
    metrics_addr: String,

    /// Stop after this many seconds
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Do not read operator commands from stdin
    #[arg(long)]
    no_console: bool,
}

#[actix_rt::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = SimulationConfig::load(args.config.as_deref())?;
    if args.log_level.is_some() || args.log_format.is_some() {
        config.logging = TracingConfig::for_level(
            args.log_level.as_deref().unwrap_or("info"),
            args.log_format.unwrap_or(config.logging.format),
        );
    }
    init_tracing(&config.logging)?;
    info!(config = ?args.config, "Configuration loaded");

    let _metrics_handle = if args.metrics {
        let listen_addr: SocketAddr = args.metrics_addr.parse()?;
        match init_metrics(MetricsConfig { listen_addr }) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Failed to initialize metrics");
                None
            }
        }
    } else {
        None
    };

    let platform = Platform::default();
    let registry = ActorRegistry::new().start();

    let environment = BuildingEnvironment::new(&config.environment);
    let manager = RoomManager::new(&config);
    let lamp = DeviceController::lamp(&config);
    let blinds = DeviceController::blinds(&config);

    let roles: [(&str, &dyn AgentRole); 4] = [
        (config.environment.name.as_str(), &environment),
        (config.manager.name.as_str(), &manager),
        (config.lamp.name.as_str(), &lamp),
        (config.blinds.name.as_str(), &blinds),
    ];
    let tick = Duration::from_millis(config.scheduler.tick_ms);
    for (name, role) in roles {
        start_role(
            &platform,
            &registry,
            name,
            role,
            tick,
            config.scheduler.max_turns_per_tick,
        )?;
    }

    let env = environment.handle();
    let mut commands = if args.no_console {
        None
    } else {
        println!("{}", ConsoleCommand::USAGE);
        Some(spawn_console())
    };

    let deadline = async {
        match args.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    info!("Room simulation running, press Ctrl+C to stop");
    loop {
        tokio::select! {
            command = next_command(&mut commands) => match command {
                Some(ConsoleCommand::Quit) => break,
                Some(command) => {
                    let state = command.apply(&env);
                    println!("illuminance={} weather={}", state.illuminance, state.weather);
                    if command == ConsoleCommand::Status {
                        print_agents(&registry).await;
                    }
                }
                None => {
                    info!("Console closed");
                    commands = None;
                }
            },
            _ = &mut deadline => {
                info!("Simulation time elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    info!("Shutting down...");
    shutdown_agents(&registry, ShutdownReason::PlatformShutdown).await?;
    tokio::time::sleep(tick * 2).await;

    report(&manager, &env, &platform);
    System::current().stop();
    Ok(())
}

/// Read operator commands from stdin on a separate task
fn spawn_console() -> mpsc::Receiver<ConsoleCommand> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<ConsoleCommand>() {
                Ok(command) => {
                    if tx.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => println!("{e}; {}", ConsoleCommand::USAGE),
            }
        }
    });
    rx
}

/// Next console command; never resolves once the console is closed
async fn next_command(commands: &mut Option<mpsc::Receiver<ConsoleCommand>>) -> Option<ConsoleCommand> {
    match commands {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn print_agents(registry: &Addr<ActorRegistry>) {
    let Ok(names) = registry.send(ListActors).await else {
        return;
    };
    for name in names {
        match agent_status(registry, &name).await {
            Ok(status) => println!(
                "  {:<20} {:<12} behaviors={} pending={} turns={}",
                status.name,
                status.role,
                status.behaviors.len(),
                status.pending_messages,
                status.turns
            ),
            Err(e) => println!("  {name:<20} {e}"),
        }
    }
}

fn report(manager: &RoomManager, env: &EnvironmentHandle, platform: &Platform) {
    let state = env.snapshot();
    println!("final: illuminance={} weather={}", state.illuminance, state.weather);

    for (i, outcome) in manager.outcomes().lock().iter().enumerate() {
        println!("negotiation {}: {:?}", i + 1, outcome);
    }

    let mut counts: Vec<_> = platform.sniffer().performative_counts().into_iter().collect();
    counts.sort_by_key(|(performative, _)| performative.as_str());
    for (performative, count) in counts {
        println!("  {performative:<16} {count}");
    }
}
