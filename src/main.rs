//! Marga demo - walks an agent across a generated voxel world
//!
//! Builds a flat world with a few walls and steps, sets a goal, and runs
//! the planning tick loop until the agent arrives or the tick budget runs
//! out. Every lifecycle event is logged.
//!
//! Usage:
//!   marga --goal 40,64,0
//!   marga --config marga.toml --strategy dijkstra --ticks 5000

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use marga::config::MargaConfig;
use marga::core::Cell;
use marga::goal::Goal;
use marga::movement::{MoveModel, VoxelWorld, WalkingModel};
use marga::planning::{Actuator, PathEvent, PlanningCoordinator, StepActuator};
use marga::search::SearchStrategy;
use marga::{MargaError, Result};

/// Marga planning demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Goal cell as x,y,z
    #[arg(short, long, default_value = "40,64,0")]
    goal: Cell,

    /// Start cell as x,y,z
    #[arg(short, long, default_value = "0,64,0")]
    start: Cell,

    /// Maximum ticks to run
    #[arg(short, long, default_value_t = 5000)]
    ticks: u64,

    /// Search strategy (overrides the config file)
    #[arg(long, value_enum)]
    strategy: Option<SearchStrategy>,

    /// Milliseconds per tick (0 runs as fast as possible)
    #[arg(long, default_value_t = 0)]
    tick_ms: u64,
}

const GROUND_Y: i32 = 64;

/// Flat ground with a wall that has one gap, and a one-block step
fn demo_world() -> VoxelWorld {
    let mut world = VoxelWorld::flat(GROUND_Y);
    for z in -12..=12 {
        if z != 9 {
            world.add_wall(12, z, 3);
        }
    }
    for z in -3..=3 {
        world.add_wall(24, z, 1);
        world.add_wall(25, z, 1);
    }
    world
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("marga=info".parse().map_err(|e| {
                    MargaError::Config(format!("invalid log directive: {}", e))
                })?),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            MargaConfig::load(path)?
        }
        None => {
            info!("Using default configuration");
            MargaConfig::default()
        }
    };
    if let Some(strategy) = args.strategy {
        config.search.strategy = strategy;
    }

    info!("Marga v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Strategy {:?}, timeouts {}ms/{}ms (plan-ahead {}ms/{}ms)",
        config.search.strategy,
        config.planning.primary_timeout_ms,
        config.planning.failure_timeout_ms,
        config.planning.plan_ahead_primary_timeout_ms,
        config.planning.plan_ahead_failure_timeout_ms
    );

    let model: Arc<dyn MoveModel> = Arc::new(WalkingModel::new(demo_world()));
    let actuator = StepActuator::new(args.start);
    let mut coordinator = PlanningCoordinator::new(config, model, actuator);
    let events = coordinator.subscribe();

    let goal = Goal::Block(args.goal);
    info!("Planning from {} to {}", args.start, goal);
    coordinator.set_goal_and_path(goal.clone())?;

    let tick_interval = Duration::from_millis(args.tick_ms);
    let mut arrived = false;
    for tick in 0..args.ticks {
        // Nothing to walk yet; wait for the search instead of spinning
        if !coordinator.has_path() && coordinator.in_progress().is_some() {
            coordinator.await_search(Duration::from_secs(10));
        }
        coordinator.tick()?;

        for event in events.try_iter() {
            info!("[tick {}] {:?}", tick, event);
            arrived |= event == PathEvent::AtGoal;
        }
        if let Some(e) = coordinator.take_search_error() {
            error!("Search aborted: {}", e);
            return Err(e.into());
        }
        if arrived {
            break;
        }

        // Nothing to walk and nothing running; start again from here
        if coordinator.calc_failed_last_tick() {
            warn!("Search failed, retrying");
        }
        coordinator.replan_if_idle()?;

        if tick % 100 == 0
            && let Some(eta) = coordinator.estimated_ticks_to_goal()
        {
            info!(
                "[tick {}] at {}, ~{:.0} ticks to goal",
                tick,
                coordinator.actuator().position(),
                eta
            );
        }

        if !tick_interval.is_zero() {
            std::thread::sleep(tick_interval);
        }
    }

    let position = coordinator.actuator().position();
    if arrived {
        info!("Arrived at {}", position);
    } else {
        warn!("Stopped at {} without reaching {}", position, goal);
        coordinator.force_cancel();
    }
    Ok(())
}
