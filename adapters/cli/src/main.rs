#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that generates an Island Defence level and prints it.

mod render;
mod settings;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use island_defence_core::{Direction, TileCoord};
use island_defence_engine::Engine;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

/// Generates an island level, places spawners and prints the result.
#[derive(Debug, Parser)]
#[command(name = "island-defence", version)]
struct Args {
    /// TOML file providing world, catalog and spawner settings.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
    /// Seed string overriding the configured one.
    #[arg(long, short = 's')]
    seed: Option<String>,
    /// Number of spawners to request.
    #[arg(long, short = 'n')]
    spawners: Option<usize>,
    /// Objective tile as `x,y`.
    #[arg(long, value_parser = parse_coord)]
    objective: Option<TileCoord>,
    /// Side of the objective enemies enter from.
    #[arg(long, value_enum, default_value_t = Facing::South)]
    facing: Facing,
    /// Enables debug logging unless `RUST_LOG` says otherwise.
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Facing {
    North,
    East,
    South,
    West,
}

impl From<Facing> for Direction {
    fn from(facing: Facing) -> Self {
        match facing {
            Facing::North => Direction::North,
            Facing::East => Direction::East,
            Facing::South => Direction::South,
            Facing::West => Direction::West,
        }
    }
}

fn parse_coord(value: &str) -> Result<TileCoord, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{value}`"))?;
    let x = x.trim().parse().map_err(|error| format!("invalid x: {error}"))?;
    let y = y.trim().parse().map_err(|error| format!("invalid y: {error}"))?;
    Ok(TileCoord::new(x, y))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the Island Defence command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(seed) = args.seed {
        settings.world.seed = seed;
    }
    if let Some(spawners) = args.spawners {
        settings.spawners = spawners;
    }

    let mut engine = Engine::new(settings.catalog.clone()).context("invalid tile catalog")?;
    engine
        .generate_world(&settings.world)
        .context("failed to generate world")?;
    let placed = engine
        .place_spawners(settings.spawners)
        .context("failed to place spawners")?;

    if let Some(coord) = args.objective {
        let handle = engine
            .grid()
            .and_then(|grid| grid.handle_at(coord))
            .ok_or_else(|| anyhow!("objective {coord:?} lies outside the grid"))?;
        let kind = engine.catalog().objective;
        let _ = engine
            .place_objective(handle, args.facing.into(), kind)
            .map_err(|rejection| anyhow!("objective rejected at {coord:?}: {rejection:?}"))?;
    }

    print!("{}", render::render(&engine));
    println!();
    println!("seed: {}", engine.seed().unwrap_or_default());
    if let Some(grid) = engine.grid() {
        println!("size: {}x{}", grid.width(), grid.height());
    }
    if let Some(start) = engine.start() {
        println!("start: ({}, {})", start.coord().x(), start.coord().y());
    }
    println!("spawners: {} of {} requested", placed.len(), settings.spawners);
    if engine.objective().is_some() {
        println!(
            "objective accessible: {}",
            engine.check_objective_accessible()
        );
    }
    Ok(())
}
