#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line host that drives the Safepath systems over a generated map.

mod config;
mod logging;

use std::{f32::consts::TAU, fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use safepath_core::{Category, CellBounds, CellCoord, EntityId, EntityRecord, Vec3};
use safepath_system_danger_field::{BuildProgress, DangerFieldService};
use safepath_system_pathfinding::{PathDistanceEstimator, PathOutcome};
use safepath_world::{EntityRoster, EntityScatter, ObstacleGrid, ObstacleScatter};

use config::SafepathConfig;

/// Builds a map, scatters entities, publishes danger fields and reports
/// safety scores and path distances.
#[derive(Debug, Parser)]
#[command(name = "safepath", version)]
struct Args {
    /// Width and depth of the generated map, in cells.
    #[arg(long, default_value_t = 64)]
    size: u32,
    /// Probability that a generated cell holds a pillar.
    #[arg(long, default_value_t = 0.35)]
    density: f32,
    /// Seed shared by the obstacle and entity generators.
    #[arg(long, default_value_t = 12_345)]
    seed: u64,
    /// Number of entity categories to scatter.
    #[arg(long, default_value_t = 3)]
    categories: u16,
    /// Entities placed around each category's anchor.
    #[arg(long, default_value_t = 4)]
    per_category: usize,
    /// ASCII obstacle layout (`.` open, `#` solid) used instead of a generated map.
    #[arg(long)]
    map: Option<PathBuf>,
    /// JSON file overriding system tuning.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Simulated milliseconds per host tick.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
    /// Ticks allowed for the first danger-field publish.
    #[arg(long, default_value_t = 10_000)]
    max_ticks: u32,
    /// Log debug output from the systems.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);
    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => SafepathConfig::load(path)?,
        None => SafepathConfig::default(),
    };

    let grid = load_grid(args)?;
    let Some(bounds) = grid.bounds() else {
        bail!("the obstacle map contains no cells");
    };
    let roster = scatter_entities(args, &grid, bounds)?;
    log::info!(
        "map {}x{} with {} obstructed cells, {} entities",
        grid.dimensions().0,
        grid.dimensions().1,
        grid.obstructed_count(),
        roster.len()
    );

    let mut service = DangerFieldService::new(config.danger_field)
        .context("invalid danger field tuning")?;
    let ticks = publish_fields(args, &mut service, &grid, &roster)?;

    let mut estimator = PathDistanceEstimator::new(config.pathfinder, config.distance)
        .context("invalid pathfinding tuning")?;
    let entities: Vec<EntityRecord> = roster.iter().collect();

    let set = service.snapshot();
    println!(
        "danger fields: generation {} after {ticks} ticks",
        set.generation()
    );
    for category in set.categories() {
        let cells = set.field(category).map_or(0, |field| field.len());
        println!("  category {}: {cells} cells measured", category.get());
    }

    println!("entities:");
    for entity in &entities {
        let score = service.lookup(entity.category, entity.position);
        let nearest = nearest_threat(&mut estimator, &grid, entity, &entities);
        let cell = entity.cell();
        match nearest {
            Some((threat, distance)) => println!(
                "  #{} category {} at ({}, {}): safety {:?}, nearest threat #{} at {distance:.2}",
                entity.id.get(),
                entity.category.get(),
                cell.x(),
                cell.z(),
                score,
                threat.get(),
            ),
            None => println!(
                "  #{} category {} at ({}, {}): safety {:?}, no threats",
                entity.id.get(),
                entity.category.get(),
                cell.x(),
                cell.z(),
                score,
            ),
        }
    }

    if let [first, .., last] = entities.as_slice() {
        let pathfinder = estimator.pathfinder_mut();
        let request = pathfinder.request(first.position, last.position);
        let path = pathfinder.find_path(&grid, request);
        let status = match path.outcome() {
            PathOutcome::Coincident => "coincident".to_owned(),
            PathOutcome::Reached => "reached".to_owned(),
            PathOutcome::Partial(reason) => format!("partial ({reason:?})"),
        };
        println!(
            "path #{} -> #{}: {status}, {} waypoints, length {:.2}, {} iterations",
            first.id.get(),
            last.id.get(),
            path.waypoints().len(),
            path.length(),
            path.iterations()
        );
    }

    println!(
        "distance cache: {} of {} entries",
        estimator.cache().len(),
        estimator.cache().capacity()
    );
    Ok(())
}

fn load_grid(args: &Args) -> Result<ObstacleGrid> {
    if let Some(path) = &args.map {
        let layout = fs::read_to_string(path)
            .with_context(|| format!("failed to read map file {}", path.display()))?;
        return ObstacleGrid::from_ascii(CellCoord::new(0, 0), &layout)
            .with_context(|| format!("invalid map file {}", path.display()));
    }

    let half = i32::try_from(args.size / 2).context("map size is too large")?;
    Ok(ObstacleScatter {
        origin: CellCoord::new(-half, -half),
        columns: args.size,
        rows: args.size,
        density: args.density,
        seed: args.seed,
        ..ObstacleScatter::default()
    }
    .generate())
}

fn scatter_entities(args: &Args, grid: &ObstacleGrid, bounds: CellBounds) -> Result<EntityRoster> {
    let min = bounds.min();
    let max = bounds.max();
    let centre = Vec3::new(
        (min.x() + max.x()) as f32 / 2.0,
        0.0,
        (min.z() + max.z()) as f32 / 2.0,
    );
    let extent = (max.x() - min.x()).min(max.z() - min.z()).max(1) as f32;
    let radius = extent / 4.0;

    let anchors = (0..args.categories)
        .map(|index| {
            let angle = TAU * f32::from(index) / f32::from(args.categories.max(1));
            let anchor = centre + Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius);
            (Category::new(index), anchor)
        })
        .collect();

    let mut roster = EntityRoster::new();
    let placed = EntityScatter {
        anchors,
        per_category: args.per_category,
        spread: (extent / 16.0).max(1.0),
        seed: args.seed,
    }
    .populate(grid, &mut roster)?;
    let requested = usize::from(args.categories).saturating_mul(args.per_category);
    if placed < requested {
        log::warn!("placed {placed} of {requested} entities; the rest found no walkable cell");
    }
    Ok(roster)
}

fn publish_fields(
    args: &Args,
    service: &mut DangerFieldService,
    grid: &ObstacleGrid,
    roster: &EntityRoster,
) -> Result<u32> {
    let dt = Duration::from_millis(args.tick_ms);
    let mut chunks = 0_u32;
    for tick in 1..=args.max_ticks {
        match service.advance(dt, grid, roster) {
            BuildProgress::Published { generation } => {
                log::info!("generation {generation} published after {chunks} suspended chunks");
                return Ok(tick);
            }
            BuildProgress::Suspended { .. } => chunks += 1,
            BuildProgress::Idle => {}
        }
    }
    bail!(
        "danger fields were not published within {} ticks",
        args.max_ticks
    )
}

fn nearest_threat(
    estimator: &mut PathDistanceEstimator,
    grid: &ObstacleGrid,
    entity: &EntityRecord,
    entities: &[EntityRecord],
) -> Option<(EntityId, f32)> {
    entities
        .iter()
        .filter(|other| other.category != entity.category)
        .map(|other| {
            (
                other.id,
                estimator.compute_path_distance(grid, entity.position, other.position),
            )
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}
