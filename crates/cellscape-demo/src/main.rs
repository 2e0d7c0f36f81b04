//! Demo binary that builds the regions around a world position and logs
//! per-region statistics.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p cellscape-demo -- --x 120 --y -40 --radius 3`.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cellscape_config::{CliArgs, Config, ConfigError, default_config_dir};
use cellscape_mesh::{MeshBuilder, RegionMesh, RegionOutcome, RegionPipeline, RegionTask};
use cellscape_terrain::TerrainGenerator;
use clap::Parser;
use glam::{IVec2, Vec2};
use tracing::{info, warn};

fn load_config(args: &CliArgs) -> Result<(Config, PathBuf), ConfigError> {
    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let mut config = Config::load_or_create(&config_dir)?;
    config.apply_cli_overrides(args)?;
    config.validate()?;
    Ok((config, config_dir))
}

fn build_generator(config: &Config) -> TerrainGenerator {
    TerrainGenerator::new(
        config.cellular.clone(),
        config.classifier.clone(),
        config.height.clone(),
        config.discovery.clone(),
        config.region_kinds.clone(),
    )
}

fn log_region(mesh: &RegionMesh) {
    let (min_height, max_height) = mesh.heights.min_max().unwrap_or_default();
    info!(
        region = %mesh.region_id,
        seed = %mesh.metadata.seed,
        kind = %mesh.kind,
        points = mesh.point_count,
        sector_cells = mesh.metadata.sector_cells.len(),
        adjacent_cells = mesh.metadata.adjacent_cells.len(),
        quads = mesh.terrain.quad_count,
        triangles = mesh.terrain.lone_triangle_count,
        water_quads = mesh.water.as_ref().map_or(0, |w| w.quad_count),
        min_height,
        max_height,
        "region built"
    );
    if mesh.truncated {
        warn!(region = %mesh.region_id, "region was truncated at the point cap");
    }
}

/// Square of seed cells around `center`, nearest first.
fn seed_cells(center: IVec2, radius: i32) -> VecDeque<RegionTask> {
    let mut seeds: Vec<IVec2> = (-radius..=radius)
        .flat_map(|dy| (-radius..=radius).map(move |dx| center + IVec2::new(dx, dy)))
        .collect();
    seeds.sort_by_key(|s| (*s - center).length_squared());
    seeds.into_iter().map(|seed| RegionTask { seed }).collect()
}

/// Regions gathered from the pipeline.
#[derive(Default)]
struct Collected {
    built: Vec<Box<RegionMesh>>,
    duplicates: usize,
}

/// Feed `pending` to the pipeline and gather one result per task.
///
/// Fails with [`io::ErrorKind::TimedOut`] when results are still missing at
/// the deadline, e.g. after a worker panicked.
fn build_regions(
    pipeline: &RegionPipeline,
    mut pending: VecDeque<RegionTask>,
    timeout: Duration,
    region_stats: bool,
) -> io::Result<Collected> {
    let total = pending.len();
    let deadline = Instant::now() + timeout;
    let mut received = 0;
    let mut collected = Collected::default();

    while received < total {
        while let Some(task) = pending.pop_front() {
            if let Err(task) = pipeline.submit(task) {
                pending.push_front(task);
                break;
            }
        }
        for result in pipeline.drain_results() {
            received += 1;
            match result.outcome {
                RegionOutcome::Built(mesh) => {
                    if region_stats {
                        log_region(&mesh);
                    }
                    collected.built.push(mesh);
                }
                RegionOutcome::Duplicate { .. } => collected.duplicates += 1,
            }
        }
        if received < total {
            if Instant::now() >= deadline {
                warn!(received, total, unsubmitted = pending.len(), "gave up waiting for regions");
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{} of {total} regions missing after {timeout:?}", total - received),
                ));
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }
    Ok(collected)
}

fn run(config: &Config, args: &CliArgs) -> io::Result<()> {
    let generator = Arc::new(build_generator(config));
    let builder = Arc::new(MeshBuilder::new(config.mesh.clone()));
    let mut pipeline =
        RegionPipeline::with_params(&config.pipeline, Arc::clone(&generator), builder)?;

    let position = Vec2::new(args.x, args.y);
    let center = generator.sampler().cell_at(position);
    let pending = seed_cells(center, args.radius as i32);
    info!(%position, cell = %center, tasks = pending.len(), "building regions");

    let start = Instant::now();
    let timeout = Duration::from_secs(args.timeout_secs);
    let collected = build_regions(&pipeline, pending, timeout, config.debug.region_stats);
    pipeline.shutdown();
    let Collected { built, duplicates } = collected?;

    let quads: usize = built.iter().map(|m| m.terrain.quad_count).sum();
    info!(
        regions = built.len(),
        duplicates,
        quads,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "all regions built"
    );

    let sampled = generator.height_at(position);
    let from_region = built
        .iter()
        .find_map(|m| m.heights.height_at(position.round()));
    info!(
        %position,
        height = sampled,
        region_height = ?from_region,
        "height at requested position"
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let (config, config_dir) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("cellscape: {e}");
            return ExitCode::FAILURE;
        }
    };

    let log_dir = config_dir.join("logs");
    cellscape_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match run(&config, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("region pipeline failed: {e}");
            ExitCode::FAILURE
        }
    }
}
