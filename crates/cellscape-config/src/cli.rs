//! Command-line argument parsing.

use std::path::PathBuf;
use std::str::FromStr;

use cellscape_noise::{BorderMode, DistanceFunction, ParamError, ReturnType};
use clap::Parser;

use crate::Config;
use crate::error::ConfigError;

/// Cellscape command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "cellscape", about = "Procedural cellular terrain")]
pub struct CliArgs {
    /// Cellular field seed.
    #[arg(long)]
    pub seed: Option<i32>,

    /// Cells per world unit.
    #[arg(long)]
    pub frequency: Option<f32>,

    /// Centroid jitter in cell units, 0 to 0.5.
    #[arg(long)]
    pub jitter: Option<f32>,

    /// Distance function (natural, manhattan, euclidean).
    #[arg(long)]
    pub distance_function: Option<String>,

    /// Border mode (grouping, height_group).
    #[arg(long)]
    pub border_mode: Option<String>,

    /// Distance-to-edge return type (distance2, distance2_add, distance2_sub,
    /// distance2_mul, distance2_div).
    #[arg(long)]
    pub return_type: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// World X of the position to build terrain around.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub x: f32,

    /// World Y of the position to build terrain around.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub y: f32,

    /// Radius, in cells, of the square of seed cells to build.
    #[arg(long, default_value_t = 2)]
    pub radius: u32,

    /// Seconds to wait for every region before giving up.
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn parse_override<T>(flag: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = ParamError>,
{
    value
        .parse()
        .map_err(|source| ConfigError::InvalidOverride { flag, source })
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) -> Result<(), ConfigError> {
        if let Some(seed) = args.seed {
            self.cellular.seed = seed;
        }
        if let Some(frequency) = args.frequency {
            self.cellular.frequency = frequency;
        }
        if let Some(jitter) = args.jitter {
            self.cellular.jitter = jitter;
        }
        if let Some(ref name) = args.distance_function {
            self.cellular.distance_function =
                parse_override::<DistanceFunction>("distance-function", name)?;
        }
        if let Some(ref name) = args.border_mode {
            self.cellular.border_mode = parse_override::<BorderMode>("border-mode", name)?;
        }
        if let Some(ref name) = args.return_type {
            self.cellular.return_type = parse_override::<ReturnType>("return-type", name)?;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        Ok(())
    }
}
