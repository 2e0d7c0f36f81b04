//! Configuration sections with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use cellscape_mesh::{MeshParams, PipelineParams};
use cellscape_noise::{CellularParams, ClassifierParams, ParamError};
use cellscape_terrain::{DiscoveryParams, HeightParams, RegionKindTable};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Cellular field: seed, frequency, jitter, metric, border mode.
    pub cellular: CellularParams,
    /// Grouping and height-group noise.
    pub classifier: ClassifierParams,
    /// Elevation, slopes and lakes.
    pub height: HeightParams,
    /// Flood fill limits.
    pub discovery: DiscoveryParams,
    /// Mesh colouring and water.
    pub mesh: MeshParams,
    /// Kind of each grouping, indexed by grouping modulo length.
    pub region_kinds: RegionKindTable,
    /// Worker pool sizing.
    pub pipeline: PipelineParams,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter used when `RUST_LOG` is unset (e.g. "debug", "info,cellscape_terrain=trace").
    pub log_level: String,
    /// Write a JSON log file next to the config in debug builds.
    pub log_to_file: bool,
    /// Log one line of statistics per built region.
    pub region_stats: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: true,
            region_stats: true,
        }
    }
}

/// Platform config directory for cellscape, or `./.cellscape` when the
/// platform has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("cellscape"))
        .unwrap_or_else(|| PathBuf::from(".cellscape"))
}

fn section(name: &'static str) -> impl FnOnce(ParamError) -> ConfigError {
    move |source| ConfigError::Invalid {
        section: name,
        source,
    }
}

impl Config {
    /// Check every section for out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cellular.validate().map_err(section("cellular"))?;
        self.classifier.validate().map_err(section("classifier"))?;
        self.height.validate().map_err(section("height"))?;
        self.discovery.validate().map_err(section("discovery"))?;
        self.mesh.validate().map_err(section("mesh"))?;
        self.pipeline.validate().map_err(section("pipeline"))?;
        Ok(())
    }

    fn read(config_path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(config_path).map_err(ConfigError::ReadError)?;
        ron::from_str(&contents).map_err(ConfigError::ParseError)
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        log::debug!("Saved config to {}", config_path.display());
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
