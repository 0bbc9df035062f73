use anyhow::{anyhow, ensure, Result};
use clap::Parser;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

use crate::config::Tolerances;
use crate::output::ExportFormat;


/// Runtime configuration for the application.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub tolerances: Tolerances,
    /// Layout JSON to trace.
    pub layout: Option<String>,
    /// Snapshot JSON to replay: a single snapshot or an array.
    pub replay: Option<String>,
    /// Where to write a snapshot of the traced layout.
    pub record: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub progress: bool,
    /// Also export component operators and sensor readings in this format.
    #[serde(default)]
    pub export: Option<ExportFormat>,
}

fn default_output_dir() -> String {
    "polarbench_out".to_string()
}

pub fn load_default_config() -> Result<Settings> {
    let root = retrieve_project_root()?;
    let default_config_file = root.join("config/default.toml");

    let settings: Config = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()
        .map_err(|err| anyhow!("error loading configuration: {}", err))?;

    let config: Settings = settings
        .try_deserialize()
        .map_err(|err| anyhow!("error deserializing configuration: {}", err))?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads `config/local.toml` (or `config/default.toml`), then `POLARBENCH_*`
/// environment variables, then command-line flags.
///
/// Nested keys use a double underscore, e.g. `POLARBENCH_TOLERANCES__MAX_DEPTH=8`.
pub fn load_config() -> Result<Settings> {
    load_config_with(&CliArgs::parse())
}

pub fn load_config_with(args: &CliArgs) -> Result<Settings> {
    let root = retrieve_project_root()?;

    let default_config_file = root.join("config/default.toml");
    let local_config = root.join("config/local.toml");

    // Check if local config exists, if not use default
    let config_file = if local_config.exists() {
        info!("using local configuration: {:?}", local_config);
        local_config
    } else {
        info!("using default configuration: {:?}", default_config_file);
        default_config_file
    };

    let settings: Config = Config::builder()
        .add_source(File::from(config_file).required(true))
        .add_source(
            Environment::with_prefix("polarbench")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .map_err(|err| anyhow!("error loading configuration: {}", err))?;

    let mut config: Settings = settings
        .try_deserialize()
        .map_err(|err| anyhow!("error deserializing configuration: {}", err))?;

    args.apply(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the POLARBENCH_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any
///    of its parents, use it.
fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("POLARBENCH_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }

    let exe_path = env::current_exe()?;
    exe_path
        .ancestors()
        .skip(1)
        .find(|dir| dir.join("config").is_dir())
        .map(|dir| dir.to_path_buf())
        .ok_or_else(|| anyhow!("could not find project root directory"))
}

pub fn validate_config(config: &Settings) -> Result<()> {
    let t = &config.tolerances;
    ensure!(t.max_depth > 0, "max depth must be at least 1");
    ensure!(
        t.min_intensity.is_finite() && t.min_intensity >= 0.0,
        "min intensity must be a non-negative number"
    );
    ensure!(
        t.conservation.is_finite() && t.conservation >= 0.0,
        "conservation tolerance must be a non-negative number"
    );
    ensure!(
        t.cross_engine.is_finite() && t.cross_engine >= 0.0,
        "cross-engine tolerance must be a non-negative number"
    );
    ensure!(
        t.linear_threshold < t.circular_threshold,
        "linear ellipticity threshold must be below the circular threshold"
    );
    ensure!(
        t.pure_state_dop > 0.0 && t.pure_state_dop <= 1.0,
        "pure state degree of polarization must be in (0, 1]"
    );
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about = "polarbench - polarized light through optical benches")]
pub struct CliArgs {
    /// Layout JSON file to trace.
    #[arg(short, long, conflicts_with = "replay")]
    layout: Option<String>,

    /// Snapshot JSON file to replay. May hold a single snapshot or an array,
    /// which is replayed in parallel.
    #[arg(long)]
    replay: Option<String>,

    /// Record a snapshot of the traced layout to this file.
    #[arg(long, requires = "layout")]
    record: Option<String>,

    /// Description stored with a recorded snapshot.
    #[arg(short, long)]
    description: Option<String>,

    /// Directory for trace output files.
    #[arg(short, long)]
    out: Option<String>,

    /// Minimum intensity for a ray to keep propagating.
    #[arg(long)]
    min_intensity: Option<f64>,

    /// The maximum number of components a ray may traverse before it is truncated.
    #[arg(long)]
    max_depth: Option<usize>,

    /// Relative tolerance of the energy conservation check.
    #[arg(long)]
    conservation: Option<f64>,

    /// Propagate every state with Mueller calculus, even pure ones.
    #[arg(long)]
    mueller: bool,

    /// Show a progress bar during batch replay.
    #[arg(long)]
    progress: bool,

    /// Export component operators and sensor readings to the output directory.
    #[arg(long, value_enum)]
    export: Option<ExportFormat>,
}

impl CliArgs {
    /// Overrides settings with the flags that were given.
    pub fn apply(&self, config: &mut Settings) {
        if let Some(layout) = &self.layout {
            config.layout = Some(layout.clone());
        }
        if let Some(replay) = &self.replay {
            config.replay = Some(replay.clone());
        }
        if let Some(record) = &self.record {
            config.record = Some(record.clone());
        }
        if let Some(description) = &self.description {
            config.description = Some(description.clone());
        }
        if let Some(out) = &self.out {
            config.output_dir = out.clone();
        }
        if let Some(min_intensity) = self.min_intensity {
            config.tolerances.min_intensity = min_intensity;
        }
        if let Some(max_depth) = self.max_depth {
            config.tolerances.max_depth = max_depth;
        }
        if let Some(conservation) = self.conservation {
            config.tolerances.conservation = conservation;
        }
        if self.mueller {
            config.tolerances.force_mueller = true;
        }
        if self.progress {
            config.progress = true;
        }
        if let Some(format) = self.export {
            config.export = Some(format);
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.tolerances;
        write!(
            f,
            "Settings:
  - Layout: {}
  - Replay: {}
  - Output Directory: {}
  - Min Intensity: {:e}
  - Max Depth: {}
  - Conservation Tolerance: {:e}
  - Cross-Engine Tolerance: {}
  - Force Mueller: {}
  - Export: {}
  ",
            self.layout.as_deref().unwrap_or("-"),
            self.replay.as_deref().unwrap_or("-"),
            self.output_dir,
            t.min_intensity,
            t.max_depth,
            t.conservation,
            t.cross_engine,
            t.force_mueller,
            self.export.map_or("-", |f| f.extension()),
        )
    }
}
