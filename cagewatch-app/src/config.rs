use anyhow::{Context, Result};
use cagewatch_core::performance::PerformanceThresholds;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "farm.yaml";

/// Settings read from `farm.yaml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding `units/` and `events/`.
    pub data_dir: PathBuf,
    /// Where snapshot CSV logs are written.
    pub output_dir: PathBuf,
    pub thresholds: PerformanceThresholds,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/farm"),
            output_dir: PathBuf::from("./data/reports"),
            thresholds: PerformanceThresholds::default(),
        }
    }
}

impl AppConfig {
    /// Loads a config file. Relative directories are taken relative to the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML from {:?}", path))?;

        if let Some(base) = path.parent() {
            config.data_dir = resolve(base, &config.data_dir);
            config.output_dir = resolve(base, &config.output_dir);
        }
        log::debug!("Loaded config from {:?}: {:?}", path, config);
        Ok(config)
    }

    /// An explicit path must exist; otherwise `farm.yaml` is used when present.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load(DEFAULT_CONFIG_FILE),
            None => {
                log::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }
}

fn resolve(base: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        base.join(dir)
    }
}
