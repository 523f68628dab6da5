//! Service configuration.
//!
//! Sources, lowest to highest priority: built-in defaults, environment
//! variables, an optional YAML file, command-line flags. The YAML file only
//! needs the fields it overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use cube_processor::ProcessorConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the thermal processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Dataset roots live at `<data_dir>/<dataset_id>`.
    pub data_dir: PathBuf,

    /// Results are written to `<output_dir>/<dataset_id>`.
    pub output_dir: PathBuf,

    /// HTTP listen port.
    pub port: u16,

    /// How often finished datasets are swept from the registry (seconds).
    pub eviction_interval_secs: u64,

    /// How long a finished dataset is kept before it may be swept (seconds).
    pub retention_secs: u64,

    /// Reconstruction settings.
    pub processor: ProcessorConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            output_dir: PathBuf::from("./results"),
            port: 8090,
            eviction_interval_secs: 3600,
            retention_secs: 86_400,
            processor: ProcessorConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            processor: ProcessorConfig::from_env()?,
            ..Self::default()
        };

        if let Ok(dir) = std::env::var("DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(port) = env_parse("PORT")? {
            config.port = port;
        }
        if let Some(secs) = env_parse("EVICTION_INTERVAL_SECS")? {
            config.eviction_interval_secs = secs;
        }
        if let Some(secs) = env_parse("RETENTION_SECS")? {
            config.retention_secs = secs;
        }

        Ok(config)
    }

    /// Environment configuration with the YAML file at `path` layered on top.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::from_env()?
            .merge_yaml(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Load from the environment and, if given, a YAML file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_yaml(path),
            None => Self::from_env(),
        }
    }

    /// Overlay the fields present in `yaml` onto this configuration.
    pub fn merge_yaml(self, yaml: &str) -> Result<Self> {
        let overlay: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let mut base = serde_yaml::to_value(&self)?;
        merge_values(&mut base, overlay);
        Ok(serde_yaml::from_value(base)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.processor
            .validate()
            .context("Invalid processor configuration")?;
        if self.eviction_interval_secs == 0 {
            anyhow::bail!("eviction_interval_secs must be > 0");
        }
        Ok(())
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

/// Command-line overrides; `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub port: Option<u16>,
    pub chunk_size: Option<usize>,
    pub workers: Option<usize>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ServiceConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.processor.chunk_size = chunk_size;
        }
        if let Some(workers) = self.workers {
            config.processor.worker_threads = workers;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: '{}'", key, value)),
        Err(_) => Ok(None),
    }
}

/// Recursively overlay mappings; any other value replaces the base.
fn merge_values(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (_, serde_yaml::Value::Null) => {}
        (base, overlay) => *base = overlay,
    }
}
