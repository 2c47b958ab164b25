//! Loader configuration
//!
//! Configuration is read from JSON and can be overridden through
//! environment variables:
//!
//! * `IMAGESET_NUM_WORKERS` – number of parallel workers
//! * `IMAGESET_WORKER_INDEX` – index of this process among the workers
//! * `IMAGESET_PREFETCH` – capacity of the sample queue

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::shard::WorkerTopology;

/// Environment variable overriding [`LoaderConfig::num_workers`]
pub const ENV_NUM_WORKERS: &str = "IMAGESET_NUM_WORKERS";

/// Environment variable overriding [`LoaderConfig::worker_index`]
pub const ENV_WORKER_INDEX: &str = "IMAGESET_WORKER_INDEX";

/// Environment variable overriding [`LoaderConfig::prefetch`]
pub const ENV_PREFETCH: &str = "IMAGESET_PREFETCH";

/// Configuration for loading a dataset with parallel workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Number of parallel workers
    pub num_workers: usize,

    /// Capacity of the queue between workers and the consumer
    pub prefetch: usize,

    /// Index of this worker, when the caller is itself one worker of
    /// `num_workers` rather than the driver of all of them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_index: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        let num_workers = num_cpus::get();
        Self {
            num_workers,
            prefetch: 2 * num_workers,
            worker_index: None,
        }
    }
}

impl LoaderConfig {
    /// Create a configuration for `num_workers` workers
    pub fn with_workers(num_workers: usize) -> Self {
        Self {
            num_workers,
            prefetch: 2 * num_workers.max(1),
            worker_index: None,
        }
    }

    /// Parse a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid loader configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "Loaded loader configuration");
        Self::from_json_str(&json)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`
    ///
    /// Either every override is applied and the result is valid, or the
    /// configuration is left untouched.
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut updated = self.clone();
        if let Some(value) = lookup(ENV_NUM_WORKERS) {
            updated.num_workers = parse_env(ENV_NUM_WORKERS, &value)?;
        }
        if let Some(value) = lookup(ENV_WORKER_INDEX) {
            updated.worker_index = Some(parse_env(ENV_WORKER_INDEX, &value)?);
        }
        if let Some(value) = lookup(ENV_PREFETCH) {
            updated.prefetch = parse_env(ENV_PREFETCH, &value)?;
        }
        updated.validate()?;

        *self = updated;
        Ok(())
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(Error::Config("num_workers must be greater than 0".into()));
        }
        if self.prefetch == 0 {
            return Err(Error::Config("prefetch must be greater than 0".into()));
        }
        if let Some(index) = self.worker_index {
            WorkerTopology::new(self.num_workers, index)?;
        }
        Ok(())
    }

    /// The topology of this worker, if the configuration names one
    pub fn topology(&self) -> Result<Option<WorkerTopology>> {
        self.worker_index
            .map(|index| WorkerTopology::new(self.num_workers, index))
            .transpose()
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value '{value}' for {key}: {e}")))
}
