//! Supervisor settings.
//!
//! Layered with the `config` crate, later sources winning:
//!
//! 1. built-in defaults
//! 2. optional TOML file (`AQUAMON_CONFIG`, default `aquamon.toml`)
//! 3. `AQUAMON_*` environment variables, `__` separating nested keys
//!    (e.g. `AQUAMON_CONTROL__FEED_AMOUNT=700`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config, Environment, File};
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::calibration::ControlDefaults;
use crate::scope::{Line, ScopeDirectory, Tank};

pub const DEFAULT_CONFIG_FILE: &str = "aquamon.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub bind_addr:         String,
    /// TOML parameter catalog; the built-in catalog is used when unset.
    pub catalog_path:      Option<PathBuf>,
    /// JSON array of readings to serve from memory.
    pub readings_path:     Option<PathBuf>,
    pub catalog_poll_secs: u64,
    pub control:           ControlDefaults,
    pub lines:             Vec<Line>,
    pub tanks:             Vec<Tank>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            catalog_path: None,
            readings_path: None,
            catalog_poll_secs: 2,
            control: ControlDefaults::default(),
            lines: Vec::new(),
            tanks: Vec::new(),
        }
    }
}

impl SupervisorConfig {
    /// Load from `AQUAMON_CONFIG` (or `aquamon.toml`) plus the environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var("AQUAMON_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("AQUAMON")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;

        let cfg: SupervisorConfig = settings
            .try_deserialize()
            .context("invalid supervisor configuration")?;
        cfg.control
            .validate()
            .context("invalid control defaults")?;
        Ok(cfg)
    }

    pub fn catalog_poll_interval(&self) -> Duration {
        Duration::from_secs(self.catalog_poll_secs.max(1))
    }

    pub fn scope_directory(&self) -> ScopeDirectory {
        ScopeDirectory::new(self.lines.clone(), self.tanks.clone())
    }
}
