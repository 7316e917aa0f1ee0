// src/config.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::simplify::SimplifyOptions;

/// ~/.gravlab/config.toml unless overridden on the command line.
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|h| h.join(".gravlab").join("config.toml"))
}

pub fn resolve_config_path(cli_path: &Option<PathBuf>) -> Option<PathBuf> {
    if let Some(p) = cli_path {
        return Some(p.clone());
    }
    default_config_path()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub simplify: SimplifyConfig,
    #[serde(default)]
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplifyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Per-request budget; unset means no deadline.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    #[serde(default = "default_atol")]
    pub atol: f64,
}

fn default_true() -> bool {
    true
}

fn default_rtol() -> f64 {
    1e-6
}

fn default_atol() -> f64 {
    1e-9
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        SimplifyConfig { enabled: true, timeout_ms: None }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig { rtol: default_rtol(), atol: default_atol() }
    }
}

impl Config {
    /// Missing file is not an error; defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let Some(path) = path else { return Ok(Config::default()) };
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    /// Fresh options per request so the deadline starts counting now.
    pub fn simplify_options(&self) -> SimplifyOptions {
        if !self.simplify.enabled {
            return SimplifyOptions::disabled();
        }
        match self.simplify.timeout_ms {
            Some(ms) => SimplifyOptions::with_timeout(Duration::from_millis(ms)),
            None => SimplifyOptions::enabled(),
        }
    }
}
