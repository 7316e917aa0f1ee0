// src/commands/mod.rs
//! CLI subcommand implementations. Each command loads a scenario file,
//! runs one pipeline dispatch from `api`, and prints either a text report
//! or JSON.

pub mod embedding;
pub mod geodesic;
pub mod geometry;
pub mod stress_energy;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::api::{Scenario, TensorMap};
use crate::config::Config;
use crate::core::geometry::PipelineContext;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Copy)]
pub struct RunOpts {
    pub json: bool,
    pub trace: bool,
    pub no_simplify: bool,
}

pub(crate) fn load_scenario(path: &Path) -> Result<Scenario> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read scenario {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parse scenario {}", path.display()))
}

pub(crate) fn make_context(config: &Config, opts: &RunOpts) -> PipelineContext {
    let options = if opts.no_simplify {
        crate::core::simplify::SimplifyOptions::disabled()
    } else {
        config.simplify_options()
    };
    PipelineContext::new(options)
}

pub(crate) fn print_trace(ctx: &PipelineContext) {
    for event in ctx.trace.events() {
        eprintln!(
            "{} [{}] {}: {}",
            event.at.format("%H:%M:%S%.3f"),
            event.level,
            event.stage.cyan(),
            event.message
        );
    }
}

pub(crate) fn print_tensor_section(title: &str, map: &TensorMap) {
    println!("{}", title.bold());
    if map.is_empty() {
        println!("  (all components zero)");
        return;
    }
    for (key, value) in map {
        println!("  [{}] = {}", key.green(), value.expression);
    }
}
