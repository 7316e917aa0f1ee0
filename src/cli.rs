// src/cli.rs
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "gravlab",
    about = "gravlab — symbolic curvature, field-equation checks, geodesics, embeddings",
    version,
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct GravlabCli {
    /// Global: path to config (TOML); default: ~/.gravlab/config.toml
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Global: skip symbolic simplification (raw derived expressions)
    #[arg(long = "no-simplify", action = ArgAction::SetTrue, global = true)]
    pub no_simplify: bool,

    /// Global: print the per-request trace after the result
    #[arg(long = "trace", action = ArgAction::SetTrue, global = true)]
    pub trace: bool,

    /// Global: emit machine-readable JSON instead of the text report
    #[arg(long = "json", action = ArgAction::SetTrue, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full curvature chain: metric -> Christoffel -> Riemann -> Ricci ->
    /// scalar -> Einstein
    ///
    /// Example:
    ///   gravlab geometry scenarios/schwarzschild.toml
    Geometry {
        /// Scenario file (TOML) with the metric and parameters
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,
    },

    /// Build the stress-energy tensor from the scenario's matter section
    StressEnergy {
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,
    },

    /// Check G_ab = kappa T_ab for the scenario's metric and matter
    Verify {
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,
    },

    /// Integrate a geodesic from the scenario's initial conditions
    Geodesic {
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,
    },

    /// Compute the embedding surface for the scenario's metric
    Embedding {
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,
    },
}
