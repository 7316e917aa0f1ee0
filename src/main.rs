use clap::Parser;
use colored::Colorize;

use gravlab::cli::{Command, GravlabCli};
use gravlab::commands;
use gravlab::config::{resolve_config_path, Config};

fn main() -> anyhow::Result<()> {
    let args = GravlabCli::parse();

    let cfg_path = resolve_config_path(&args.config);
    let config = match Config::load(cfg_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "warn:".yellow().bold(), e);
            Config::default()
        }
    };

    let opts = commands::RunOpts {
        json: args.json,
        trace: args.trace,
        no_simplify: args.no_simplify,
    };

    match args.cmd {
        Command::Geometry { scenario } => commands::geometry::main(&scenario, &config, &opts),
        Command::StressEnergy { scenario } => {
            commands::stress_energy::main(&scenario, &config, &opts)
        }
        Command::Verify { scenario } => commands::verify::main(&scenario, &config, &opts),
        Command::Geodesic { scenario } => commands::geodesic::main(&scenario, &config, &opts),
        Command::Embedding { scenario } => commands::embedding::main(&scenario, &config, &opts),
    }
}
