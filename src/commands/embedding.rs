// src/commands/embedding.rs
use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::api::build_embedding;
use crate::config::Config;

use super::{load_scenario, make_context, print_trace, RunOpts};

pub fn main(scenario_path: &Path, config: &Config, opts: &RunOpts) -> Result<()> {
    let scenario = load_scenario(scenario_path)?;
    let request = scenario.embedding_request()?;
    let mut ctx = make_context(config, opts);
    let response = build_embedding(&request, &mut ctx)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{} {}", "embedding:".bold(), response.message);
        if let Some(latex) = &response.z_function_latex {
            println!("  z(r) = {}", latex);
        }
        println!("{:>12}{:>14}", "r", "z");
        for (r, z) in response.r_values.iter().zip(&response.z_values) {
            println!("{:>12.5}{:>14.6}", r, z);
        }
    }
    if opts.trace {
        print_trace(&ctx);
    }
    Ok(())
}
