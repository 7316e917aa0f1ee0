// src/commands/verify.rs
use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::api::verify_efe;
use crate::config::Config;

use super::{load_scenario, make_context, print_tensor_section, print_trace, RunOpts};

pub fn main(scenario_path: &Path, config: &Config, opts: &RunOpts) -> Result<()> {
    let scenario = load_scenario(scenario_path)?;
    let request = scenario.efe_request();
    let mut ctx = make_context(config, opts);
    let response = verify_efe(&request, &mut ctx)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        let tag = if response.verified {
            "verified".green().bold()
        } else {
            "not verified".red().bold()
        };
        println!("{}: {}", tag, response.message);
        if let Some(residual) = &response.residual {
            print_tensor_section("residual G_ab - kappa T_ab", residual);
        }
    }
    if opts.trace {
        print_trace(&ctx);
    }
    Ok(())
}
