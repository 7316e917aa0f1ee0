// src/commands/geodesic.rs
use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::api::run_geodesic;
use crate::config::Config;

use super::{load_scenario, make_context, print_trace, RunOpts};

pub fn main(scenario_path: &Path, config: &Config, opts: &RunOpts) -> Result<()> {
    let scenario = load_scenario(scenario_path)?;
    let mut request = scenario.geodesic_request()?;
    // config tolerances apply unless the scenario pins its own
    request.rtol = request.rtol.or(Some(config.solver.rtol));
    request.atol = request.atol.or(Some(config.solver.atol));

    let mut ctx = make_context(config, opts);
    let response = run_geodesic(&request, &mut ctx)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!(
            "{} {} samples, status: {}",
            "geodesic:".bold(),
            response.tau_values.len(),
            if response.status == "complete" {
                response.status.green()
            } else {
                response.status.yellow()
            }
        );
        let names: Vec<&String> = response.position_coords.keys().collect();
        print!("{:>12}", "tau");
        for name in &names {
            print!("{:>14}", name);
        }
        println!();
        for (i, tau) in response.tau_values.iter().enumerate() {
            print!("{:>12.5}", tau);
            for name in &names {
                print!("{:>14.6}", response.position_coords[*name][i]);
            }
            println!();
        }
    }
    if opts.trace {
        print_trace(&ctx);
    }
    Ok(())
}
