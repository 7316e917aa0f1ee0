// src/commands/stress_energy.rs
use std::path::Path;

use anyhow::Result;

use crate::api::build_stress_energy;
use crate::config::Config;

use super::{load_scenario, make_context, print_tensor_section, print_trace, RunOpts};

pub fn main(scenario_path: &Path, config: &Config, opts: &RunOpts) -> Result<()> {
    let scenario = load_scenario(scenario_path)?;
    let request = scenario.stress_energy_request()?;
    let mut ctx = make_context(config, opts);
    let response = build_stress_energy(&request, &mut ctx)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_tensor_section("stress-energy T_ab", &response.stress_energy);
    }
    if opts.trace {
        print_trace(&ctx);
    }
    Ok(())
}
