// src/commands/geometry.rs
use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::api::compute_geometry;
use crate::config::Config;

use super::{load_scenario, make_context, print_tensor_section, print_trace, RunOpts};

pub fn main(scenario_path: &Path, config: &Config, opts: &RunOpts) -> Result<()> {
    let scenario = load_scenario(scenario_path)?;
    let request = scenario.geometry_request();
    let mut ctx = make_context(config, opts);
    let response = compute_geometry(&request, &mut ctx)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!(
            "{} {}",
            "coordinates:".bold(),
            response.coordinates.join(", ")
        );
        print_tensor_section("metric g_ab", &response.metric);
        print_tensor_section("inverse metric g^ab", &response.inverse_metric);
        print_tensor_section("christoffel Gamma^a_bc", &response.christoffel);
        print_tensor_section("riemann R^a_bcd", &response.riemann);
        print_tensor_section("ricci R_ab", &response.ricci_tensor);
        println!("{} {}", "ricci scalar R =".bold(), response.ricci_scalar.expression);
        print_tensor_section("einstein G_ab", &response.einstein_tensor);
    }
    if opts.trace {
        print_trace(&ctx);
    }
    Ok(())
}
