// Geodesic integrator against known Schwarzschild motion: a circular
// orbit must hold its radius, and a radial plunge must come back as a
// truncated trajectory rather than an error.

use std::collections::HashMap;

use gravlab::api::{run_geodesic, GeodesicRequest, MetricInput};
use gravlab::{PipelineContext, SimplifyOptions};

fn schwarzschild_metric() -> MetricInput {
    MetricInput {
        coordinate_names: Some(vec!["t".into(), "r".into(), "theta".into(), "phi".into()]),
        components: vec![
            vec!["-(1 - 2*M/r)".into(), "0".into(), "0".into(), "0".into()],
            vec!["0".into(), "1/(1 - 2*M/r)".into(), "0".into(), "0".into()],
            vec!["0".into(), "0".into(), "r^2".into(), "0".into()],
            vec!["0".into(), "0".into(), "0".into(), "r^2*sin(theta)^2".into()],
        ],
    }
}

fn params_m(m: f64) -> HashMap<String, f64> {
    let mut map = HashMap::new();
    map.insert("M".to_string(), m);
    map
}

#[test]
fn circular_orbit_holds_its_radius() {
    // r = 6M, M = 1: u^t = 1/sqrt(1 - 3M/r), u^phi = sqrt(M/r^3) u^t
    let r0: f64 = 6.0;
    let u_t = 1.0 / (1.0f64 - 3.0 / r0).sqrt();
    let u_phi = (1.0 / (r0 * r0 * r0)).sqrt() * u_t;

    let mut ctx = PipelineContext::new(SimplifyOptions::enabled());
    let request = GeodesicRequest {
        metric: schwarzschild_metric(),
        initial_position: vec![0.0, r0, std::f64::consts::FRAC_PI_2, 0.0],
        initial_velocity: vec![u_t, 0.0, 0.0, u_phi],
        t_span: [0.0, 100.0],
        num_points: 101,
        parameter_values: params_m(1.0),
        rtol: None,
        atol: None,
    };
    let response = run_geodesic(&request, &mut ctx).unwrap();
    assert_eq!(response.status, "complete");

    let r_values = &response.position_coords["r"];
    for &r in r_values {
        assert!((r - r0).abs() / r0 < 1e-3, "orbit drifted to r = {}", r);
    }
    // it actually went around, not just sat still
    let phi_final = *response.position_coords["phi"].last().unwrap();
    assert!(phi_final > 2.0 * std::f64::consts::PI);
    // theta stays in the equatorial plane
    for &theta in &response.position_coords["theta"] {
        assert!((theta - std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }
}

#[test]
fn radial_plunge_truncates_with_singularity_status() {
    // free fall from rest at r = 3M; the trajectory ends early instead of
    // erroring out
    let e = (1.0f64 - 2.0 / 3.0).sqrt();
    let mut ctx = PipelineContext::new(SimplifyOptions::enabled());
    let request = GeodesicRequest {
        metric: schwarzschild_metric(),
        initial_position: vec![0.0, 3.0, std::f64::consts::FRAC_PI_2, 0.0],
        initial_velocity: vec![e / (1.0 - 2.0 / 3.0), 0.0, 0.0, 0.0],
        t_span: [0.0, 40.0],
        num_points: 81,
        parameter_values: params_m(1.0),
        rtol: None,
        atol: None,
    };
    let response = run_geodesic(&request, &mut ctx).unwrap();
    assert_eq!(response.status, "singularity");
    assert!(response.tau_values.len() < 81);
    assert_eq!(
        response.tau_values.len(),
        response.position_coords["r"].len()
    );
    // fell inward while the numbers lasted
    let r = &response.position_coords["r"];
    assert!(r.last().unwrap() < r.first().unwrap());
}

#[test]
fn mismatched_state_length_fails_eagerly() {
    let mut ctx = PipelineContext::new(SimplifyOptions::enabled());
    let request = GeodesicRequest {
        metric: schwarzschild_metric(),
        initial_position: vec![0.0, 6.0],
        initial_velocity: vec![1.0, 0.0],
        t_span: [0.0, 1.0],
        num_points: 5,
        parameter_values: params_m(1.0),
        rtol: None,
        atol: None,
    };
    let err = run_geodesic(&request, &mut ctx).unwrap_err();
    assert!(matches!(err, gravlab::CoreError::DimensionMismatch(_)));
}
