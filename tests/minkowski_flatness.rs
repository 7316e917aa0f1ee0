// Flat spacetime in Cartesian coordinates: every derived tensor is an
// exact symbolic zero, not a small residue.

use std::collections::HashMap;

use gravlab::api::{compute_geometry, GeometryRequest, MetricInput};
use gravlab::{PipelineContext, SimplifyOptions};

fn minkowski_request() -> GeometryRequest {
    GeometryRequest {
        metric: MetricInput {
            coordinate_names: Some(vec!["t".into(), "x".into(), "y".into(), "z".into()]),
            components: vec![
                vec!["-1".into(), "0".into(), "0".into(), "0".into()],
                vec!["0".into(), "1".into(), "0".into(), "0".into()],
                vec!["0".into(), "0".into(), "1".into(), "0".into()],
                vec!["0".into(), "0".into(), "0".into(), "1".into()],
            ],
        },
        parameter_values: HashMap::new(),
    }
}

#[test]
fn all_curvature_tensors_vanish() {
    let mut ctx = PipelineContext::new(SimplifyOptions::enabled());
    let response = compute_geometry(&minkowski_request(), &mut ctx).unwrap();
    assert!(response.christoffel.is_empty());
    assert!(response.riemann.is_empty());
    assert!(response.ricci_tensor.is_empty());
    assert_eq!(response.ricci_scalar.expression, "0");
    assert!(response.einstein_tensor.is_empty());
}

#[test]
fn inverse_is_the_metric_itself() {
    let mut ctx = PipelineContext::new(SimplifyOptions::enabled());
    let response = compute_geometry(&minkowski_request(), &mut ctx).unwrap();
    assert_eq!(response.inverse_metric["00"].expression, "-1");
    assert_eq!(response.inverse_metric["11"].expression, "1");
    assert_eq!(response.inverse_metric.len(), 4);
}

#[test]
fn flatness_survives_disabled_simplification() {
    // smart constructors alone fold the constant-only arithmetic
    let mut ctx = PipelineContext::new(SimplifyOptions::disabled());
    let response = compute_geometry(&minkowski_request(), &mut ctx).unwrap();
    assert!(response.christoffel.is_empty());
    assert!(response.riemann.is_empty());
}
