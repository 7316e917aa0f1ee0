// Matter presets through the wire-level API, and the three verdicts the
// field-equation verifier can reach.

use gravlab::api::{
    build_stress_energy, verify_efe, EfeRequest, MetricInput, StressEnergyInput,
    StressEnergyRequest,
};
use gravlab::{CoreError, PipelineContext, SimplifyOptions};

fn flat_metric() -> MetricInput {
    MetricInput {
        coordinate_names: Some(vec!["t".into(), "x".into(), "y".into(), "z".into()]),
        components: vec![
            vec!["-1".into(), "0".into(), "0".into(), "0".into()],
            vec!["0".into(), "1".into(), "0".into(), "0".into()],
            vec!["0".into(), "0".into(), "1".into(), "0".into()],
            vec!["0".into(), "0".into(), "0".into(), "1".into()],
        ],
    }
}

fn input(method: &str) -> StressEnergyInput {
    StressEnergyInput {
        definition_method: method.into(),
        preset_name: None,
        density_symbol: None,
        pressure_symbol: None,
        components: None,
    }
}

#[test]
fn dust_is_a_single_time_time_component() {
    let mut ctx = PipelineContext::new(SimplifyOptions::enabled());
    let request = StressEnergyRequest {
        definition: input("dust"),
        metric_input: Some(flat_metric()),
    };
    let response = build_stress_energy(&request, &mut ctx).unwrap();
    assert_eq!(response.stress_energy.len(), 1);
    assert_eq!(response.stress_energy["00"].expression, "rho");
}

#[test]
fn perfect_fluid_needs_a_metric() {
    let mut ctx = PipelineContext::new(SimplifyOptions::enabled());
    let request = StressEnergyRequest {
        definition: input("perfect_fluid"),
        metric_input: None,
    };
    let err = build_stress_energy(&request, &mut ctx).unwrap_err();
    assert!(matches!(err, CoreError::MissingMetric(_)));
}

#[test]
fn perfect_fluid_in_flat_space_is_diagonal() {
    let mut ctx = PipelineContext::new(SimplifyOptions::enabled());
    let request = StressEnergyRequest {
        definition: input("perfect_fluid"),
        metric_input: Some(flat_metric()),
    };
    let response = build_stress_energy(&request, &mut ctx).unwrap();
    // T_00 = rho, T_ii = p
    assert_eq!(response.stress_energy["00"].expression, "rho");
    assert_eq!(response.stress_energy["11"].expression, "p");
    assert_eq!(response.stress_energy["33"].expression, "p");
    assert_eq!(response.stress_energy.len(), 4);
}

#[test]
fn custom_symbol_names_flow_through() {
    let mut ctx = PipelineContext::new(SimplifyOptions::enabled());
    let request = StressEnergyRequest {
        definition: StressEnergyInput {
            definition_method: "perfect_fluid".into(),
            preset_name: None,
            density_symbol: Some("mu".into()),
            pressure_symbol: Some("P".into()),
            components: None,
        },
        metric_input: Some(flat_metric()),
    };
    let response = build_stress_energy(&request, &mut ctx).unwrap();
    assert_eq!(response.stress_energy["00"].expression, "mu");
    assert_eq!(response.stress_energy["22"].expression, "P");
}

#[test]
fn explicit_grid_round_trips() {
    let mut components = vec![vec!["0".to_string(); 4]; 4];
    components[0][0] = "rho*r^2".into();
    let mut ctx = PipelineContext::new(SimplifyOptions::enabled());
    let request = StressEnergyRequest {
        definition: StressEnergyInput {
            definition_method: "explicit".into(),
            preset_name: None,
            density_symbol: None,
            pressure_symbol: None,
            components: Some(components),
        },
        metric_input: Some(flat_metric()),
    };
    let response = build_stress_energy(&request, &mut ctx).unwrap();
    assert_eq!(response.stress_energy.len(), 1);
    assert!(response.stress_energy["00"].expression.contains("rho"));
}

#[test]
fn verifier_distinguishes_violated_from_unproven() {
    // flat metric + dust: G = 0 against T != 0 is provably wrong
    let mut ctx = PipelineContext::new(SimplifyOptions::enabled());
    let violated = verify_efe(
        &EfeRequest {
            metric_input: flat_metric(),
            stress_energy_input: input("dust"),
            kappa: None,
        },
        &mut ctx,
    )
    .unwrap();
    assert!(!violated.verified);
    assert!(violated.message.contains("violated"), "{}", violated.message);

    // flat metric + vacuum: exactly satisfied
    let mut ctx = PipelineContext::new(SimplifyOptions::enabled());
    let verified = verify_efe(
        &EfeRequest {
            metric_input: flat_metric(),
            stress_energy_input: input("vacuum"),
            kappa: None,
        },
        &mut ctx,
    )
    .unwrap();
    assert!(verified.verified);
    assert!(verified.message.contains("verified"), "{}", verified.message);
}

#[test]
fn kappa_override_rescales_the_check() {
    // with kappa = 0 any stress-energy trivially verifies against flat
    // space
    let mut ctx = PipelineContext::new(SimplifyOptions::enabled());
    let response = verify_efe(
        &EfeRequest {
            metric_input: flat_metric(),
            stress_energy_input: input("dust"),
            kappa: Some(0.0),
        },
        &mut ctx,
    )
    .unwrap();
    assert!(response.verified, "{}", response.message);
}
