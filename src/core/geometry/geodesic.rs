// src/core/geometry/geodesic.rs
//! Geodesic integration: d^2 x^a / dtau^2 = -Gamma^a_bc v^b v^c, solved
//! with an adaptive Dormand-Prince 5(4) pair and reported on a uniform
//! proper-time grid.
//!
//! Parameters (mass and friends) are substituted into the connection once
//! up front; per-step work is pure f64 evaluation over the coordinates. A
//! numeric fault mid-flight (a pole, a domain fault, a step that will not
//! shrink any further) ends the trajectory early with a singularity
//! status; a fault on the very first derivative evaluation is an input
//! error instead.

use std::collections::HashMap;

use crate::core::error::CoreError;
use crate::core::expr::Expr;
use crate::core::tensor::Tensor;

use super::metric::Metric;
use super::PipelineContext;

#[derive(Debug, Clone)]
pub struct GeodesicRequest {
    pub initial_position: Vec<f64>,
    pub initial_velocity: Vec<f64>,
    pub tau_start: f64,
    pub tau_end: f64,
    /// Output sample count over [tau_start, tau_end], endpoints included.
    pub samples: usize,
    /// Numeric values for every non-coordinate symbol in the connection.
    pub parameters: HashMap<String, f64>,
    pub rtol: f64,
    pub atol: f64,
}

impl GeodesicRequest {
    pub const DEFAULT_RTOL: f64 = 1e-6;
    pub const DEFAULT_ATOL: f64 = 1e-9;

    pub fn new(position: Vec<f64>, velocity: Vec<f64>, tau_end: f64, samples: usize) -> Self {
        GeodesicRequest {
            initial_position: position,
            initial_velocity: velocity,
            tau_start: 0.0,
            tau_end,
            samples,
            parameters: HashMap::new(),
            rtol: Self::DEFAULT_RTOL,
            atol: Self::DEFAULT_ATOL,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntegrationStatus {
    Complete,
    /// Integration stopped at `tau`; the trajectory holds the samples
    /// reached before the fault.
    Singularity { tau: f64 },
}

#[derive(Debug, Clone)]
pub struct Trajectory {
    pub tau_values: Vec<f64>,
    /// One row per sample, one column per coordinate.
    pub positions: Vec<Vec<f64>>,
    pub velocities: Vec<Vec<f64>>,
    pub status: IntegrationStatus,
}

/// Connection component with parameters already substituted; only
/// coordinates remain free.
struct GammaTerm {
    a: usize,
    b: usize,
    c: usize,
    expr: Expr,
}

pub fn integrate_geodesic(
    metric: &Metric,
    gamma: &Tensor,
    request: &GeodesicRequest,
    ctx: &mut PipelineContext,
) -> Result<Trajectory, CoreError> {
    let n = metric.dim();
    if request.initial_position.len() != n || request.initial_velocity.len() != n {
        return Err(CoreError::dimension_mismatch(format!(
            "initial state needs {} positions and {} velocities",
            n, n
        )));
    }
    if gamma.rank() != 3 || gamma.dim() != n {
        return Err(CoreError::dimension_mismatch(
            "connection tensor shape disagrees with the metric",
        ));
    }
    if request.samples < 2 {
        return Err(CoreError::dimension_mismatch("at least two output samples are required"));
    }
    if !(request.tau_end > request.tau_start) {
        return Err(CoreError::dimension_mismatch("tau_end must exceed tau_start"));
    }

    let terms: Vec<GammaTerm> = gamma
        .iter_nonzero()
        .map(|(idx, expr)| GammaTerm {
            a: idx[0],
            b: idx[1],
            c: idx[2],
            expr: expr.substitute_values(&request.parameters),
        })
        .collect();
    ctx.trace.info(
        "geodesic",
        format!("{} connection terms after parameter substitution", terms.len()),
    );

    let coord_names: Vec<String> = metric.basis().names().to_vec();
    let deriv = |state: &[f64]| -> Result<Vec<f64>, ()> {
        let mut vars: HashMap<String, f64> = HashMap::with_capacity(n);
        for (i, name) in coord_names.iter().enumerate() {
            vars.insert(name.clone(), state[i]);
        }
        let mut out = vec![0.0; 2 * n];
        out[..n].copy_from_slice(&state[n..]);
        for term in &terms {
            let value = term.expr.evaluate(&vars).map_err(|_| ())?;
            out[n + term.a] -= value * state[n + term.b] * state[n + term.c];
        }
        if out.iter().all(|v| v.is_finite()) {
            Ok(out)
        } else {
            Err(())
        }
    };

    let mut state: Vec<f64> = request
        .initial_position
        .iter()
        .chain(request.initial_velocity.iter())
        .copied()
        .collect();

    // the first evaluation failing means the initial state itself sits on
    // a pole of the connection
    if deriv(&state).is_err() {
        return Err(CoreError::singularity(
            "connection is not finite at the initial state",
            request.tau_start,
        ));
    }

    let span = request.tau_end - request.tau_start;
    let grid_step = span / (request.samples - 1) as f64;
    let mut tau_values = vec![request.tau_start];
    let mut positions = vec![state[..n].to_vec()];
    let mut velocities = vec![state[n..].to_vec()];

    let mut tau = request.tau_start;
    let mut h = grid_step / 10.0;
    let min_step = span * 1e-14;

    'grid: for sample in 1..request.samples {
        let target = request.tau_start + grid_step * sample as f64;
        while tau < target {
            if h > target - tau {
                h = target - tau;
            }
            match rk45_step(&deriv, &state, h, request.rtol, request.atol) {
                StepOutcome::Accept { next, new_h } => {
                    tau += h;
                    state = next;
                    h = new_h.min(grid_step);
                }
                StepOutcome::Shrink { new_h } => {
                    if new_h < min_step {
                        ctx.trace.warn(
                            "geodesic",
                            format!("step underflow at tau = {:.6}", tau),
                        );
                        break 'grid;
                    }
                    h = new_h;
                }
                StepOutcome::Fault => {
                    if h / 2.0 < min_step {
                        ctx.trace.warn(
                            "geodesic",
                            format!("derivative fault at tau = {:.6}", tau),
                        );
                        break 'grid;
                    }
                    h /= 2.0;
                }
            }
        }
        if tau < target {
            break;
        }
        tau_values.push(target);
        positions.push(state[..n].to_vec());
        velocities.push(state[n..].to_vec());
    }

    let status = if tau_values.len() == request.samples {
        ctx.trace.info("geodesic", format!("completed {} samples", request.samples));
        IntegrationStatus::Complete
    } else {
        ctx.trace.info(
            "geodesic",
            format!("stopped early at tau = {:.6} with {} samples", tau, tau_values.len()),
        );
        IntegrationStatus::Singularity { tau }
    };
    Ok(Trajectory { tau_values, positions, velocities, status })
}

enum StepOutcome {
    Accept { next: Vec<f64>, new_h: f64 },
    Shrink { new_h: f64 },
    Fault,
}

// Dormand-Prince 5(4) tableau
const A: [[f64; 6]; 6] = [
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0, 0.0, 0.0],
    [9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0, 0.0],
    [35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0],
];
const B5: [f64; 7] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];
const B4: [f64; 7] = [
    5179.0 / 57600.0,
    0.0,
    7571.0 / 16695.0,
    393.0 / 640.0,
    -92097.0 / 339200.0,
    187.0 / 2100.0,
    1.0 / 40.0,
];

fn rk45_step<F>(deriv: &F, state: &[f64], h: f64, rtol: f64, atol: f64) -> StepOutcome
where
    F: Fn(&[f64]) -> Result<Vec<f64>, ()>,
{
    let dim = state.len();
    let mut k: Vec<Vec<f64>> = Vec::with_capacity(7);
    match deriv(state) {
        Ok(k1) => k.push(k1),
        Err(()) => return StepOutcome::Fault,
    }
    for stage in 0..6 {
        let mut probe = state.to_vec();
        for (j, kj) in k.iter().enumerate() {
            let a = A[stage][j];
            if a == 0.0 {
                continue;
            }
            for i in 0..dim {
                probe[i] += h * a * kj[i];
            }
        }
        match deriv(&probe) {
            Ok(ks) => k.push(ks),
            Err(()) => return StepOutcome::Fault,
        }
    }

    let mut next = state.to_vec();
    let mut err_sq = 0.0;
    for i in 0..dim {
        let mut fifth = 0.0;
        let mut fourth = 0.0;
        for (j, kj) in k.iter().enumerate() {
            fifth += B5[j] * kj[i];
            fourth += B4[j] * kj[i];
        }
        next[i] += h * fifth;
        let scale = atol + rtol * state[i].abs().max(next[i].abs());
        let e = h * (fifth - fourth) / scale;
        err_sq += e * e;
    }
    if !next.iter().all(|v| v.is_finite()) {
        return StepOutcome::Fault;
    }

    let err = (err_sq / dim as f64).sqrt();
    let factor = if err == 0.0 {
        5.0
    } else {
        (0.9 * err.powf(-0.2)).clamp(0.2, 5.0)
    };
    if err <= 1.0 {
        StepOutcome::Accept { next, new_h: h * factor }
    } else {
        StepOutcome::Shrink { new_h: h * factor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::christoffel::christoffel_symbols;
    use crate::core::simplify::SimplifyOptions;

    fn ctx() -> PipelineContext {
        PipelineContext::new(SimplifyOptions::enabled())
    }

    fn parse_metric(coords: &[&str], rows: &[&[&str]], ctx: &mut PipelineContext) -> Metric {
        let names: Vec<String> = coords.iter().map(|s| s.to_string()).collect();
        let grid: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect();
        Metric::parse(&names, &grid, ctx).unwrap()
    }

    fn schwarzschild(ctx: &mut PipelineContext) -> Metric {
        parse_metric(
            &["t", "r", "theta", "phi"],
            &[
                &["-(1 - 2*M/r)", "0", "0", "0"],
                &["0", "1/(1 - 2*M/r)", "0", "0"],
                &["0", "0", "r^2", "0"],
                &["0", "0", "0", "r^2*sin(theta)^2"],
            ],
            ctx,
        )
    }

    #[test]
    fn flat_space_geodesics_are_straight_lines() {
        let mut ctx = ctx();
        let metric = parse_metric(
            &["t", "x"],
            &[&["-1", "0"], &["0", "1"]],
            &mut ctx,
        );
        let gamma = christoffel_symbols(&metric, &mut ctx).unwrap();
        let request = GeodesicRequest::new(vec![0.0, 1.0], vec![1.0, 0.5], 4.0, 21);
        let trajectory = integrate_geodesic(&metric, &gamma, &request, &mut ctx).unwrap();
        assert_eq!(trajectory.status, IntegrationStatus::Complete);
        assert_eq!(trajectory.tau_values.len(), 21);
        // x(tau) = 1 + 0.5 tau
        let last = trajectory.positions.last().unwrap();
        assert!((last[0] - 4.0).abs() < 1e-9);
        assert!((last[1] - 3.0).abs() < 1e-9);
        // velocity is conserved
        let v_last = trajectory.velocities.last().unwrap();
        assert!((v_last[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn wrong_state_length_is_a_dimension_mismatch() {
        let mut ctx = ctx();
        let metric = schwarzschild(&mut ctx);
        let gamma = christoffel_symbols(&metric, &mut ctx).unwrap();
        let mut request = GeodesicRequest::new(vec![0.0, 6.0, 1.5], vec![1.0, 0.0, 0.0], 1.0, 5);
        request.parameters.insert("M".into(), 1.0);
        let err = integrate_geodesic(&metric, &gamma, &request, &mut ctx).unwrap_err();
        assert!(matches!(err, CoreError::DimensionMismatch(_)));
    }

    #[test]
    fn starting_on_the_horizon_is_an_immediate_singularity() {
        let mut ctx = ctx();
        let metric = schwarzschild(&mut ctx);
        let gamma = christoffel_symbols(&metric, &mut ctx).unwrap();
        let mut request = GeodesicRequest::new(
            vec![0.0, 2.0, std::f64::consts::FRAC_PI_2, 0.0],
            vec![1.0, 0.0, 0.0, 0.0],
            1.0,
            5,
        );
        request.parameters.insert("M".into(), 1.0);
        let err = integrate_geodesic(&metric, &gamma, &request, &mut ctx).unwrap_err();
        assert!(matches!(err, CoreError::SingularityEncountered { .. }));
    }

    #[test]
    fn radial_plunge_returns_a_partial_trajectory() {
        // free fall from rest at r = 3M crosses the horizon and blows up
        // well before tau = 40; the result is a truncated trajectory, not
        // an error
        let mut ctx = ctx();
        let metric = schwarzschild(&mut ctx);
        let gamma = christoffel_symbols(&metric, &mut ctx).unwrap();
        let e = (1.0f64 - 2.0 / 3.0).sqrt();
        let mut request = GeodesicRequest::new(
            vec![0.0, 3.0, std::f64::consts::FRAC_PI_2, 0.0],
            vec![e / (1.0 - 2.0 / 3.0), 0.0, 0.0, 0.0],
            40.0,
            41,
        );
        request.parameters.insert("M".into(), 1.0);
        let trajectory = integrate_geodesic(&metric, &gamma, &request, &mut ctx).unwrap();
        assert!(matches!(trajectory.status, IntegrationStatus::Singularity { .. }));
        assert!(trajectory.tau_values.len() < request.samples);
        assert_eq!(trajectory.tau_values.len(), trajectory.positions.len());
        // r decreased monotonically while it lasted
        let r_first = trajectory.positions.first().unwrap()[1];
        let r_last = trajectory.positions.last().unwrap()[1];
        assert!(r_last < r_first);
    }
}
