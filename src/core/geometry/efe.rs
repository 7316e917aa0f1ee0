// src/core/geometry/efe.rs
//! Field-equation check: D_ab = G_ab - kappa T_ab, component by component.
//!
//! The verdict is three-valued. A residual the canonicalizer reduces to
//! zero everywhere is `Verified`; a residual that is a nonzero constant or
//! clearly nonzero under numeric probing is `Violated`; anything the
//! simplifier cannot decide and the probes cannot condemn stays
//! `Unproven` rather than being rounded to a yes.

use std::collections::HashMap;

use crate::core::error::CoreError;
use crate::core::expr::Expr;
use crate::core::simplify::ZeroCheck;
use crate::core::tensor::Tensor;

use super::metric::Metric;
use super::PipelineContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Verified,
    Violated,
    Unproven,
}

#[derive(Debug)]
pub struct EfeReport {
    pub verdict: Verdict,
    pub message: String,
    pub residual: Tensor,
}

const PROBE_SEEDS: [f64; 3] = [1.37, 2.71, 3.89];
const PROBE_TOL: f64 = 1e-6;

/// Compares the Einstein tensor against kappa T_ab; kappa defaults to 1
/// (units where the coupling is absorbed into T).
pub fn verify_field_equations(
    metric: &Metric,
    einstein: &Tensor,
    stress_energy: &Tensor,
    kappa: Option<f64>,
    ctx: &mut PipelineContext,
) -> Result<EfeReport, CoreError> {
    let n = metric.dim();
    if stress_energy.rank() != 2 || stress_energy.dim() != n {
        return Err(CoreError::dimension_mismatch(
            "stress-energy tensor shape disagrees with the metric",
        ));
    }
    let kappa = match kappa {
        Some(value) => Expr::num(value),
        None => Expr::one(),
    };

    let mut residual = Tensor::zeros(2, n);
    let mut undecided: Vec<String> = Vec::new();
    for a in 0..n {
        for b in 0..n {
            let d_ab = Expr::sub(
                einstein.get(&[a, b]).clone(),
                Expr::mul(kappa.clone(), stress_energy.get(&[a, b]).clone()),
            );
            let d_ab = ctx.simplifier.simplify(&d_ab)?;
            match ctx.simplifier.check_zero(&d_ab)? {
                ZeroCheck::Zero => {}
                ZeroCheck::NonZeroConstant => {
                    let key = residual.index_key(&[a, b]);
                    residual.set(&[a, b], d_ab.clone());
                    ctx.trace.warn("efe", format!("residual {} is a nonzero constant", key));
                    return Ok(EfeReport {
                        verdict: Verdict::Violated,
                        message: format!(
                            "field equations violated: residual component {} is the nonzero constant {}",
                            key, d_ab
                        ),
                        residual: fill_residual(residual, einstein, stress_energy, &kappa, ctx)?,
                    });
                }
                ZeroCheck::Undecided => {
                    let key = residual.index_key(&[a, b]);
                    if let Some(value) = probe_nonzero(&d_ab) {
                        residual.set(&[a, b], d_ab.clone());
                        ctx.trace.warn(
                            "efe",
                            format!("residual {} probed to {:.3e}", key, value),
                        );
                        return Ok(EfeReport {
                            verdict: Verdict::Violated,
                            message: format!(
                                "field equations violated: residual component {} evaluates to {:.6e} at a sample point",
                                key, value
                            ),
                            residual: fill_residual(residual, einstein, stress_energy, &kappa, ctx)?,
                        });
                    }
                    undecided.push(key);
                }
            }
            residual.set(&[a, b], d_ab);
        }
    }

    if undecided.is_empty() {
        ctx.trace.info("efe", "all residual components vanish identically");
        Ok(EfeReport {
            verdict: Verdict::Verified,
            message: "field equations verified: all residual components vanish identically".into(),
            residual,
        })
    } else {
        ctx.trace.info(
            "efe",
            format!("{} residual components undecided", undecided.len()),
        );
        Ok(EfeReport {
            verdict: Verdict::Unproven,
            message: format!(
                "could not prove equality: residual component {} did not simplify to zero",
                undecided[0]
            ),
            residual,
        })
    }
}

/// Numeric spot check over a few deterministic sample points. Some(value)
/// when any probe comes out clearly nonzero; probes that fault (a sample
/// landing on a pole) are skipped.
fn probe_nonzero(expr: &Expr) -> Option<f64> {
    let symbols = expr.free_symbols();
    for seed in PROBE_SEEDS {
        let mut vars = HashMap::new();
        for (i, name) in symbols.iter().enumerate() {
            if name == "pi" {
                continue; // evaluate() supplies the real constant
            }
            vars.insert(name.clone(), seed + 0.29 * i as f64);
        }
        match expr.evaluate(&vars) {
            Ok(value) if value.abs() > PROBE_TOL => return Some(value),
            _ => {}
        }
    }
    None
}

/// On early exit the residual grid is only partially written; finish it so
/// the report always carries the full tensor.
fn fill_residual(
    mut residual: Tensor,
    einstein: &Tensor,
    stress_energy: &Tensor,
    kappa: &Expr,
    ctx: &mut PipelineContext,
) -> Result<Tensor, CoreError> {
    let n = residual.dim();
    for a in 0..n {
        for b in 0..n {
            if !residual.get(&[a, b]).is_zero() {
                continue;
            }
            let d_ab = Expr::sub(
                einstein.get(&[a, b]).clone(),
                Expr::mul(kappa.clone(), stress_energy.get(&[a, b]).clone()),
            );
            residual.set(&[a, b], ctx.simplifier.simplify(&d_ab)?);
        }
    }
    Ok(residual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::stress_energy::{stress_energy_tensor, StressEnergySource};
    use crate::core::simplify::SimplifyOptions;

    fn ctx() -> PipelineContext {
        PipelineContext::new(SimplifyOptions::enabled())
    }

    fn flat(ctx: &mut PipelineContext) -> Metric {
        let coords: Vec<String> = ["t", "x", "y", "z"].iter().map(|s| s.to_string()).collect();
        let grid: Vec<Vec<String>> = [
            ["-1", "0", "0", "0"],
            ["0", "1", "0", "0"],
            ["0", "0", "1", "0"],
            ["0", "0", "0", "1"],
        ]
        .iter()
        .map(|row| row.iter().map(|s| s.to_string()).collect())
        .collect();
        Metric::parse(&coords, &grid, ctx).unwrap()
    }

    #[test]
    fn flat_vacuum_is_verified() {
        let mut ctx = ctx();
        let metric = flat(&mut ctx);
        let einstein = Tensor::zeros(2, 4);
        let t = stress_energy_tensor(&StressEnergySource::Vacuum, Some(&metric), &mut ctx).unwrap();
        let report = verify_field_equations(&metric, &einstein, &t, None, &mut ctx).unwrap();
        assert_eq!(report.verdict, Verdict::Verified);
        assert!(report.message.contains("verified"));
        assert!(report.residual.is_zero());
    }

    #[test]
    fn matching_tensors_verify_under_the_default_coupling() {
        // G == T with kappa omitted: the default coupling is 1, so the
        // residual vanishes identically
        let mut ctx = ctx();
        let metric = flat(&mut ctx);
        let mut einstein = Tensor::zeros(2, 4);
        einstein.set(&[0, 0], Expr::sym("rho"));
        let t = stress_energy_tensor(&StressEnergySource::dust(), Some(&metric), &mut ctx).unwrap();
        let report = verify_field_equations(&metric, &einstein, &t, None, &mut ctx).unwrap();
        assert_eq!(report.verdict, Verdict::Verified);
        assert!(report.residual.is_zero());
    }

    #[test]
    fn flat_metric_with_dust_is_violated() {
        // G = 0 but T_00 = rho: the residual -rho probes nonzero
        let mut ctx = ctx();
        let metric = flat(&mut ctx);
        let einstein = Tensor::zeros(2, 4);
        let t = stress_energy_tensor(&StressEnergySource::dust(), Some(&metric), &mut ctx).unwrap();
        let report = verify_field_equations(&metric, &einstein, &t, None, &mut ctx).unwrap();
        assert_eq!(report.verdict, Verdict::Violated);
        assert!(report.message.contains("violated"), "{}", report.message);
        assert!(!report.residual.get(&[0, 0]).is_zero());
    }

    #[test]
    fn constant_residual_is_reported_as_violated() {
        let mut ctx = ctx();
        let metric = flat(&mut ctx);
        let mut einstein = Tensor::zeros(2, 4);
        einstein.set(&[1, 1], Expr::num(3.0));
        let t = stress_energy_tensor(&StressEnergySource::Vacuum, Some(&metric), &mut ctx).unwrap();
        let report = verify_field_equations(&metric, &einstein, &t, None, &mut ctx).unwrap();
        assert_eq!(report.verdict, Verdict::Violated);
        assert!(report.message.contains("nonzero constant"), "{}", report.message);
    }

    #[test]
    fn undecidable_residual_stays_unproven() {
        // ln(exp(r)) - r is opaque to the canonicalizer and probes to zero
        let mut ctx = ctx();
        let metric = flat(&mut ctx);
        let mut einstein = Tensor::zeros(2, 4);
        einstein.set(
            &[0, 0],
            crate::core::parser::parse_expression("ln(exp(r)) - r").unwrap(),
        );
        let t = stress_energy_tensor(&StressEnergySource::Vacuum, Some(&metric), &mut ctx).unwrap();
        let report = verify_field_equations(&metric, &einstein, &t, None, &mut ctx).unwrap();
        assert_eq!(report.verdict, Verdict::Unproven);
        assert!(report.message.contains("could not prove"), "{}", report.message);
    }
}
