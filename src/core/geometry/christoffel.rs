// src/core/geometry/christoffel.rs
//! Connection coefficients of the second kind:
//!
//!   Gamma^a_bc = 1/2 * g^ad * (d_b g_dc + d_c g_db - d_d g_bc)
//!
//! Symmetric in (b, c) by the formula itself; every component is computed
//! directly rather than mirrored from a stored half.

use crate::core::error::CoreError;
use crate::core::expr::Expr;
use crate::core::tensor::Tensor;

use super::metric::Metric;
use super::PipelineContext;

/// Derives the rank-3 Christoffel tensor from the metric. O(N^4) symbolic
/// operations before simplification.
pub fn christoffel_symbols(metric: &Metric, ctx: &mut PipelineContext) -> Result<Tensor, CoreError> {
    let basis = metric.basis();
    let n = basis.dim();
    if metric.g().rank() != 2 || metric.g().dim() != n {
        return Err(CoreError::dimension_mismatch(
            "metric tensor shape disagrees with the coordinate basis",
        ));
    }

    // dg[d][a][b] = d_d g_ab; zeros skipped, constants differentiate away
    let mut dg = Tensor::zeros(3, n);
    for d in 0..n {
        let coord = basis.name(d);
        for a in 0..n {
            for b in 0..n {
                let entry = metric.component(a, b);
                if !entry.is_zero() {
                    dg.set(&[d, a, b], entry.diff(coord));
                }
            }
        }
    }

    let mut gamma = Tensor::zeros(3, n);
    for a in 0..n {
        for b in 0..n {
            for c in 0..n {
                let mut sum = Expr::zero();
                for d in 0..n {
                    let g_ad = metric.inverse().get(&[a, d]);
                    if g_ad.is_zero() {
                        continue;
                    }
                    let term = Expr::sub(
                        Expr::add(dg.get(&[b, d, c]).clone(), dg.get(&[c, d, b]).clone()),
                        dg.get(&[d, b, c]).clone(),
                    );
                    if term.is_zero() {
                        continue;
                    }
                    sum = Expr::add(sum, Expr::mul(g_ad.clone(), term));
                }
                if sum.is_zero() {
                    continue;
                }
                let halved = Expr::mul(Expr::div(Expr::one(), Expr::num(2.0)), sum);
                gamma.set(&[a, b, c], ctx.simplifier.simplify(&halved)?);
            }
        }
    }

    ctx.trace.info(
        "christoffel",
        format!("{} of {} components nonzero", gamma.nonzero_count(), n * n * n),
    );
    Ok(gamma)
}
