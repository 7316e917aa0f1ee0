// src/core/geometry/curvature.rs
//! Curvature chain: Riemann from the connection, then the Ricci
//! contraction, the scalar, and the Einstein tensor. Stages run strictly
//! in that order; each simplifies its own components before handing off.

use crate::core::error::CoreError;
use crate::core::expr::Expr;
use crate::core::tensor::Tensor;

use super::metric::Metric;
use super::PipelineContext;

/// R^a_bcd = d_c Gamma^a_db - d_d Gamma^a_cb
///         + Gamma^a_ce Gamma^e_db - Gamma^a_de Gamma^e_cb
pub fn riemann_tensor(
    metric: &Metric,
    gamma: &Tensor,
    ctx: &mut PipelineContext,
) -> Result<Tensor, CoreError> {
    let n = metric.dim();
    if gamma.rank() != 3 || gamma.dim() != n {
        return Err(CoreError::dimension_mismatch(
            "connection tensor shape disagrees with the metric",
        ));
    }

    // dgamma[d][a][b][c] = d_d Gamma^a_bc
    let mut dgamma = Tensor::zeros(4, n);
    for d in 0..n {
        let coord = metric.basis().name(d);
        for (idx, component) in gamma.iter_nonzero() {
            let derivative = component.diff(coord);
            if !derivative.is_zero() {
                dgamma.set(&[d, idx[0], idx[1], idx[2]], ctx.simplifier.simplify(&derivative)?);
            }
        }
    }

    let mut riemann = Tensor::zeros(4, n);
    for a in 0..n {
        for b in 0..n {
            for c in 0..n {
                for d in 0..n {
                    let mut sum = Expr::sub(
                        dgamma.get(&[c, a, d, b]).clone(),
                        dgamma.get(&[d, a, c, b]).clone(),
                    );
                    for e in 0..n {
                        let first = Expr::mul(
                            gamma.get(&[a, c, e]).clone(),
                            gamma.get(&[e, d, b]).clone(),
                        );
                        let second = Expr::mul(
                            gamma.get(&[a, d, e]).clone(),
                            gamma.get(&[e, c, b]).clone(),
                        );
                        sum = Expr::add(sum, Expr::sub(first, second));
                    }
                    if sum.is_zero() {
                        continue;
                    }
                    riemann.set(&[a, b, c, d], ctx.simplifier.simplify(&sum)?);
                }
            }
        }
    }

    ctx.trace.info(
        "riemann",
        format!(
            "{} of {} components nonzero",
            riemann.nonzero_count(),
            n * n * n * n
        ),
    );
    Ok(riemann)
}

/// R_bd = R^a_bad
pub fn ricci_tensor(riemann: &Tensor, ctx: &mut PipelineContext) -> Result<Tensor, CoreError> {
    let n = riemann.dim();
    if riemann.rank() != 4 {
        return Err(CoreError::dimension_mismatch("Ricci contraction needs a rank-4 tensor"));
    }
    let mut ricci = Tensor::zeros(2, n);
    for b in 0..n {
        for d in 0..n {
            let mut sum = Expr::zero();
            for a in 0..n {
                sum = Expr::add(sum, riemann.get(&[a, b, a, d]).clone());
            }
            if sum.is_zero() {
                continue;
            }
            ricci.set(&[b, d], ctx.simplifier.simplify(&sum)?);
        }
    }
    ctx.trace
        .info("ricci", format!("{} of {} components nonzero", ricci.nonzero_count(), n * n));
    Ok(ricci)
}

/// R = g^ab R_ab
pub fn ricci_scalar(
    metric: &Metric,
    ricci: &Tensor,
    ctx: &mut PipelineContext,
) -> Result<Expr, CoreError> {
    let n = metric.dim();
    if ricci.rank() != 2 || ricci.dim() != n {
        return Err(CoreError::dimension_mismatch(
            "Ricci tensor shape disagrees with the metric",
        ));
    }
    let mut scalar = Expr::zero();
    for a in 0..n {
        for b in 0..n {
            let g_ab = metric.inverse().get(&[a, b]);
            let r_ab = ricci.get(&[a, b]);
            if g_ab.is_zero() || r_ab.is_zero() {
                continue;
            }
            scalar = Expr::add(scalar, Expr::mul(g_ab.clone(), r_ab.clone()));
        }
    }
    let scalar = ctx.simplifier.simplify(&scalar)?;
    ctx.trace.info("ricci_scalar", format!("R = {}", scalar));
    Ok(scalar)
}

/// G_ab = R_ab - 1/2 g_ab R
pub fn einstein_tensor(
    metric: &Metric,
    ricci: &Tensor,
    scalar: &Expr,
    ctx: &mut PipelineContext,
) -> Result<Tensor, CoreError> {
    let n = metric.dim();
    if ricci.rank() != 2 || ricci.dim() != n {
        return Err(CoreError::dimension_mismatch(
            "Ricci tensor shape disagrees with the metric",
        ));
    }
    let half_r = Expr::mul(Expr::div(Expr::one(), Expr::num(2.0)), scalar.clone());
    let mut einstein = Tensor::zeros(2, n);
    for a in 0..n {
        for b in 0..n {
            let term = Expr::sub(
                ricci.get(&[a, b]).clone(),
                Expr::mul(metric.component(a, b).clone(), half_r.clone()),
            );
            if term.is_zero() {
                continue;
            }
            einstein.set(&[a, b], ctx.simplifier.simplify(&term)?);
        }
    }
    ctx.trace.info(
        "einstein",
        format!("{} of {} components nonzero", einstein.nonzero_count(), n * n),
    );
    Ok(einstein)
}
