// src/core/geometry/metric.rs
//! Metric construction: parse the component grid, check the determinant,
//! invert symbolically.

use crate::core::error::CoreError;
use crate::core::expr::Expr;
use crate::core::parser::parse_expression;
use crate::core::simplify::ZeroCheck;
use crate::core::tensor::{CoordinateBasis, Tensor};

use super::PipelineContext;

/// The metric tensor g_ab with its inverse g^ab over a fixed basis.
#[derive(Debug, Clone)]
pub struct Metric {
    basis: CoordinateBasis,
    g: Tensor,
    g_inv: Tensor,
}

impl Metric {
    /// Parses an N x N grid of component strings over the named
    /// coordinates. Unknown identifiers in the components become free
    /// parameter symbols.
    pub fn parse(
        coord_names: &[String],
        components: &[Vec<String>],
        ctx: &mut PipelineContext,
    ) -> Result<Metric, CoreError> {
        let basis = CoordinateBasis::new(coord_names.to_vec())?;
        let n = basis.dim();
        if components.len() != n {
            return Err(CoreError::dimension_mismatch(format!(
                "metric grid has {} rows for a {}-coordinate basis",
                components.len(),
                n
            )));
        }
        let mut rows = Vec::with_capacity(n);
        for row in components {
            if row.len() != n {
                return Err(CoreError::dimension_mismatch(format!(
                    "metric row has {} entries, expected {}",
                    row.len(),
                    n
                )));
            }
            let mut parsed = Vec::with_capacity(n);
            for text in row {
                parsed.push(parse_expression(text)?);
            }
            rows.push(parsed);
        }
        Metric::new(basis, rows, ctx)
    }

    /// Builds a metric from already-parsed expressions.
    pub fn new(
        basis: CoordinateBasis,
        components: Vec<Vec<Expr>>,
        ctx: &mut PipelineContext,
    ) -> Result<Metric, CoreError> {
        let n = basis.dim();
        if components.len() != n || components.iter().any(|row| row.len() != n) {
            return Err(CoreError::dimension_mismatch(format!(
                "metric components must form a {0}x{0} grid",
                n
            )));
        }

        // symmetry is checked but not enforced: exploratory non-symmetric
        // metrics stay expressible
        for a in 0..n {
            for b in (a + 1)..n {
                let diff = Expr::sub(components[a][b].clone(), components[b][a].clone());
                if ctx.simplifier.check_zero(&diff)? != ZeroCheck::Zero {
                    ctx.trace.warn(
                        "metric",
                        format!("metric is not symmetric: g[{a}][{b}] != g[{b}][{a}]"),
                    );
                }
            }
        }

        let det = determinant(&components);
        if ctx.simplifier.check_zero(&det)? == ZeroCheck::Zero {
            return Err(CoreError::singular_metric(
                "determinant is symbolically zero, metric cannot be inverted",
            ));
        }
        ctx.trace.debug("metric", format!("det(g) = {}", det));

        // inverse via adjugate: g^ab = cofactor(b, a) / det
        let mut inverse_rows = Vec::with_capacity(n);
        for a in 0..n {
            let mut row = Vec::with_capacity(n);
            for b in 0..n {
                let entry = Expr::div(cofactor(&components, b, a), det.clone());
                row.push(ctx.simplifier.simplify(&entry)?);
            }
            inverse_rows.push(row);
        }

        let g = Tensor::from_rank2(components)?;
        let g_inv = Tensor::from_rank2(inverse_rows)?;
        ctx.trace.info(
            "metric",
            format!("built {n}x{n} metric, {} nonzero components", g.nonzero_count()),
        );
        Ok(Metric { basis, g, g_inv })
    }

    pub fn basis(&self) -> &CoordinateBasis {
        &self.basis
    }

    pub fn dim(&self) -> usize {
        self.basis.dim()
    }

    pub fn g(&self) -> &Tensor {
        &self.g
    }

    pub fn inverse(&self) -> &Tensor {
        &self.g_inv
    }

    pub fn component(&self, a: usize, b: usize) -> &Expr {
        self.g.get(&[a, b])
    }
}

/// Laplace expansion along the first row. Fine for the N <= 4 grids this
/// pipeline sees.
fn determinant(m: &[Vec<Expr>]) -> Expr {
    let n = m.len();
    if n == 1 {
        return m[0][0].clone();
    }
    let mut det = Expr::zero();
    for (col, entry) in m[0].iter().enumerate() {
        if entry.is_zero() {
            continue;
        }
        let minor_det = determinant(&minor(m, 0, col));
        let term = Expr::mul(entry.clone(), minor_det);
        det = if col % 2 == 0 {
            Expr::add(det, term)
        } else {
            Expr::sub(det, term)
        };
    }
    det
}

fn cofactor(m: &[Vec<Expr>], row: usize, col: usize) -> Expr {
    let minor_det = determinant(&minor(m, row, col));
    if (row + col) % 2 == 0 {
        minor_det
    } else {
        Expr::neg(minor_det)
    }
}

fn minor(m: &[Vec<Expr>], row: usize, col: usize) -> Vec<Vec<Expr>> {
    m.iter()
        .enumerate()
        .filter(|(r, _)| *r != row)
        .map(|(_, entries)| {
            entries
                .iter()
                .enumerate()
                .filter(|(c, _)| *c != col)
                .map(|(_, e)| e.clone())
                .collect()
        })
        .collect()
}
