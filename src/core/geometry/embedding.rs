// src/core/geometry/embedding.rs
//! Flamm-style embedding of the equatorial plane: a surface of revolution
//! whose profile satisfies dz/dr = sqrt(g_rr - 1).
//!
//! Two routes to the profile. When g_rr - 1 canonicalizes to c/q(r) with a
//! linear q, the antiderivative has the closed form 2 sqrt(c q(r)) / q',
//! which is reported in LaTeX alongside the samples. Everything else falls
//! back to cumulative adaptive-Simpson quadrature anchored at z(r_min) = 0;
//! no formula is reported in that case.

use std::collections::HashMap;

use crate::core::error::CoreError;
use crate::core::expr::Expr;
use crate::core::simplify::ZeroCheck;

use super::metric::Metric;
use super::PipelineContext;

#[derive(Debug, Clone)]
pub struct EmbeddingRequest {
    /// Lower radius; defaults to the horizon 2M when a mass parameter is
    /// supplied, with a 0.1 floor.
    pub r_min: Option<f64>,
    pub r_max: f64,
    pub samples: usize,
    pub parameters: HashMap<String, f64>,
}

impl EmbeddingRequest {
    pub fn new(r_max: f64, samples: usize) -> Self {
        EmbeddingRequest { r_min: None, r_max, samples, parameters: HashMap::new() }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingSurface {
    pub r_values: Vec<f64>,
    pub z_values: Vec<f64>,
    /// Closed-form profile, when integration found one.
    pub z_expression: Option<Expr>,
    pub z_function_latex: Option<String>,
}

impl EmbeddingSurface {
    /// Revolves the profile into a mesh: x = r cos(phi), y = r sin(phi),
    /// z constant along each ring.
    pub fn revolve(&self, phi_samples: usize) -> (Vec<Vec<f64>>, Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let mut x = Vec::with_capacity(self.r_values.len());
        let mut y = Vec::with_capacity(self.r_values.len());
        let mut z = Vec::with_capacity(self.r_values.len());
        for (&r, &zi) in self.r_values.iter().zip(&self.z_values) {
            let mut xr = Vec::with_capacity(phi_samples);
            let mut yr = Vec::with_capacity(phi_samples);
            for j in 0..phi_samples {
                let phi = 2.0 * std::f64::consts::PI * j as f64 / phi_samples as f64;
                xr.push(r * phi.cos());
                yr.push(r * phi.sin());
            }
            x.push(xr);
            y.push(yr);
            z.push(vec![zi; phi_samples]);
        }
        (x, y, z)
    }
}

const SIMPSON_TOL: f64 = 1e-8;
const SIMPSON_MAX_DEPTH: u32 = 24;

pub fn embedding_surface(
    metric: &Metric,
    request: &EmbeddingRequest,
    ctx: &mut PipelineContext,
) -> Result<EmbeddingSurface, CoreError> {
    let radial = metric
        .basis()
        .index_of("r")
        .ok_or_else(|| CoreError::dimension_mismatch("metric has no radial coordinate 'r'"))?;
    if request.samples < 2 {
        return Err(CoreError::dimension_mismatch("at least two radial samples are required"));
    }

    let r_min = request.r_min.unwrap_or_else(|| {
        let horizon = request.parameters.get("M").map(|m| 2.0 * m).unwrap_or(0.0);
        horizon.max(0.1)
    });
    if !(request.r_max > r_min) {
        return Err(CoreError::dimension_mismatch("r_max must exceed r_min"));
    }

    // dz/dr squared, kept symbolic for the closed-form attempt
    let w = ctx.simplifier.simplify(&Expr::sub(
        metric.component(radial, radial).clone(),
        Expr::one(),
    ))?;
    let w_numeric = w.substitute_values(&request.parameters);

    let n = request.samples;
    let step = (request.r_max - r_min) / (n - 1) as f64;
    let r_values: Vec<f64> = (0..n).map(|i| r_min + step * i as f64).collect();

    // every sample must sit where the profile is real: g_rr >= 1
    for &r in &r_values {
        let mut vars = HashMap::new();
        vars.insert("r".to_string(), r);
        if let Ok(value) = w_numeric.evaluate(&vars) {
            if value < -1e-12 {
                return Err(CoreError::embedding_undefined(
                    "g_rr < 1, the surface does not embed in flat space",
                    r,
                ));
            }
        }
    }

    if ctx.simplifier.check_zero(&w)? == ZeroCheck::Zero {
        ctx.trace.info("embedding", "g_rr = 1, profile is flat");
        return Ok(EmbeddingSurface {
            z_values: vec![0.0; n],
            r_values,
            z_expression: Some(Expr::zero()),
            z_function_latex: Some("0".to_string()),
        });
    }

    if let Some(z_expr) = closed_form_profile(&w, ctx) {
        let z_numeric = z_expr.substitute_values(&request.parameters);
        let mut z_values = Vec::with_capacity(n);
        let mut ok = true;
        for &r in &r_values {
            let mut vars = HashMap::new();
            vars.insert("r".to_string(), r);
            match z_numeric.evaluate(&vars) {
                Ok(value) => z_values.push(value),
                Err(_) => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            ctx.trace.info("embedding", format!("closed-form profile z(r) = {}", z_expr));
            let latex = z_expr.to_latex();
            return Ok(EmbeddingSurface {
                r_values,
                z_values,
                z_expression: Some(z_expr),
                z_function_latex: Some(latex),
            });
        }
    }

    // numeric fallback: cumulative quadrature of sqrt(g_rr - 1)
    ctx.trace.info("embedding", "no closed form, integrating numerically");
    let span = request.r_max - r_min;
    let integrand = |r: f64| -> Option<f64> {
        let mut vars = HashMap::new();
        vars.insert("r".to_string(), r);
        // a pole at the exact lower edge (a horizon) is integrable; nudge
        // inward instead of giving up
        let value = match w_numeric.evaluate(&vars) {
            Ok(v) => v,
            Err(_) => {
                vars.insert("r".to_string(), r + span * 1e-9);
                w_numeric.evaluate(&vars).ok()?
            }
        };
        if value < 0.0 {
            if value > -1e-9 {
                return Some(0.0);
            }
            return None;
        }
        Some(value.sqrt())
    };

    let mut z_values = Vec::with_capacity(n);
    z_values.push(0.0);
    let mut acc = 0.0;
    for i in 1..n {
        let (a, b) = (r_values[i - 1], r_values[i]);
        let segment = adaptive_simpson(&integrand, a, b).ok_or_else(|| {
            CoreError::embedding_undefined(
                "g_rr < 1, the surface does not embed in flat space",
                b,
            )
        })?;
        acc += segment;
        z_values.push(acc);
    }

    Ok(EmbeddingSurface { r_values, z_values, z_expression: None, z_function_latex: None })
}

/// Closed form for w = c / (q0 + q1 r): z(r) = 2 sqrt(c (q0 + q1 r)) / q1,
/// which vanishes at the root of the denominator (the horizon for
/// Schwarzschild). None when w is not of that shape.
fn closed_form_profile(w: &Expr, ctx: &mut PipelineContext) -> Option<Expr> {
    let (num, den) = ctx.simplifier.as_univariate_rational(w, "r")?;
    if num.len() != 1 || den.len() != 2 || num[0].is_zero() || den[1].is_zero() {
        return None;
    }
    let q = Expr::add(den[0].clone(), Expr::mul(den[1].clone(), Expr::sym("r")));
    let z = Expr::div(
        Expr::mul(Expr::num(2.0), Expr::sqrt(Expr::mul(num[0].clone(), q))),
        den[1].clone(),
    );
    ctx.simplifier.simplify(&z).ok()
}

fn adaptive_simpson<F>(f: &F, a: f64, b: f64) -> Option<f64>
where
    F: Fn(f64) -> Option<f64>,
{
    let fa = f(a)?;
    let fb = f(b)?;
    let m = 0.5 * (a + b);
    let fm = f(m)?;
    let whole = simpson(a, b, fa, fm, fb);
    simpson_recurse(f, a, b, fa, fm, fb, whole, SIMPSON_TOL, SIMPSON_MAX_DEPTH)
}

fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

#[allow(clippy::too_many_arguments)]
fn simpson_recurse<F>(
    f: &F,
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    tol: f64,
    depth: u32,
) -> Option<f64>
where
    F: Fn(f64) -> Option<f64>,
{
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = f(lm)?;
    let frm = f(rm)?;
    let left = simpson(a, m, fa, flm, fm);
    let right = simpson(m, b, fm, frm, fb);
    let delta = left + right - whole;
    if depth == 0 || delta.abs() <= 15.0 * tol {
        return Some(left + right + delta / 15.0);
    }
    let half_tol = tol / 2.0;
    let l = simpson_recurse(f, a, m, fa, flm, fm, left, half_tol, depth - 1)?;
    let r = simpson_recurse(f, m, b, fm, frm, fb, right, half_tol, depth - 1)?;
    Some(l + r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simplify::SimplifyOptions;

    fn ctx() -> PipelineContext {
        PipelineContext::new(SimplifyOptions::enabled())
    }

    fn schwarzschild(ctx: &mut PipelineContext) -> Metric {
        let coords: Vec<String> =
            ["t", "r", "theta", "phi"].iter().map(|s| s.to_string()).collect();
        let grid: Vec<Vec<String>> = [
            ["-(1 - 2*M/r)", "0", "0", "0"],
            ["0", "1/(1 - 2*M/r)", "0", "0"],
            ["0", "0", "r^2", "0"],
            ["0", "0", "0", "r^2*sin(theta)^2"],
        ]
        .iter()
        .map(|row| row.iter().map(|s| s.to_string()).collect())
        .collect();
        Metric::parse(&coords, &grid, ctx).unwrap()
    }

    fn flat_polar(ctx: &mut PipelineContext) -> Metric {
        let coords: Vec<String> =
            ["t", "r", "theta", "phi"].iter().map(|s| s.to_string()).collect();
        let grid: Vec<Vec<String>> = [
            ["-1", "0", "0", "0"],
            ["0", "1", "0", "0"],
            ["0", "0", "r^2", "0"],
            ["0", "0", "0", "r^2*sin(theta)^2"],
        ]
        .iter()
        .map(|row| row.iter().map(|s| s.to_string()).collect())
        .collect();
        Metric::parse(&coords, &grid, ctx).unwrap()
    }

    #[test]
    fn schwarzschild_profile_matches_the_flamm_paraboloid() {
        // z(r) = sqrt(8 M (r - 2M)); at M = 1, z(4) = 4
        let mut ctx = ctx();
        let metric = schwarzschild(&mut ctx);
        let mut request = EmbeddingRequest::new(10.0, 9);
        request.r_min = Some(2.0);
        request.parameters.insert("M".into(), 1.0);
        let surface = embedding_surface(&metric, &request, &mut ctx).unwrap();
        assert!(surface.z_function_latex.is_some());
        for (&r, &z) in surface.r_values.iter().zip(&surface.z_values) {
            let expected = (8.0 * (r - 2.0)).sqrt();
            assert!((z - expected).abs() < 1e-9, "z({}) = {}, want {}", r, z, expected);
        }
    }

    #[test]
    fn r_min_defaults_to_the_horizon() {
        let mut ctx = ctx();
        let metric = schwarzschild(&mut ctx);
        let mut request = EmbeddingRequest::new(10.0, 5);
        request.parameters.insert("M".into(), 1.5);
        let surface = embedding_surface(&metric, &request, &mut ctx).unwrap();
        assert!((surface.r_values[0] - 3.0).abs() < 1e-12);
        assert!((surface.z_values[0]).abs() < 1e-12);
    }

    #[test]
    fn inside_the_horizon_is_undefined() {
        let mut ctx = ctx();
        let metric = schwarzschild(&mut ctx);
        let mut request = EmbeddingRequest::new(10.0, 20);
        request.r_min = Some(1.0);
        request.parameters.insert("M".into(), 1.0);
        let err = embedding_surface(&metric, &request, &mut ctx).unwrap_err();
        assert!(matches!(err, CoreError::EmbeddingUndefined { .. }));
    }

    #[test]
    fn flat_metric_embeds_as_a_plane() {
        let mut ctx = ctx();
        let metric = flat_polar(&mut ctx);
        let mut request = EmbeddingRequest::new(5.0, 8);
        request.r_min = Some(0.5);
        let surface = embedding_surface(&metric, &request, &mut ctx).unwrap();
        assert!(surface.z_values.iter().all(|&z| z == 0.0));
        assert_eq!(surface.z_function_latex.as_deref(), Some("0"));
    }

    #[test]
    fn revolved_mesh_has_the_requested_shape() {
        let mut ctx = ctx();
        let metric = flat_polar(&mut ctx);
        let mut request = EmbeddingRequest::new(5.0, 4);
        request.r_min = Some(1.0);
        let surface = embedding_surface(&metric, &request, &mut ctx).unwrap();
        let (x, y, z) = surface.revolve(16);
        assert_eq!(x.len(), 4);
        assert_eq!(y[0].len(), 16);
        assert_eq!(z[2][5], surface.z_values[2]);
        // first ring sits at radius 1
        let r0 = (x[0][3].powi(2) + y[0][3].powi(2)).sqrt();
        assert!((r0 - 1.0).abs() < 1e-12);
    }
}
