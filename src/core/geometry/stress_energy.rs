// src/core/geometry/stress_energy.rs
//! Stress-energy tensor construction: the built-in matter presets and the
//! explicit component grid. Everything comes out covariant (T_ab) to match
//! the Einstein tensor it will be compared against.

use crate::core::error::CoreError;
use crate::core::expr::Expr;
use crate::core::parser::parse_expression;
use crate::core::tensor::Tensor;

use super::metric::Metric;
use super::PipelineContext;

/// Matter content. Preset density and pressure are free symbols whose
/// names the caller may override; `Explicit` takes the full grid.
#[derive(Debug, Clone)]
pub enum StressEnergySource {
    Vacuum,
    Dust { density: String },
    PerfectFluid { density: String, pressure: String },
    Explicit { components: Vec<Vec<String>> },
}

impl StressEnergySource {
    pub fn dust() -> Self {
        StressEnergySource::Dust { density: "rho".into() }
    }

    pub fn perfect_fluid() -> Self {
        StressEnergySource::PerfectFluid { density: "rho".into(), pressure: "p".into() }
    }
}

/// Builds T_ab for the given source. The perfect fluid needs the metric to
/// normalize its four-velocity; vacuum and dust only need the dimension.
pub fn stress_energy_tensor(
    source: &StressEnergySource,
    metric: Option<&Metric>,
    ctx: &mut PipelineContext,
) -> Result<Tensor, CoreError> {
    let dim = metric.map(|m| m.dim()).unwrap_or(4);
    let tensor = match source {
        StressEnergySource::Vacuum => Tensor::zeros(2, dim),

        StressEnergySource::Dust { density } => {
            // comoving dust: u_a = (-1, 0, ..., 0), T_ab = rho u_a u_b
            let mut t = Tensor::zeros(2, dim);
            t.set(&[0, 0], Expr::sym(density.clone()));
            t
        }

        StressEnergySource::PerfectFluid { density, pressure } => {
            let metric = metric.ok_or_else(|| {
                CoreError::missing_metric(
                    "a perfect fluid needs the metric to normalize its four-velocity",
                )
            })?;
            let rho = Expr::sym(density.clone());
            let p = Expr::sym(pressure.clone());
            // static observer: u_a = (-sqrt(-g_00), 0, ..., 0)
            let u_t = Expr::neg(Expr::sqrt(Expr::neg(metric.component(0, 0).clone())));
            let mut t = Tensor::zeros(2, metric.dim());
            for a in 0..metric.dim() {
                for b in 0..metric.dim() {
                    let mut term = Expr::mul(p.clone(), metric.component(a, b).clone());
                    if a == 0 && b == 0 {
                        term = Expr::add(
                            term,
                            Expr::mul(
                                Expr::add(rho.clone(), p.clone()),
                                Expr::mul(u_t.clone(), u_t.clone()),
                            ),
                        );
                    }
                    if term.is_zero() {
                        continue;
                    }
                    t.set(&[a, b], ctx.simplifier.simplify(&term)?);
                }
            }
            t
        }

        StressEnergySource::Explicit { components } => {
            if components.len() != dim || components.iter().any(|row| row.len() != dim) {
                return Err(CoreError::dimension_mismatch(format!(
                    "stress-energy components must form a {0}x{0} grid",
                    dim
                )));
            }
            let mut t = Tensor::zeros(2, dim);
            for (a, row) in components.iter().enumerate() {
                for (b, text) in row.iter().enumerate() {
                    let expr = parse_expression(text)?;
                    if expr.is_zero() {
                        continue;
                    }
                    t.set(&[a, b], ctx.simplifier.simplify(&expr)?);
                }
            }
            t
        }
    };
    ctx.trace.info(
        "stress_energy",
        format!("{} nonzero components", tensor.nonzero_count()),
    );
    Ok(tensor)
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

    #[test]
    fn vacuum_is_all_zero() {
        let mut ctx = ctx();
        let t = stress_energy_tensor(&StressEnergySource::Vacuum, None, &mut ctx).unwrap();
        assert!(t.is_zero());
        assert_eq!(t.dim(), 4);
    }

    #[test]
    fn dust_puts_density_in_the_time_slot() {
        let mut ctx = ctx();
        let t = stress_energy_tensor(&StressEnergySource::dust(), None, &mut ctx).unwrap();
        assert_eq!(t.get(&[0, 0]), &Expr::sym("rho"));
        assert_eq!(t.nonzero_count(), 1);
    }

    #[test]
    fn dust_symbol_name_is_overridable() {
        let mut ctx = ctx();
        let source = StressEnergySource::Dust { density: "rho_0".into() };
        let t = stress_energy_tensor(&source, None, &mut ctx).unwrap();
        assert_eq!(t.get(&[0, 0]), &Expr::sym("rho_0"));
    }

    #[test]
    fn perfect_fluid_without_metric_is_missing_metric() {
        let mut ctx = ctx();
        let err = stress_energy_tensor(&StressEnergySource::perfect_fluid(), None, &mut ctx)
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingMetric(_)));
    }

    #[test]
    fn perfect_fluid_time_component() {
        // T_00 = (rho + p)(-g_00) + p g_00 = -rho g_00 = rho (1 - 2M/r)
        let mut ctx = ctx();
        let metric = schwarzschild(&mut ctx);
        let t = stress_energy_tensor(&StressEnergySource::perfect_fluid(), Some(&metric), &mut ctx)
            .unwrap();
        let expected = parse_expression("rho*(1 - 2*M/r)").unwrap();
        let residual = Expr::sub(t.get(&[0, 0]).clone(), expected);
        assert!(
            ctx.simplifier.simplify(&residual).unwrap().is_zero(),
            "T_00 = {}",
            t.get(&[0, 0])
        );
        // spatial diagonal picks up p g_ab
        let expected = parse_expression("p*r^2").unwrap();
        let residual = Expr::sub(t.get(&[2, 2]).clone(), expected);
        assert!(ctx.simplifier.simplify(&residual).unwrap().is_zero());
    }

    #[test]
    fn explicit_grid_is_parsed_and_shape_checked() {
        let mut ctx = ctx();
        let metric = schwarzschild(&mut ctx);
        let bad = StressEnergySource::Explicit {
            components: vec![vec!["0".into(); 3]; 3],
        };
        let err = stress_energy_tensor(&bad, Some(&metric), &mut ctx).unwrap_err();
        assert!(matches!(err, CoreError::DimensionMismatch(_)));

        let mut rows = vec![vec!["0".to_string(); 4]; 4];
        rows[1][1] = "q/r^4".into();
        let good = StressEnergySource::Explicit { components: rows };
        let t = stress_energy_tensor(&good, Some(&metric), &mut ctx).unwrap();
        assert_eq!(t.nonzero_count(), 1);
    }
}
