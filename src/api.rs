// src/api.rs
//! Wire-level request/response shapes and the dispatch functions that run
//! the pipeline stages behind them. Everything here is plain serde data;
//! the same structs deserialize from JSON requests and from TOML scenario
//! files handed to the CLI.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::error::CoreError;
use crate::core::expr::Expr;
use crate::core::geometry::christoffel::christoffel_symbols;
use crate::core::geometry::curvature::{einstein_tensor, ricci_scalar, ricci_tensor, riemann_tensor};
use crate::core::geometry::efe::{verify_field_equations, Verdict};
use crate::core::geometry::embedding::{embedding_surface, EmbeddingRequest};
use crate::core::geometry::geodesic::{self, integrate_geodesic, IntegrationStatus};
use crate::core::geometry::metric::Metric;
use crate::core::geometry::stress_energy::{stress_energy_tensor, StressEnergySource};
use crate::core::geometry::PipelineContext;
use crate::core::tensor::{Tensor, DEFAULT_COORDS};

/* ── Shared input shapes ─────────────────────────────────── */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricInput {
    /// Defaults to ["t", "r", "theta", "phi"] when omitted.
    #[serde(default)]
    pub coordinate_names: Option<Vec<String>>,
    pub components: Vec<Vec<String>>,
}

impl MetricInput {
    pub fn coordinates(&self) -> Vec<String> {
        self.coordinate_names
            .clone()
            .unwrap_or_else(|| DEFAULT_COORDS.iter().map(|s| s.to_string()).collect())
    }

    pub fn build(&self, ctx: &mut PipelineContext) -> Result<Metric, CoreError> {
        Metric::parse(&self.coordinates(), &self.components, ctx)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressEnergyInput {
    /// "vacuum" | "dust" | "perfect_fluid" | "explicit", or "preset" with
    /// the preset named separately.
    pub definition_method: String,
    #[serde(default)]
    pub preset_name: Option<String>,
    #[serde(default)]
    pub density_symbol: Option<String>,
    #[serde(default)]
    pub pressure_symbol: Option<String>,
    #[serde(default)]
    pub components: Option<Vec<Vec<String>>>,
}

impl StressEnergyInput {
    pub fn vacuum() -> Self {
        StressEnergyInput {
            definition_method: "vacuum".into(),
            preset_name: None,
            density_symbol: None,
            pressure_symbol: None,
            components: None,
        }
    }

    fn source(&self) -> Result<StressEnergySource, CoreError> {
        let method = match self.definition_method.as_str() {
            "preset" => self.preset_name.as_deref().unwrap_or("vacuum"),
            other => other,
        };
        let density = self.density_symbol.clone().unwrap_or_else(|| "rho".into());
        match method {
            "vacuum" => Ok(StressEnergySource::Vacuum),
            "dust" => Ok(StressEnergySource::Dust { density }),
            "perfect_fluid" => Ok(StressEnergySource::PerfectFluid {
                density,
                pressure: self.pressure_symbol.clone().unwrap_or_else(|| "p".into()),
            }),
            "explicit" => {
                let components = self.components.clone().ok_or_else(|| {
                    CoreError::dimension_mismatch(
                        "explicit stress-energy needs a component grid",
                    )
                })?;
                Ok(StressEnergySource::Explicit { components })
            }
            other => Err(CoreError::dimension_mismatch(format!(
                "unknown stress-energy definition '{}'",
                other
            ))),
        }
    }
}

/* ── Tensor serialization ────────────────────────────────── */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentValue {
    pub expression: String,
    pub latex: String,
}

impl ComponentValue {
    fn from_expr(expr: &Expr) -> Self {
        ComponentValue { expression: format!("{}", expr), latex: expr.to_latex() }
    }
}

/// Nonzero components only, keyed "ab" / "a_bc" / "a_bcd" by rank.
pub type TensorMap = BTreeMap<String, ComponentValue>;

fn tensor_map(tensor: &Tensor, parameters: &HashMap<String, f64>) -> TensorMap {
    tensor
        .iter_nonzero()
        .filter_map(|(idx, expr)| {
            let rendered = if parameters.is_empty() {
                expr.clone()
            } else {
                expr.substitute_values(parameters)
            };
            // substitution can collapse a component (M = 0 and friends)
            if rendered.is_zero() {
                return None;
            }
            Some((tensor.index_key(&idx), ComponentValue::from_expr(&rendered)))
        })
        .collect()
}

/* ── Geometry ────────────────────────────────────────────── */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryRequest {
    #[serde(flatten)]
    pub metric: MetricInput,
    #[serde(default)]
    pub parameter_values: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryResponse {
    pub coordinates: Vec<String>,
    pub metric: TensorMap,
    pub inverse_metric: TensorMap,
    pub christoffel: TensorMap,
    pub riemann: TensorMap,
    pub ricci_tensor: TensorMap,
    pub ricci_scalar: ComponentValue,
    pub einstein_tensor: TensorMap,
}

pub fn compute_geometry(
    request: &GeometryRequest,
    ctx: &mut PipelineContext,
) -> Result<GeometryResponse, CoreError> {
    let metric = request.metric.build(ctx)?;
    let gamma = christoffel_symbols(&metric, ctx)?;
    let riemann = riemann_tensor(&metric, &gamma, ctx)?;
    let ricci = ricci_tensor(&riemann, ctx)?;
    let scalar = ricci_scalar(&metric, &ricci, ctx)?;
    let einstein = einstein_tensor(&metric, &ricci, &scalar, ctx)?;

    let params = &request.parameter_values;
    let scalar_rendered = if params.is_empty() {
        scalar.clone()
    } else {
        scalar.substitute_values(params)
    };
    Ok(GeometryResponse {
        coordinates: metric.basis().names().to_vec(),
        metric: tensor_map(metric.g(), params),
        inverse_metric: tensor_map(metric.inverse(), params),
        christoffel: tensor_map(&gamma, params),
        riemann: tensor_map(&riemann, params),
        ricci_tensor: tensor_map(&ricci, params),
        ricci_scalar: ComponentValue::from_expr(&scalar_rendered),
        einstein_tensor: tensor_map(&einstein, params),
    })
}

/* ── Stress-energy ───────────────────────────────────────── */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressEnergyRequest {
    #[serde(flatten)]
    pub definition: StressEnergyInput,
    /// Needed by the perfect-fluid preset and for shape checks.
    #[serde(default)]
    pub metric_input: Option<MetricInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressEnergyResponse {
    pub stress_energy: TensorMap,
}

pub fn build_stress_energy(
    request: &StressEnergyRequest,
    ctx: &mut PipelineContext,
) -> Result<StressEnergyResponse, CoreError> {
    let metric = match &request.metric_input {
        Some(input) => Some(input.build(ctx)?),
        None => None,
    };
    let source = request.definition.source()?;
    let tensor = stress_energy_tensor(&source, metric.as_ref(), ctx)?;
    Ok(StressEnergyResponse { stress_energy: tensor_map(&tensor, &HashMap::new()) })
}

/* ── Field-equation verification ─────────────────────────── */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfeRequest {
    pub metric_input: MetricInput,
    pub stress_energy_input: StressEnergyInput,
    /// Coupling constant; defaults to 1.
    #[serde(default)]
    pub kappa: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfeResponse {
    pub verified: bool,
    pub message: String,
    /// Nonzero residual components; present unless verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residual: Option<TensorMap>,
}

pub fn verify_efe(request: &EfeRequest, ctx: &mut PipelineContext) -> Result<EfeResponse, CoreError> {
    let metric = request.metric_input.build(ctx)?;
    let gamma = christoffel_symbols(&metric, ctx)?;
    let riemann = riemann_tensor(&metric, &gamma, ctx)?;
    let ricci = ricci_tensor(&riemann, ctx)?;
    let scalar = ricci_scalar(&metric, &ricci, ctx)?;
    let einstein = einstein_tensor(&metric, &ricci, &scalar, ctx)?;

    let source = request.stress_energy_input.source()?;
    let stress = stress_energy_tensor(&source, Some(&metric), ctx)?;
    let report = verify_field_equations(&metric, &einstein, &stress, request.kappa, ctx)?;
    let verified = report.verdict == Verdict::Verified;
    Ok(EfeResponse {
        verified,
        message: report.message,
        residual: if verified {
            None
        } else {
            Some(tensor_map(&report.residual, &HashMap::new()))
        },
    })
}

/* ── Geodesics ───────────────────────────────────────────── */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeodesicRequest {
    #[serde(flatten)]
    pub metric: MetricInput,
    pub initial_position: Vec<f64>,
    pub initial_velocity: Vec<f64>,
    pub t_span: [f64; 2],
    pub num_points: usize,
    #[serde(default)]
    pub parameter_values: HashMap<String, f64>,
    #[serde(default)]
    pub rtol: Option<f64>,
    #[serde(default)]
    pub atol: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeodesicResponse {
    pub tau_values: Vec<f64>,
    pub position_coords: BTreeMap<String, Vec<f64>>,
    pub velocity_coords: BTreeMap<String, Vec<f64>>,
    /// "complete" or "singularity".
    pub status: String,
}

pub fn run_geodesic(
    request: &GeodesicRequest,
    ctx: &mut PipelineContext,
) -> Result<GeodesicResponse, CoreError> {
    let metric = request.metric.build(ctx)?;
    let gamma = christoffel_symbols(&metric, ctx)?;
    let core_request = geodesic::GeodesicRequest {
        initial_position: request.initial_position.clone(),
        initial_velocity: request.initial_velocity.clone(),
        tau_start: request.t_span[0],
        tau_end: request.t_span[1],
        samples: request.num_points,
        parameters: request.parameter_values.clone(),
        rtol: request.rtol.unwrap_or(geodesic::GeodesicRequest::DEFAULT_RTOL),
        atol: request.atol.unwrap_or(geodesic::GeodesicRequest::DEFAULT_ATOL),
    };
    let trajectory = integrate_geodesic(&metric, &gamma, &core_request, ctx)?;

    let mut position_coords = BTreeMap::new();
    let mut velocity_coords = BTreeMap::new();
    for (i, name) in metric.basis().names().iter().enumerate() {
        position_coords.insert(
            name.clone(),
            trajectory.positions.iter().map(|row| row[i]).collect(),
        );
        velocity_coords.insert(
            name.clone(),
            trajectory.velocities.iter().map(|row| row[i]).collect(),
        );
    }
    Ok(GeodesicResponse {
        tau_values: trajectory.tau_values,
        position_coords,
        velocity_coords,
        status: match trajectory.status {
            IntegrationStatus::Complete => "complete".into(),
            IntegrationStatus::Singularity { .. } => "singularity".into(),
        },
    })
}

/* ── Embedding ───────────────────────────────────────────── */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingApiRequest {
    pub metric_input: MetricInput,
    #[serde(default)]
    pub parameter_values: HashMap<String, f64>,
    #[serde(default)]
    pub r_min: Option<f64>,
    pub r_max: f64,
    pub num_points_r: usize,
    #[serde(default = "default_phi_points")]
    pub num_points_phi: usize,
}

fn default_phi_points() -> usize {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub r_values: Vec<f64>,
    pub z_values: Vec<f64>,
    pub x_surface: Vec<Vec<f64>>,
    pub y_surface: Vec<Vec<f64>>,
    pub z_surface: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_function_latex: Option<String>,
    pub message: String,
}

pub fn build_embedding(
    request: &EmbeddingApiRequest,
    ctx: &mut PipelineContext,
) -> Result<EmbeddingResponse, CoreError> {
    let metric = request.metric_input.build(ctx)?;
    let core_request = EmbeddingRequest {
        r_min: request.r_min,
        r_max: request.r_max,
        samples: request.num_points_r,
        parameters: request.parameter_values.clone(),
    };
    let surface = embedding_surface(&metric, &core_request, ctx)?;
    let (x_surface, y_surface, z_surface) = surface.revolve(request.num_points_phi);
    let message = match &surface.z_function_latex {
        Some(_) => "embedding profile integrated in closed form".to_string(),
        None => "embedding profile integrated numerically".to_string(),
    };
    Ok(EmbeddingResponse {
        r_values: surface.r_values,
        z_values: surface.z_values,
        x_surface,
        y_surface,
        z_surface,
        z_function_latex: surface.z_function_latex,
        message,
    })
}

/* ── CLI scenario files ──────────────────────────────────── */

/// One TOML file describing a spacetime and the operations to drive
/// against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub metric: MetricInput,
    #[serde(default)]
    pub parameters: HashMap<String, f64>,
    #[serde(default)]
    pub stress_energy: Option<StressEnergyInput>,
    #[serde(default)]
    pub kappa: Option<f64>,
    #[serde(default)]
    pub geodesic: Option<GeodesicSection>,
    #[serde(default)]
    pub embedding: Option<EmbeddingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeodesicSection {
    pub initial_position: Vec<f64>,
    pub initial_velocity: Vec<f64>,
    pub t_span: [f64; 2],
    pub num_points: usize,
    #[serde(default)]
    pub rtol: Option<f64>,
    #[serde(default)]
    pub atol: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSection {
    #[serde(default)]
    pub r_min: Option<f64>,
    pub r_max: f64,
    pub num_points_r: usize,
    #[serde(default = "default_phi_points")]
    pub num_points_phi: usize,
}

impl Scenario {
    pub fn geometry_request(&self) -> GeometryRequest {
        GeometryRequest {
            metric: self.metric.clone(),
            parameter_values: self.parameters.clone(),
        }
    }

    pub fn efe_request(&self) -> EfeRequest {
        EfeRequest {
            metric_input: self.metric.clone(),
            stress_energy_input: self
                .stress_energy
                .clone()
                .unwrap_or_else(StressEnergyInput::vacuum),
            kappa: self.kappa,
        }
    }

    pub fn stress_energy_request(&self) -> Result<StressEnergyRequest, CoreError> {
        let definition = self.stress_energy.clone().ok_or_else(|| {
            CoreError::dimension_mismatch("scenario has no [stress_energy] section")
        })?;
        Ok(StressEnergyRequest { definition, metric_input: Some(self.metric.clone()) })
    }

    pub fn geodesic_request(&self) -> Result<GeodesicRequest, CoreError> {
        let section = self.geodesic.clone().ok_or_else(|| {
            CoreError::dimension_mismatch("scenario has no [geodesic] section")
        })?;
        Ok(GeodesicRequest {
            metric: self.metric.clone(),
            initial_position: section.initial_position,
            initial_velocity: section.initial_velocity,
            t_span: section.t_span,
            num_points: section.num_points,
            parameter_values: self.parameters.clone(),
            rtol: section.rtol,
            atol: section.atol,
        })
    }

    pub fn embedding_request(&self) -> Result<EmbeddingApiRequest, CoreError> {
        let section = self.embedding.clone().ok_or_else(|| {
            CoreError::dimension_mismatch("scenario has no [embedding] section")
        })?;
        Ok(EmbeddingApiRequest {
            metric_input: self.metric.clone(),
            parameter_values: self.parameters.clone(),
            r_min: section.r_min,
            r_max: section.r_max,
            num_points_r: section.num_points_r,
            num_points_phi: section.num_points_phi,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simplify::SimplifyOptions;

    fn ctx() -> PipelineContext {
        PipelineContext::new(SimplifyOptions::enabled())
    }

    #[test]
    fn minkowski_geometry_response_is_nearly_empty() {
        let mut ctx = ctx();
        let request = GeometryRequest {
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
        };
        let response = compute_geometry(&request, &mut ctx).unwrap();
        assert_eq!(response.metric.len(), 4);
        assert!(response.christoffel.is_empty());
        assert!(response.riemann.is_empty());
        assert!(response.einstein_tensor.is_empty());
        assert_eq!(response.ricci_scalar.expression, "0");
    }

    #[test]
    fn substituted_zero_components_drop_out_of_the_map() {
        // Schwarzschild with M = 0 is flat: mass-bearing connection terms
        // fold to zero under substitution and must not serialize as "0"
        let mut ctx = ctx();
        let mut params = HashMap::new();
        params.insert("M".to_string(), 0.0);
        let request = GeometryRequest {
            metric: MetricInput {
                coordinate_names: Some(vec!["t".into(), "r".into(), "theta".into(), "phi".into()]),
                components: vec![
                    vec!["-(1 - 2*M/r)".into(), "0".into(), "0".into(), "0".into()],
                    vec!["0".into(), "1/(1 - 2*M/r)".into(), "0".into(), "0".into()],
                    vec!["0".into(), "0".into(), "r^2".into(), "0".into()],
                    vec!["0".into(), "0".into(), "0".into(), "r^2*sin(theta)^2".into()],
                ],
            },
            parameter_values: params,
        };
        let response = compute_geometry(&request, &mut ctx).unwrap();
        // Gamma^r_tt = M (r - 2M) / r^3 vanishes at M = 0
        assert!(!response.christoffel.contains_key("1_00"));
        // the purely angular terms survive
        assert!(response.christoffel.contains_key("1_22"));
        assert!(response
            .christoffel
            .values()
            .all(|value| value.expression != "0"));
    }

    #[test]
    fn default_coordinates_fill_in() {
        let input = MetricInput { coordinate_names: None, components: vec![] };
        assert_eq!(input.coordinates(), vec!["t", "r", "theta", "phi"]);
    }

    #[test]
    fn scenario_toml_round_trip() {
        let text = r#"
            [metric]
            coordinate_names = ["t", "r", "theta", "phi"]
            components = [
                ["-(1 - 2*M/r)", "0", "0", "0"],
                ["0", "1/(1 - 2*M/r)", "0", "0"],
                ["0", "0", "r^2", "0"],
                ["0", "0", "0", "r^2*sin(theta)^2"],
            ]

            [parameters]
            M = 1.0

            [stress_energy]
            definition_method = "vacuum"

            [embedding]
            r_max = 10.0
            num_points_r = 40
        "#;
        let scenario: Scenario = toml::from_str(text).unwrap();
        assert_eq!(scenario.parameters["M"], 1.0);
        let embedding = scenario.embedding_request().unwrap();
        assert_eq!(embedding.num_points_phi, 60);
        assert!(scenario.geodesic_request().is_err());
    }

    #[test]
    fn stress_energy_preset_spelling_variants() {
        let direct = StressEnergyInput {
            definition_method: "dust".into(),
            preset_name: None,
            density_symbol: None,
            pressure_symbol: None,
            components: None,
        };
        let via_preset = StressEnergyInput {
            definition_method: "preset".into(),
            preset_name: Some("dust".into()),
            density_symbol: None,
            pressure_symbol: None,
            components: None,
        };
        assert!(matches!(direct.source().unwrap(), StressEnergySource::Dust { .. }));
        assert!(matches!(via_preset.source().unwrap(), StressEnergySource::Dust { .. }));
    }

    #[test]
    fn geodesic_response_keys_by_coordinate() {
        let mut ctx = ctx();
        let request = GeodesicRequest {
            metric: MetricInput {
                coordinate_names: Some(vec!["t".into(), "x".into()]),
                components: vec![
                    vec!["-1".into(), "0".into()],
                    vec!["0".into(), "1".into()],
                ],
            },
            initial_position: vec![0.0, 0.0],
            initial_velocity: vec![1.0, 0.25],
            t_span: [0.0, 2.0],
            num_points: 9,
            parameter_values: HashMap::new(),
            rtol: None,
            atol: None,
        };
        let response = run_geodesic(&request, &mut ctx).unwrap();
        assert_eq!(response.status, "complete");
        assert_eq!(response.tau_values.len(), 9);
        let x = &response.position_coords["x"];
        assert!((x.last().unwrap() - 0.5).abs() < 1e-9);
    }
}
