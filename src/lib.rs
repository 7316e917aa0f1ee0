//! gravlab — symbolic general-relativity pipeline: metric in, curvature
//! tensors, field-equation verdicts, geodesics, and embedding surfaces out.

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;

pub use crate::core::error::CoreError;
pub use crate::core::expr::Expr;
pub use crate::core::geometry::PipelineContext;
pub use crate::core::simplify::SimplifyOptions;
pub use crate::core::tensor::{CoordinateBasis, Tensor, DEFAULT_COORDS};
