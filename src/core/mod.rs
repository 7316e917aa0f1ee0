//! Core module tree: the expression engine, the canonicalizing
//! simplifier, and the metric-to-curvature pipeline built on top of them.

pub mod error;
pub mod expr;
pub mod geometry;
pub mod lexer;
pub mod parser;
pub mod simplify;
pub mod tensor;
pub mod token;
pub mod trace;

pub use error::CoreError;
pub use expr::Expr;
pub use tensor::{CoordinateBasis, Tensor, DEFAULT_COORDS};
