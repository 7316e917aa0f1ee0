//! The metric-to-curvature pipeline.
//!
//! Stages are strictly sequential: each consumes the complete output of the
//! one before it. All tensors are owned values; a stage never mutates its
//! input.

pub mod christoffel;
pub mod curvature;
pub mod efe;
pub mod embedding;
pub mod geodesic;
pub mod metric;
pub mod stress_energy;

use crate::core::simplify::{Simplifier, SimplifyOptions};
use crate::core::trace::TraceLog;

/// Per-request state threaded through the stages: the simplifier with its
/// budget, and the event log. Never shared across requests.
pub struct PipelineContext {
    pub simplifier: Simplifier,
    pub trace: TraceLog,
}

impl PipelineContext {
    pub fn new(options: SimplifyOptions) -> Self {
        PipelineContext { simplifier: Simplifier::new(options), trace: TraceLog::default() }
    }

    pub fn with_trace(options: SimplifyOptions, trace: TraceLog) -> Self {
        PipelineContext { simplifier: Simplifier::new(options), trace }
    }
}
