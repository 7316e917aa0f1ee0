use std::fmt;

/// Typed, stage-qualified failures surfaced by the tensor pipeline.
/// Every stage validates eagerly at its entry point; none of these are
/// ever downgraded to a default or zero result.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Invalid expression syntax, with source position.
    Parse {
        message: String,
        line: usize,
        column: usize,
    },
    /// Basis length and tensor shape disagree.
    DimensionMismatch(String),
    /// Metric determinant simplifies to symbolic zero.
    SingularMetric(String),
    /// Stage needs a metric that the caller did not supply.
    MissingMetric(String),
    /// Simplification budget expired before a canonical form was reached.
    SimplificationTimeout(String),
    /// Numeric evaluation hit a (near-)zero division or domain fault.
    /// Carries the affine parameter reached before the failure.
    SingularityEncountered { message: String, tau: f64 },
    /// g_rr < 1 somewhere in the requested range; no real embedding exists.
    EmbeddingUndefined { message: String, r: f64 },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Parse { message, line, column } => {
                write!(f, "Parse Error: {} at {}:{}", message, line, column)
            }
            CoreError::DimensionMismatch(msg) => write!(f, "Dimension Mismatch: {}", msg),
            CoreError::SingularMetric(msg) => write!(f, "Singular Metric: {}", msg),
            CoreError::MissingMetric(msg) => write!(f, "Missing Metric: {}", msg),
            CoreError::SimplificationTimeout(msg) => {
                write!(f, "Simplification Timeout: {}", msg)
            }
            CoreError::SingularityEncountered { message, tau } => {
                write!(f, "Singularity Encountered: {} (tau = {})", message, tau)
            }
            CoreError::EmbeddingUndefined { message, r } => {
                write!(f, "Embedding Undefined: {} (r = {})", message, r)
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl CoreError {
    pub fn parse(message: impl Into<String>, line: usize, column: usize) -> Self {
        CoreError::Parse { message: message.into(), line, column }
    }
    pub fn dimension_mismatch(message: impl Into<String>) -> Self {
        CoreError::DimensionMismatch(message.into())
    }
    pub fn singular_metric(message: impl Into<String>) -> Self {
        CoreError::SingularMetric(message.into())
    }
    pub fn missing_metric(message: impl Into<String>) -> Self {
        CoreError::MissingMetric(message.into())
    }
    pub fn simplification_timeout(message: impl Into<String>) -> Self {
        CoreError::SimplificationTimeout(message.into())
    }
    pub fn singularity(message: impl Into<String>, tau: f64) -> Self {
        CoreError::SingularityEncountered { message: message.into(), tau }
    }
    pub fn embedding_undefined(message: impl Into<String>, r: f64) -> Self {
        CoreError::EmbeddingUndefined { message: message.into(), r }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test] fn test_parse_error_display() {
        let err = CoreError::parse("unexpected token '@'", 1, 7);
        assert_eq!(format!("{}", err), "Parse Error: unexpected token '@' at 1:7");
    }
    #[test] fn test_singular_metric_display() {
        let err = CoreError::singular_metric("determinant is zero");
        assert_eq!(format!("{}", err), "Singular Metric: determinant is zero");
    }
    #[test] fn test_singularity_carries_tau() {
        let err = CoreError::singularity("division by zero in Gamma", 3.25);
        assert_eq!(
            format!("{}", err),
            "Singularity Encountered: division by zero in Gamma (tau = 3.25)"
        );
    }
    #[test] fn test_embedding_undefined_carries_r() {
        let err = CoreError::embedding_undefined("g_rr < 1", 1.5);
        assert_eq!(format!("{}", err), "Embedding Undefined: g_rr < 1 (r = 1.5)");
    }
}
