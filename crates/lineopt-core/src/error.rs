//! Error types for objective evaluation and optimization.
//!
//! Two layers are distinguished: [`OracleError`] describes what can go wrong
//! when the objective is queried, while [`OptimizerError`] covers everything
//! the line searches, direction strategies and the driver can report.

use crate::optimizer::TerminationReason;
use thiserror::Error;

/// Errors raised by an objective oracle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    /// The oracle does not provide the requested information.
    ///
    /// Returned by the default trait methods for gradient, Hessian and
    /// Hessian-vector products.
    #[error("Oracle capability unavailable: {capability}")]
    Unavailable {
        /// Name of the missing capability
        capability: String,
    },

    /// The caller-supplied objective failed to evaluate.
    #[error("Objective evaluation failed: {reason}")]
    Evaluation {
        /// Description of the failure
        reason: String,
    },

    /// The objective produced NaN or infinite output.
    #[error("Objective produced a non-finite {quantity}")]
    NonFinite {
        /// Which quantity was non-finite (value, gradient, ...)
        quantity: String,
    },

    /// Input point has the wrong length.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },
}

impl OracleError {
    /// Create an Unavailable error for a capability.
    pub fn unavailable<S: Into<String>>(capability: S) -> Self {
        Self::Unavailable {
            capability: capability.into(),
        }
    }

    /// Create an Evaluation error with a custom reason.
    pub fn evaluation<S: Into<String>>(reason: S) -> Self {
        Self::Evaluation {
            reason: reason.into(),
        }
    }

    /// Create a NonFinite error.
    pub fn non_finite<S: Into<String>>(quantity: S) -> Self {
        Self::NonFinite {
            quantity: quantity.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }
}

/// Errors that can occur during optimization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizerError {
    /// The initial point does not match the oracle dimension.
    ///
    /// Detected before any oracle call.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension expected by the oracle
        expected: usize,
        /// Dimension of the supplied point
        actual: usize,
    },

    /// Propagated oracle error.
    #[error("Oracle evaluation failed: {0}")]
    OracleFailure(#[from] OracleError),

    /// The search direction is not a descent direction.
    ///
    /// This error occurs when ⟨∇f(x), d⟩ ≥ 0 at a non-stationary point.
    #[error("Not a descent direction: directional derivative {directional_derivative} >= 0")]
    NonDescentDirection {
        /// Value of ⟨∇f(x), d⟩
        directional_derivative: f64,
    },

    /// Inexact line search exhausted its budget.
    #[error("Line search did not converge: {reason}")]
    LineSearchNonConvergent {
        /// Description of why the line search failed
        reason: String,
        /// Number of trial steps attempted
        iterations: usize,
        /// Last step size tried
        last_step_size: f64,
    },

    /// The Newton system could not be solved.
    #[error("Singular Hessian: {reason}")]
    SingularHessian {
        /// Description of the factorization or curvature failure
        reason: String,
    },

    /// Exact line search found non-positive curvature along the direction.
    #[error("Objective is not a convex quadratic along the direction: curvature {curvature}")]
    NonQuadraticObjective {
        /// Value of dᵀ∇²f d
        curvature: f64,
    },

    /// The oracle cannot supply the derivatives a strategy needs.
    #[error("Strategy '{strategy}' requires {required} information from the oracle")]
    MissingDerivative {
        /// Strategy name
        strategy: String,
        /// Missing information ("gradient", "Hessian")
        required: String,
    },

    /// Invalid optimizer configuration.
    #[error("Invalid optimizer configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },
}

impl OptimizerError {
    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create a NonDescentDirection error.
    pub fn non_descent(directional_derivative: f64) -> Self {
        Self::NonDescentDirection {
            directional_derivative,
        }
    }

    /// Create a LineSearchNonConvergent error with detailed context.
    pub fn line_search_failed<S: Into<String>>(
        reason: S,
        iterations: usize,
        last_step_size: f64,
    ) -> Self {
        Self::LineSearchNonConvergent {
            reason: reason.into(),
            iterations,
            last_step_size,
        }
    }

    /// Create a SingularHessian error.
    pub fn singular_hessian<S: Into<String>>(reason: S) -> Self {
        Self::SingularHessian {
            reason: reason.into(),
        }
    }

    /// Create a NonQuadraticObjective error.
    pub fn non_quadratic(curvature: f64) -> Self {
        Self::NonQuadraticObjective { curvature }
    }

    /// Create a MissingDerivative error.
    pub fn missing_derivative<S1, S2>(strategy: S1, required: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::MissingDerivative {
            strategy: strategy.into(),
            required: required.into(),
        }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Status reported by the driver when a run ends with this error.
    ///
    /// Errors detected before the first oracle call map to
    /// [`TerminationReason::InvalidInput`].
    pub fn termination_reason(&self) -> TerminationReason {
        match self {
            Self::OracleFailure(_) => TerminationReason::OracleFailure,
            Self::NonDescentDirection { .. } => TerminationReason::NonDescentDirection,
            Self::LineSearchNonConvergent { .. } => TerminationReason::LineSearchNonConvergent,
            Self::SingularHessian { .. } => TerminationReason::SingularHessian,
            Self::NonQuadraticObjective { .. } => TerminationReason::NonQuadraticObjective,
            Self::DimensionMismatch { .. }
            | Self::MissingDerivative { .. }
            | Self::InvalidConfiguration { .. } => TerminationReason::InvalidInput,
        }
    }
}

/// Result type alias for oracle queries.
pub type OracleResult<T> = std::result::Result<T, OracleError>;

/// Result type alias for optimizer operations.
pub type OptimizerResult<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_oracle_error_creation() {
        let err = OracleError::unavailable("hessian");
        assert!(matches!(err, OracleError::Unavailable { .. }));
        assert_eq!(err.to_string(), "Oracle capability unavailable: hessian");

        let err = OracleError::dimension_mismatch(3, 4);
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 4");

        let err = OracleError::non_finite("gradient");
        assert_eq!(err.to_string(), "Objective produced a non-finite gradient");
    }

    #[test]
    fn test_optimizer_error_context() {
        let err = OptimizerError::line_search_failed("bracket expansion exhausted", 25, 1e-8);

        if let OptimizerError::LineSearchNonConvergent {
            reason,
            iterations,
            last_step_size,
        } = err
        {
            assert_eq!(reason, "bracket expansion exhausted");
            assert_eq!(iterations, 25);
            assert_eq!(last_step_size, 1e-8);
        } else {
            panic!("Expected LineSearchNonConvergent variant");
        }
    }

    #[test]
    fn test_oracle_error_propagation() {
        let optimizer_err: OptimizerError = OracleError::evaluation("log of negative").into();

        assert!(matches!(optimizer_err, OptimizerError::OracleFailure(_)));
        assert!(optimizer_err.to_string().contains("Oracle evaluation failed"));
        assert!(optimizer_err.to_string().contains("log of negative"));
    }

    #[test]
    fn test_termination_reason_mapping() {
        let cases = vec![
            (
                OptimizerError::from(OracleError::evaluation("boom")),
                TerminationReason::OracleFailure,
            ),
            (
                OptimizerError::non_descent(0.5),
                TerminationReason::NonDescentDirection,
            ),
            (
                OptimizerError::line_search_failed("x", 1, 0.0),
                TerminationReason::LineSearchNonConvergent,
            ),
            (
                OptimizerError::singular_hessian("not positive definite"),
                TerminationReason::SingularHessian,
            ),
            (
                OptimizerError::non_quadratic(-1.0),
                TerminationReason::NonQuadraticObjective,
            ),
            (
                OptimizerError::missing_derivative("Newton", "Hessian"),
                TerminationReason::InvalidInput,
            ),
        ];

        for (err, reason) in cases {
            assert_eq!(err.termination_reason(), reason);
        }
    }

    #[test]
    fn test_optimizer_error_display() {
        let errors = vec![
            OptimizerError::dimension_mismatch(2, 3),
            OptimizerError::non_descent(1.0),
            OptimizerError::singular_hessian("pivot 1 non-positive"),
            OptimizerError::non_quadratic(0.0),
            OptimizerError::missing_derivative("BFGS", "gradient"),
            OptimizerError::invalid_configuration("must be in (0, 1)", "c1", "1.5"),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
