//! Run outcome and stopping rules.
//!
//! # Termination
//!
//! A run stops for one of three kinds of reasons:
//!
//! - **Normal termination**: the gradient norm met the tolerance
//!   ([`TerminationReason::Converged`]) or a budget ran out
//!   ([`TerminationReason::MaxIterationsReached`],
//!   [`TerminationReason::MaxFunctionEvaluations`]).
//! - **Progress failure**: the value dropped below the unboundedness
//!   threshold, or the line search returned a step below the minimum step
//!   length ([`TerminationReason::Stalled`]).
//! - **Algorithmic failure**: the oracle, the direction strategy or the line
//!   search reported an error. The result then carries the error in
//!   [`OptimizationResult::failure`] together with the last accepted iterate.
//!
//! # Examples
//!
//! ```rust
//! use lineopt_core::optimizer::{StoppingCriterion, ToleranceMode};
//!
//! let criterion = StoppingCriterion::<f64>::new()
//!     .with_max_iterations(500)
//!     .with_gradient_tolerance(1e-6)
//!     .with_tolerance_mode(ToleranceMode::Relative);
//! assert!(criterion.validate().is_ok());
//! ```

use crate::{
    error::{OptimizerError, OptimizerResult},
    types::{DVector, Scalar},
};
use num_traits::Float;
use std::fmt;
use std::time::Duration;

/// Reason a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationReason {
    /// Gradient norm below the threshold
    Converged,
    /// Iteration budget exhausted without convergence
    MaxIterationsReached,
    /// Function evaluation budget exhausted
    MaxFunctionEvaluations,
    /// Objective value at or below the unboundedness threshold
    Unbounded,
    /// Accepted step at or below the minimum step length
    Stalled,
    /// A callback or cancellation flag requested termination
    CallbackRequest,
    /// The oracle failed or produced non-finite output
    OracleFailure,
    /// The direction was not a descent direction
    NonDescentDirection,
    /// The inexact line search exhausted its budget
    LineSearchNonConvergent,
    /// The Newton system had no positive definite solution
    SingularHessian,
    /// Exact line search met non-positive curvature
    NonQuadraticObjective,
    /// The run was rejected before the first oracle call
    InvalidInput,
}

impl TerminationReason {
    /// True for every status produced by an error.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::OracleFailure
                | Self::NonDescentDirection
                | Self::LineSearchNonConvergent
                | Self::SingularHessian
                | Self::NonQuadraticObjective
                | Self::InvalidInput
        )
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Converged => "converged",
            Self::MaxIterationsReached => "maximum iterations reached",
            Self::MaxFunctionEvaluations => "maximum function evaluations reached",
            Self::Unbounded => "objective unbounded below",
            Self::Stalled => "step too small",
            Self::CallbackRequest => "stopped by callback",
            Self::OracleFailure => "oracle failure",
            Self::NonDescentDirection => "non-descent direction",
            Self::LineSearchNonConvergent => "line search did not converge",
            Self::SingularHessian => "singular Hessian",
            Self::NonQuadraticObjective => "non-positive curvature in exact line search",
            Self::InvalidInput => "invalid input",
        };
        f.write_str(name)
    }
}

/// How the gradient tolerance is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ToleranceMode {
    /// Stop when ‖∇f(xₖ)‖ ≤ ε
    #[default]
    Absolute,
    /// Stop when ‖∇f(xₖ)‖ ≤ ε‖∇f(x₀)‖
    Relative,
}

/// Stopping rules for a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoppingCriterion<T: Scalar> {
    /// Maximum number of iterations
    pub max_iterations: usize,

    /// Maximum number of objective value evaluations, line-search trials included
    pub max_function_evaluations: Option<usize>,

    /// Tolerance ε on the gradient norm
    pub gradient_tolerance: T,

    /// Whether ε is absolute or relative to the first gradient norm
    pub tolerance_mode: ToleranceMode,

    /// Values at or below this are reported as unbounded
    pub unbounded_threshold: T,

    /// Accepted steps α‖d‖ at or below this stop the run as stalled
    pub min_step_size: T,
}

impl<T: Scalar> Default for StoppingCriterion<T> {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_function_evaluations: None,
            gradient_tolerance: T::DEFAULT_GRADIENT_TOLERANCE,
            tolerance_mode: ToleranceMode::Absolute,
            unbounded_threshold: <T as Float>::neg_infinity(),
            min_step_size: T::MIN_STEP_SIZE,
        }
    }
}

impl<T: Scalar> StoppingCriterion<T> {
    /// Creates a criterion with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the iteration budget.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Sets the function evaluation budget.
    pub fn with_max_function_evaluations(mut self, max_evals: usize) -> Self {
        self.max_function_evaluations = Some(max_evals);
        self
    }

    /// Sets the gradient norm tolerance.
    pub fn with_gradient_tolerance(mut self, tol: T) -> Self {
        self.gradient_tolerance = tol;
        self
    }

    /// Sets absolute or relative interpretation of the tolerance.
    pub fn with_tolerance_mode(mut self, mode: ToleranceMode) -> Self {
        self.tolerance_mode = mode;
        self
    }

    /// Sets the "finite minus infinity" threshold.
    pub fn with_unbounded_threshold(mut self, threshold: T) -> Self {
        self.unbounded_threshold = threshold;
        self
    }

    /// Sets the minimum step length.
    pub fn with_min_step_size(mut self, min_step: T) -> Self {
        self.min_step_size = min_step;
        self
    }

    /// Gradient norm threshold given the norm at the initial point.
    pub fn gradient_threshold(&self, initial_gradient_norm: T) -> T {
        match self.tolerance_mode {
            ToleranceMode::Absolute => self.gradient_tolerance,
            ToleranceMode::Relative => self.gradient_tolerance * initial_gradient_norm,
        }
    }

    /// Validates the criterion.
    pub fn validate(&self) -> OptimizerResult<()> {
        if self.gradient_tolerance <= T::zero() || !Float::is_finite(self.gradient_tolerance) {
            return Err(OptimizerError::invalid_configuration(
                "Gradient tolerance must be positive and finite",
                "gradient_tolerance",
                self.gradient_tolerance.to_string(),
            ));
        }
        if self.min_step_size < T::zero() {
            return Err(OptimizerError::invalid_configuration(
                "Minimum step size must be non-negative",
                "min_step_size",
                self.min_step_size.to_string(),
            ));
        }
        if Float::is_nan(self.unbounded_threshold) {
            return Err(OptimizerError::invalid_configuration(
                "Unboundedness threshold must not be NaN",
                "unbounded_threshold",
                "NaN",
            ));
        }
        Ok(())
    }
}

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct OptimizationResult<T: Scalar> {
    /// Last accepted iterate
    pub point: DVector<T>,

    /// f at `point`
    pub value: T,

    /// ‖∇f‖ at `point`
    pub gradient_norm: T,

    /// Lowest-valued iterate seen (differs from `point` for non-monotone methods)
    pub best_point: DVector<T>,

    /// f at `best_point`
    pub best_value: T,

    /// Number of completed iterations
    pub iterations: usize,

    /// Objective value evaluations
    pub function_evaluations: usize,

    /// Gradient evaluations
    pub gradient_evaluations: usize,

    /// Hessian or Hessian-vector product evaluations
    pub hessian_evaluations: usize,

    /// Wall-clock time of the run
    pub duration: Duration,

    /// Why the run stopped
    pub termination_reason: TerminationReason,

    /// True iff `termination_reason` is `Converged`
    pub converged: bool,

    /// The error behind a failure status
    pub failure: Option<OptimizerError>,
}

impl<T: Scalar> OptimizationResult<T> {
    /// Creates a result; best point and value default to the final ones.
    pub fn new(
        point: DVector<T>,
        value: T,
        iterations: usize,
        duration: Duration,
        termination_reason: TerminationReason,
    ) -> Self {
        Self {
            best_point: point.clone(),
            best_value: value,
            point,
            value,
            gradient_norm: <T as Float>::nan(),
            iterations,
            function_evaluations: 0,
            gradient_evaluations: 0,
            hessian_evaluations: 0,
            duration,
            converged: termination_reason == TerminationReason::Converged,
            termination_reason,
            failure: None,
        }
    }

    /// Sets the gradient norm at the final point.
    pub fn with_gradient_norm(mut self, norm: T) -> Self {
        self.gradient_norm = norm;
        self
    }

    /// Sets the best point seen.
    pub fn with_best(mut self, point: DVector<T>, value: T) -> Self {
        self.best_point = point;
        self.best_value = value;
        self
    }

    /// Sets the (value, gradient, Hessian) evaluation counts.
    pub fn with_evaluations(mut self, counts: (usize, usize, usize)) -> Self {
        self.function_evaluations = counts.0;
        self.gradient_evaluations = counts.1;
        self.hessian_evaluations = counts.2;
        self
    }

    /// Attaches the error that ended the run.
    pub fn with_failure(mut self, error: OptimizerError) -> Self {
        self.termination_reason = error.termination_reason();
        self.converged = false;
        self.failure = Some(error);
        self
    }

    /// (final point, status, iteration count).
    pub fn into_parts(self) -> (DVector<T>, TerminationReason, usize) {
        (self.point, self.termination_reason, self.iterations)
    }

    /// Converts a failed run into its error.
    pub fn into_result(self) -> OptimizerResult<Self> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}
