//! Line search strategies.
//!
//! Given the current iterate x, a search direction d and the oracle, a line
//! search picks a step α ≥ 0 for the update x + α d.
//!
//! # Mathematical Foundation
//!
//! All strategies work on the restriction φ(α) = f(x + α d), whose slope at
//! the origin is the directional derivative φ'(0) = ⟨∇f(x), d⟩.
//!
//! ### Armijo Condition (Sufficient Decrease)
//! φ(α) ≤ φ(0) + c₁ α φ'(0), with 0 < c₁ < 1.
//!
//! ### Wolfe Conditions
//!
//! **Weak Wolfe** adds the curvature condition φ'(α) ≥ c₂ φ'(0).
//!
//! **Strong Wolfe** replaces it by |φ'(α)| ≤ c₂ |φ'(0)|, with 0 < c₁ < c₂ < 1.
//!
//! # Variants
//!
//! | Strategy            | Exact | Conditions            | Needs            |
//! |---------------------|-------|-----------------------|------------------|
//! | [`ExactQuadratic`]  | yes   | global line minimizer | Hessian·d        |
//! | [`Armijo`]          | no    | sufficient decrease   | values           |
//! | [`ArmijoWolfe`]     | no    | Armijo + curvature    | values, gradients|
//! | [`ScheduledStep`]   | no    | none (schedule)       | values           |
//!
//! No strategy ever returns a negative step.

mod armijo;
mod exact;
mod scheduled;
mod wolfe;

pub use armijo::Armijo;
pub use exact::ExactQuadratic;
pub use scheduled::ScheduledStep;
pub use wolfe::ArmijoWolfe;

use crate::{
    error::{OptimizerError, OptimizerResult},
    objective::{DerivativeOrder, Objective},
    types::{DVector, Scalar},
};
use std::fmt::Debug;

/// Which curvature condition the Armijo–Wolfe search enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CurvatureCondition {
    /// φ'(α) ≥ c₂ φ'(0)
    #[default]
    Weak,
    /// |φ'(α)| ≤ c₂ |φ'(0)|
    Strong,
}

/// Tuning parameters shared by the inexact line searches.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSearchParams<T: Scalar> {
    /// Initial step size α₀ for line search start
    pub initial_step_size: T,

    /// Maximum allowable step size
    pub max_step_size: T,

    /// Minimum step size; zoom intervals narrower than this stop shrinking
    pub min_step_size: T,

    /// Armijo parameter c₁ ∈ (0,1)
    pub c1: T,

    /// Wolfe parameter c₂ ∈ (c₁,1)
    pub c2: T,

    /// Backtracking reduction factor ρ ∈ (0,1)
    pub rho: T,

    /// Bracket growth factor (> 1) while the curvature condition fails
    pub expansion_factor: T,

    /// Fraction of the bracket kept clear of interpolated trial steps
    pub safeguard: T,

    /// Backtracks (Armijo) or bracket expansions (Wolfe) allowed
    pub max_iterations: usize,

    /// Zoom iterations allowed once a bracket is found
    pub max_zoom_iterations: usize,

    /// Weak or strong Wolfe curvature condition
    pub curvature: CurvatureCondition,

    /// Use safeguarded quadratic interpolation instead of plain ρ-backtracking
    pub interpolate: bool,
}

impl<T: Scalar> Default for LineSearchParams<T> {
    fn default() -> Self {
        Self {
            initial_step_size: T::one(),
            max_step_size: T::MAX_STEP_SIZE,
            min_step_size: T::MIN_STEP_SIZE,
            c1: <T as Scalar>::from_f64(1e-4),
            c2: <T as Scalar>::from_f64(0.9),
            rho: <T as Scalar>::from_f64(0.5),
            expansion_factor: <T as Scalar>::from_f64(2.0),
            safeguard: <T as Scalar>::from_f64(0.01),
            max_iterations: 50,
            max_zoom_iterations: 50,
            curvature: CurvatureCondition::Weak,
            interpolate: false,
        }
    }
}

impl<T: Scalar> LineSearchParams<T> {
    /// Creates default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain halving backtracking.
    pub fn backtracking() -> Self {
        Self::default()
    }

    /// Weak Wolfe conditions with c₁ = 10⁻⁴, c₂ = 0.9.
    pub fn weak_wolfe() -> Self {
        Self::default()
    }

    /// Strong Wolfe conditions with c₁ = 10⁻⁴, c₂ = 0.9.
    pub fn strong_wolfe() -> Self {
        Self {
            curvature: CurvatureCondition::Strong,
            ..Self::default()
        }
    }

    /// Sets the initial trial step.
    pub fn with_initial_step_size(mut self, step: T) -> Self {
        self.initial_step_size = step;
        self
    }

    /// Sets the maximum step.
    pub fn with_max_step_size(mut self, step: T) -> Self {
        self.max_step_size = step;
        self
    }

    /// Sets the Armijo constant.
    pub fn with_c1(mut self, c1: T) -> Self {
        self.c1 = c1;
        self
    }

    /// Sets the curvature constant.
    pub fn with_c2(mut self, c2: T) -> Self {
        self.c2 = c2;
        self
    }

    /// Sets the backtracking factor.
    pub fn with_rho(mut self, rho: T) -> Self {
        self.rho = rho;
        self
    }

    /// Sets the backtrack / bracket expansion budget.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Sets the zoom budget.
    pub fn with_max_zoom_iterations(mut self, max_iter: usize) -> Self {
        self.max_zoom_iterations = max_iter;
        self
    }

    /// Sets the curvature condition.
    pub fn with_curvature(mut self, curvature: CurvatureCondition) -> Self {
        self.curvature = curvature;
        self
    }

    /// Enables interpolated backtracking.
    pub fn with_interpolation(mut self, interpolate: bool) -> Self {
        self.interpolate = interpolate;
        self
    }

    /// Validates the parameters shared by every search.
    ///
    /// `c2` and the zoom budget are only read by [`ArmijoWolfe`] and are
    /// checked by [`LineSearchParams::validate_wolfe`].
    pub fn validate(&self) -> OptimizerResult<()> {
        let invalid = |reason: &str, parameter: &str, value: String| {
            Err(OptimizerError::invalid_configuration(reason, parameter, value))
        };

        if self.initial_step_size <= T::zero() {
            return invalid(
                "Initial step size must be positive",
                "initial_step_size",
                self.initial_step_size.to_string(),
            );
        }
        if self.min_step_size <= T::zero() || self.max_step_size <= self.min_step_size {
            return invalid(
                "Step bounds must satisfy 0 < min_step_size < max_step_size",
                "max_step_size",
                format!("[{}, {}]", self.min_step_size, self.max_step_size),
            );
        }
        if self.c1 <= T::zero() || self.c1 >= T::one() {
            return invalid("Armijo constant c1 must be in (0, 1)", "c1", self.c1.to_string());
        }
        if self.rho <= T::zero() || self.rho >= T::one() {
            return invalid(
                "Backtracking factor rho must be in (0, 1)",
                "rho",
                self.rho.to_string(),
            );
        }
        if self.expansion_factor <= T::one() {
            return invalid(
                "Expansion factor must exceed 1",
                "expansion_factor",
                self.expansion_factor.to_string(),
            );
        }
        if self.safeguard < T::zero() || self.safeguard >= <T as Scalar>::from_f64(0.5) {
            return invalid(
                "Interpolation safeguard must be in [0, 0.5)",
                "safeguard",
                self.safeguard.to_string(),
            );
        }
        if self.max_iterations == 0 {
            return invalid(
                "Maximum iterations must be at least 1",
                "max_iterations",
                "0".to_string(),
            );
        }
        Ok(())
    }

    /// Validates the parameters for a curvature-condition search.
    pub fn validate_wolfe(&self) -> OptimizerResult<()> {
        self.validate()?;
        if self.c2 <= self.c1 || self.c2 >= T::one() {
            return Err(OptimizerError::invalid_configuration(
                "Wolfe constant c2 must satisfy c1 < c2 < 1",
                "c2",
                self.c2.to_string(),
            ));
        }
        if self.max_zoom_iterations == 0 {
            return Err(OptimizerError::invalid_configuration(
                "Zoom phase needs at least one iteration",
                "max_zoom_iterations",
                "0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a line search needs to know about the current iterate.
#[derive(Debug, Clone, Copy)]
pub struct LineSearchContext<'a, T: Scalar> {
    /// Current iterate x
    pub point: &'a DVector<T>,
    /// f(x)
    pub value: T,
    /// ∇f(x)
    pub gradient: &'a DVector<T>,
    /// Search direction d
    pub direction: &'a DVector<T>,
    /// φ'(0) = ⟨∇f(x), d⟩
    pub directional_derivative: T,
    /// Outer iteration counter, used by schedules
    pub iteration: usize,
}

impl<'a, T: Scalar> LineSearchContext<'a, T> {
    /// Builds a context, computing the directional derivative.
    pub fn new(
        point: &'a DVector<T>,
        value: T,
        gradient: &'a DVector<T>,
        direction: &'a DVector<T>,
        iteration: usize,
    ) -> Self {
        Self {
            point,
            value,
            gradient,
            direction,
            directional_derivative: gradient.dot(direction),
            iteration,
        }
    }

    /// x + α d.
    pub fn trial_point(&self, alpha: T) -> DVector<T> {
        let mut y = self.point.clone();
        y.axpy(alpha, self.direction, T::one());
        y
    }

    /// Armijo test φ(α) ≤ φ(0) + c₁ α φ'(0).
    pub fn sufficient_decrease(&self, alpha: T, value: T, c1: T) -> bool {
        value <= self.value + c1 * alpha * self.directional_derivative
    }

    pub(crate) fn require_descent(&self, strategy: &str) -> OptimizerResult<()> {
        if self.directional_derivative < T::zero() {
            Ok(())
        } else {
            tracing::debug!(
                strategy,
                directional_derivative = self.directional_derivative.to_f64(),
                "rejecting non-descent direction"
            );
            Err(OptimizerError::non_descent(self.directional_derivative.to_f64()))
        }
    }
}

/// Outcome of one line search.
#[derive(Debug, Clone)]
pub struct LineSearchOutcome<T: Scalar> {
    /// Accepted step α ≥ 0
    pub step_size: T,
    /// x + α d
    pub new_point: DVector<T>,
    /// f(x + α d)
    pub new_value: T,
    /// ∇f(x + α d) when the search already evaluated it
    pub new_gradient: Option<DVector<T>>,
    /// Objective value evaluations performed
    pub function_evals: usize,
    /// Gradient evaluations performed
    pub gradient_evals: usize,
    /// Trial steps tried
    pub trials: usize,
    /// False when the acceptance conditions were not met and a fallback step was returned
    pub success: bool,
}

/// Trait for line search strategies.
///
/// Implementations are pure functions of their parameters and the
/// arguments: they hold no state between calls.
pub trait LineSearch<T: Scalar>: Debug + Send + Sync {
    /// Strategy name for logging.
    fn name(&self) -> &str;

    /// Whether the step is the global minimizer along the line.
    fn is_exact(&self) -> bool;

    /// Oracle information the strategy needs.
    fn required_order(&self) -> DerivativeOrder {
        DerivativeOrder::First
    }

    /// Whether the strategy rejects directions with φ'(0) ≥ 0.
    fn requires_descent(&self) -> bool {
        true
    }

    /// Checks the configuration before a run starts.
    fn validate(&self) -> OptimizerResult<()> {
        Ok(())
    }

    /// Searches along `ctx.direction`.
    fn search<O>(
        &self,
        oracle: &O,
        ctx: &LineSearchContext<'_, T>,
    ) -> OptimizerResult<LineSearchOutcome<T>>
    where
        O: Objective<T> + ?Sized;
}

/// Runtime-selectable line search.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineSearchMethod<T: Scalar> {
    /// Closed-form step for quadratics
    Exact(ExactQuadratic<T>),
    /// Backtracking
    Armijo(Armijo<T>),
    /// Bracketing and zoom
    ArmijoWolfe(ArmijoWolfe<T>),
    /// Step from a schedule
    Scheduled(ScheduledStep<T>),
}

impl<T: Scalar> LineSearch<T> for LineSearchMethod<T> {
    fn name(&self) -> &str {
        match self {
            Self::Exact(ls) => ls.name(),
            Self::Armijo(ls) => ls.name(),
            Self::ArmijoWolfe(ls) => ls.name(),
            Self::Scheduled(ls) => ls.name(),
        }
    }

    fn is_exact(&self) -> bool {
        matches!(self, Self::Exact(_))
    }

    fn required_order(&self) -> DerivativeOrder {
        match self {
            Self::Exact(ls) => ls.required_order(),
            Self::Armijo(ls) => ls.required_order(),
            Self::ArmijoWolfe(ls) => ls.required_order(),
            Self::Scheduled(ls) => ls.required_order(),
        }
    }

    fn requires_descent(&self) -> bool {
        match self {
            Self::Exact(ls) => ls.requires_descent(),
            Self::Armijo(ls) => ls.requires_descent(),
            Self::ArmijoWolfe(ls) => ls.requires_descent(),
            Self::Scheduled(ls) => ls.requires_descent(),
        }
    }

    fn validate(&self) -> OptimizerResult<()> {
        match self {
            Self::Exact(ls) => ls.validate(),
            Self::Armijo(ls) => ls.validate(),
            Self::ArmijoWolfe(ls) => ls.validate(),
            Self::Scheduled(ls) => ls.validate(),
        }
    }

    fn search<O>(
        &self,
        oracle: &O,
        ctx: &LineSearchContext<'_, T>,
    ) -> OptimizerResult<LineSearchOutcome<T>>
    where
        O: Objective<T> + ?Sized,
    {
        match self {
            Self::Exact(ls) => ls.search(oracle, ctx),
            Self::Armijo(ls) => ls.search(oracle, ctx),
            Self::ArmijoWolfe(ls) => ls.search(oracle, ctx),
            Self::Scheduled(ls) => ls.search(oracle, ctx),
        }
    }
}

impl<T: Scalar> From<ExactQuadratic<T>> for LineSearchMethod<T> {
    fn from(ls: ExactQuadratic<T>) -> Self {
        Self::Exact(ls)
    }
}

impl<T: Scalar> From<Armijo<T>> for LineSearchMethod<T> {
    fn from(ls: Armijo<T>) -> Self {
        Self::Armijo(ls)
    }
}

impl<T: Scalar> From<ArmijoWolfe<T>> for LineSearchMethod<T> {
    fn from(ls: ArmijoWolfe<T>) -> Self {
        Self::ArmijoWolfe(ls)
    }
}

impl<T: Scalar> From<ScheduledStep<T>> for LineSearchMethod<T> {
    fn from(ls: ScheduledStep<T>) -> Self {
        Self::Scheduled(ls)
    }
}
