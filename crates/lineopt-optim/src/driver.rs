//! The outer optimization loop.
//!
//! # Algorithm Overview
//!
//! Starting from x₀, each iteration:
//! 1. Checks the stopping rules (gradient norm, unboundedness, budgets)
//! 2. Asks the direction strategy for dₖ
//! 3. Rejects dₖ unless ⟨∇f(xₖ), dₖ⟩ < 0 (subgradient directions excepted)
//! 4. Runs the line search along dₖ
//! 5. Accepts xₖ₊₁ = xₖ + αₖ dₖ and evaluates the oracle there
//!
//! Configuration and oracle mismatches are returned as `Err` before the
//! first oracle call. Everything that goes wrong afterwards ends the run
//! with an [`OptimizationResult`] holding the last accepted iterate, the
//! matching [`TerminationReason`] and the error in `failure`.
//!
//! # Examples
//!
//! ```rust
//! use lineopt_core::prelude::*;
//! use lineopt_optim::{run, SteepestDescent};
//!
//! // f(x, y) = (x − 1)² + 2(y + 2)²
//! let f = QuadraticObjective::diagonal(&[2.0, 4.0], &[2.0, -8.0], 9.0).unwrap();
//! let x0: DVector<f64> = DVector::from_vec(vec![0.0, 0.0]);
//!
//! let result = run(&f, &x0, &SteepestDescent, &Armijo::backtracking(), 1000, 1e-6).unwrap();
//! assert_eq!(result.termination_reason, TerminationReason::Converged);
//! assert!((result.point[0] - 1.0).abs() < 1e-5);
//! assert!((result.point[1] + 2.0).abs() < 1e-5);
//! ```

use lineopt_core::{
    callback::{CallbackInfo, NoOpCallback, OptimizationCallback},
    direction::DirectionStrategy,
    error::{OptimizerError, OptimizerResult},
    line_search::{LineSearch, LineSearchContext},
    objective::{CountingObjective, Evaluation, Objective},
    optimizer::{OptimizationResult, StoppingCriterion, TerminationReason},
    types::{DVector, Scalar},
};
use num_traits::Float;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

/// Runs `direction` with `line_search` from `x0`.
///
/// Stops when ‖∇f‖ ≤ `tolerance` or after `max_iterations` iterations.
/// Use [`OptimizationResult::into_parts`] for the
/// (final point, status, iteration count) triple.
pub fn run<T, O, D, L>(
    oracle: &O,
    x0: &DVector<T>,
    direction: &D,
    line_search: &L,
    max_iterations: usize,
    tolerance: T,
) -> OptimizerResult<OptimizationResult<T>>
where
    T: Scalar,
    O: Objective<T> + ?Sized,
    D: DirectionStrategy<T>,
    L: LineSearch<T>,
{
    let criterion = StoppingCriterion::new()
        .with_max_iterations(max_iterations)
        .with_gradient_tolerance(tolerance);
    minimize(oracle, x0, direction, line_search, &criterion, &mut NoOpCallback)
}

/// Owns a direction strategy, a line search and stopping rules.
///
/// The driver itself is stateless between runs: every call to
/// [`Driver::minimize`] starts from a fresh direction history, so one driver
/// can serve many runs, including concurrent ones.
#[derive(Debug, Clone)]
pub struct Driver<T: Scalar, D, L> {
    direction: D,
    line_search: L,
    criterion: StoppingCriterion<T>,
}

impl<T, D, L> Driver<T, D, L>
where
    T: Scalar,
    D: DirectionStrategy<T>,
    L: LineSearch<T>,
{
    /// Creates a driver with default stopping rules.
    pub fn new(direction: D, line_search: L) -> Self {
        Self {
            direction,
            line_search,
            criterion: StoppingCriterion::default(),
        }
    }

    /// Replaces the stopping rules.
    pub fn with_criterion(mut self, criterion: StoppingCriterion<T>) -> Self {
        self.criterion = criterion;
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.criterion.max_iterations = max_iterations;
        self
    }

    /// Sets the gradient norm tolerance.
    pub fn with_gradient_tolerance(mut self, tolerance: T) -> Self {
        self.criterion.gradient_tolerance = tolerance;
        self
    }

    /// The direction strategy.
    pub fn direction(&self) -> &D {
        &self.direction
    }

    /// The line search.
    pub fn line_search(&self) -> &L {
        &self.line_search
    }

    /// The stopping rules.
    pub fn criterion(&self) -> &StoppingCriterion<T> {
        &self.criterion
    }

    /// Minimizes `oracle` from `x0`.
    pub fn minimize<O>(&self, oracle: &O, x0: &DVector<T>) -> OptimizerResult<OptimizationResult<T>>
    where
        O: Objective<T> + ?Sized,
    {
        self.minimize_with_callback(oracle, x0, &mut NoOpCallback)
    }

    /// Minimizes `oracle` from `x0`, reporting every iteration to `callback`.
    pub fn minimize_with_callback<O, C>(
        &self,
        oracle: &O,
        x0: &DVector<T>,
        callback: &mut C,
    ) -> OptimizerResult<OptimizationResult<T>>
    where
        O: Objective<T> + ?Sized,
        C: OptimizationCallback<T> + ?Sized,
    {
        minimize(
            oracle,
            x0,
            &self.direction,
            &self.line_search,
            &self.criterion,
            callback,
        )
    }

    /// Runs one independent minimization per starting point, in parallel.
    ///
    /// Results are returned in the order of `starts`.
    #[cfg(feature = "parallel")]
    pub fn minimize_batch<O>(
        &self,
        oracle: &O,
        starts: &[DVector<T>],
    ) -> Vec<OptimizerResult<OptimizationResult<T>>>
    where
        O: Objective<T> + Sync + ?Sized,
    {
        use rayon::prelude::*;

        starts
            .par_iter()
            .map(|x0| self.minimize(oracle, x0))
            .collect()
    }
}

/// Pre-flight checks done before any oracle call.
fn check_inputs<T, O, D, L>(
    oracle: &O,
    x0: &DVector<T>,
    direction: &D,
    line_search: &L,
    criterion: &StoppingCriterion<T>,
) -> OptimizerResult<()>
where
    T: Scalar,
    O: Objective<T> + ?Sized,
    D: DirectionStrategy<T>,
    L: LineSearch<T>,
{
    criterion.validate()?;
    direction.validate()?;
    line_search.validate()?;

    if x0.len() != oracle.dimension() {
        return Err(OptimizerError::dimension_mismatch(oracle.dimension(), x0.len()));
    }

    let available = oracle.order();
    if direction.required_order() > available {
        return Err(OptimizerError::missing_derivative(
            direction.name(),
            direction.required_order().describe(),
        ));
    }
    if line_search.required_order() > available {
        return Err(OptimizerError::missing_derivative(
            line_search.name(),
            line_search.required_order().describe(),
        ));
    }
    Ok(())
}

/// Evaluates the oracle at `point`, attaching the Hessian when the strategy
/// wants it and the oracle has one.
fn evaluate<T, O, D>(
    oracle: &O,
    direction: &D,
    point: DVector<T>,
    value_and_gradient: Option<(T, DVector<T>)>,
    iteration: usize,
) -> OptimizerResult<Evaluation<T>>
where
    T: Scalar,
    O: Objective<T> + ?Sized,
    D: DirectionStrategy<T>,
{
    let eval = match value_and_gradient {
        Some((value, gradient)) => Evaluation::new(point, value, gradient, iteration)?,
        None => Evaluation::from_oracle(oracle, point, iteration)?,
    };

    if direction.wants_hessian_matrix() && oracle.has_hessian_matrix() {
        let hessian = oracle.hessian(&eval.point)?;
        return Ok(eval.with_hessian(hessian));
    }
    Ok(eval)
}

/// Normalized optimality gap (f − f*) / max(|f*|, 1).
fn relative_gap<T: Scalar>(value: T, optimal: T) -> T {
    (value - optimal) / Float::max(Float::abs(optimal), T::one())
}

/// Core loop shared by [`run`] and [`Driver`].
pub fn minimize<T, O, D, L, C>(
    oracle: &O,
    x0: &DVector<T>,
    direction: &D,
    line_search: &L,
    criterion: &StoppingCriterion<T>,
    callback: &mut C,
) -> OptimizerResult<OptimizationResult<T>>
where
    T: Scalar,
    O: Objective<T> + ?Sized,
    D: DirectionStrategy<T>,
    L: LineSearch<T>,
    C: OptimizationCallback<T> + ?Sized,
{
    check_inputs(oracle, x0, direction, line_search, criterion)?;

    let start_time = Instant::now();
    let span = info_span!(
        "minimize",
        direction = direction.name(),
        line_search = line_search.name(),
        dimension = x0.len()
    );
    let _guard = span.enter();

    let counted = CountingObjective::new(oracle);
    let optimal_value = counted.optimal_value();

    let mut eval = match evaluate(&counted, direction, x0.clone(), None, 0) {
        Ok(eval) => eval,
        Err(err) => {
            warn!(error = %err, "oracle failed at the initial point");
            let result = OptimizationResult::new(
                x0.clone(),
                <T as Float>::nan(),
                0,
                start_time.elapsed(),
                TerminationReason::OracleFailure,
            )
            .with_evaluations(counted.counts())
            .with_failure(err);
            callback.on_optimization_end(&result);
            return Ok(result);
        }
    };

    let threshold = criterion.gradient_threshold(eval.gradient_norm());
    callback.on_optimization_start(&eval.point, eval.value);

    let mut history = direction.initial_history(x0.len());
    let mut best_point = eval.point.clone();
    let mut best_value = eval.value;
    let mut previous_gap: Option<T> = None;
    let mut iteration = 0;
    let mut failure: Option<OptimizerError> = None;

    let reason = loop {
        let gradient_norm = eval.gradient_norm();

        if gradient_norm <= threshold {
            break TerminationReason::Converged;
        }
        if eval.value <= criterion.unbounded_threshold {
            break TerminationReason::Unbounded;
        }
        if iteration >= criterion.max_iterations {
            break TerminationReason::MaxIterationsReached;
        }
        if let Some(max_evals) = criterion.max_function_evaluations {
            if counted.counts().0 >= max_evals {
                break TerminationReason::MaxFunctionEvaluations;
            }
        }

        let d = match direction.next_direction(&counted, &eval, history) {
            Ok((d, next)) => {
                history = next;
                d
            }
            Err(err) => {
                let reason = err.termination_reason();
                failure = Some(err);
                break reason;
            }
        };

        let ctx = LineSearchContext::new(&eval.point, eval.value, &eval.gradient, &d, iteration);
        if ctx.directional_derivative >= T::zero() && !direction.allows_non_descent() {
            failure = Some(OptimizerError::non_descent(ctx.directional_derivative.to_f64()));
            break TerminationReason::NonDescentDirection;
        }

        let outcome = match line_search.search(&counted, &ctx) {
            Ok(outcome) => outcome,
            Err(err) => {
                let reason = err.termination_reason();
                failure = Some(err);
                break reason;
            }
        };

        let direction_norm = d.norm();
        let step_length = outcome.step_size * direction_norm;
        if step_length <= criterion.min_step_size {
            debug!(iteration, step = outcome.step_size.to_f64(), "step below minimum length");
            break TerminationReason::Stalled;
        }
        if !outcome.success {
            if outcome.new_value < eval.value {
                warn!(
                    iteration,
                    trials = outcome.trials,
                    "line search conditions not met, accepting decreasing step"
                );
            } else {
                failure = Some(OptimizerError::line_search_failed(
                    "no decrease along the direction",
                    outcome.trials,
                    outcome.step_size.to_f64(),
                ));
                break TerminationReason::LineSearchNonConvergent;
            }
        }

        iteration += 1;
        let step_size = outcome.step_size;
        let known = match outcome.new_gradient {
            Some(gradient) => Some((outcome.new_value, gradient)),
            None => match counted.gradient(&outcome.new_point) {
                Ok(gradient) => Some((outcome.new_value, gradient)),
                Err(err) => {
                    failure = Some(err.into());
                    break TerminationReason::OracleFailure;
                }
            },
        };
        eval = match evaluate(&counted, direction, outcome.new_point, known, iteration) {
            Ok(next) => next,
            Err(err) => {
                let reason = err.termination_reason();
                failure = Some(err);
                break reason;
            }
        };

        if eval.value < best_value {
            best_value = eval.value;
            best_point = eval.point.clone();
        }

        let function_evaluations = counted.counts().0;
        match optimal_value {
            Some(optimal) => {
                let gap = relative_gap(eval.value, optimal);
                let rate = previous_gap
                    .filter(|prev| *prev > T::zero())
                    .map(|prev| (gap / prev).to_f64());
                debug!(
                    iteration,
                    value = eval.value.to_f64(),
                    gradient_norm = gradient_norm.to_f64(),
                    step = step_size.to_f64(),
                    evaluations = function_evaluations,
                    gap = gap.to_f64(),
                    rate,
                    "iteration"
                );
                previous_gap = Some(gap);
            }
            None => debug!(
                iteration,
                value = eval.value.to_f64(),
                gradient_norm = gradient_norm.to_f64(),
                step = step_size.to_f64(),
                evaluations = function_evaluations,
                "iteration"
            ),
        }

        let info = CallbackInfo {
            iteration,
            point: &eval.point,
            value: eval.value,
            gradient_norm,
            step_size,
            direction_norm,
            function_evaluations,
            elapsed: start_time.elapsed(),
        };
        if !callback.on_iteration_end(&info) {
            break TerminationReason::CallbackRequest;
        }
    };

    let final_gradient_norm = eval.gradient_norm();
    let elapsed = start_time.elapsed();
    let mut result = OptimizationResult::new(eval.point, eval.value, iteration, elapsed, reason)
        .with_gradient_norm(final_gradient_norm)
        .with_best(best_point, best_value)
        .with_evaluations(counted.counts());
    if let Some(err) = failure {
        result = result.with_failure(err);
    }

    if result.termination_reason.is_failure() {
        warn!(
            iterations = result.iterations,
            reason = %result.termination_reason,
            "optimization failed"
        );
    } else {
        info!(
            iterations = result.iterations,
            value = result.value.to_f64(),
            gradient_norm = final_gradient_norm.to_f64(),
            reason = %result.termination_reason,
            "optimization finished"
        );
    }
    callback.on_optimization_end(&result);
    Ok(result)
}
