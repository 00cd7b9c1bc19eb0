use super::{LineSearch, LineSearchContext, LineSearchOutcome, LineSearchParams};
use crate::{
    error::OptimizerResult,
    numerical::{quadratic_minimizer, safeguard_step},
    objective::{DerivativeOrder, Objective},
    types::{DVector, Scalar},
};
use num_traits::Float;
use tracing::warn;

/// Backtracking line search enforcing the Armijo condition.
///
/// Starting from `initial_step_size`, the trial step is multiplied by ρ
/// (halved with the default parameters) until
///
/// f(x + αd) ≤ f(x) + c₁ α ⟨∇f(x), d⟩.
///
/// With `interpolate` enabled the next trial is instead the minimizer of the
/// quadratic through φ(0), φ'(0) and φ(α), kept inside [ρ²α, ρα].
///
/// Only function values are evaluated after the start point, so the
/// search works with zeroth-order trial information.
///
/// # Budget exhaustion
///
/// After `max_iterations` rejected trials the smallest tested step with a
/// finite value is returned with `success = false` and `trials` equal to the
/// budget. If no trial produced a finite value the step is zero, which the
/// driver reports as a stalled run.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Armijo<T: Scalar> {
    /// Tuning parameters (c₁, ρ, α₀, budget)
    pub params: LineSearchParams<T>,
}

impl<T: Scalar> Armijo<T> {
    /// Creates a backtracking search with the given parameters.
    pub fn new(params: LineSearchParams<T>) -> Self {
        Self { params }
    }

    /// Halving backtracking with c₁ = 10⁻⁴.
    pub fn backtracking() -> Self {
        Self::new(LineSearchParams::backtracking())
    }

    fn next_trial(&self, ctx: &LineSearchContext<'_, T>, alpha: T, value: T) -> T {
        let shrunk = self.params.rho * alpha;
        if !self.params.interpolate || !Float::is_finite(value) {
            return shrunk;
        }
        let candidate =
            quadratic_minimizer(T::zero(), ctx.value, ctx.directional_derivative, alpha, value);
        safeguard_step(candidate, self.params.rho * shrunk, shrunk, T::zero())
    }
}

impl<T: Scalar> LineSearch<T> for Armijo<T> {
    fn name(&self) -> &str {
        "Armijo"
    }

    fn is_exact(&self) -> bool {
        false
    }

    fn required_order(&self) -> DerivativeOrder {
        DerivativeOrder::First
    }

    fn validate(&self) -> OptimizerResult<()> {
        self.params.validate()
    }

    fn search<O>(
        &self,
        oracle: &O,
        ctx: &LineSearchContext<'_, T>,
    ) -> OptimizerResult<LineSearchOutcome<T>>
    where
        O: Objective<T> + ?Sized,
    {
        ctx.require_descent(self.name())?;

        let mut alpha = Float::min(self.params.initial_step_size, self.params.max_step_size);
        let mut fallback: Option<(T, DVector<T>, T)> = None;

        for trial in 1..=self.params.max_iterations {
            let y = ctx.trial_point(alpha);
            let fy = oracle.value(&y)?;

            if Float::is_finite(fy) && ctx.sufficient_decrease(alpha, fy, self.params.c1) {
                return Ok(LineSearchOutcome {
                    step_size: alpha,
                    new_point: y,
                    new_value: fy,
                    new_gradient: None,
                    function_evals: trial,
                    gradient_evals: 0,
                    trials: trial,
                    success: true,
                });
            }

            if Float::is_finite(fy) {
                fallback = Some((alpha, y, fy));
            }
            alpha = self.next_trial(ctx, alpha, fy);
        }

        let budget = self.params.max_iterations;
        let (step_size, new_point, new_value) =
            fallback.unwrap_or_else(|| (T::zero(), ctx.point.clone(), ctx.value));
        warn!(
            iteration = ctx.iteration,
            trials = budget,
            step = step_size.to_f64(),
            "Armijo backtracking exhausted its budget, returning smallest tested step"
        );

        Ok(LineSearchOutcome {
            step_size,
            new_point,
            new_value,
            new_gradient: None,
            function_evals: budget,
            gradient_evals: 0,
            trials: budget,
            success: false,
        })
    }
}
