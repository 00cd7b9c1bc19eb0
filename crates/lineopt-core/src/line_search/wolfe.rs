use super::{CurvatureCondition, LineSearch, LineSearchContext, LineSearchOutcome, LineSearchParams};
use crate::{
    error::{OptimizerError, OptimizerResult},
    numerical::{cubic_minimizer, safeguard_step, secant_root},
    objective::{DerivativeOrder, Objective},
    types::{DVector, Scalar},
};
use num_traits::Float;
use tracing::{trace, warn};

/// Line search enforcing the Armijo and curvature (Wolfe) conditions.
///
/// # Algorithm
///
/// 1. **Bracketing**: starting from `initial_step_size`, the step grows by
///    `expansion_factor` while it satisfies sufficient decrease but φ' is
///    still too negative. The phase ends as soon as an interval is known to
///    contain an acceptable step, or fails with `LineSearchNonConvergent`
///    after `max_iterations` expansions.
/// 2. **Zoom**: the bracket [lo, hi] is shrunk with a cubic interpolation
///    step, or the secant root of φ' when the cubic has no minimizer. The
///    trial is clamped away from the endpoints by `safeguard`, and bisection
///    takes over when neither model is usable. `lo` always satisfies
///    sufficient decrease.
///
/// If the zoom budget runs out and `lo > 0`, the Armijo-satisfying step
/// `lo` is returned with `success = false`. If `lo` is still zero the search
/// fails with `LineSearchNonConvergent`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmijoWolfe<T: Scalar> {
    /// Tuning parameters
    pub params: LineSearchParams<T>,
}

/// One evaluated point on the line.
#[derive(Debug, Clone)]
struct Trial<T: Scalar> {
    alpha: T,
    point: DVector<T>,
    value: T,
    gradient: DVector<T>,
    slope: T,
}

impl<T: Scalar> Trial<T> {
    fn origin(ctx: &LineSearchContext<'_, T>) -> Self {
        Self {
            alpha: T::zero(),
            point: ctx.point.clone(),
            value: ctx.value,
            gradient: ctx.gradient.clone(),
            slope: ctx.directional_derivative,
        }
    }

    fn into_outcome(self, evals: usize, trials: usize, success: bool) -> LineSearchOutcome<T> {
        LineSearchOutcome {
            step_size: self.alpha,
            new_point: self.point,
            new_value: self.value,
            new_gradient: Some(self.gradient),
            function_evals: evals,
            gradient_evals: evals,
            trials,
            success,
        }
    }
}

/// Zoom trial from the cubic through both ends, or the secant root of φ'
/// when the cubic has no minimizer.
fn interpolate<T: Scalar>(lo: &Trial<T>, hi: &Trial<T>) -> Option<T> {
    if !Float::is_finite(hi.value) || !Float::is_finite(hi.slope) {
        return None;
    }
    cubic_minimizer(lo.alpha, lo.value, lo.slope, hi.alpha, hi.value, hi.slope)
        .or_else(|| secant_root(lo.alpha, lo.slope, hi.alpha, hi.slope))
}

impl<T: Scalar> ArmijoWolfe<T> {
    /// Creates a Wolfe line search with the given parameters.
    pub fn new(params: LineSearchParams<T>) -> Self {
        Self { params }
    }

    /// Weak Wolfe conditions, c₁ = 10⁻⁴, c₂ = 0.9.
    pub fn weak() -> Self {
        Self::new(LineSearchParams::weak_wolfe())
    }

    /// Strong Wolfe conditions, c₁ = 10⁻⁴, c₂ = 0.9.
    pub fn strong() -> Self {
        Self::new(LineSearchParams::strong_wolfe())
    }

    fn curvature_satisfied(&self, ctx: &LineSearchContext<'_, T>, slope: T) -> bool {
        let bound = self.params.c2 * ctx.directional_derivative;
        match self.params.curvature {
            CurvatureCondition::Weak => slope >= bound,
            CurvatureCondition::Strong => Float::abs(slope) <= -bound,
        }
    }

    fn evaluate<O>(
        &self,
        oracle: &O,
        ctx: &LineSearchContext<'_, T>,
        alpha: T,
    ) -> OptimizerResult<Trial<T>>
    where
        O: Objective<T> + ?Sized,
    {
        let point = ctx.trial_point(alpha);
        let (value, gradient) = oracle.value_and_gradient(&point)?;
        let slope = gradient.dot(ctx.direction);
        Ok(Trial {
            alpha,
            point,
            value,
            gradient,
            slope,
        })
    }

    /// Sufficient decrease fails, or the value did not improve on `reference`.
    fn rejects(&self, ctx: &LineSearchContext<'_, T>, trial: &Trial<T>, reference: T) -> bool {
        !Float::is_finite(trial.value)
            || !ctx.sufficient_decrease(trial.alpha, trial.value, self.params.c1)
            || trial.value >= reference
    }

    fn zoom<O>(
        &self,
        oracle: &O,
        ctx: &LineSearchContext<'_, T>,
        mut lo: Trial<T>,
        mut hi: Trial<T>,
        mut evals: usize,
    ) -> OptimizerResult<LineSearchOutcome<T>>
    where
        O: Objective<T> + ?Sized,
    {
        for _ in 0..self.params.max_zoom_iterations {
            if Float::abs(hi.alpha - lo.alpha) <= self.params.min_step_size {
                break;
            }
            let candidate = interpolate(&lo, &hi);
            let alpha = safeguard_step(candidate, lo.alpha, hi.alpha, self.params.safeguard);

            let trial = self.evaluate(oracle, ctx, alpha)?;
            evals += 1;
            trace!(alpha = alpha.to_f64(), value = trial.value.to_f64(), "zoom trial");

            if self.rejects(ctx, &trial, lo.value) {
                hi = trial;
            } else {
                if self.curvature_satisfied(ctx, trial.slope) {
                    return Ok(trial.into_outcome(evals, evals, true));
                }
                if trial.slope * (hi.alpha - lo.alpha) >= T::zero() {
                    hi = lo;
                }
                lo = trial;
            }
        }

        if lo.alpha > T::zero() {
            warn!(
                iteration = ctx.iteration,
                step = lo.alpha.to_f64(),
                "Wolfe zoom exhausted its budget, returning best Armijo step"
            );
            return Ok(lo.into_outcome(evals, evals, false));
        }
        Err(OptimizerError::line_search_failed(
            "zoom phase found no step satisfying sufficient decrease",
            evals,
            hi.alpha.to_f64(),
        ))
    }
}

impl<T: Scalar> LineSearch<T> for ArmijoWolfe<T> {
    fn name(&self) -> &str {
        match self.params.curvature {
            CurvatureCondition::Weak => "ArmijoWolfe",
            CurvatureCondition::Strong => "StrongWolfe",
        }
    }

    fn is_exact(&self) -> bool {
        false
    }

    fn required_order(&self) -> DerivativeOrder {
        DerivativeOrder::First
    }

    fn validate(&self) -> OptimizerResult<()> {
        self.params.validate_wolfe()
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

        let mut prev = Trial::origin(ctx);
        let mut alpha = Float::min(self.params.initial_step_size, self.params.max_step_size);
        let mut evals = 0;

        for _ in 0..self.params.max_iterations {
            let trial = self.evaluate(oracle, ctx, alpha)?;
            evals += 1;

            if self.rejects(ctx, &trial, prev.value) {
                return self.zoom(oracle, ctx, prev, trial, evals);
            }
            if self.curvature_satisfied(ctx, trial.slope) {
                return Ok(trial.into_outcome(evals, evals, true));
            }
            if trial.slope >= T::zero() {
                return self.zoom(oracle, ctx, trial, prev, evals);
            }

            if alpha >= self.params.max_step_size {
                return Err(OptimizerError::line_search_failed(
                    "step reached its upper bound with the curvature condition unmet",
                    evals,
                    alpha.to_f64(),
                ));
            }
            prev = trial;
            alpha = Float::min(alpha * self.params.expansion_factor, self.params.max_step_size);
        }

        Err(OptimizerError::line_search_failed(
            "bracket expansion budget exhausted",
            evals,
            alpha.to_f64(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::{QuadraticObjective, Rosenbrock};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn check_wolfe(
        ls: &ArmijoWolfe<f64>,
        ctx: &LineSearchContext<'_, f64>,
        outcome: &LineSearchOutcome<f64>,
    ) {
        let g = outcome.new_gradient.as_ref().unwrap();
        let slope = g.dot(ctx.direction);
        assert!(ctx.sufficient_decrease(outcome.step_size, outcome.new_value, ls.params.c1));
        assert!(ls.curvature_satisfied(ctx, slope), "slope {slope}");
    }

    #[test]
    fn test_weak_wolfe_on_rosenbrock() {
        let f = Rosenbrock::<f64>::new();
        let x = DVector::from_vec(vec![-1.2, 1.0]);
        let (fx, g) = f.value_and_gradient(&x).unwrap();
        let d = -&g;
        let ctx = LineSearchContext::new(&x, fx, &g, &d, 0);
        let ls = ArmijoWolfe::weak();
        let outcome = ls.search(&f, &ctx).unwrap();

        assert!(outcome.success);
        check_wolfe(&ls, &ctx, &outcome);
    }

    #[test]
    fn test_strong_wolfe_on_rosenbrock() {
        let f = Rosenbrock::<f64>::new();
        let x = DVector::from_vec(vec![-1.2, 1.0]);
        let (fx, g) = f.value_and_gradient(&x).unwrap();
        let d = -&g;
        let ctx = LineSearchContext::new(&x, fx, &g, &d, 0);
        let ls = ArmijoWolfe::new(LineSearchParams::strong_wolfe().with_c2(0.1));
        let outcome = ls.search(&f, &ctx).unwrap();

        assert!(outcome.success);
        assert_eq!(ls.name(), "StrongWolfe");
        check_wolfe(&ls, &ctx, &outcome);
    }

    #[test]
    fn test_expansion_on_short_initial_step() {
        let f = QuadraticObjective::diagonal(&[1.0], &[0.0], 0.0).unwrap();
        let x = DVector::from_vec(vec![100.0]);
        let (fx, g) = f.value_and_gradient(&x).unwrap();
        // tiny direction: the unit step barely moves
        let d = -&g * 1e-3;
        let ctx = LineSearchContext::new(&x, fx, &g, &d, 0);
        let ls = ArmijoWolfe::weak();
        let outcome = ls.search(&f, &ctx).unwrap();

        assert!(outcome.step_size > 1.0);
        assert!(outcome.trials > 1);
        check_wolfe(&ls, &ctx, &outcome);
    }

    #[test]
    fn test_expansion_budget_exhausted() {
        // linear objective: unbounded below, curvature condition never holds
        #[derive(Debug)]
        struct Linear;
        impl Objective<f64> for Linear {
            fn dimension(&self) -> usize {
                1
            }
            fn value(&self, x: &DVector<f64>) -> crate::error::OracleResult<f64> {
                Ok(-x[0])
            }
            fn gradient(&self, _x: &DVector<f64>) -> crate::error::OracleResult<DVector<f64>> {
                Ok(DVector::from_vec(vec![-1.0]))
            }
        }

        let x = DVector::from_vec(vec![0.0]);
        let g = DVector::from_vec(vec![-1.0]);
        let d = DVector::from_vec(vec![1.0]);
        let ctx = LineSearchContext::new(&x, 0.0, &g, &d, 0);
        let ls = ArmijoWolfe::new(LineSearchParams::weak_wolfe().with_max_iterations(5));
        let err = ls.search(&Linear, &ctx).unwrap_err();

        assert!(matches!(
            err,
            OptimizerError::LineSearchNonConvergent { iterations: 5, .. }
        ));
    }

    fn trial(alpha: f64, value: f64, slope: f64) -> Trial<f64> {
        Trial {
            alpha,
            point: DVector::from_vec(vec![alpha]),
            value,
            gradient: DVector::from_vec(vec![slope]),
            slope,
        }
    }

    #[test]
    fn test_zoom_interpolation_falls_back_to_secant() {
        // d1 = 0 and φ'(lo)·φ'(hi) > 0: the cubic has no real minimizer
        let lo = trial(0.0, 0.0, -1.0);
        let hi = trial(1.0, -0.5, -0.5);
        let cubic = cubic_minimizer(lo.alpha, lo.value, lo.slope, hi.alpha, hi.value, hi.slope);
        assert!(cubic.is_none());

        let alpha = interpolate(&lo, &hi).unwrap();
        assert_relative_eq!(alpha, 2.0, epsilon = 1e-12);
        assert_relative_eq!(safeguard_step(Some(alpha), lo.alpha, hi.alpha, 0.1), 0.9);
    }

    #[test]
    fn test_zoom_interpolation_uses_cubic_when_available() {
        // φ(α) = (α − 2)²
        let lo = trial(0.0, 4.0, -4.0);
        let hi = trial(3.0, 1.0, 2.0);
        assert_relative_eq!(interpolate(&lo, &hi).unwrap(), 2.0, epsilon = 1e-12);

        assert!(interpolate(&lo, &trial(3.0, f64::INFINITY, 2.0)).is_none());
    }

    proptest! {
        #[test]
        fn prop_wolfe_conditions_hold(
            x0 in -2.0f64..2.0,
            x1 in -1.0f64..3.0,
            strong in any::<bool>(),
        ) {
            let f = Rosenbrock::<f64>::new();
            let x = DVector::from_vec(vec![x0, x1]);
            let (fx, g) = f.value_and_gradient(&x).unwrap();
            prop_assume!(g.norm() > 1e-6);
            let d = -&g;
            let ctx = LineSearchContext::new(&x, fx, &g, &d, 0);
            let params = if strong {
                LineSearchParams::strong_wolfe()
            } else {
                LineSearchParams::weak_wolfe()
            };
            let ls = ArmijoWolfe::new(params);
            let outcome = ls.search(&f, &ctx).unwrap();

            prop_assert!(outcome.step_size > 0.0);
            prop_assert!(
                ctx.sufficient_decrease(outcome.step_size, outcome.new_value, ls.params.c1)
            );
            if outcome.success {
                let slope = outcome.new_gradient.as_ref().unwrap().dot(&d);
                prop_assert!(ls.curvature_satisfied(&ctx, slope));
            }
        }
    }
}
