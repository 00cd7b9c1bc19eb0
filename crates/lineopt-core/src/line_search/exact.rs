use super::{LineSearch, LineSearchContext, LineSearchOutcome};
use crate::{
    error::{OptimizerError, OptimizerResult},
    objective::{DerivativeOrder, Objective},
    types::Scalar,
};
use num_traits::Float;

/// Exact minimization along the line for quadratic objectives.
///
/// For f(x) = ½ xᵀQx − qᵀx + c the restriction φ(α) is a parabola with
/// curvature dᵀQd, minimized at
///
/// α* = −⟨∇f(x), d⟩ / dᵀQd.
///
/// The curvature is obtained through one Hessian-vector product. When
/// dᵀQd ≤ tol·‖d‖² the parabola has no minimizer (the objective is unbounded
/// along d, or not a strictly convex quadratic) and the search fails with
/// `NonQuadraticObjective`. On non-quadratic objectives the step is the
/// minimizer of the local quadratic model, which is a Newton step on φ.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExactQuadratic<T: Scalar> {
    /// Relative curvature threshold
    pub curvature_tolerance: T,
    /// Upper bound on the returned step
    pub max_step_size: T,
}

impl<T: Scalar> Default for ExactQuadratic<T> {
    fn default() -> Self {
        Self {
            curvature_tolerance: T::CURVATURE_TOLERANCE,
            max_step_size: T::MAX_STEP_SIZE,
        }
    }
}

impl<T: Scalar> ExactQuadratic<T> {
    /// Creates an exact line search with default tolerances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the curvature threshold.
    pub fn with_curvature_tolerance(mut self, tol: T) -> Self {
        self.curvature_tolerance = tol;
        self
    }
}

impl<T: Scalar> LineSearch<T> for ExactQuadratic<T> {
    fn name(&self) -> &str {
        "ExactQuadratic"
    }

    fn is_exact(&self) -> bool {
        true
    }

    fn required_order(&self) -> DerivativeOrder {
        DerivativeOrder::Second
    }

    fn validate(&self) -> OptimizerResult<()> {
        if self.curvature_tolerance < T::zero() || self.max_step_size <= T::zero() {
            return Err(OptimizerError::invalid_configuration(
                "Curvature tolerance must be non-negative and the step bound positive",
                "curvature_tolerance",
                format!("{} (max step {})", self.curvature_tolerance, self.max_step_size),
            ));
        }
        Ok(())
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

        let hd = oracle.hessian_vector_product(ctx.point, ctx.direction)?;
        let curvature = ctx.direction.dot(&hd);
        let threshold = self.curvature_tolerance * ctx.direction.norm_squared();
        if !Float::is_finite(curvature) || curvature <= threshold {
            return Err(OptimizerError::non_quadratic(curvature.to_f64()));
        }

        let step_size = Float::min(-ctx.directional_derivative / curvature, self.max_step_size);
        let new_point = ctx.trial_point(step_size);
        let (new_value, new_gradient) = oracle.value_and_gradient(&new_point)?;

        Ok(LineSearchOutcome {
            step_size,
            new_point,
            new_value,
            new_gradient: Some(new_gradient),
            function_evals: 1,
            gradient_evals: 1,
            trials: 1,
            success: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::QuadraticObjective;
    use crate::types::{DMatrix, DVector};
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_step_minimizes_along_line() {
        let f = QuadraticObjective::diagonal(&[2.0, 4.0], &[2.0, -8.0], 9.0).unwrap();
        let x = DVector::from_vec(vec![0.0, 0.0]);
        let (fx, g) = f.value_and_gradient(&x).unwrap();
        let d = -&g;
        let ctx = LineSearchContext::new(&x, fx, &g, &d, 0);

        let outcome = ExactQuadratic::new().search(&f, &ctx).unwrap();
        // g = (-2, 8): α = gᵀg / gᵀQg = 68 / 264
        assert_relative_eq!(outcome.step_size, 68.0 / 264.0, epsilon = 1e-14);
        assert!(outcome.success);

        // φ'(α*) = 0
        let new_g = outcome.new_gradient.unwrap();
        assert_relative_eq!(new_g.dot(&d), 0.0, epsilon = 1e-12);
        assert!(outcome.new_value < fx);
    }

    #[test]
    fn test_non_positive_curvature_is_rejected() {
        let q = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, -1.0]));
        let f = QuadraticObjective::new(q, DVector::zeros(2), 0.0).unwrap();
        let x = DVector::from_vec(vec![0.0, 1.0]);
        let (fx, g) = f.value_and_gradient(&x).unwrap();
        // g = (0, -1); descending along +y has negative curvature
        let d = -&g;
        let ctx = LineSearchContext::new(&x, fx, &g, &d, 0);

        let err = ExactQuadratic::new().search(&f, &ctx).unwrap_err();
        assert!(matches!(err, OptimizerError::NonQuadraticObjective { .. }));
    }

    #[test]
    fn test_rejects_ascent_direction() {
        let f = QuadraticObjective::diagonal(&[1.0], &[0.0], 0.0).unwrap();
        let x = DVector::from_vec(vec![1.0]);
        let (fx, g) = f.value_and_gradient(&x).unwrap();
        let ctx = LineSearchContext::new(&x, fx, &g, &g, 0);
        assert!(matches!(
            ExactQuadratic::new().search(&f, &ctx),
            Err(OptimizerError::NonDescentDirection { .. })
        ));
    }
}
