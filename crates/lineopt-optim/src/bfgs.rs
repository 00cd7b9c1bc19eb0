//! BFGS quasi-Newton directions.
//!
//! # Mathematical Foundation
//!
//! The strategy keeps an approximation Hₖ of the inverse Hessian and returns
//! dₖ = −Hₖ gₖ. After each step, with sₖ = xₖ₊₁ − xₖ and yₖ = gₖ₊₁ − gₖ,
//!
//! Hₖ₊₁ = (I − ρ s yᵀ) Hₖ (I − ρ y sᵀ) + ρ s sᵀ,  ρ = 1 / ⟨s, y⟩.
//!
//! Expanded, this is
//!
//! Hₖ₊₁ = Hₖ − ρ (Hₖy sᵀ + s (Hₖy)ᵀ) + (ρ² yᵀHₖy + ρ) s sᵀ,
//!
//! which preserves symmetry, and preserves positive definiteness exactly
//! when ⟨s, y⟩ > 0. Wolfe line searches guarantee that condition; Armijo
//! backtracking does not, so the update is skipped and H reset to the
//! identity whenever the curvature condition fails.
//!
//! Before the first update, and before the first update after every reset,
//! H = I is optionally rescaled to (⟨s, y⟩ / ⟨y, y⟩) I (Nocedal & Wright,
//! eq. 6.20).

use lineopt_core::{
    direction::DirectionStrategy,
    error::{OptimizerError, OptimizerResult},
    numerical::symmetrize,
    objective::{Evaluation, Objective},
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;
use tracing::{trace, warn};

/// Configuration for BFGS directions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BfgsConfig<T: Scalar> {
    /// Rescale the identity before the first update after a (re)start
    pub initial_scaling: bool,
    /// Updates require ⟨s, y⟩ > tol·‖s‖·‖y‖
    pub curvature_tolerance: T,
}

impl<T: Scalar> Default for BfgsConfig<T> {
    fn default() -> Self {
        Self {
            initial_scaling: true,
            curvature_tolerance: <T as Scalar>::from_f64(1e-10),
        }
    }
}

impl<T: Scalar> BfgsConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the initial scaling of H₀.
    pub fn with_initial_scaling(mut self, scaling: bool) -> Self {
        self.initial_scaling = scaling;
        self
    }

    /// Sets the curvature tolerance.
    pub fn with_curvature_tolerance(mut self, tol: T) -> Self {
        self.curvature_tolerance = tol;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> OptimizerResult<()> {
        if self.curvature_tolerance < T::zero() {
            return Err(OptimizerError::invalid_configuration(
                "Curvature tolerance must be non-negative",
                "curvature_tolerance",
                self.curvature_tolerance.to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-run state of the BFGS strategy.
#[derive(Debug, Clone)]
pub struct BfgsHistory<T: Scalar> {
    /// Inverse Hessian approximation Hₖ
    pub inverse_hessian: DMatrix<T>,
    /// xₖ₋₁
    pub previous_point: Option<DVector<T>>,
    /// gₖ₋₁
    pub previous_gradient: Option<DVector<T>>,
    /// Accepted updates
    pub updates: usize,
    /// Resets of H to the identity
    pub resets: usize,
    /// H is an unscaled identity awaiting its first update
    pub rescale_pending: bool,
}

/// Applies the BFGS inverse update to `h` in place.
///
/// Returns `false`, leaving `h` untouched, when ⟨s, y⟩ ≤ tol·‖s‖·‖y‖ or the
/// pair is not finite.
pub fn bfgs_inverse_update<T: Scalar>(
    h: &mut DMatrix<T>,
    s: &DVector<T>,
    y: &DVector<T>,
    tol: T,
) -> bool {
    let sy = s.dot(y);
    if !Float::is_finite(sy) || sy <= tol * s.norm() * y.norm() {
        return false;
    }

    let rho = T::one() / sy;
    let hy = &*h * y;
    let yhy = y.dot(&hy);
    if !Float::is_finite(yhy) {
        return false;
    }

    h.ger(-rho, &hy, s, T::one());
    h.ger(-rho, s, &hy, T::one());
    h.ger(rho * rho * yhy + rho, s, s, T::one());
    symmetrize(h);
    true
}

/// BFGS direction strategy.
#[derive(Debug, Clone, Default)]
pub struct Bfgs<T: Scalar> {
    config: BfgsConfig<T>,
}

impl<T: Scalar> Bfgs<T> {
    /// Creates a strategy with the given configuration.
    pub fn new(config: BfgsConfig<T>) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BfgsConfig<T> {
        &self.config
    }

    fn reset(history: &mut BfgsHistory<T>) {
        let n = history.inverse_hessian.nrows();
        history.inverse_hessian = DMatrix::identity(n, n);
        history.resets += 1;
        history.rescale_pending = true;
    }
}

impl<T: Scalar> DirectionStrategy<T> for Bfgs<T> {
    type History = BfgsHistory<T>;

    fn name(&self) -> &str {
        "BFGS"
    }

    fn validate(&self) -> OptimizerResult<()> {
        self.config.validate()
    }

    fn initial_history(&self, dimension: usize) -> Self::History {
        BfgsHistory {
            inverse_hessian: DMatrix::identity(dimension, dimension),
            previous_point: None,
            previous_gradient: None,
            updates: 0,
            resets: 0,
            rescale_pending: true,
        }
    }

    fn next_direction<O>(
        &self,
        _oracle: &O,
        eval: &Evaluation<T>,
        mut history: Self::History,
    ) -> OptimizerResult<(DVector<T>, Self::History)>
    where
        O: Objective<T> + ?Sized,
    {
        let n = eval.dimension();
        if history.inverse_hessian.nrows() != n {
            return Err(OptimizerError::dimension_mismatch(
                history.inverse_hessian.nrows(),
                n,
            ));
        }

        let previous = (&history.previous_point, &history.previous_gradient);
        if let (Some(x_prev), Some(g_prev)) = previous {
            let s = &eval.point - x_prev;
            let y = &eval.gradient - g_prev;

            let mut candidate = if history.rescale_pending && self.config.initial_scaling {
                let sy = s.dot(&y);
                let yy = y.dot(&y);
                if sy > T::zero() && yy > T::zero() {
                    DMatrix::identity(n, n) * (sy / yy)
                } else {
                    history.inverse_hessian.clone()
                }
            } else {
                history.inverse_hessian.clone()
            };

            if bfgs_inverse_update(&mut candidate, &s, &y, self.config.curvature_tolerance) {
                history.inverse_hessian = candidate;
                history.updates += 1;
                history.rescale_pending = false;
                trace!(iteration = eval.iteration, updates = history.updates, "BFGS update");
            } else {
                warn!(
                    iteration = eval.iteration,
                    sy = s.dot(&y).to_f64(),
                    "curvature condition failed, resetting BFGS approximation"
                );
                Self::reset(&mut history);
            }
        }

        let mut direction = -(&history.inverse_hessian * &eval.gradient);
        let slope = direction.dot(&eval.gradient);
        if slope >= T::zero() || !Float::is_finite(slope) {
            warn!(
                iteration = eval.iteration,
                "BFGS direction is not a descent direction, resetting approximation"
            );
            Self::reset(&mut history);
            direction = -&eval.gradient;
        }

        history.previous_point = Some(eval.point.clone());
        history.previous_gradient = Some(eval.gradient.clone());
        Ok((direction, history))
    }
}
