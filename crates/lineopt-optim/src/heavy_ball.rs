//! Heavy-ball (Polyak momentum) directions.
//!
//! # Algorithm Overview
//!
//! dₖ = −gₖ + βₖ mₖ
//!
//! where the momentum term mₖ is either the last displacement xₖ − xₖ₋₁
//! (Polyak's original method) or the last search direction dₖ₋₁.
//!
//! The coefficient is either fixed, βₖ = β, or rescaled at every iteration so
//! that the momentum term has a length proportional to the gradient:
//!
//! βₖ = β ‖gₖ‖ / ‖mₖ‖.
//!
//! The combined direction need not be a descent direction. When
//! ⟨gₖ, dₖ⟩ ≥ 0 the strategy falls back to −gₖ for that iteration.

use lineopt_core::{
    direction::DirectionStrategy,
    error::{OptimizerError, OptimizerResult},
    objective::{Evaluation, Objective},
    types::{DVector, Scalar},
};
use tracing::warn;

/// How the momentum coefficient is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MomentumCoefficient<T: Scalar> {
    /// βₖ = β
    Fixed {
        /// β ∈ [0, 1)
        coefficient: T,
    },
    /// βₖ = β ‖gₖ‖ / ‖mₖ‖
    Scaled {
        /// β ∈ [0, 1)
        coefficient: T,
    },
}

impl<T: Scalar> MomentumCoefficient<T> {
    fn base(&self) -> T {
        match *self {
            Self::Fixed { coefficient } | Self::Scaled { coefficient } => coefficient,
        }
    }
}

/// Which vector the momentum multiplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MomentumTerm {
    /// xₖ − xₖ₋₁
    #[default]
    Displacement,
    /// dₖ₋₁
    PreviousDirection,
}

/// Configuration for heavy-ball directions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeavyBallConfig<T: Scalar> {
    /// Momentum coefficient rule
    pub momentum: MomentumCoefficient<T>,
    /// Momentum vector
    pub term: MomentumTerm,
}

impl<T: Scalar> Default for HeavyBallConfig<T> {
    fn default() -> Self {
        Self {
            momentum: MomentumCoefficient::Fixed {
                coefficient: <T as Scalar>::from_f64(0.9),
            },
            term: MomentumTerm::Displacement,
        }
    }
}

impl<T: Scalar> HeavyBallConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed coefficient β.
    pub fn fixed(coefficient: T) -> Self {
        Self {
            momentum: MomentumCoefficient::Fixed { coefficient },
            ..Self::default()
        }
    }

    /// Coefficient rescaled by ‖gₖ‖ / ‖mₖ‖.
    pub fn scaled(coefficient: T) -> Self {
        Self {
            momentum: MomentumCoefficient::Scaled { coefficient },
            ..Self::default()
        }
    }

    /// Sets the momentum vector.
    pub fn with_term(mut self, term: MomentumTerm) -> Self {
        self.term = term;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> OptimizerResult<()> {
        let beta = self.momentum.base();
        if beta < T::zero() || beta >= T::one() {
            return Err(OptimizerError::invalid_configuration(
                "Momentum coefficient must be in [0, 1)",
                "momentum",
                beta.to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-run state of the heavy-ball strategy.
#[derive(Debug, Clone)]
pub struct HeavyBallHistory<T: Scalar> {
    /// xₖ₋₁
    pub previous_point: Option<DVector<T>>,
    /// dₖ₋₁
    pub previous_direction: Option<DVector<T>>,
    /// Iterations where −g replaced a non-descent direction
    pub fallbacks: usize,
}

/// Heavy-ball direction strategy.
#[derive(Debug, Clone, Default)]
pub struct HeavyBall<T: Scalar> {
    config: HeavyBallConfig<T>,
}

impl<T: Scalar> HeavyBall<T> {
    /// Creates a strategy with the given configuration.
    pub fn new(config: HeavyBallConfig<T>) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HeavyBallConfig<T> {
        &self.config
    }

    fn coefficient(&self, gradient: &DVector<T>, momentum: &DVector<T>) -> T {
        match self.config.momentum {
            MomentumCoefficient::Fixed { coefficient } => coefficient,
            MomentumCoefficient::Scaled { coefficient } => {
                let norm = momentum.norm();
                if norm > T::zero() {
                    coefficient * gradient.norm() / norm
                } else {
                    T::zero()
                }
            }
        }
    }
}

impl<T: Scalar> DirectionStrategy<T> for HeavyBall<T> {
    type History = HeavyBallHistory<T>;

    fn name(&self) -> &str {
        "HeavyBall"
    }

    fn validate(&self) -> OptimizerResult<()> {
        self.config.validate()
    }

    fn initial_history(&self, _dimension: usize) -> Self::History {
        HeavyBallHistory {
            previous_point: None,
            previous_direction: None,
            fallbacks: 0,
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
        let gradient = &eval.gradient;
        let momentum = match self.config.term {
            MomentumTerm::Displacement => history
                .previous_point
                .as_ref()
                .map(|prev| &eval.point - prev),
            MomentumTerm::PreviousDirection => history.previous_direction.clone(),
        };

        let mut direction = -gradient;
        if let Some(m) = momentum {
            let beta = self.coefficient(gradient, &m);
            direction.axpy(beta, &m, T::one());

            if direction.dot(gradient) >= T::zero() {
                warn!(
                    iteration = eval.iteration,
                    beta = beta.to_f64(),
                    "momentum direction is not a descent direction, using the negative gradient"
                );
                direction = -gradient;
                history.fallbacks += 1;
            }
        }

        history.previous_point = Some(eval.point.clone());
        history.previous_direction = Some(direction.clone());
        Ok((direction, history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lineopt_core::objective::QuadraticObjective;

    fn quadratic() -> QuadraticObjective<f64> {
        QuadraticObjective::diagonal(&[1.0, 1.0], &[0.0, 0.0], 0.0).unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(HeavyBallConfig::<f64>::fixed(0.5).validate().is_ok());
        assert!(HeavyBallConfig::<f64>::scaled(0.0).validate().is_ok());
        assert!(HeavyBallConfig::<f64>::fixed(1.0).validate().is_err());
        assert!(HeavyBallConfig::<f64>::scaled(-0.1).validate().is_err());
    }

    #[test]
    fn test_fixed_momentum_uses_displacement() {
        let f = quadratic();
        let hb = HeavyBall::new(HeavyBallConfig::fixed(0.5));
        let history = HeavyBallHistory {
            previous_point: Some(DVector::from_vec(vec![3.0, 0.0])),
            previous_direction: None,
            fallbacks: 0,
        };
        // g = x = (2, 0), displacement (−1, 0): d = (−2.5, 0)
        let eval = Evaluation::from_oracle(&f, DVector::from_vec(vec![2.0, 0.0]), 1).unwrap();
        let (d, history) = hb.next_direction(&f, &eval, history).unwrap();
        assert_relative_eq!(d[0], -2.5);
        assert_relative_eq!(d[1], 0.0);
        assert_eq!(history.previous_point, Some(eval.point.clone()));
        assert_eq!(history.fallbacks, 0);
    }

    #[test]
    fn test_scaled_momentum_length() {
        let f = quadratic();
        let config = HeavyBallConfig::scaled(0.5).with_term(MomentumTerm::PreviousDirection);
        let hb = HeavyBall::new(config);
        let history = HeavyBallHistory {
            previous_point: None,
            previous_direction: Some(DVector::from_vec(vec![0.0, -10.0])),
            fallbacks: 0,
        };
        // g = (2, 0): βₖ = 0.5 · 2 / 10, so βₖ mₖ = (0, −1)
        let eval = Evaluation::from_oracle(&f, DVector::from_vec(vec![2.0, 0.0]), 1).unwrap();
        let (d, _) = hb.next_direction(&f, &eval, history).unwrap();
        assert_relative_eq!(d[0], -2.0);
        assert_relative_eq!(d[1], -1.0);
    }

    #[test]
    fn test_non_descent_momentum_falls_back() {
        let f = quadratic();
        let config = HeavyBallConfig::fixed(0.9).with_term(MomentumTerm::PreviousDirection);
        let hb = HeavyBall::new(config);
        let history = HeavyBallHistory {
            previous_point: None,
            previous_direction: Some(DVector::from_vec(vec![10.0, 0.0])),
            fallbacks: 0,
        };
        let eval = Evaluation::from_oracle(&f, DVector::from_vec(vec![1.0, 0.0]), 1).unwrap();
        let (d, history) = hb.next_direction(&f, &eval, history).unwrap();
        assert_eq!(d, -&eval.gradient);
        assert_eq!(history.fallbacks, 1);
    }
}
