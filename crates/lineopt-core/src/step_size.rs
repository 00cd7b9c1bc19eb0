//! Step size schedules.
//!
//! Schedules supply the step length for methods that give up the descent
//! guarantee, most notably the subgradient method, where convergence rests on
//! the classical conditions on the sequence αₖ:
//!
//! - **Non-summable**: Σₖ αₖ = ∞ (the iterates can travel arbitrarily far)
//! - **Square summable**: Σₖ αₖ² < ∞ (the accumulated error stays bounded)
//!
//! [`StepSizeSchedule::Harmonic`] satisfies both; the square-root decay is
//! only non-summable but gives the better O(1/√k) rate on the best value.
//!
//! # Examples
//!
//! ```rust
//! use lineopt_core::step_size::StepSizeSchedule;
//!
//! let schedule = StepSizeSchedule::sqrt_decay(0.5);
//! assert!(schedule.get_step_size(3) < schedule.get_step_size(0));
//! ```

use crate::{
    error::{OptimizerError, OptimizerResult},
    types::Scalar,
};
use num_traits::Float;
use std::fmt::Debug;

/// Step size schedule αₖ as a function of the iteration counter k.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepSizeSchedule<T: Scalar> {
    /// Fixed step size αₖ = α₀
    Constant(T),

    /// Exponential decay: αₖ = α₀ · γᵏ where 0 < γ < 1
    ExponentialDecay {
        /// Initial step size α₀
        initial: T,
        /// Decay factor γ ∈ (0, 1)
        decay_rate: T,
    },

    /// Polynomial decay: αₖ = α₀ / (1 + βk)ᵖ where β > 0, p > 0
    PolynomialDecay {
        /// Initial step size α₀
        initial: T,
        /// Decay coefficient β > 0
        decay_rate: T,
        /// Decay power p > 0
        power: T,
    },

    /// Square root decay: αₖ = α₀ / √(1 + k)
    SquareRootDecay {
        /// Initial step size α₀
        initial: T,
    },

    /// Harmonic decay: αₖ = α₀ / (1 + k), square summable but not summable
    Harmonic {
        /// Initial step size α₀
        initial: T,
    },
}

impl<T: Scalar> StepSizeSchedule<T> {
    /// Computes the step size αₖ for iteration k.
    pub fn get_step_size(&self, iteration: usize) -> T {
        let k = <T as Scalar>::from_usize(iteration);

        match self {
            Self::Constant(alpha) => *alpha,

            Self::ExponentialDecay {
                initial,
                decay_rate,
            } => *initial * <T as Float>::powf(*decay_rate, k),

            Self::PolynomialDecay {
                initial,
                decay_rate,
                power,
            } => *initial / <T as Float>::powf(T::one() + *decay_rate * k, *power),

            Self::SquareRootDecay { initial } => *initial / <T as Float>::sqrt(T::one() + k),

            Self::Harmonic { initial } => *initial / (T::one() + k),
        }
    }

    /// Creates a constant step size schedule αₖ = α₀.
    pub fn constant(step_size: T) -> Self {
        Self::Constant(step_size)
    }

    /// Creates an exponential decay schedule αₖ = α₀ · γᵏ.
    pub fn exponential_decay(initial: T, decay_rate: T) -> Self {
        Self::ExponentialDecay {
            initial,
            decay_rate,
        }
    }

    /// Creates a polynomial decay schedule αₖ = α₀ / (1 + βk)ᵖ.
    ///
    /// For p ∈ (0.5, 1] the sequence is non-summable with summable squares.
    pub fn polynomial_decay(initial: T, decay_rate: T, power: T) -> Self {
        Self::PolynomialDecay {
            initial,
            decay_rate,
            power,
        }
    }

    /// Creates a square root decay schedule αₖ = α₀ / √(1 + k).
    pub fn sqrt_decay(initial: T) -> Self {
        Self::SquareRootDecay { initial }
    }

    /// Creates a harmonic schedule αₖ = α₀ / (1 + k).
    pub fn harmonic(initial: T) -> Self {
        Self::Harmonic { initial }
    }

    /// Whether αₖ → 0.
    pub fn is_diminishing(&self) -> bool {
        !matches!(self, Self::Constant(_))
    }

    /// Checks that every parameter lies in its admissible range.
    pub fn validate(&self) -> OptimizerResult<()> {
        let initial = match self {
            Self::Constant(alpha) => *alpha,
            Self::ExponentialDecay {
                initial,
                decay_rate,
            } => {
                if *decay_rate <= T::zero() || *decay_rate >= T::one() {
                    return Err(OptimizerError::invalid_configuration(
                        "Decay rate must be in (0, 1)",
                        "decay_rate",
                        decay_rate.to_string(),
                    ));
                }
                *initial
            }
            Self::PolynomialDecay {
                initial,
                decay_rate,
                power,
            } => {
                if *decay_rate <= T::zero() || *power <= T::zero() {
                    return Err(OptimizerError::invalid_configuration(
                        "Decay coefficient and power must be positive",
                        "decay_rate",
                        format!("{decay_rate}, power {power}"),
                    ));
                }
                *initial
            }
            Self::SquareRootDecay { initial } | Self::Harmonic { initial } => *initial,
        };

        if initial <= T::zero() || !Float::is_finite(initial) {
            return Err(OptimizerError::invalid_configuration(
                "Initial step size must be positive and finite",
                "initial",
                initial.to_string(),
            ));
        }
        Ok(())
    }
}
