//! Nonlinear conjugate gradient directions.
//!
//! # Algorithm Overview
//!
//! The first direction is d₀ = −g₀. Afterwards
//!
//! dₖ = −gₖ + βₖ dₖ₋₁
//!
//! where βₖ depends on the chosen formula. With yₖ = gₖ − gₖ₋₁:
//!
//! - **Fletcher-Reeves (FR)**: β = ‖gₖ‖² / ‖gₖ₋₁‖²
//! - **Polak-Ribière (PR)**: β = ⟨gₖ, yₖ⟩ / ‖gₖ₋₁‖²
//! - **Hestenes-Stiefel (HS)**: β = ⟨gₖ, yₖ⟩ / ⟨dₖ₋₁, yₖ⟩
//! - **Dai-Yuan (DY)**: β = ‖gₖ‖² / ⟨dₖ₋₁, yₖ⟩
//! - **Hybrid FR-PR**: β = max(−β_FR, min(β_PR, β_FR))
//!
//! On a strictly convex quadratic with exact line searches every formula
//! reduces to linear CG and reaches the minimizer in at most n iterations.
//!
//! # Restarts
//!
//! β is set to zero (dₖ = −gₖ) when:
//! - the formula's denominator vanishes or β is not finite,
//! - β < 0 and negative values are not allowed (the default; for PR this is PR+),
//! - `restart_period` iterations have passed since the last restart,
//! - the resulting direction is not a descent direction.
//!
//! # References
//!
//! - Hager & Zhang, "A survey of nonlinear conjugate gradient methods" (2006)
//! - Dai & Yuan, "A nonlinear conjugate gradient method with a strong global
//!   convergence property" (1999)

use lineopt_core::{
    direction::DirectionStrategy,
    error::{OptimizerError, OptimizerResult},
    objective::{Evaluation, Objective},
    types::{DVector, Scalar},
};
use num_traits::Float;
use tracing::{debug, warn};

/// β formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConjugateGradientMethod {
    /// Fletcher-Reeves
    FletcherReeves,
    /// Polak-Ribière
    #[default]
    PolakRibiere,
    /// Hestenes-Stiefel
    HestenesStiefel,
    /// Dai-Yuan
    DaiYuan,
    /// max(−β_FR, min(β_PR, β_FR))
    HybridFletcherReevesPolakRibiere,
}

/// Configuration for conjugate gradient directions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CGConfig<T: Scalar> {
    /// The CG method variant to use
    pub method: ConjugateGradientMethod,
    /// Period for automatic restarts (0 = no automatic restart)
    pub restart_period: usize,
    /// Keep negative β instead of restarting
    pub allow_negative_beta: bool,
    /// Denominators with magnitude at or below this trigger a restart
    pub denominator_tolerance: T,
}

impl<T: Scalar> Default for CGConfig<T> {
    fn default() -> Self {
        Self {
            method: ConjugateGradientMethod::PolakRibiere,
            restart_period: 0,
            allow_negative_beta: false,
            denominator_tolerance: <T as Scalar>::from_f64(1e-30),
        }
    }
}

impl<T: Scalar> CGConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the CG method variant.
    pub fn with_method(mut self, method: ConjugateGradientMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the restart period (n means restart every n iterations).
    pub fn with_restart_period(mut self, period: usize) -> Self {
        self.restart_period = period;
        self
    }

    /// Keeps negative β values.
    pub fn with_negative_beta(mut self, allow: bool) -> Self {
        self.allow_negative_beta = allow;
        self
    }

    /// Creates a configuration for Fletcher-Reeves method.
    pub fn fletcher_reeves() -> Self {
        Self::new().with_method(ConjugateGradientMethod::FletcherReeves)
    }

    /// Creates a configuration for Polak-Ribière (PR+) method.
    pub fn polak_ribiere() -> Self {
        Self::new().with_method(ConjugateGradientMethod::PolakRibiere)
    }

    /// Creates a configuration for Hestenes-Stiefel method.
    pub fn hestenes_stiefel() -> Self {
        Self::new().with_method(ConjugateGradientMethod::HestenesStiefel)
    }

    /// Creates a configuration for Dai-Yuan method.
    pub fn dai_yuan() -> Self {
        Self::new().with_method(ConjugateGradientMethod::DaiYuan)
    }

    /// Creates a configuration for the hybrid FR-PR method.
    pub fn hybrid() -> Self {
        Self::new()
            .with_method(ConjugateGradientMethod::HybridFletcherReevesPolakRibiere)
            .with_negative_beta(true)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> OptimizerResult<()> {
        if self.denominator_tolerance < T::zero() {
            return Err(OptimizerError::invalid_configuration(
                "Denominator tolerance must be non-negative",
                "denominator_tolerance",
                self.denominator_tolerance.to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-run state of a conjugate gradient strategy.
#[derive(Debug, Clone)]
pub struct CgHistory<T: Scalar> {
    /// gₖ₋₁
    pub previous_gradient: Option<DVector<T>>,
    /// dₖ₋₁
    pub previous_direction: Option<DVector<T>>,
    /// Directions produced since the last steepest descent step
    pub iterations_since_restart: usize,
    /// Number of restarts after the first iteration
    pub restarts: usize,
}

/// Nonlinear conjugate gradient direction strategy.
#[derive(Debug, Clone, Default)]
pub struct ConjugateGradient<T: Scalar> {
    config: CGConfig<T>,
}

impl<T: Scalar> ConjugateGradient<T> {
    /// Creates a strategy with the given configuration.
    pub fn new(config: CGConfig<T>) -> Self {
        Self { config }
    }

    /// Fletcher-Reeves with default restarts.
    pub fn fletcher_reeves() -> Self {
        Self::new(CGConfig::fletcher_reeves())
    }

    /// PR+ with default restarts.
    pub fn polak_ribiere() -> Self {
        Self::new(CGConfig::polak_ribiere())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CGConfig<T> {
        &self.config
    }

    /// βₖ, or `None` when the formula breaks down.
    pub fn beta(
        &self,
        gradient: &DVector<T>,
        previous_gradient: &DVector<T>,
        previous_direction: &DVector<T>,
    ) -> Option<T> {
        let tol = self.config.denominator_tolerance;
        let ratio = |num: T, den: T| {
            if Float::abs(den) <= tol {
                None
            } else {
                Some(num / den)
            }
        };

        let y = gradient - previous_gradient;
        let gg = gradient.norm_squared();
        let gg_prev = previous_gradient.norm_squared();

        let beta = match self.config.method {
            ConjugateGradientMethod::FletcherReeves => ratio(gg, gg_prev)?,
            ConjugateGradientMethod::PolakRibiere => ratio(gradient.dot(&y), gg_prev)?,
            ConjugateGradientMethod::HestenesStiefel => {
                ratio(gradient.dot(&y), previous_direction.dot(&y))?
            }
            ConjugateGradientMethod::DaiYuan => ratio(gg, previous_direction.dot(&y))?,
            ConjugateGradientMethod::HybridFletcherReevesPolakRibiere => {
                let fr = ratio(gg, gg_prev)?;
                let pr = ratio(gradient.dot(&y), gg_prev)?;
                Float::max(-fr, Float::min(pr, fr))
            }
        };

        if !Float::is_finite(beta) {
            return None;
        }
        Some(beta)
    }
}

impl<T: Scalar> DirectionStrategy<T> for ConjugateGradient<T> {
    type History = CgHistory<T>;

    fn name(&self) -> &str {
        match self.config.method {
            ConjugateGradientMethod::FletcherReeves => "CG-FR",
            ConjugateGradientMethod::PolakRibiere => {
                if self.config.allow_negative_beta {
                    "CG-PR"
                } else {
                    "CG-PR+"
                }
            }
            ConjugateGradientMethod::HestenesStiefel => "CG-HS",
            ConjugateGradientMethod::DaiYuan => "CG-DY",
            ConjugateGradientMethod::HybridFletcherReevesPolakRibiere => "CG-Hybrid",
        }
    }

    fn validate(&self) -> OptimizerResult<()> {
        self.config.validate()
    }

    fn initial_history(&self, _dimension: usize) -> Self::History {
        CgHistory {
            previous_gradient: None,
            previous_direction: None,
            iterations_since_restart: 0,
            restarts: 0,
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
        let periodic = self.config.restart_period > 0
            && history.iterations_since_restart >= self.config.restart_period;

        let beta = match (&history.previous_gradient, &history.previous_direction) {
            (Some(g_prev), Some(d_prev)) if !periodic => {
                match self.beta(gradient, g_prev, d_prev) {
                    Some(b) if b < T::zero() && !self.config.allow_negative_beta => None,
                    other => other,
                }
            }
            _ => None,
        };

        let mut direction = -gradient;
        match beta {
            Some(b) => {
                if let Some(d_prev) = &history.previous_direction {
                    direction.axpy(b, d_prev, T::one());
                }
                history.iterations_since_restart += 1;
            }
            None => {
                if history.previous_direction.is_some() {
                    debug!(iteration = eval.iteration, periodic, "conjugate gradient restart");
                    history.restarts += 1;
                }
                history.iterations_since_restart = 1;
            }
        }

        if beta.is_some() && direction.dot(gradient) >= T::zero() {
            warn!(
                iteration = eval.iteration,
                method = self.name(),
                "conjugate direction is not a descent direction, restarting"
            );
            direction = -gradient;
            history.restarts += 1;
            history.iterations_since_restart = 1;
        }

        history.previous_gradient = Some(gradient.clone());
        history.previous_direction = Some(direction.clone());
        Ok((direction, history))
    }
}
