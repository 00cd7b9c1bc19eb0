//! Steepest descent and subgradient directions.
//!
//! Both produce d = −g. They differ in what g is and in what the driver may
//! assume about it: for steepest descent g = ∇f(x) and d is a descent
//! direction at every non-stationary point; for the subgradient method g is
//! an arbitrary subgradient of a nonsmooth convex f, −g need not decrease f,
//! and the step must come from a diminishing schedule
//! ([`ScheduledStep`](lineopt_core::line_search::ScheduledStep)).

use lineopt_core::{
    direction::DirectionStrategy,
    error::OptimizerResult,
    objective::{Evaluation, Objective},
    types::{DVector, Scalar},
};

/// d = −∇f(x).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SteepestDescent;

impl SteepestDescent {
    /// Creates the strategy.
    pub fn new() -> Self {
        Self
    }
}

impl<T: Scalar> DirectionStrategy<T> for SteepestDescent {
    type History = ();

    fn name(&self) -> &str {
        "SteepestDescent"
    }

    fn initial_history(&self, _dimension: usize) -> Self::History {}

    fn next_direction<O>(
        &self,
        _oracle: &O,
        eval: &Evaluation<T>,
        history: Self::History,
    ) -> OptimizerResult<(DVector<T>, Self::History)>
    where
        O: Objective<T> + ?Sized,
    {
        Ok((-&eval.gradient, history))
    }
}

/// d = −g for a subgradient g ∈ ∂f(x).
///
/// Permits non-descent directions; pair it with a scheduled step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subgradient;

impl Subgradient {
    /// Creates the strategy.
    pub fn new() -> Self {
        Self
    }
}

impl<T: Scalar> DirectionStrategy<T> for Subgradient {
    type History = ();

    fn name(&self) -> &str {
        "Subgradient"
    }

    fn allows_non_descent(&self) -> bool {
        true
    }

    fn initial_history(&self, _dimension: usize) -> Self::History {}

    fn next_direction<O>(
        &self,
        _oracle: &O,
        eval: &Evaluation<T>,
        history: Self::History,
    ) -> OptimizerResult<(DVector<T>, Self::History)>
    where
        O: Objective<T> + ?Sized,
    {
        Ok((-&eval.gradient, history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineopt_core::objective::Rosenbrock;

    #[test]
    fn test_steepest_descent_is_negative_gradient() {
        let f = Rosenbrock::<f64>::new();
        let eval = Evaluation::from_oracle(&f, DVector::from_vec(vec![-1.2, 1.0]), 0).unwrap();
        let (d, ()) = SteepestDescent.next_direction(&f, &eval, ()).unwrap();
        assert_eq!(d, -&eval.gradient);
        assert!(d.dot(&eval.gradient) < 0.0);
        assert!(!DirectionStrategy::<f64>::allows_non_descent(&SteepestDescent));
    }

    #[test]
    fn test_subgradient_allows_non_descent() {
        assert!(DirectionStrategy::<f64>::allows_non_descent(&Subgradient));
        assert_eq!(DirectionStrategy::<f64>::name(&Subgradient), "Subgradient");
    }
}
