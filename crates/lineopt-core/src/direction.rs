//! Direction strategy interface.
//!
//! A direction strategy maps the oracle output at the current iterate and
//! its own history to a search direction. History is threaded explicitly:
//! [`DirectionStrategy::next_direction`] takes the previous history by value
//! and returns the updated one, so a strategy value holds configuration only
//! and can be shared by any number of independent runs.

use crate::{
    error::OptimizerResult,
    objective::{DerivativeOrder, Evaluation, Objective},
    types::{DVector, Scalar},
};
use std::fmt::Debug;

/// Trait for search direction strategies.
pub trait DirectionStrategy<T: Scalar>: Debug + Send + Sync {
    /// Per-run state: previous gradients, directions, curvature pairs...
    type History: Clone + Debug + Send;

    /// Strategy name for logging.
    fn name(&self) -> &str;

    /// Oracle information the strategy needs.
    fn required_order(&self) -> DerivativeOrder {
        DerivativeOrder::First
    }

    /// Whether the driver should attach the dense Hessian to each evaluation
    /// when the oracle provides one.
    fn wants_hessian_matrix(&self) -> bool {
        false
    }

    /// Whether directions with ⟨∇f, d⟩ ≥ 0 are legitimate output.
    fn allows_non_descent(&self) -> bool {
        false
    }

    /// Checks the configuration before a run starts.
    fn validate(&self) -> OptimizerResult<()> {
        Ok(())
    }

    /// History before the first iteration.
    fn initial_history(&self, dimension: usize) -> Self::History;

    /// Computes the direction at `eval.point`.
    fn next_direction<O>(
        &self,
        oracle: &O,
        eval: &Evaluation<T>,
        history: Self::History,
    ) -> OptimizerResult<(DVector<T>, Self::History)>
    where
        O: Objective<T> + ?Sized;
}
