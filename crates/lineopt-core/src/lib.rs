//! Core traits and types for line-search based unconstrained optimization.
//!
//! This crate provides the building blocks shared by every algorithm:
//!
//! - [`objective::Objective`]: the oracle interface (value, gradient,
//!   Hessian or Hessian-vector products)
//! - [`line_search`]: exact, Armijo, Armijo–Wolfe and scheduled step rules
//! - [`direction::DirectionStrategy`]: the interface implemented by steepest
//!   descent, conjugate gradient, quasi-Newton and Newton directions
//! - [`optimizer`]: stopping rules, termination statuses and run results
//! - [`callback`]: iteration hooks and cooperative cancellation
//!
//! Concrete direction strategies and the driver live in `lineopt-optim`.

#![warn(missing_docs)]

pub mod callback;
pub mod direction;
pub mod error;
pub mod line_search;
pub mod numerical;
pub mod objective;
pub mod optimizer;
pub mod step_size;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::callback::{
        CallbackInfo, NoOpCallback, OptimizationCallback, RecordingCallback, StopAfter, StopFlag,
    };
    pub use crate::direction::DirectionStrategy;
    pub use crate::error::{OptimizerError, OptimizerResult, OracleError, OracleResult};
    pub use crate::line_search::{
        Armijo, ArmijoWolfe, CurvatureCondition, ExactQuadratic, LineSearch, LineSearchContext,
        LineSearchMethod, LineSearchOutcome, LineSearchParams, ScheduledStep,
    };
    pub use crate::objective::{
        CountingObjective, DerivativeOrder, Evaluation, Objective, QuadraticObjective, Rosenbrock,
        WeightedL1,
    };
    pub use crate::optimizer::{
        OptimizationResult, StoppingCriterion, TerminationReason, ToleranceMode,
    };
    pub use crate::step_size::StepSizeSchedule;
    pub use crate::types::{DMatrix, DVector, Scalar};
}
