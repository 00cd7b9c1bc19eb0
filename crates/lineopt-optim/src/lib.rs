//! Direction strategies and the optimization driver.
//!
//! This crate provides concrete search directions built on the traits of
//! `lineopt-core`, and the loop that combines a direction with a line search.
//!
//! # Available Directions
//!
//! - **Steepest descent**: d = −∇f
//! - **Subgradient**: d = −g for nonsmooth convex objectives
//! - **Conjugate gradient**: Fletcher-Reeves, Polak-Ribière, Hestenes-Stiefel,
//!   Dai-Yuan and a hybrid FR-PR rule
//! - **Heavy ball**: gradient plus Polyak momentum
//! - **Newton**: dense Cholesky or matrix-free CG solve of ∇²f d = −∇f
//! - **BFGS**: quasi-Newton inverse Hessian approximation
//!
//! # Examples
//!
//! ```rust
//! use lineopt_core::prelude::*;
//! use lineopt_optim::{Bfgs, Driver};
//!
//! let f = Rosenbrock::new();
//! let driver = Driver::new(Bfgs::default(), ArmijoWolfe::weak())
//!     .with_criterion(
//!         StoppingCriterion::new()
//!             .with_max_iterations(500)
//!             .with_gradient_tolerance(1e-6),
//!     );
//!
//! let result = driver.minimize(&f, &DVector::from_vec(vec![-1.2, 1.0])).unwrap();
//! assert!(result.converged);
//! ```

#![warn(missing_docs)]

pub mod bfgs;
pub mod conjugate_gradient;
pub mod driver;
pub mod heavy_ball;
pub mod newton;
pub mod steepest_descent;

// Re-export main strategies for convenience
pub use bfgs::{bfgs_inverse_update, Bfgs, BfgsConfig, BfgsHistory};
pub use conjugate_gradient::{CGConfig, CgHistory, ConjugateGradient, ConjugateGradientMethod};
pub use driver::{minimize, run, Driver};
pub use heavy_ball::{
    HeavyBall, HeavyBallConfig, HeavyBallHistory, MomentumCoefficient, MomentumTerm,
};
pub use newton::{Newton, NewtonConfig, NewtonFallback, NewtonHistory};
pub use steepest_descent::{SteepestDescent, Subgradient};

// Re-export commonly used items from core
pub use lineopt_core::{
    line_search::{Armijo, ArmijoWolfe, ExactQuadratic, LineSearchParams, ScheduledStep},
    optimizer::{OptimizationResult, StoppingCriterion, TerminationReason},
    step_size::StepSizeSchedule,
};
