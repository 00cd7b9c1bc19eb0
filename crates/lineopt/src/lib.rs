//! # lineopt
//!
//! Line-search based unconstrained minimization of smooth (and some
//! nonsmooth convex) functions on ℝⁿ.
//!
//! A run combines three pieces:
//!
//! - an **oracle** implementing [`Objective`](lineopt_core::objective::Objective),
//!   supplying values and, where available, gradients and Hessians
//! - a **direction strategy**: steepest descent, subgradient, nonlinear
//!   conjugate gradient, heavy ball, Newton or BFGS
//! - a **line search**: exact (quadratics), Armijo backtracking,
//!   Armijo–Wolfe, or a prescribed step schedule
//!
//! ## Quick Start
//!
//! ```rust
//! use lineopt::prelude::*;
//!
//! // f(x, y) = (x − 1)² + 2(y + 2)²
//! let f = QuadraticObjective::diagonal(&[2.0, 4.0], &[2.0, -8.0], 9.0).unwrap();
//! let x0: DVector<f64> = DVector::zeros(2);
//!
//! let (point, status, _iterations) =
//!     run(&f, &x0, &SteepestDescent, &Armijo::backtracking(), 1000, 1e-6)
//!         .unwrap()
//!         .into_parts();
//!
//! assert_eq!(status, TerminationReason::Converged);
//! assert!((point[0] - 1.0).abs() < 1e-5);
//! ```
//!
//! ## Features
//!
//! - `parallel` (default): independent multi-start runs with rayon
//! - `serde`: serialization of configurations and statuses

#![warn(missing_docs)]

pub use lineopt_core;
pub use lineopt_optim;

// Re-export nalgebra for convenience
pub use nalgebra;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use lineopt_core::prelude::*;
    pub use lineopt_optim::{
        minimize, run, Bfgs, BfgsConfig, CGConfig, ConjugateGradient, ConjugateGradientMethod,
        Driver, HeavyBall, HeavyBallConfig, MomentumCoefficient, MomentumTerm, Newton,
        NewtonConfig, NewtonFallback, SteepestDescent, Subgradient,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_prelude_covers_a_full_run() {
        let f = Rosenbrock::new();
        let driver = Driver::new(Bfgs::default(), ArmijoWolfe::weak()).with_max_iterations(500);
        let result = driver.minimize(&f, &DVector::from_vec(vec![-1.2, 1.0])).unwrap();

        assert_eq!(result.termination_reason, TerminationReason::Converged);
        assert_relative_eq!(result.point[0], 1.0, epsilon = 1e-4);
    }
}
