//! Newton directions.
//!
//! The Newton direction solves ∇²f(x) d = −∇f(x). When the oracle exposes a
//! dense Hessian the system is solved by Cholesky factorization; otherwise it
//! is solved matrix-free by conjugate gradient on Hessian-vector products.
//!
//! Both solvers fail on a Hessian that is not positive definite. By default
//! the failure is reported as `SingularHessian`; with
//! [`NewtonFallback::SteepestDescent`] the strategy takes −∇f(x) for that
//! iteration instead.

use lineopt_core::{
    direction::DirectionStrategy,
    error::{OptimizerError, OptimizerResult},
    numerical::{cholesky_solve, conjugate_gradient_solve, regularize_diagonal},
    objective::{DerivativeOrder, Evaluation, Objective},
    types::{DVector, Scalar},
};
use tracing::{debug, warn};

/// What to do when the Newton system has no positive definite solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NewtonFallback {
    /// Fail with `SingularHessian`
    #[default]
    None,
    /// Use −∇f(x) for this iteration
    SteepestDescent,
}

/// Configuration for the Newton direction
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewtonConfig<T: Scalar> {
    /// Behavior on indefinite or singular Hessians
    pub fallback: NewtonFallback,
    /// Regularization μ: solves (∇²f + μI) d = −∇f
    pub hessian_regularization: T,
    /// Maximum number of CG iterations for the matrix-free solve
    pub max_cg_iterations: usize,
    /// Relative residual tolerance for the matrix-free solve
    pub cg_tolerance: T,
}

impl<T: Scalar> Default for NewtonConfig<T> {
    fn default() -> Self {
        Self {
            fallback: NewtonFallback::None,
            hessian_regularization: T::zero(),
            max_cg_iterations: 100,
            cg_tolerance: <T as Scalar>::from_f64(1e-10),
        }
    }
}

impl<T: Scalar> NewtonConfig<T> {
    /// Create a new Newton configuration with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback policy
    pub fn with_fallback(mut self, fallback: NewtonFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set the Hessian regularization parameter
    pub fn with_regularization(mut self, reg: T) -> Self {
        self.hessian_regularization = reg;
        self
    }

    /// Set CG solver parameters
    pub fn with_cg_params(mut self, max_iter: usize, tol: T) -> Self {
        self.max_cg_iterations = max_iter;
        self.cg_tolerance = tol;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> OptimizerResult<()> {
        if self.hessian_regularization < T::zero() {
            return Err(OptimizerError::invalid_configuration(
                "Hessian regularization must be non-negative",
                "hessian_regularization",
                self.hessian_regularization.to_string(),
            ));
        }
        if self.max_cg_iterations == 0 || self.cg_tolerance <= T::zero() {
            return Err(OptimizerError::invalid_configuration(
                "CG solver needs at least one iteration and a positive tolerance",
                "max_cg_iterations",
                format!("{} (tol {})", self.max_cg_iterations, self.cg_tolerance),
            ));
        }
        Ok(())
    }
}

/// Per-run state of the Newton strategy.
#[derive(Debug, Clone, Default)]
pub struct NewtonHistory {
    /// Iterations that fell back to steepest descent
    pub fallbacks: usize,
    /// Hessian-vector products spent in matrix-free solves
    pub cg_iterations: usize,
}

/// Newton direction strategy.
#[derive(Debug, Clone, Default)]
pub struct Newton<T: Scalar> {
    config: NewtonConfig<T>,
}

impl<T: Scalar> Newton<T> {
    /// Create a new Newton strategy
    pub fn new(config: NewtonConfig<T>) -> Self {
        Self { config }
    }

    /// Newton with a steepest descent fallback.
    pub fn with_steepest_descent_fallback() -> Self {
        Self::new(NewtonConfig::new().with_fallback(NewtonFallback::SteepestDescent))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &NewtonConfig<T> {
        &self.config
    }

    /// Solves the (regularized) Newton system at `eval`.
    fn solve<O>(
        &self,
        oracle: &O,
        eval: &Evaluation<T>,
        history: &mut NewtonHistory,
    ) -> OptimizerResult<DVector<T>>
    where
        O: Objective<T> + ?Sized,
    {
        let rhs = -&eval.gradient;
        match &eval.hessian {
            Some(hessian) => {
                let mut h = hessian.clone();
                regularize_diagonal(&mut h, self.config.hessian_regularization);
                cholesky_solve(&h, &rhs)
            }
            None => {
                let solution = conjugate_gradient_solve(
                    |v| oracle.hessian_vector_product(&eval.point, v),
                    &rhs,
                    self.config.hessian_regularization,
                    self.config.max_cg_iterations,
                    self.config.cg_tolerance,
                )?;
                history.cg_iterations += solution.iterations;
                if !solution.converged {
                    debug!(
                        iteration = eval.iteration,
                        residual = solution.residual_norm.to_f64(),
                        "truncated Newton solve"
                    );
                }
                Ok(solution.solution)
            }
        }
    }
}

impl<T: Scalar> DirectionStrategy<T> for Newton<T> {
    type History = NewtonHistory;

    fn name(&self) -> &str {
        "Newton"
    }

    fn required_order(&self) -> DerivativeOrder {
        DerivativeOrder::Second
    }

    fn wants_hessian_matrix(&self) -> bool {
        true
    }

    fn validate(&self) -> OptimizerResult<()> {
        self.config.validate()
    }

    fn initial_history(&self, _dimension: usize) -> Self::History {
        NewtonHistory::default()
    }

    fn next_direction<O>(
        &self,
        oracle: &O,
        eval: &Evaluation<T>,
        mut history: Self::History,
    ) -> OptimizerResult<(DVector<T>, Self::History)>
    where
        O: Objective<T> + ?Sized,
    {
        match self.solve(oracle, eval, &mut history) {
            Ok(direction) => Ok((direction, history)),
            Err(err @ OptimizerError::SingularHessian { .. }) => match self.config.fallback {
                NewtonFallback::None => Err(err),
                NewtonFallback::SteepestDescent => {
                    warn!(
                        iteration = eval.iteration,
                        error = %err,
                        "Newton system unsolvable, using the negative gradient"
                    );
                    history.fallbacks += 1;
                    Ok((-&eval.gradient, history))
                }
            },
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lineopt_core::objective::{QuadraticObjective, Rosenbrock};

    /// Quadratic exposing only Hessian-vector products.
    #[derive(Debug)]
    struct MatrixFree(QuadraticObjective<f64>);

    impl Objective<f64> for MatrixFree {
        fn dimension(&self) -> usize {
            self.0.dimension()
        }

        fn value(&self, x: &DVector<f64>) -> lineopt_core::error::OracleResult<f64> {
            self.0.value(x)
        }

        fn gradient(&self, x: &DVector<f64>) -> lineopt_core::error::OracleResult<DVector<f64>> {
            self.0.gradient(x)
        }

        fn hessian_vector_product(
            &self,
            x: &DVector<f64>,
            v: &DVector<f64>,
        ) -> lineopt_core::error::OracleResult<DVector<f64>> {
            self.0.hessian_vector_product(x, v)
        }

        fn order(&self) -> DerivativeOrder {
            DerivativeOrder::Second
        }
    }

    fn with_hessian<O: Objective<f64>>(f: &O, x: Vec<f64>) -> Evaluation<f64> {
        let eval = Evaluation::from_oracle(f, DVector::from_vec(x), 0).unwrap();
        let h = f.hessian(&eval.point).unwrap();
        eval.with_hessian(h)
    }

    #[test]
    fn test_dense_newton_step_reaches_minimizer() {
        let f = QuadraticObjective::diagonal(&[2.0, 4.0], &[2.0, -8.0], 9.0).unwrap();
        let eval = with_hessian(&f, vec![0.0, 0.0]);
        let newton = Newton::default();
        let (d, _) = newton.next_direction(&f, &eval, NewtonHistory::default()).unwrap();
        assert_relative_eq!(d[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(d[1], -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_free_newton_step() {
        let q = QuadraticObjective::diagonal(&[2.0, 4.0], &[2.0, -8.0], 9.0).unwrap();
        let f = MatrixFree(q);
        let eval = Evaluation::from_oracle(&f, DVector::from_vec(vec![0.0, 0.0]), 0).unwrap();
        let (d, history) = Newton::default()
            .next_direction(&f, &eval, NewtonHistory::default())
            .unwrap();
        assert_relative_eq!(d[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(d[1], -2.0, epsilon = 1e-8);
        assert!(history.cg_iterations <= 2);
    }

    #[test]
    fn test_indefinite_hessian_is_singular() {
        let f = Rosenbrock::<f64>::new();
        let eval = with_hessian(&f, vec![0.0, 1.0]);
        let result = Newton::default().next_direction(&f, &eval, NewtonHistory::default());
        assert!(matches!(
            result,
            Err(OptimizerError::SingularHessian { .. })
        ));
    }

    #[test]
    fn test_steepest_descent_fallback() {
        let f = Rosenbrock::<f64>::new();
        let eval = with_hessian(&f, vec![0.0, 1.0]);
        let (d, history) = Newton::with_steepest_descent_fallback()
            .next_direction(&f, &eval, NewtonHistory::default())
            .unwrap();
        assert_eq!(d, -&eval.gradient);
        assert_eq!(history.fallbacks, 1);
    }

    #[test]
    fn test_config_validation() {
        assert!(NewtonConfig::<f64>::new().validate().is_ok());
        assert!(NewtonConfig::<f64>::new()
            .with_regularization(-1.0)
            .validate()
            .is_err());
        assert!(NewtonConfig::<f64>::new()
            .with_cg_params(0, 1e-6)
            .validate()
            .is_err());
    }
}
