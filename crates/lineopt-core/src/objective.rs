//! Objective oracle interface.
//!
//! An optimizer only ever talks to the objective through the [`Objective`]
//! trait: a black box that returns the value at a point and, depending on
//! its [`DerivativeOrder`], a gradient (or subgradient), a dense Hessian or
//! Hessian-vector products.
//!
//! The module also ships reference objectives used throughout the tests and
//! benchmarks, a [`CountingObjective`] adapter that tallies oracle calls,
//! and a finite-difference [`DerivativeChecker`].

use crate::{
    error::{OracleError, OracleResult},
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;
use std::cell::Cell;
use std::fmt::Debug;

/// Highest derivative an oracle can supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DerivativeOrder {
    /// Function values only.
    Zeroth,
    /// Values and gradients (or subgradients).
    First,
    /// Values, gradients and curvature (Hessian or Hessian-vector products).
    Second,
}

impl DerivativeOrder {
    /// Human readable name of the information this order adds.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Zeroth => "value",
            Self::First => "gradient",
            Self::Second => "Hessian",
        }
    }
}

/// Trait for objective oracles.
///
/// Implementations must be reentrant: the same oracle may be queried from
/// several independent runs at once, so evaluation must not rely on
/// interior mutation that is not thread safe.
pub trait Objective<T: Scalar>: Debug {
    /// Dimension `n` of the domain.
    fn dimension(&self) -> usize;

    /// Evaluates f(x).
    fn value(&self, x: &DVector<T>) -> OracleResult<T>;

    /// Evaluates ∇f(x), or any subgradient for nonsmooth objectives.
    fn gradient(&self, _x: &DVector<T>) -> OracleResult<DVector<T>> {
        Err(OracleError::unavailable("gradient"))
    }

    /// Evaluates f(x) and ∇f(x) together.
    ///
    /// Override when both share intermediate computations.
    fn value_and_gradient(&self, x: &DVector<T>) -> OracleResult<(T, DVector<T>)> {
        Ok((self.value(x)?, self.gradient(x)?))
    }

    /// Evaluates the dense Hessian ∇²f(x).
    fn hessian(&self, _x: &DVector<T>) -> OracleResult<DMatrix<T>> {
        Err(OracleError::unavailable("hessian"))
    }

    /// Computes ∇²f(x)·v.
    ///
    /// The default multiplies the dense Hessian; matrix-free oracles
    /// override this without providing [`Objective::hessian`].
    fn hessian_vector_product(&self, x: &DVector<T>, v: &DVector<T>) -> OracleResult<DVector<T>> {
        Ok(self.hessian(x)? * v)
    }

    /// Highest derivative the oracle supplies.
    fn order(&self) -> DerivativeOrder {
        DerivativeOrder::First
    }

    /// Whether [`Objective::hessian`] returns a dense matrix.
    ///
    /// Second-order oracles that return `false` are assumed to implement
    /// [`Objective::hessian_vector_product`] only.
    fn has_hessian_matrix(&self) -> bool {
        false
    }

    /// Known optimal value f*, used for gap reporting.
    fn optimal_value(&self) -> Option<T> {
        None
    }
}

impl<T: Scalar, O: Objective<T> + ?Sized> Objective<T> for &O {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn value(&self, x: &DVector<T>) -> OracleResult<T> {
        (**self).value(x)
    }

    fn gradient(&self, x: &DVector<T>) -> OracleResult<DVector<T>> {
        (**self).gradient(x)
    }

    fn value_and_gradient(&self, x: &DVector<T>) -> OracleResult<(T, DVector<T>)> {
        (**self).value_and_gradient(x)
    }

    fn hessian(&self, x: &DVector<T>) -> OracleResult<DMatrix<T>> {
        (**self).hessian(x)
    }

    fn hessian_vector_product(&self, x: &DVector<T>, v: &DVector<T>) -> OracleResult<DVector<T>> {
        (**self).hessian_vector_product(x, v)
    }

    fn order(&self) -> DerivativeOrder {
        (**self).order()
    }

    fn has_hessian_matrix(&self) -> bool {
        (**self).has_hessian_matrix()
    }

    fn optimal_value(&self) -> Option<T> {
        (**self).optimal_value()
    }
}

/// Oracle output at one iterate.
///
/// Produced fresh by the driver at every iteration. The Hessian is only
/// filled in when the direction strategy asks for second-order information
/// and the oracle exposes a dense matrix.
#[derive(Debug, Clone)]
pub struct Evaluation<T: Scalar> {
    /// The iterate x_k
    pub point: DVector<T>,
    /// f(x_k)
    pub value: T,
    /// ∇f(x_k) or a subgradient
    pub gradient: DVector<T>,
    /// ∇²f(x_k) when requested and available
    pub hessian: Option<DMatrix<T>>,
    /// Iteration index k
    pub iteration: usize,
}

impl<T: Scalar> Evaluation<T> {
    /// Builds an evaluation after checking that value and gradient are finite.
    pub fn new(
        point: DVector<T>,
        value: T,
        gradient: DVector<T>,
        iteration: usize,
    ) -> OracleResult<Self> {
        if !Float::is_finite(value) {
            return Err(OracleError::non_finite("value"));
        }
        if gradient.len() != point.len() {
            return Err(OracleError::dimension_mismatch(point.len(), gradient.len()));
        }
        if gradient.iter().any(|g| !Float::is_finite(*g)) {
            return Err(OracleError::non_finite("gradient"));
        }
        Ok(Self {
            point,
            value,
            gradient,
            hessian: None,
            iteration,
        })
    }

    /// Queries the oracle at `point`.
    pub fn from_oracle<O>(oracle: &O, point: DVector<T>, iteration: usize) -> OracleResult<Self>
    where
        O: Objective<T> + ?Sized,
    {
        let (value, gradient) = oracle.value_and_gradient(&point)?;
        Self::new(point, value, gradient, iteration)
    }

    /// Attaches a dense Hessian.
    pub fn with_hessian(mut self, hessian: DMatrix<T>) -> Self {
        self.hessian = Some(hessian);
        self
    }

    /// Euclidean norm of the gradient.
    pub fn gradient_norm(&self) -> T {
        self.gradient.norm()
    }

    /// Dimension of the iterate.
    pub fn dimension(&self) -> usize {
        self.point.len()
    }
}

/// Convex quadratic test objective.
///
/// Computes f(x) = ½ xᵀQx − qᵀx + c for a symmetric matrix Q.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuadraticObjective<T: Scalar> {
    /// The quadratic form matrix (symmetric)
    pub q: DMatrix<T>,
    /// The linear term
    pub linear: DVector<T>,
    /// The constant term
    pub constant: T,
}

impl<T: Scalar> QuadraticObjective<T> {
    /// Creates a new quadratic objective.
    pub fn new(q: DMatrix<T>, linear: DVector<T>, constant: T) -> OracleResult<Self> {
        if q.nrows() != q.ncols() {
            return Err(OracleError::dimension_mismatch(q.nrows(), q.ncols()));
        }
        if linear.len() != q.nrows() {
            return Err(OracleError::dimension_mismatch(q.nrows(), linear.len()));
        }
        Ok(Self {
            q,
            linear,
            constant,
        })
    }

    /// Diagonal quadratic Σ ½ dᵢ xᵢ² − qᵢ xᵢ + c.
    pub fn diagonal(diagonal: &[T], linear: &[T], constant: T) -> OracleResult<Self> {
        let q = DMatrix::from_diagonal(&DVector::from_column_slice(diagonal));
        Self::new(q, DVector::from_column_slice(linear), constant)
    }

    /// Analytic minimizer Q⁻¹q, if Q is positive definite.
    pub fn minimizer(&self) -> Option<DVector<T>> {
        self.q.clone().cholesky().map(|chol| chol.solve(&self.linear))
    }
}

impl<T: Scalar> Objective<T> for QuadraticObjective<T> {
    fn dimension(&self) -> usize {
        self.linear.len()
    }

    fn value(&self, x: &DVector<T>) -> OracleResult<T> {
        check_dimension(self.dimension(), x)?;
        let half = <T as Scalar>::from_f64(0.5);
        Ok(x.dot(&(&self.q * x)) * half - self.linear.dot(x) + self.constant)
    }

    fn value_and_gradient(&self, x: &DVector<T>) -> OracleResult<(T, DVector<T>)> {
        check_dimension(self.dimension(), x)?;
        let qx = &self.q * x;
        let half = <T as Scalar>::from_f64(0.5);
        let value = x.dot(&qx) * half - self.linear.dot(x) + self.constant;
        Ok((value, qx - &self.linear))
    }

    fn gradient(&self, x: &DVector<T>) -> OracleResult<DVector<T>> {
        check_dimension(self.dimension(), x)?;
        Ok(&self.q * x - &self.linear)
    }

    fn hessian(&self, _x: &DVector<T>) -> OracleResult<DMatrix<T>> {
        Ok(self.q.clone())
    }

    fn hessian_vector_product(&self, _x: &DVector<T>, v: &DVector<T>) -> OracleResult<DVector<T>> {
        Ok(&self.q * v)
    }

    fn order(&self) -> DerivativeOrder {
        DerivativeOrder::Second
    }

    fn has_hessian_matrix(&self) -> bool {
        true
    }

    fn optimal_value(&self) -> Option<T> {
        let half = <T as Scalar>::from_f64(0.5);
        self.minimizer()
            .map(|x| self.constant - half * self.linear.dot(&x))
    }
}

/// Extended Rosenbrock function.
///
/// f(x) = Σᵢ b (xᵢ₊₁ − xᵢ²)² + (a − xᵢ)², minimized at (a, a², ...) for
/// n = 2 and at (1, ..., 1) for the standard a = 1.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rosenbrock<T: Scalar> {
    dimension: usize,
    /// Shift parameter a
    pub a: T,
    /// Valley steepness b
    pub b: T,
}

impl<T: Scalar> Rosenbrock<T> {
    /// The classic two-dimensional function with a = 1, b = 100.
    pub fn new() -> Self {
        Self::with_dimension(2)
    }

    /// Standard parameters in `dimension` variables.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(2),
            a: T::one(),
            b: <T as Scalar>::from_f64(100.0),
        }
    }
}

impl<T: Scalar> Default for Rosenbrock<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> Objective<T> for Rosenbrock<T> {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn value(&self, x: &DVector<T>) -> OracleResult<T> {
        check_dimension(self.dimension, x)?;
        let mut f = T::zero();
        for i in 0..self.dimension.saturating_sub(1) {
            let r = x[i + 1] - x[i] * x[i];
            let s = self.a - x[i];
            f += self.b * r * r + s * s;
        }
        Ok(f)
    }

    fn gradient(&self, x: &DVector<T>) -> OracleResult<DVector<T>> {
        check_dimension(self.dimension, x)?;
        let two = <T as Scalar>::from_f64(2.0);
        let four = <T as Scalar>::from_f64(4.0);
        let mut g = DVector::zeros(self.dimension);
        for i in 0..self.dimension.saturating_sub(1) {
            let r = x[i + 1] - x[i] * x[i];
            g[i] -= four * self.b * x[i] * r + two * (self.a - x[i]);
            g[i + 1] += two * self.b * r;
        }
        Ok(g)
    }

    fn hessian(&self, x: &DVector<T>) -> OracleResult<DMatrix<T>> {
        check_dimension(self.dimension, x)?;
        let two = <T as Scalar>::from_f64(2.0);
        let four = <T as Scalar>::from_f64(4.0);
        let twelve = <T as Scalar>::from_f64(12.0);
        let mut h = DMatrix::zeros(self.dimension, self.dimension);
        for i in 0..self.dimension.saturating_sub(1) {
            h[(i, i)] += twelve * self.b * x[i] * x[i] - four * self.b * x[i + 1] + two;
            h[(i, i + 1)] -= four * self.b * x[i];
            h[(i + 1, i)] -= four * self.b * x[i];
            h[(i + 1, i + 1)] += two * self.b;
        }
        Ok(h)
    }

    fn order(&self) -> DerivativeOrder {
        DerivativeOrder::Second
    }

    fn has_hessian_matrix(&self) -> bool {
        true
    }

    fn optimal_value(&self) -> Option<T> {
        Some(T::zero())
    }
}

/// Weighted ℓ₁ distance f(x) = Σ wᵢ |xᵢ − cᵢ|.
///
/// Nonsmooth at the center; [`Objective::gradient`] returns the subgradient
/// wᵢ·sign(xᵢ − cᵢ) with 0 on the kinks.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightedL1<T: Scalar> {
    /// Non-negative weights
    pub weights: DVector<T>,
    /// Minimizer
    pub center: DVector<T>,
}

impl<T: Scalar> WeightedL1<T> {
    /// Creates a weighted ℓ₁ objective.
    pub fn new(weights: DVector<T>, center: DVector<T>) -> OracleResult<Self> {
        if weights.len() != center.len() {
            return Err(OracleError::dimension_mismatch(center.len(), weights.len()));
        }
        Ok(Self { weights, center })
    }
}

impl<T: Scalar> Objective<T> for WeightedL1<T> {
    fn dimension(&self) -> usize {
        self.center.len()
    }

    fn value(&self, x: &DVector<T>) -> OracleResult<T> {
        check_dimension(self.dimension(), x)?;
        Ok(self
            .weights
            .iter()
            .zip(x.iter().zip(self.center.iter()))
            .fold(T::zero(), |acc, (w, (xi, ci))| acc + *w * Float::abs(*xi - *ci)))
    }

    fn gradient(&self, x: &DVector<T>) -> OracleResult<DVector<T>> {
        check_dimension(self.dimension(), x)?;
        Ok(DVector::from_iterator(
            x.len(),
            self.weights
                .iter()
                .zip(x.iter().zip(self.center.iter()))
                .map(|(w, (xi, ci))| {
                    let diff = *xi - *ci;
                    if diff > T::zero() {
                        *w
                    } else if diff < T::zero() {
                        -*w
                    } else {
                        T::zero()
                    }
                }),
        ))
    }

    fn optimal_value(&self) -> Option<T> {
        Some(T::zero())
    }
}

fn check_dimension<T: Scalar>(expected: usize, x: &DVector<T>) -> OracleResult<()> {
    if x.len() == expected {
        Ok(())
    } else {
        Err(OracleError::dimension_mismatch(expected, x.len()))
    }
}

/// Wrapper counting oracle evaluations.
///
/// The driver wraps every oracle in one of these for the duration of a run,
/// so line-search trial evaluations count against the evaluation budget.
/// Counters use [`Cell`] and are therefore per-run.
#[derive(Debug)]
pub struct CountingObjective<O> {
    inner: O,
    value_count: Cell<usize>,
    gradient_count: Cell<usize>,
    hessian_count: Cell<usize>,
}

impl<O> CountingObjective<O> {
    /// Creates a new counting wrapper around an objective.
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            value_count: Cell::new(0),
            gradient_count: Cell::new(0),
            hessian_count: Cell::new(0),
        }
    }

    /// Resets all counters to zero.
    pub fn reset_counts(&self) {
        self.value_count.set(0);
        self.gradient_count.set(0);
        self.hessian_count.set(0);
    }

    /// Returns (values, gradients, Hessians or Hessian-vector products).
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.value_count.get(),
            self.gradient_count.get(),
            self.hessian_count.get(),
        )
    }

    /// Returns the wrapped objective.
    pub fn into_inner(self) -> O {
        self.inner
    }

    fn bump(cell: &Cell<usize>) {
        cell.set(cell.get() + 1);
    }
}

impl<T: Scalar, O: Objective<T>> Objective<T> for CountingObjective<O> {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn value(&self, x: &DVector<T>) -> OracleResult<T> {
        Self::bump(&self.value_count);
        self.inner.value(x)
    }

    fn gradient(&self, x: &DVector<T>) -> OracleResult<DVector<T>> {
        Self::bump(&self.gradient_count);
        self.inner.gradient(x)
    }

    fn value_and_gradient(&self, x: &DVector<T>) -> OracleResult<(T, DVector<T>)> {
        Self::bump(&self.value_count);
        Self::bump(&self.gradient_count);
        self.inner.value_and_gradient(x)
    }

    fn hessian(&self, x: &DVector<T>) -> OracleResult<DMatrix<T>> {
        Self::bump(&self.hessian_count);
        self.inner.hessian(x)
    }

    fn hessian_vector_product(&self, x: &DVector<T>, v: &DVector<T>) -> OracleResult<DVector<T>> {
        Self::bump(&self.hessian_count);
        self.inner.hessian_vector_product(x, v)
    }

    fn order(&self) -> DerivativeOrder {
        self.inner.order()
    }

    fn has_hessian_matrix(&self) -> bool {
        self.inner.has_hessian_matrix()
    }

    fn optimal_value(&self) -> Option<T> {
        self.inner.optimal_value()
    }
}

/// Utilities for checking gradient implementations.
pub struct DerivativeChecker;

impl DerivativeChecker {
    /// Central finite-difference gradient.
    pub fn finite_difference_gradient<T, O>(oracle: &O, x: &DVector<T>) -> OracleResult<DVector<T>>
    where
        T: Scalar,
        O: Objective<T> + ?Sized,
    {
        let h = <T as Float>::sqrt(<T as Scalar>::EPSILON);
        let two = <T as Scalar>::from_f64(2.0);
        let mut gradient = DVector::zeros(x.len());
        let mut probe = x.clone();
        for i in 0..x.len() {
            let original = probe[i];
            let step = h * Float::max(T::one(), Float::abs(original));
            probe[i] = original + step;
            let f_plus = oracle.value(&probe)?;
            probe[i] = original - step;
            let f_minus = oracle.value(&probe)?;
            probe[i] = original;
            gradient[i] = (f_plus - f_minus) / (two * step);
        }
        Ok(gradient)
    }

    /// Checks the analytic gradient against finite differences.
    ///
    /// Returns whether the relative error is below `tol`, and the error.
    pub fn check_gradient<T, O>(oracle: &O, x: &DVector<T>, tol: T) -> OracleResult<(bool, T)>
    where
        T: Scalar,
        O: Objective<T> + ?Sized,
    {
        let analytic = oracle.gradient(x)?;
        let numeric = Self::finite_difference_gradient(oracle, x)?;
        let scale = Float::max(T::one(), analytic.norm());
        let error = (analytic - numeric).norm() / scale;
        Ok((error < tol, error))
    }
}
