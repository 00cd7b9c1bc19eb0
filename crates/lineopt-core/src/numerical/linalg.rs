//! Dense and matrix-free linear algebra helpers.

use crate::{
    error::{OptimizerError, OptimizerResult, OracleResult},
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;

/// Solves A x = b for a symmetric positive definite A via Cholesky.
///
/// Fails with `SingularHessian` when the factorization breaks down, which is
/// exactly the case where A is not positive definite.
pub fn cholesky_solve<T: Scalar>(a: &DMatrix<T>, b: &DVector<T>) -> OptimizerResult<DVector<T>> {
    if a.nrows() != a.ncols() || a.nrows() != b.len() {
        return Err(OptimizerError::dimension_mismatch(a.nrows(), b.len()));
    }
    a.clone()
        .cholesky()
        .map(|chol| chol.solve(b))
        .ok_or_else(|| OptimizerError::singular_hessian("matrix is not positive definite"))
}

/// Checks |aᵢⱼ − aⱼᵢ| within a relative tolerance.
pub fn is_symmetric<T: Scalar>(a: &DMatrix<T>, tol: T) -> bool {
    if a.nrows() != a.ncols() {
        return false;
    }
    for i in 0..a.nrows() {
        for j in (i + 1)..a.ncols() {
            if !approx::relative_eq!(a[(i, j)], a[(j, i)], epsilon = tol, max_relative = tol) {
                return false;
            }
        }
    }
    true
}

/// Whether a symmetric matrix admits a Cholesky factorization.
pub fn is_positive_definite<T: Scalar>(a: &DMatrix<T>) -> bool {
    a.nrows() == a.ncols() && a.clone().cholesky().is_some()
}

/// Replaces A by (A + Aᵀ)/2.
pub fn symmetrize<T: Scalar>(a: &mut DMatrix<T>) {
    let half = <T as Scalar>::from_f64(0.5);
    let n = a.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = (a[(i, j)] + a[(j, i)]) * half;
            a[(i, j)] = avg;
            a[(j, i)] = avg;
        }
    }
}

/// Adds `reg` to the diagonal.
pub fn regularize_diagonal<T: Scalar>(matrix: &mut DMatrix<T>, reg: T) {
    for i in 0..matrix.nrows().min(matrix.ncols()) {
        matrix[(i, i)] += reg;
    }
}

/// Result of a matrix-free conjugate gradient solve.
#[derive(Debug, Clone)]
pub struct CgSolution<T: Scalar> {
    /// Approximate solution
    pub solution: DVector<T>,
    /// Number of Hessian-vector products used
    pub iterations: usize,
    /// ‖b − A x‖ at exit
    pub residual_norm: T,
    /// Whether the relative residual reached the tolerance
    pub converged: bool,
}

/// Solves (A + reg·I) x = b with conjugate gradient, given only products A·p.
///
/// Stops when ‖r‖ ≤ tol·‖b‖ or after `max_iterations` products. Meeting a
/// direction p with pᵀ(A + reg·I)p ≤ 0 means the operator is not positive
/// definite and yields `SingularHessian`.
pub fn conjugate_gradient_solve<T, F>(
    mut apply: F,
    rhs: &DVector<T>,
    regularization: T,
    max_iterations: usize,
    tol: T,
) -> OptimizerResult<CgSolution<T>>
where
    T: Scalar,
    F: FnMut(&DVector<T>) -> OracleResult<DVector<T>>,
{
    let n = rhs.len();
    let rhs_norm = rhs.norm();
    let mut x = DVector::zeros(n);
    if rhs_norm == T::zero() {
        return Ok(CgSolution {
            solution: x,
            iterations: 0,
            residual_norm: T::zero(),
            converged: true,
        });
    }

    let threshold = tol * rhs_norm;
    let mut r = rhs.clone();
    let mut p = r.clone();
    let mut rr = r.dot(&r);

    for k in 0..max_iterations {
        let mut ap = apply(&p)?;
        if ap.len() != n {
            return Err(OptimizerError::dimension_mismatch(n, ap.len()));
        }
        ap.axpy(regularization, &p, T::one());

        let pap = p.dot(&ap);
        if pap <= <T as Scalar>::EPSILON * p.dot(&p) || !Float::is_finite(pap) {
            return Err(OptimizerError::singular_hessian(format!(
                "non-positive curvature {pap} met by conjugate gradient at step {k}"
            )));
        }

        let alpha = rr / pap;
        x.axpy(alpha, &p, T::one());
        r.axpy(-alpha, &ap, T::one());

        let rr_new = r.dot(&r);
        let residual_norm = <T as Float>::sqrt(rr_new);
        if residual_norm <= threshold {
            return Ok(CgSolution {
                solution: x,
                iterations: k + 1,
                residual_norm,
                converged: true,
            });
        }

        let beta = rr_new / rr;
        rr = rr_new;
        // p = r + beta * p
        p *= beta;
        p += &r;
    }

    Ok(CgSolution {
        solution: x,
        iterations: max_iterations,
        residual_norm: <T as Float>::sqrt(rr),
        converged: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::dmatrix;

    #[test]
    fn test_cholesky_solve() {
        let a = dmatrix![4.0, 1.0; 1.0, 3.0];
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let x = cholesky_solve(&a, &b).unwrap();
        assert_relative_eq!(&a * &x, b, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = dmatrix![-398.0, 0.0; 0.0, 200.0];
        let b = DVector::from_vec(vec![2.0, -200.0]);
        let err = cholesky_solve(&a, &b).unwrap_err();
        assert!(matches!(err, OptimizerError::SingularHessian { .. }));
        assert!(!is_positive_definite(&a));
    }

    #[test]
    fn test_symmetry_helpers() {
        let mut a = dmatrix![1.0, 2.0; 2.5, 1.0];
        assert!(!is_symmetric(&a, 1e-12));
        symmetrize(&mut a);
        assert!(is_symmetric(&a, 1e-12));
        assert_relative_eq!(a[(0, 1)], 2.25);

        regularize_diagonal(&mut a, 1.0);
        assert_relative_eq!(a[(0, 0)], 2.0);
    }

    #[test]
    fn test_conjugate_gradient_matches_direct_solve() {
        let a = dmatrix![4.0, 1.0, 0.0; 1.0, 3.0, 0.5; 0.0, 0.5, 2.0];
        let b = DVector::from_vec(vec![1.0, -2.0, 0.5]);
        let cg = conjugate_gradient_solve(|p| Ok(&a * p), &b, 0.0, 10, 1e-12).unwrap();
        let direct = cholesky_solve(&a, &b).unwrap();

        assert!(cg.converged);
        assert!(cg.iterations <= 3);
        assert_relative_eq!(cg.solution, direct, epsilon = 1e-9);
    }

    #[test]
    fn test_conjugate_gradient_detects_negative_curvature() {
        let a = dmatrix![-1.0, 0.0; 0.0, 1.0];
        let b = DVector::from_vec(vec![1.0, 0.0]);
        let err = conjugate_gradient_solve(|p| Ok(&a * p), &b, 0.0, 10, 1e-10).unwrap_err();
        assert!(matches!(err, OptimizerError::SingularHessian { .. }));
    }
}
