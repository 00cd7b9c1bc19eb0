//! One-dimensional interpolation along the search line.
//!
//! All formulas work on φ(α) = f(x + α d) and its derivative
//! φ'(α) = ⟨∇f(x + α d), d⟩. They return `None` when the model is degenerate,
//! in which case callers fall back to bisection.

use crate::types::Scalar;
use num_traits::Float;

/// Minimizer of the quadratic matching φ(a), φ'(a) and φ(b).
pub fn quadratic_minimizer<T: Scalar>(a: T, fa: T, dfa: T, b: T, fb: T) -> Option<T> {
    let width = b - a;
    let two = <T as Scalar>::from_f64(2.0);
    let curvature = fb - fa - dfa * width;
    if curvature <= T::zero() || width == T::zero() {
        return None;
    }
    let alpha = a - dfa * width * width / (two * curvature);
    Float::is_finite(alpha).then_some(alpha)
}

/// Zero of the secant through (a, φ'(a)) and (b, φ'(b)).
pub fn secant_root<T: Scalar>(a: T, dfa: T, b: T, dfb: T) -> Option<T> {
    let slope = dfb - dfa;
    if slope == T::zero() {
        return None;
    }
    let alpha = (a * dfb - b * dfa) / slope;
    Float::is_finite(alpha).then_some(alpha)
}

/// Minimizer of the cubic Hermite interpolant on [a, b].
///
/// Nocedal & Wright, eq. (3.59).
pub fn cubic_minimizer<T: Scalar>(a: T, fa: T, dfa: T, b: T, fb: T, dfb: T) -> Option<T> {
    let three = <T as Scalar>::from_f64(3.0);
    let two = <T as Scalar>::from_f64(2.0);
    let width = b - a;
    if width == T::zero() {
        return None;
    }
    let d1 = dfa + dfb - three * (fa - fb) / (a - b);
    let disc = d1 * d1 - dfa * dfb;
    if disc < T::zero() {
        return None;
    }
    let d2 = Float::signum(width) * <T as Float>::sqrt(disc);
    let denom = dfb - dfa + two * d2;
    if denom == T::zero() {
        return None;
    }
    let alpha = b - width * (dfb + d2 - d1) / denom;
    Float::is_finite(alpha).then_some(alpha)
}

/// Clamps a trial step into the inner part of the bracket.
///
/// The admissible interval is the bracket shrunk by `safeguard` times its
/// width on both ends, so successive trials keep shrinking it. The bracket
/// endpoints may come in either order. Non-finite candidates become the
/// midpoint.
pub fn safeguard_step<T: Scalar>(candidate: Option<T>, lo: T, hi: T, safeguard: T) -> T {
    let (left, right) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let margin = (right - left) * safeguard;
    let half = <T as Scalar>::from_f64(0.5);
    match candidate {
        Some(alpha) if Float::is_finite(alpha) => {
            Float::min(Float::max(alpha, left + margin), right - margin)
        }
        _ => (left + right) * half,
    }
}
