//! Type definitions and aliases for line-search optimization.
//!
//! This module provides the scalar trait shared by every algorithm, the
//! dense vector/matrix aliases, and per-precision numerical constants.

use nalgebra::{RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in optimization (f32 or f64).
///
/// This trait combines all the numeric traits required by the line
/// searches and direction strategies.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default tolerance for convergence checks.
    const DEFAULT_TOLERANCE: Self;

    /// Default tolerance for gradient norm convergence.
    const DEFAULT_GRADIENT_TOLERANCE: Self;

    /// Curvature below which a quadratic model along a line is treated as flat.
    const CURVATURE_TOLERANCE: Self;

    /// Maximum value for line search step size.
    const MAX_STEP_SIZE: Self;

    /// Minimum value for line search step size.
    const MIN_STEP_SIZE: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Convert to f64 (for logging/display and error payloads).
    ///
    /// Returns NaN if the value cannot be represented.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).unwrap_or(f64::NAN)
    }

    /// Convert from usize (for iteration counts).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_TOLERANCE: Self = 1e-4;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-4;
    const CURVATURE_TOLERANCE: Self = 1e-6;
    const MAX_STEP_SIZE: Self = 1e3;
    const MIN_STEP_SIZE: Self = 1e-10;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_TOLERANCE: Self = 1e-6;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-6;
    const CURVATURE_TOLERANCE: Self = 1e-12;
    const MAX_STEP_SIZE: Self = 1e6;
    const MIN_STEP_SIZE: Self = 1e-16;
}

/// Type alias for a dynamically-sized column vector.
pub type DVector<T> = nalgebra::DVector<T>;

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = nalgebra::DMatrix<T>;
