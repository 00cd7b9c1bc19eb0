//! Numerical utilities: dense and matrix-free linear solves, and the
//! interpolation formulas used by the inexact line searches.

pub mod interpolation;
pub mod linalg;

// Re-export numerical utilities
pub use interpolation::*;
pub use linalg::*;
