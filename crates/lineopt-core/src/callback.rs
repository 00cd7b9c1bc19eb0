//! Callback support for optimization runs.
//!
//! Callbacks observe every accepted iterate and may stop the run between
//! iterations. [`StopFlag`] turns this into a cooperative cancellation
//! handle that can be flipped from another thread.

use crate::optimizer::OptimizationResult;
use crate::types::{DVector, Scalar};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Information passed to callbacks after each iteration.
#[derive(Clone, Debug)]
pub struct CallbackInfo<'a, T: Scalar> {
    /// Index of the completed iteration (starting at 1)
    pub iteration: usize,
    /// New iterate
    pub point: &'a DVector<T>,
    /// f at the new iterate
    pub value: T,
    /// ‖∇f‖ at the previous iterate, where the direction was computed
    pub gradient_norm: T,
    /// Accepted step α
    pub step_size: T,
    /// ‖d‖ of the direction used
    pub direction_norm: T,
    /// Objective value evaluations so far
    pub function_evaluations: usize,
    /// Elapsed time since the run started
    pub elapsed: Duration,
}

/// Trait for optimization callbacks.
pub trait OptimizationCallback<T: Scalar> {
    /// Called once before the first iteration.
    fn on_optimization_start(&mut self, point: &DVector<T>, value: T) {
        let _ = (point, value);
    }

    /// Called at the end of each iteration.
    ///
    /// Returns `true` to continue optimization, `false` to stop early.
    fn on_iteration_end(&mut self, info: &CallbackInfo<'_, T>) -> bool {
        let _ = info;
        true
    }

    /// Called once with the final result.
    fn on_optimization_end(&mut self, result: &OptimizationResult<T>) {
        let _ = result;
    }
}

/// A no-op callback that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl<T: Scalar> OptimizationCallback<T> for NoOpCallback {}

/// Records the trajectory of a run.
#[derive(Debug, Clone, Default)]
pub struct RecordingCallback<T: Scalar> {
    /// f(x₀), f(x₁), ...
    pub values: Vec<T>,
    /// Gradient norms at the points where directions were computed
    pub gradient_norms: Vec<T>,
    /// Accepted steps
    pub step_sizes: Vec<T>,
    /// Iterates, if `keep_points` is set
    pub points: Vec<DVector<T>>,
    keep_points: bool,
}

impl<T: Scalar> RecordingCallback<T> {
    /// Records values, gradient norms and step sizes.
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            gradient_norms: Vec::new(),
            step_sizes: Vec::new(),
            points: Vec::new(),
            keep_points: false,
        }
    }

    /// Also keeps a copy of every iterate.
    pub fn with_points() -> Self {
        Self {
            keep_points: true,
            ..Self::new()
        }
    }

    /// Whether recorded values never increase (up to `slack`).
    pub fn is_monotone(&self, slack: T) -> bool {
        self.values.windows(2).all(|w| w[1] <= w[0] + slack)
    }
}

impl<T: Scalar> OptimizationCallback<T> for RecordingCallback<T> {
    fn on_optimization_start(&mut self, point: &DVector<T>, value: T) {
        self.values.push(value);
        if self.keep_points {
            self.points.push(point.clone());
        }
    }

    fn on_iteration_end(&mut self, info: &CallbackInfo<'_, T>) -> bool {
        self.values.push(info.value);
        self.gradient_norms.push(info.gradient_norm);
        self.step_sizes.push(info.step_size);
        if self.keep_points {
            self.points.push(info.point.clone());
        }
        true
    }
}

/// Shared cancellation flag checked between iterations.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    flag: Arc<AtomicBool>,
}

impl StopFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks every run holding a clone of this flag to stop.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Clears the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl<T: Scalar> OptimizationCallback<T> for StopFlag {
    fn on_iteration_end(&mut self, _info: &CallbackInfo<'_, T>) -> bool {
        !self.is_stop_requested()
    }
}

/// Stops after a fixed number of iterations.
#[derive(Debug, Clone, Copy)]
pub struct StopAfter(pub usize);

impl<T: Scalar> OptimizationCallback<T> for StopAfter {
    fn on_iteration_end(&mut self, info: &CallbackInfo<'_, T>) -> bool {
        info.iteration < self.0
    }
}
