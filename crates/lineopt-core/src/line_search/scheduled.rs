use super::{LineSearch, LineSearchContext, LineSearchOutcome};
use crate::{
    error::OptimizerResult,
    objective::{DerivativeOrder, Objective},
    step_size::StepSizeSchedule,
    types::Scalar,
};

/// Step length taken from a [`StepSizeSchedule`] without any acceptance test.
///
/// With `normalize` (the default) the step is αₖ/‖d‖, so the iterate moves
/// exactly αₖ in Euclidean distance. This is the step rule of the
/// subgradient method, which cannot rely on descent at each iteration and
/// therefore accepts directions with φ'(0) ≥ 0.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduledStep<T: Scalar> {
    /// Schedule αₖ
    pub schedule: StepSizeSchedule<T>,
    /// Divide the scheduled step by ‖d‖
    pub normalize: bool,
}

impl<T: Scalar> ScheduledStep<T> {
    /// Normalized steps following `schedule`.
    pub fn new(schedule: StepSizeSchedule<T>) -> Self {
        Self {
            schedule,
            normalize: true,
        }
    }

    /// Fixed step α applied to the raw direction.
    pub fn fixed(step_size: T) -> Self {
        Self {
            schedule: StepSizeSchedule::constant(step_size),
            normalize: false,
        }
    }

    /// Enables or disables normalization by ‖d‖.
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }
}

impl<T: Scalar> LineSearch<T> for ScheduledStep<T> {
    fn name(&self) -> &str {
        "ScheduledStep"
    }

    fn is_exact(&self) -> bool {
        false
    }

    fn required_order(&self) -> DerivativeOrder {
        DerivativeOrder::Zeroth
    }

    fn requires_descent(&self) -> bool {
        false
    }

    fn validate(&self) -> OptimizerResult<()> {
        self.schedule.validate()
    }

    fn search<O>(
        &self,
        oracle: &O,
        ctx: &LineSearchContext<'_, T>,
    ) -> OptimizerResult<LineSearchOutcome<T>>
    where
        O: Objective<T> + ?Sized,
    {
        let scheduled = self.schedule.get_step_size(ctx.iteration);
        let norm = ctx.direction.norm();
        let step_size = if !self.normalize {
            scheduled
        } else if norm > T::zero() {
            scheduled / norm
        } else {
            T::zero()
        };

        let new_point = ctx.trial_point(step_size);
        let new_value = oracle.value(&new_point)?;

        Ok(LineSearchOutcome {
            step_size,
            new_point,
            new_value,
            new_gradient: None,
            function_evals: 1,
            gradient_evals: 0,
            trials: 1,
            success: true,
        })
    }
}
