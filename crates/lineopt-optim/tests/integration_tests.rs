//! Integration tests for lineopt-optim
//!
//! End-to-end runs of every direction strategy with the line searches it is
//! meant to be paired with.

use approx::assert_relative_eq;
use lineopt_core::{
    callback::{RecordingCallback, StopAfter, StopFlag},
    line_search::{Armijo, ArmijoWolfe, ExactQuadratic, LineSearchParams, ScheduledStep},
    objective::{Objective, QuadraticObjective, Rosenbrock, WeightedL1},
    optimizer::{StoppingCriterion, TerminationReason, ToleranceMode},
    step_size::StepSizeSchedule,
    types::DVector,
};
use lineopt_optim::{
    run, Bfgs, CGConfig, ConjugateGradient, Driver, HeavyBall, HeavyBallConfig, Newton,
    SteepestDescent, Subgradient,
};

/// f(x, y) = (x − 1)² + 2(y + 2)², minimized at (1, −2) with f* = 0.
fn separable_quadratic() -> QuadraticObjective<f64> {
    QuadraticObjective::diagonal(&[2.0, 4.0], &[2.0, -8.0], 9.0).unwrap()
}

fn origin() -> DVector<f64> {
    DVector::zeros(2)
}

#[test]
fn test_steepest_descent_armijo_reaches_minimizer() {
    let f = separable_quadratic();
    let driver = Driver::new(SteepestDescent, Armijo::backtracking())
        .with_max_iterations(1000)
        .with_gradient_tolerance(1e-6);
    let mut recorder = RecordingCallback::new();

    let result = driver
        .minimize_with_callback(&f, &origin(), &mut recorder)
        .unwrap();

    assert_eq!(result.termination_reason, TerminationReason::Converged);
    assert!(result.gradient_norm <= 1e-6);
    assert_relative_eq!(result.point[0], 1.0, epsilon = 1e-6);
    assert_relative_eq!(result.point[1], -2.0, epsilon = 1e-6);
    assert!(recorder.is_monotone(0.0), "values: {:?}", recorder.values);
    assert_eq!(result.gradient_evaluations, result.iterations + 1);
}

#[test]
fn test_run_returns_point_status_and_iterations() {
    let f = separable_quadratic();
    let (point, status, iterations) =
        run(&f, &origin(), &SteepestDescent, &Armijo::backtracking(), 1000, 1e-6)
            .unwrap()
            .into_parts();

    assert_eq!(status, TerminationReason::Converged);
    assert!(iterations > 0);
    assert_relative_eq!(point[0], 1.0, epsilon = 1e-6);
}

#[test]
fn test_steepest_descent_exact_decreases_monotonically() {
    let f = separable_quadratic();
    let driver = Driver::new(SteepestDescent, ExactQuadratic::new())
        .with_max_iterations(100)
        .with_gradient_tolerance(1e-8);
    let mut recorder = RecordingCallback::new();

    let result = driver
        .minimize_with_callback(&f, &origin(), &mut recorder)
        .unwrap();

    assert!(result.converged);
    assert!(recorder.is_monotone(0.0));
    // first exact step along −g₀ = (2, −8)
    assert_relative_eq!(recorder.step_sizes[0], 68.0 / 264.0, epsilon = 1e-12);
}

#[test]
fn test_conjugate_gradient_exact_terminates_in_dimension_steps() {
    let f = separable_quadratic();
    let result = run(
        &f,
        &origin(),
        &ConjugateGradient::fletcher_reeves(),
        &ExactQuadratic::new(),
        10,
        1e-10,
    )
    .unwrap();

    assert!(result.converged);
    assert!(result.iterations <= 2);
    assert_relative_eq!(result.value, 0.0, epsilon = 1e-12);
}

#[test]
fn test_newton_takes_one_step_on_quadratic() {
    let f = separable_quadratic();
    for result in [
        run(&f, &origin(), &Newton::default(), &ExactQuadratic::new(), 10, 1e-10).unwrap(),
        run(&f, &origin(), &Newton::default(), &Armijo::backtracking(), 10, 1e-10).unwrap(),
    ] {
        assert!(result.converged);
        assert_eq!(result.iterations, 1);
        assert_relative_eq!(result.point[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.point[1], -2.0, epsilon = 1e-12);
    }
}

#[test]
fn test_newton_without_fallback_reports_singular_hessian() {
    // ∇²f(0, 1) = diag(−398, 200) is indefinite
    let f = Rosenbrock::new();
    let x0 = DVector::from_vec(vec![0.0, 1.0]);
    let result = run(&f, &x0, &Newton::default(), &Armijo::backtracking(), 100, 1e-6).unwrap();

    assert_eq!(result.termination_reason, TerminationReason::SingularHessian);
    assert_eq!(result.iterations, 0);
    assert_eq!(result.point, x0);
    assert!(result.failure.is_some());
    assert!(result.into_result().is_err());
}

#[test]
fn test_newton_with_fallback_makes_progress() {
    let f = Rosenbrock::new();
    let x0 = DVector::from_vec(vec![0.0, 1.0]);
    let result = run(
        &f,
        &x0,
        &Newton::with_steepest_descent_fallback(),
        &Armijo::backtracking(),
        200,
        1e-6,
    )
    .unwrap();

    assert_ne!(result.termination_reason, TerminationReason::SingularHessian);
    assert!(result.value < 1.0);
}

#[test]
fn test_bfgs_wolfe_solves_rosenbrock() {
    let f = Rosenbrock::new();
    let x0 = DVector::from_vec(vec![-1.2, 1.0]);
    let result = run(&f, &x0, &Bfgs::default(), &ArmijoWolfe::weak(), 500, 1e-6).unwrap();

    assert!(result.converged, "stopped with {}", result.termination_reason);
    assert_relative_eq!(result.point[0], 1.0, epsilon = 1e-4);
    assert_relative_eq!(result.point[1], 1.0, epsilon = 1e-4);
}

#[test]
fn test_polak_ribiere_strong_wolfe_solves_rosenbrock() {
    let f = Rosenbrock::new();
    let x0 = DVector::from_vec(vec![-1.2, 1.0]);
    let line_search = ArmijoWolfe::new(LineSearchParams::strong_wolfe().with_c2(0.1));
    let cg = ConjugateGradient::new(CGConfig::polak_ribiere());
    let result = run(&f, &x0, &cg, &line_search, 2000, 1e-6).unwrap();

    assert!(result.converged, "stopped with {}", result.termination_reason);
    assert_relative_eq!(result.point[0], 1.0, epsilon = 1e-4);
}

#[test]
fn test_heavy_ball_armijo_converges() {
    let f = separable_quadratic();
    let heavy_ball = HeavyBall::new(HeavyBallConfig::fixed(0.3));
    let result = run(&f, &origin(), &heavy_ball, &Armijo::backtracking(), 2000, 1e-6).unwrap();

    assert!(result.converged, "stopped with {}", result.termination_reason);
    assert_relative_eq!(result.point[0], 1.0, epsilon = 1e-5);
    assert_relative_eq!(result.point[1], -2.0, epsilon = 1e-5);
}

#[test]
fn test_subgradient_with_diminishing_steps() {
    let f = WeightedL1::new(
        DVector::from_vec(vec![1.0, 2.0]),
        DVector::from_vec(vec![1.0, -1.0]),
    )
    .unwrap();
    let line_search = ScheduledStep::new(StepSizeSchedule::sqrt_decay(1.0));
    let result = run(&f, &origin(), &Subgradient, &line_search, 2000, 1e-9).unwrap();

    assert!(!result.termination_reason.is_failure());
    assert!(result.best_value < 0.1, "best value {}", result.best_value);
    assert!(result.best_value <= result.value);
}

#[test]
fn test_unit_step_onto_kink_converges() {
    // the first step lands on the kink of |x|, where the subgradient is 0
    let f = WeightedL1::new(DVector::from_vec(vec![1.0]), DVector::from_vec(vec![0.0])).unwrap();
    let x0 = DVector::from_vec(vec![1.0]);
    let result = run(&f, &x0, &SteepestDescent, &Armijo::backtracking(), 50, 1e-6).unwrap();
    assert!(result.converged);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.value, 0.0);
}

#[test]
fn test_relative_tolerance() {
    let f = Rosenbrock::new();
    let x0 = DVector::from_vec(vec![-1.2, 1.0]);
    let criterion = StoppingCriterion::new()
        .with_gradient_tolerance(1e-3)
        .with_tolerance_mode(ToleranceMode::Relative);
    let initial_norm = f.gradient(&x0).unwrap().norm();
    let result = Driver::new(Bfgs::default(), ArmijoWolfe::weak())
        .with_criterion(criterion)
        .minimize(&f, &x0)
        .unwrap();

    assert!(result.converged);
    assert!(result.gradient_norm <= 1e-3 * initial_norm);
}

#[test]
fn test_function_evaluation_budget() {
    let f = Rosenbrock::new();
    let criterion = StoppingCriterion::new()
        .with_max_iterations(10_000)
        .with_max_function_evaluations(20);
    let result = Driver::new(SteepestDescent, Armijo::backtracking())
        .with_criterion(criterion)
        .minimize(&f, &DVector::from_vec(vec![-1.2, 1.0]))
        .unwrap();

    assert_eq!(result.termination_reason, TerminationReason::MaxFunctionEvaluations);
    assert!(result.function_evaluations >= 20);
}

#[test]
fn test_stop_after_callback() {
    let f = Rosenbrock::new();
    let driver = Driver::new(SteepestDescent, Armijo::backtracking());
    let result = driver
        .minimize_with_callback(&f, &DVector::from_vec(vec![-1.2, 1.0]), &mut StopAfter(3))
        .unwrap();

    assert_eq!(result.termination_reason, TerminationReason::CallbackRequest);
    assert_eq!(result.iterations, 3);
}

#[test]
fn test_stop_flag_cancels_run() {
    let f = Rosenbrock::new();
    let mut flag = StopFlag::new();
    flag.request_stop();
    let result = Driver::new(SteepestDescent, Armijo::backtracking())
        .minimize_with_callback(&f, &DVector::from_vec(vec![-1.2, 1.0]), &mut flag)
        .unwrap();

    assert_eq!(result.termination_reason, TerminationReason::CallbackRequest);
    assert_eq!(result.iterations, 1);
}

#[cfg(feature = "parallel")]
#[test]
fn test_batch_matches_sequential_runs() {
    let f = Rosenbrock::new();
    let driver = Driver::new(Bfgs::default(), ArmijoWolfe::weak()).with_max_iterations(500);
    let starts: Vec<DVector<f64>> = [(-1.2, 1.0), (0.0, 0.0), (2.0, 2.0), (-0.5, 1.5)]
        .iter()
        .map(|&(a, b)| DVector::from_vec(vec![a, b]))
        .collect();

    let batch = driver.minimize_batch(&f, &starts);
    assert_eq!(batch.len(), starts.len());

    for (x0, parallel) in starts.iter().zip(batch) {
        let parallel = parallel.unwrap();
        let sequential = driver.minimize(&f, x0).unwrap();
        assert_eq!(parallel.point, sequential.point);
        assert_eq!(parallel.iterations, sequential.iterations);
        assert_eq!(parallel.termination_reason, sequential.termination_reason);
    }
}
