//! Tests for the bundled test objectives and oracle wrappers.

use approx::assert_relative_eq;
use lineopt_core::{
    line_search::LineSearchParams,
    objective::{
        CountingObjective, DerivativeChecker, DerivativeOrder, Objective, QuadraticObjective,
        Rosenbrock, WeightedL1,
    },
    optimizer::StoppingCriterion,
    types::{DMatrix, DVector},
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn test_rosenbrock_minimum() {
    let f = Rosenbrock::<f64>::with_dimension(4);
    let ones = DVector::from_element(4, 1.0);

    assert_eq!(f.dimension(), 4);
    assert_relative_eq!(f.value(&ones).unwrap(), 0.0);
    assert_relative_eq!(f.gradient(&ones).unwrap().norm(), 0.0);
    assert_eq!(f.optimal_value(), Some(0.0));
    assert_eq!(f.order(), DerivativeOrder::Second);
}

#[test]
fn test_rosenbrock_hessian_matches_products() {
    let f = Rosenbrock::new();
    let x = DVector::from_vec(vec![-1.2, 1.0]);
    let v = DVector::from_vec(vec![0.3, -0.7]);

    let h = f.hessian(&x).unwrap();
    let hv = f.hessian_vector_product(&x, &v).unwrap();
    let expected = &h * &v;
    for i in 0..2 {
        assert_relative_eq!(hv[i], expected[i], epsilon = 1e-10);
    }
}

#[test]
fn test_quadratic_rejects_mismatched_shapes() {
    let q = DMatrix::<f64>::identity(2, 2);
    let linear = DVector::zeros(3);
    assert!(QuadraticObjective::new(q, linear, 0.0).is_err());
}

#[test]
fn test_weighted_l1_subgradient_at_kink() {
    let f = WeightedL1::new(
        DVector::from_vec(vec![1.0, 2.0]),
        DVector::from_vec(vec![0.0, 1.0]),
    )
    .unwrap();
    let x = DVector::from_vec(vec![0.0, 3.0]);

    assert_relative_eq!(f.value(&x).unwrap(), 4.0);
    let g = f.gradient(&x).unwrap();
    assert_eq!(g[0], 0.0);
    assert_eq!(g[1], 2.0);
    assert_eq!(f.order(), DerivativeOrder::First);
}

#[test]
fn test_counting_objective_tracks_every_call() {
    let f = CountingObjective::new(Rosenbrock::<f64>::new());
    let x = DVector::from_vec(vec![0.5, 0.5]);

    f.value(&x).unwrap();
    f.value_and_gradient(&x).unwrap();
    f.hessian_vector_product(&x, &x).unwrap();
    assert_eq!(f.counts(), (2, 1, 1));

    f.reset_counts();
    assert_eq!(f.counts(), (0, 0, 0));
}

#[cfg(feature = "serde")]
#[test]
fn test_configuration_serializes() {
    let params = LineSearchParams::<f64>::strong_wolfe().with_c2(0.1);
    let json = serde_json::to_string(&params).unwrap();
    let restored: LineSearchParams<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(params, restored);

    let criterion = StoppingCriterion::<f64>::new().with_gradient_tolerance(1e-8);
    let json = serde_json::to_string(&criterion).unwrap();
    assert!(json.contains("gradient_tolerance"));
}

proptest! {
    #[test]
    fn prop_rosenbrock_gradient_matches_finite_differences(
        x in prop::collection::vec(-2.0f64..2.0, 3),
    ) {
        let f = Rosenbrock::with_dimension(3);
        let x = DVector::from_vec(x);
        let (ok, error) = DerivativeChecker::check_gradient(&f, &x, 1e-4).unwrap();
        prop_assert!(ok, "relative error {}", error);
    }

    #[test]
    fn prop_quadratic_gradient_matches_finite_differences(
        diagonal in prop::collection::vec(0.1f64..10.0, 4),
        linear in prop::collection::vec(-5.0f64..5.0, 4),
        x in prop::collection::vec(-3.0f64..3.0, 4),
    ) {
        let f = QuadraticObjective::diagonal(&diagonal, &linear, 1.0).unwrap();
        let x = DVector::from_vec(x);
        let (ok, error) = DerivativeChecker::check_gradient(&f, &x, 1e-4).unwrap();
        prop_assert!(ok, "relative error {}", error);
    }
}
