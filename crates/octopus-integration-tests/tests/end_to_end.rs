use nalgebra::DMatrix;
use octopus_problem::parse_quadprog_args;
use octopus_solver::{
    solve_qp, solve_qp_dense, ClarabelBackend, ProblemKind, QpRouter, RouterConfig, SolveStatus,
};
use octopus_types::{ArgValue, OPT_LINEAR};
use std::collections::BTreeMap;

fn json_args(json: serde_json::Value) -> Vec<ArgValue> {
    json.as_array()
        .expect("args array")
        .iter()
        .map(|v| ArgValue::from_json(v).unwrap())
        .collect()
}

fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() < tol, "x[{}] = {}, expected {}", i, a, e);
    }
}

/// Both routes agree on a problem with every constraint kind present
#[test]
fn test_routes_agree_on_mixed_problem() {
    // minimize (x0 - 3)^2 + (x1 - 3)^2 + x2^2
    // subject to x0 + x1 + x2 <= 4, x0 - x1 = 0, 0 <= x0, x1 <= 10, x2 >= 0.5
    let args = json_args(serde_json::json!([
        [[2, 0, 0], [0, 2, 0], [0, 0, 2]],
        [-6, -6, 0],
        [[1, 1, 1]],
        4,
        [[1, -1, 0]],
        0,
        [0, "-inf", 0.5],
        ["inf", 10, "inf"],
    ]));
    let backend = ClarabelBackend::new();

    let classified = solve_qp(&args, &backend).unwrap();
    let dense = solve_qp_dense(&args, &backend).unwrap();

    assert_eq!(classified.status(), SolveStatus::Optimal);
    assert_eq!(classified.kind(), Some(ProblemKind::QuadraticGeneral));
    assert_eq!(dense.status(), SolveStatus::Optimal);

    // x2 sits on its bound, x0 = x1 share the remaining budget
    assert_close(classified.x(), &[1.75, 1.75, 0.5], 1e-4);
    assert_close(dense.x(), classified.x(), 1e-4);
    assert!((classified.objective_value() - dense.objective_value()).abs() < 1e-4);
}

#[test]
fn test_linear_nonnegative_program() {
    // minimize -x0 - x1 subject to x0 + 2 x1 <= 4, 3 x0 + x1 <= 6, x >= 0
    let args = json_args(serde_json::json!([
        [[0, 0], [0, 0]],
        [-1, -1],
        [[1, 2], [3, 1]],
        [4, 6],
        [],
        [],
        [0, 0],
    ]));

    let result = solve_qp(&args, &ClarabelBackend::new()).unwrap();

    assert_eq!(result.kind(), Some(ProblemKind::LinearNonnegative));
    assert_eq!(result.status(), SolveStatus::Optimal);
    assert_close(result.x(), &[1.6, 1.2], 1e-4);
    assert!((result.objective_value() + 2.8).abs() < 1e-4);
}

#[test]
fn test_infeasible_problem_reports_status() {
    // x0 >= 1 through the bounds, x0 <= 0 through a row
    let args = json_args(serde_json::json!([
        1,
        0,
        1,
        0,
        [],
        [],
        1,
    ]));

    let result = solve_qp(&args, &ClarabelBackend::new()).unwrap();
    assert_eq!(result.status(), SolveStatus::Infeasible);
    assert!(result.optimum().is_none());
    assert!(result.objective_value().is_nan());
}

#[test]
fn test_scalar_problem_matches_matrix_problem() {
    let scalars = vec![
        ArgValue::Scalar(2.0),
        ArgValue::Scalar(-4.0),
        ArgValue::Empty,
        ArgValue::Empty,
        ArgValue::Empty,
        ArgValue::Empty,
        ArgValue::Scalar(-1.0),
        ArgValue::Scalar(1.0),
    ];
    let matrices: Vec<ArgValue> = scalars
        .iter()
        .map(|v| match v {
            ArgValue::Scalar(s) => ArgValue::Matrix(DMatrix::from_element(1, 1, *s)),
            other => other.clone(),
        })
        .collect();

    assert_eq!(
        parse_quadprog_args(&scalars).unwrap(),
        parse_quadprog_args(&matrices).unwrap()
    );

    // minimize x^2 - 4x on [-1, 1] -> x = 1
    let result = solve_qp(&scalars, &ClarabelBackend::new()).unwrap();
    assert_close(result.x(), &[1.0], 1e-4);
    assert!((result.objective_value() + 3.0).abs() < 1e-4);
}

#[test]
fn test_linear_option_on_zero_hessian() {
    let mut opts = BTreeMap::new();
    opts.insert(OPT_LINEAR.to_string(), ArgValue::Bool(false));
    let mut args = json_args(serde_json::json!([
        [[0, 0], [0, 0]],
        [1, 1],
        [],
        [],
        [],
        [],
        [0, 0],
        [],
        [],
    ]));
    args.push(ArgValue::Map(opts));

    let problem = parse_quadprog_args(&args).unwrap();
    let router = QpRouter::new(RouterConfig::default());
    assert_eq!(router.classify(&problem).unwrap(), ProblemKind::QuadraticNonnegative);

    let result = router.solve(problem, &ClarabelBackend::new()).unwrap();
    assert_eq!(result.status(), SolveStatus::Optimal);
    assert_close(result.x(), &[0.0, 0.0], 1e-4);
}

#[test]
fn test_nonconvex_problem_is_not_reported_optimal() {
    // minimize -x0^2 + x1^2 with no constraints is unbounded below along x0
    let args = json_args(serde_json::json!([[[-1, 0], [0, 1]], [0, 0], [], []]));
    let backend = ClarabelBackend::new();

    let classified = solve_qp(&args, &backend).unwrap();
    assert_eq!(classified.kind(), Some(ProblemKind::QuadraticGeneral));
    assert_eq!(classified.status(), SolveStatus::NumericalFailure);
    assert!(classified.optimum().is_none());
    assert!(classified.objective_value().is_nan());

    let dense = solve_qp_dense(&args, &backend).unwrap();
    assert_eq!(dense.status(), SolveStatus::NumericalFailure);
    assert!(dense.optimum().is_none());
}
