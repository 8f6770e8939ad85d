//! Integration tests for the Omega solver pipeline.

use omega_solver::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn solve(pb: &mut Problem) -> OmegaResult {
    let mut solver = OmegaSolver::new();
    solver
        .solve_problem(pb, Goal::Unknown, None)
        .expect("solve failed")
}

#[test]
fn test_diophantine_equation_feasible() {
    init_logging();
    // 2x + 3y = 7 with x, y >= 0 has the solution (2, 1).
    let mut pb = Problem::new(2, 0).unwrap();
    pb.init_variables();
    pb.add_equality(&[-7, 2, 3], Color::Black).unwrap();
    pb.add_inequality(&[0, 1, 0], Color::Black).unwrap();
    pb.add_inequality(&[0, 0, 1], Color::Black).unwrap();

    assert_eq!(solve(&mut pb), OmegaResult::True);
}

#[test]
fn test_diophantine_equation_gcd_infeasible() {
    init_logging();
    // 2x + 4y = 7 fails the divisibility test.
    let mut pb = Problem::new(2, 0).unwrap();
    pb.init_variables();
    pb.add_equality(&[-7, 2, 4], Color::Black).unwrap();

    assert_eq!(solve(&mut pb), OmegaResult::False);
}

#[test]
fn test_contradictory_bounds() {
    init_logging();
    let mut pb = Problem::new(1, 0).unwrap();
    pb.init_variables();
    pb.add_inequality(&[-5, 1], Color::Black).unwrap();
    pb.add_inequality(&[3, -1], Color::Black).unwrap();

    assert_eq!(solve(&mut pb), OmegaResult::False);
}

#[test]
fn test_tightening_finds_single_point() {
    init_logging();
    // 5 <= 2x <= 6 admits only x = 3.
    let mut pb = Problem::new(1, 0).unwrap();
    pb.init_variables();
    pb.add_inequality(&[-5, 2], Color::Black).unwrap();
    pb.add_inequality(&[6, -2], Color::Black).unwrap();

    assert_eq!(solve(&mut pb), OmegaResult::True);
}

#[test]
fn test_tightening_empties_open_interval() {
    init_logging();
    // 5 <= 2x <= 5 has no integer solution.
    let mut pb = Problem::new(1, 0).unwrap();
    pb.init_variables();
    pb.add_inequality(&[-5, 2], Color::Black).unwrap();
    pb.add_inequality(&[5, -2], Color::Black).unwrap();

    assert_eq!(solve(&mut pb), OmegaResult::False);
}

#[test]
fn test_pugh_dark_shadow_example_infeasible() {
    init_logging();
    // 27 <= 11x + 13y <= 45, -10 <= 7x - 9y <= 4: the real shadow is
    // nonempty but no integer point exists.
    let mut pb = Problem::new(2, 0).unwrap();
    pb.init_variables();
    pb.add_inequality(&[-27, 11, 13], Color::Black).unwrap();
    pb.add_inequality(&[45, -11, -13], Color::Black).unwrap();
    pb.add_inequality(&[10, 7, -9], Color::Black).unwrap();
    pb.add_inequality(&[4, -7, 9], Color::Black).unwrap();

    assert_eq!(solve(&mut pb), OmegaResult::False);
}

#[test]
fn test_pugh_dark_shadow_example_relaxed_feasible() {
    init_logging();
    // Relaxing the last bound to 5 admits (2, 1).
    let mut pb = Problem::new(2, 0).unwrap();
    pb.init_variables();
    pb.add_inequality(&[-27, 11, 13], Color::Black).unwrap();
    pb.add_inequality(&[45, -11, -13], Color::Black).unwrap();
    pb.add_inequality(&[10, 7, -9], Color::Black).unwrap();
    pb.add_inequality(&[5, -7, 9], Color::Black).unwrap();

    assert_eq!(solve(&mut pb), OmegaResult::True);
}

#[test]
fn test_simplify_projects_free_variable() {
    init_logging();
    // x <= y <= 10 over protected x projects to x <= 10.
    let mut solver = OmegaSolver::new();
    let mut pb = Problem::new(2, 1).unwrap();
    pb.init_variables();
    pb.add_inequality(&[0, 1, 0], Color::Black).unwrap();
    pb.add_inequality(&[0, -1, 1], Color::Black).unwrap();
    pb.add_inequality(&[10, 0, -1], Color::Black).unwrap();

    let r = solver.simplify_problem(&mut pb).unwrap();
    assert_eq!(r, OmegaResult::True);
    assert_eq!(pb.num_vars, 1);
    assert_eq!(pb.query_variable_bounds(1), Some((0, 10)));
}

#[test]
fn test_simplify_is_idempotent() {
    init_logging();
    let mut solver = OmegaSolver::new();
    let mut pb = Problem::new(2, 1).unwrap();
    pb.init_variables();
    pb.add_inequality(&[0, 1, 0], Color::Black).unwrap();
    pb.add_inequality(&[0, -1, 1], Color::Black).unwrap();
    pb.add_inequality(&[10, 0, -1], Color::Black).unwrap();

    assert_eq!(solver.simplify_problem(&mut pb).unwrap(), OmegaResult::True);
    let geqs_after_first = pb.geqs.len();

    assert_eq!(solver.simplify_problem(&mut pb).unwrap(), OmegaResult::True);
    assert_eq!(pb.geqs.len(), geqs_after_first);
    assert_eq!(pb.query_variable_bounds(1), Some((0, 10)));
}

#[test]
fn test_gist_red_constraint_restricts_context() {
    init_logging();
    // Black: 0 <= i <= 100. Red: i <= 50 genuinely restricts.
    let mut solver = OmegaSolver::new();
    let mut pb = Problem::new(1, 1).unwrap();
    pb.init_variables();
    pb.add_inequality(&[0, 1], Color::Black).unwrap();
    pb.add_inequality(&[100, -1], Color::Black).unwrap();
    pb.add_inequality(&[50, -1], Color::Red).unwrap();

    assert!(solver.problem_has_red_equations(&mut pb).unwrap());
}

#[test]
fn test_gist_red_constraint_implied_by_context() {
    init_logging();
    // Black: 0 <= i <= 50. Red: i <= 100 adds nothing.
    let mut solver = OmegaSolver::new();
    let mut pb = Problem::new(1, 1).unwrap();
    pb.init_variables();
    pb.add_inequality(&[0, 1], Color::Black).unwrap();
    pb.add_inequality(&[50, -1], Color::Black).unwrap();
    pb.add_inequality(&[100, -1], Color::Red).unwrap();

    assert!(!solver.problem_has_red_equations(&mut pb).unwrap());
}

#[test]
fn test_gist_of_infeasible_combination_is_contradiction() {
    init_logging();
    let mut solver = OmegaSolver::new();
    let mut pb = Problem::new(1, 1).unwrap();
    pb.init_variables();
    pb.add_inequality(&[-10, 1], Color::Black).unwrap();
    pb.add_inequality(&[5, -1], Color::Red).unwrap();

    assert!(solver.problem_has_red_equations(&mut pb).unwrap());
    assert_eq!(pb.eqs.len(), 1);
    assert_eq!(pb.eqs[0].coef[0], 1);
}

#[test]
fn test_constrain_and_requery() {
    init_logging();
    let mut solver = OmegaSolver::new();
    let mut pb = Problem::new(1, 1).unwrap();
    pb.init_variables();
    pb.add_inequality(&[0, 1], Color::Black).unwrap();
    pb.add_inequality(&[20, -1], Color::Black).unwrap();
    assert_eq!(solver.simplify_problem(&mut pb).unwrap(), OmegaResult::True);
    assert_eq!(pb.query_variable_bounds(1), Some((0, 20)));

    pb.constrain_variable_value(Color::Black, 1, 7).unwrap();
    assert_eq!(solver.simplify_problem(&mut pb).unwrap(), OmegaResult::True);
    let b = pb.query_variable(1);
    assert_eq!((b.lower, b.upper), (7, 7));
}

#[test]
fn test_dependence_distance_query() {
    init_logging();
    // Flow dependence of A[i] written, A[i + 3] read inside 0 <= i <= N
    // with N = 100: the distance is the fixed value 3.
    let mut solver = OmegaSolver::new();
    let mut pb = Problem::new(3, 1).unwrap();
    pb.init_variables();
    // d = i2 - i1, both iterations in bounds, i2 = i1 + 3.
    pb.add_equality(&[0, 1, 1, -1], Color::Black).unwrap();
    pb.add_equality(&[-3, 0, -1, 1], Color::Black).unwrap();
    pb.add_inequality(&[0, 0, 1, 0], Color::Black).unwrap();
    pb.add_inequality(&[100, 0, 0, -1], Color::Black).unwrap();

    assert_eq!(solver.simplify_problem(&mut pb).unwrap(), OmegaResult::True);
    let b = pb.query_variable(1);
    assert_eq!((b.lower, b.upper), (3, 3));
}

#[test]
fn test_wide_coefficients_do_not_overflow() {
    init_logging();
    // Large but representable coefficients exercise the checked
    // multiplies without tripping them.
    let mut pb = Problem::new(2, 0).unwrap();
    pb.init_variables();
    pb.add_inequality(&[-1_000_000, 1_000, 1], Color::Black).unwrap();
    pb.add_inequality(&[2_000_000, -1_000, -1], Color::Black).unwrap();
    pb.add_inequality(&[0, 0, 1], Color::Black).unwrap();
    pb.add_inequality(&[500, 0, -1], Color::Black).unwrap();

    assert_eq!(solve(&mut pb), OmegaResult::True);
}
