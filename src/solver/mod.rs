//! The solving pipeline: equality elimination, inequality elimination, and
//! the drivers that tie them together.
//!
//! [`OmegaSolver::solve_problem`] alternates the equality and inequality
//! phases until a verdict is reached. [`OmegaSolver::simplify_problem`]
//! runs the same machinery in simplification mode, where the goal is a
//! reduced but equivalent problem over the protected variables rather than
//! a yes/no answer.

pub(crate) mod equalities;
pub(crate) mod inequalities;
pub(crate) mod normalize;
pub(crate) mod redundancy;

use crate::context::{Goal, OmegaResult, OmegaSolver};
use crate::eqn::{Color, Eqn, MAX_KEYS};
use crate::error::SolveResult;
use crate::problem::Problem;
use crate::solver::normalize::Normalize;
use crate::solver::redundancy::{coalesce, free_eliminations, free_red_eliminations};
use log::debug;

/// Maximum recursion depth of the solver. Splintering multiplies problems,
/// so a runaway recursion means a bug rather than a hard problem.
const MAX_SOLVE_DEPTH: u32 = 50;

impl OmegaSolver {
    /// Solve `pb` according to `desired`. The problem is consumed in the
    /// sense that its constraint lists are rewritten freely; callers that
    /// need the original keep a clone.
    pub fn solve_problem(
        &mut self,
        pb: &mut Problem,
        desired: Goal,
        mut outer: Option<&mut Problem>,
    ) -> SolveResult<OmegaResult> {
        debug_assert!(pb.num_vars >= pb.safe_vars);
        self.solve_depth += 1;

        if desired != Goal::Simplify {
            pb.safe_vars = 0;
        }

        assert!(
            self.solve_depth <= MAX_SOLVE_DEPTH,
            "solver recursion depth exceeded {}",
            MAX_SOLVE_DEPTH
        );

        let result = self.solve_loop(pb, desired, outer.as_deref_mut());
        self.solve_depth -= 1;
        result
    }

    fn solve_loop(
        &mut self,
        pb: &mut Problem,
        desired: Goal,
        mut outer: Option<&mut Problem>,
    ) -> SolveResult<OmegaResult> {
        loop {
            self.do_it_again = false;

            if self.solve_eq(pb, desired)? == OmegaResult::False {
                return Ok(OmegaResult::False);
            }

            let result = if self.in_approximate_mode && pb.geqs.is_empty() {
                pb.num_vars = pb.safe_vars;
                self.problem_reduced(pb)?;
                OmegaResult::True
            } else {
                let r = self.solve_geq(pb, desired, outer.as_deref_mut())?;
                if self.do_it_again && desired == Goal::Simplify {
                    continue;
                }
                r
            };

            if !self.reduce_with_subs {
                self.resurrect_subs(pb)?;
                debug_assert!(
                    self.no_eqs_in_simplified != 0
                        || result == OmegaResult::False
                        || pb.subs.is_empty()
                );
            }

            return Ok(result);
        }
    }

    /// Reduce `pb` to a minimal equivalent form over its protected
    /// variables. Returns [`OmegaResult::True`] when the reduction
    /// succeeded, [`OmegaResult::False`] when the problem is infeasible,
    /// and [`OmegaResult::Unknown`] when the solver could not decide.
    pub fn simplify_problem(&mut self, pb: &mut Problem) -> SolveResult<OmegaResult> {
        self.found_reduction = OmegaResult::False;

        if !pb.variables_initialized {
            pb.init_variables();
        }

        if self.next_key * 3 > MAX_KEYS {
            // The key space is filling up; restart the cache and force
            // every geq through normalization again.
            self.reset_hash_cache();
            for g in pb.geqs.iter_mut() {
                g.touched = true;
            }
            pb.hash_version = self.hash_version;
        } else if pb.hash_version != self.hash_version {
            for g in pb.geqs.iter_mut() {
                g.touched = true;
            }
            pb.hash_version = self.hash_version;
        }

        self.non_convex = false;

        if pb.num_vars > pb.eqs.len() + 3 * pb.safe_vars {
            free_eliminations(pb, pb.safe_vars);
        }

        if self.may_be_red == 0 && pb.subs.is_empty() && pb.safe_vars == 0 {
            self.found_reduction = self.solve_problem(pb, Goal::Unknown, None)?;

            if self.found_reduction != OmegaResult::False && self.return_single_result == 0 {
                pb.geqs.clear();
                pb.eqs.clear();
                self.fire_when_reduced(pb);
            }

            return Ok(self.found_reduction);
        }

        self.solve_problem(pb, Goal::Simplify, None)?;

        if self.found_reduction != OmegaResult::False {
            let mut i = 1;
            while pb.safe_var(i) {
                pb.forwarding.insert(pb.var[i], i as i32);
                i += 1;
            }
            for s in 0..pb.subs.len() {
                pb.forwarding.insert(pb.subs[s].key, -(s as i32) - 1);
            }
        }

        if !self.reduce_with_subs {
            debug_assert!(
                self.no_eqs_in_simplified != 0
                    || self.found_reduction == OmegaResult::False
                    || pb.subs.is_empty()
            );
        }

        Ok(self.found_reduction)
    }

    /// Simplify `pb` in approximate mode: wildcards are treated as
    /// rationals, so the result is an over-approximation of the solution
    /// set.
    pub fn simplify_approximate(&mut self, pb: &mut Problem) -> SolveResult<OmegaResult> {
        debug!("entering approximate mode");

        self.in_approximate_mode = true;
        let result = self.simplify_problem(pb);
        self.in_approximate_mode = false;
        let result = result?;

        debug_assert!(pb.num_vars == pb.safe_vars);
        if !self.reduce_with_subs {
            debug_assert!(pb.subs.is_empty());
        }

        debug!("leaving approximate mode");
        Ok(result)
    }

    /// True when the red constraints restrict the solutions of the black
    /// ones. On return `pb` holds the gist: the red constraints not
    /// implied by the black context. An infeasible combined problem leaves
    /// the contradiction `1 = 0` as a red equality.
    pub fn problem_has_red_equations(&mut self, pb: &mut Problem) -> SolveResult<bool> {
        debug!("checking for red equations:\n{}", pb);

        self.no_eqs_in_simplified += 1;
        self.may_be_red += 1;
        self.return_single_result += 1;
        self.create_color = true;

        let res = self.simplify_problem(pb);

        self.return_single_result -= 1;
        self.may_be_red -= 1;
        self.no_eqs_in_simplified -= 1;

        if res? == OmegaResult::False {
            debug!("gist is false");
            pb.subs.clear();
            pb.geqs.clear();
            pb.eqs.clear();
            let mut eq = Eqn::zero(Color::Red);
            eq.coef[0] = 1;
            pb.eqs.push(eq);
            return Ok(true);
        }

        free_red_eliminations(pb);
        debug_assert!(pb.eqs.is_empty());

        if !pb.geqs.iter().any(|g| g.color == Color::Red) {
            return Ok(false);
        }

        // A safe variable bounded on one side only by red constraints
        // proves the reds matter without any solving.
        for i in (1..=pb.safe_vars).rev() {
            let mut ub = 0u8;
            let mut lb = 0u8;

            for g in pb.geqs.iter() {
                let c = g.coef[i];
                if c != 0 {
                    let bit = if g.color == Color::Red { 2 } else { 1 };
                    if c > 0 {
                        lb |= bit;
                    } else {
                        ub |= bit;
                    }
                }
            }

            if ub == 2 || lb == 2 {
                debug!("{} is bounded only by red constraints", pb.var_name(i));
                if !self.reduce_with_subs {
                    self.resurrect_subs(pb)?;
                    debug_assert!(pb.subs.is_empty());
                }
                return Ok(true);
            }
        }

        debug!("doing potentially expensive elimination tests for red equations");
        self.no_eqs_in_simplified += 1;
        let red = self.eliminate_red(pb, true);
        self.no_eqs_in_simplified -= 1;
        red?;

        debug_assert!(pb.eqs.is_empty());
        let result = pb.geqs.iter().any(|g| g.color == Color::Red);

        if !self.reduce_with_subs {
            self.resurrect_subs(pb)?;
            let r = self.normalize_problem(pb, None)?;
            debug_assert!(r != Normalize::False);
            coalesce(pb)?;
            self.cleanout_wildcards(pb)?;
            debug_assert!(pb.subs.is_empty());
        }

        Ok(result)
    }

    /// A simplification pass settled on `pb`: record the reduction,
    /// collapse opposed red pairs, publish forwarding addresses, and hand
    /// the problem to the callback.
    pub(crate) fn problem_reduced(&mut self, pb: &mut Problem) -> SolveResult<()> {
        if self.verify_simplification {
            let verified =
                self.in_approximate_mode || self.verify_problem(pb)?;
            if !verified {
                return Ok(());
            }
            if !pb.eqs.is_empty() {
                // Verification forwarded fixed values back into us.
                self.do_it_again = true;
            }
        }

        self.found_reduction = OmegaResult::True;

        if self.no_eqs_in_simplified == 0 {
            coalesce(pb)?;
        }

        if self.reduce_with_subs || self.no_eqs_in_simplified != 0 {
            pb.chain_unprotect();
        } else {
            self.resurrect_subs(pb)?;
        }

        if self.return_single_result == 0 {
            let mut i = 1;
            while pb.safe_var(i) {
                pb.forwarding.insert(pb.var[i], i as i32);
                i += 1;
            }
            for s in 0..pb.subs.len() {
                pb.forwarding.insert(pb.subs[s].key, -(s as i32) - 1);
            }

            self.fire_when_reduced(pb);
        }

        debug!("problem reduced:\n{}", pb);
        Ok(())
    }

    /// Re-solve a copy of `pb` from scratch as a consistency check. Fixed
    /// values discovered along the way flow back into `pb` as equalities.
    pub(crate) fn verify_problem(&mut self, pb: &mut Problem) -> SolveResult<bool> {
        let mut trial = pb.clone();
        trial.safe_vars = 0;
        trial.subs.clear();

        let any_color = self.no_eqs_in_simplified != 0
            || pb.geqs.iter().any(|g| g.color == Color::Red);

        debug!(
            "verifying problem{}",
            if any_color { " (color mode)" } else { "" }
        );

        let result = if any_color {
            self.solve_problem(&mut trial, Goal::Unknown, None)?
        } else {
            self.solve_problem(&mut trial, Goal::Unknown, Some(pb))?
        };

        Ok(result != OmegaResult::False)
    }

    fn fire_when_reduced(&mut self, pb: &Problem) {
        if let Some(mut cb) = self.when_reduced.take() {
            cb(pb);
            self.when_reduced = Some(cb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eqn::Color;

    #[test]
    fn test_solve_mixed_system_feasible() {
        // x + y = 5 with 0 <= x, y <= 3 has solutions (2,3) and (3,2).
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(2, 0).unwrap();
        pb.init_variables();
        pb.add_equality(&[-5, 1, 1], Color::Black).unwrap();
        pb.add_inequality(&[0, 1, 0], Color::Black).unwrap();
        pb.add_inequality(&[0, 0, 1], Color::Black).unwrap();
        pb.add_inequality(&[3, -1, 0], Color::Black).unwrap();
        pb.add_inequality(&[3, 0, -1], Color::Black).unwrap();

        let r = solver.solve_problem(&mut pb, Goal::Unknown, None).unwrap();
        assert_eq!(r, OmegaResult::True);
    }

    #[test]
    fn test_solve_mixed_system_infeasible() {
        // x + y = 7 cannot hold with x <= 3 and y <= 3.
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(2, 0).unwrap();
        pb.init_variables();
        pb.add_equality(&[-7, 1, 1], Color::Black).unwrap();
        pb.add_inequality(&[3, -1, 0], Color::Black).unwrap();
        pb.add_inequality(&[3, 0, -1], Color::Black).unwrap();

        let r = solver.solve_problem(&mut pb, Goal::Unknown, None).unwrap();
        assert_eq!(r, OmegaResult::False);
    }

    #[test]
    fn test_simplify_keeps_safe_variable_bounds() {
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(1, 1).unwrap();
        pb.init_variables();
        pb.add_inequality(&[-2, 1], Color::Black).unwrap();
        pb.add_inequality(&[9, -1], Color::Black).unwrap();

        let r = solver.simplify_problem(&mut pb).unwrap();
        assert_eq!(r, OmegaResult::True);
        assert_eq!(pb.geqs.len(), 2);
        assert!(pb.eqs.is_empty());
    }

    #[test]
    fn test_simplify_collapses_tight_range_to_equality() {
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(1, 1).unwrap();
        pb.init_variables();
        pb.add_inequality(&[-4, 1], Color::Black).unwrap();
        pb.add_inequality(&[4, -1], Color::Black).unwrap();

        let r = solver.simplify_problem(&mut pb).unwrap();
        assert_eq!(r, OmegaResult::True);
        // x = 4 survives as a substitution for the protected variable.
        assert!(pb.geqs.is_empty());
        assert_eq!(pb.subs.len(), 1);
        assert_eq!(pb.subs[0].key, 1);
        assert_eq!(pb.subs[0].coef[0], 4);
    }

    #[test]
    fn test_simplify_infeasible_system() {
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(1, 1).unwrap();
        pb.init_variables();
        pb.add_inequality(&[-5, 1], Color::Black).unwrap();
        pb.add_inequality(&[3, -1], Color::Black).unwrap();

        let r = solver.simplify_problem(&mut pb).unwrap();
        assert_eq!(r, OmegaResult::False);
    }

    #[test]
    fn test_simplify_runs_reduction_callback() {
        use std::cell::Cell;
        use std::rc::Rc;

        let fired = Rc::new(Cell::new(false));
        let seen = fired.clone();

        let mut solver = OmegaSolver::new();
        solver.set_when_reduced(Some(Box::new(move |_pb| {
            seen.set(true);
        })));

        let mut pb = Problem::new(1, 1).unwrap();
        pb.init_variables();
        pb.add_inequality(&[0, 1], Color::Black).unwrap();

        solver.simplify_problem(&mut pb).unwrap();
        assert!(fired.get());
    }

    #[test]
    fn test_gist_reports_restricting_red() {
        // Black context: x >= 0. Red constraint: x >= 5 restricts it.
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(1, 1).unwrap();
        pb.init_variables();
        pb.add_inequality(&[0, 1], Color::Black).unwrap();
        pb.add_inequality(&[-5, 1], Color::Red).unwrap();

        assert!(solver.problem_has_red_equations(&mut pb).unwrap());
    }

    #[test]
    fn test_gist_drops_implied_red() {
        // Black context: x >= 5. Red constraint: x >= 3 is implied.
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(1, 1).unwrap();
        pb.init_variables();
        pb.add_inequality(&[-5, 1], Color::Black).unwrap();
        pb.add_inequality(&[-3, 1], Color::Red).unwrap();

        assert!(!solver.problem_has_red_equations(&mut pb).unwrap());
    }

    #[test]
    fn test_gist_detects_contradictory_red() {
        // Red x <= 2 contradicts black x >= 5: the gist is false.
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(1, 1).unwrap();
        pb.init_variables();
        pb.add_inequality(&[-5, 1], Color::Black).unwrap();
        pb.add_inequality(&[2, -1], Color::Red).unwrap();

        assert!(solver.problem_has_red_equations(&mut pb).unwrap());
        assert_eq!(pb.eqs.len(), 1);
        assert_eq!(pb.eqs[0].color, Color::Red);
        assert_eq!(pb.eqs[0].coef[0], 1);
    }

    #[test]
    #[should_panic(expected = "recursion depth")]
    fn test_depth_guard_panics() {
        let mut solver = OmegaSolver::new();
        solver.solve_depth = MAX_SOLVE_DEPTH;
        let mut pb = Problem::new(1, 0).unwrap();
        pb.init_variables();
        let _ = solver.solve_problem(&mut pb, Goal::Unknown, None);
    }
}
