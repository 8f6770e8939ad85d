//! Bound and sign queries over simplified problems, plus helpers that
//! constrain an external variable through the forwarding table.
//!
//! These run after simplification has published forwarding addresses: a
//! query names a variable by its external id and the forwarding table
//! locates it as a live column or a substitution.

use crate::context::{OmegaResult, OmegaSolver};
use crate::eqn::{int_mod, Color, Eqn, NEG_INFINITY, POS_INFINITY};
use crate::error::SolveResult;
use crate::problem::Problem;

/// Bounds on one variable in a simplified problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarBounds {
    /// Greatest known lower bound, `NEG_INFINITY` when unbounded below.
    pub lower: i64,
    /// Least known upper bound, `POS_INFINITY` when unbounded above.
    pub upper: i64,
    /// Other variables participate in the constraints on this one, so the
    /// bounds cover only the single-variable part.
    pub coupled: bool,
}

impl Problem {
    /// Bounds on external variable `var` read off the simplified problem:
    /// a constant substitution or a single-variable defining equality give
    /// exact bounds, single-variable inequalities give partial ones.
    pub fn query_variable(&self, var: i32) -> VarBounds {
        let n_vars = self.num_vars;
        let mut b = VarBounds {
            lower: NEG_INFINITY,
            upper: POS_INFINITY,
            coupled: false,
        };

        let idx = self.forwarding[&var];
        if idx < 0 {
            let s = &self.subs[(-idx - 1) as usize];
            if s.coef[1..=n_vars].iter().any(|&c| c != 0) {
                b.coupled = true;
                return b;
            }
            b.lower = s.coef[0];
            b.upper = s.coef[0];
            return b;
        }

        let i = idx as usize;
        b.coupled = self.subs.iter().any(|s| s.coef[i] != 0);

        for e in self.eqs.iter().rev() {
            if e.coef[i] == 0 {
                continue;
            }
            if e.coef[1..=n_vars]
                .iter()
                .enumerate()
                .any(|(j, &c)| j + 1 != i && c != 0)
            {
                b.coupled = true;
            } else {
                // Unit coefficient after normalization.
                b.lower = -e.coef[i] * e.coef[0];
                b.upper = b.lower;
                b.coupled = false;
                return b;
            }
        }

        for g in self.geqs.iter().rev() {
            if g.coef[i] != 0 {
                if g.key == i as i32 {
                    b.lower = b.lower.max(-g.coef[0]);
                } else if g.key == -(i as i32) {
                    b.upper = b.upper.min(g.coef[0]);
                } else {
                    b.coupled = true;
                }
            }
        }

        b
    }

    /// Exact bounds for `var` when they can be determined, including the
    /// two-column case where `var` is defined in terms of one bounded
    /// variable. `None` means the variable is coupled beyond that.
    pub fn query_variable_bounds(&self, var: i32) -> Option<(i64, i64)> {
        let mut b = self.query_variable(var);

        if !b.coupled || (self.num_vars == 1 && self.forwarding[&var] == 1) {
            return Some((b.lower, b.upper));
        }

        if self.forwarding[&var].abs() == 1
            && self.num_vars + self.subs.len() == 2
            && self.eqs.len() + self.subs.len() == 1
        {
            query_coupled_variable(
                self,
                var,
                &mut b.lower,
                &mut b.upper,
                NEG_INFINITY,
                POS_INFINITY,
            );
            return Some((b.lower, b.upper));
        }

        None
    }

    /// Dependence direction mask for `var`: `dd_gt` when it can be
    /// negative, `dd_lt` when it can be positive, `dd_eq` when it can be
    /// zero. Returns the mask and the distance when the value is fixed.
    /// `lower_bound` and `upper_bound` narrow the range considered, e.g.
    /// from known loop trip counts.
    pub fn query_variable_signs(
        &self,
        var: i32,
        dd_lt: u8,
        dd_eq: u8,
        dd_gt: u8,
        lower_bound: i64,
        upper_bound: i64,
    ) -> (u8, Option<i64>) {
        let mut b = self.query_variable(var);
        let could_be_zero = query_coupled_variable(
            self,
            var,
            &mut b.lower,
            &mut b.upper,
            lower_bound,
            upper_bound,
        );

        let mut result = 0;
        if b.lower < 0 {
            result |= dd_gt;
        }
        if b.upper > 0 {
            result |= dd_lt;
        }
        if could_be_zero {
            result |= dd_eq;
        }

        let dist = if b.lower == b.upper {
            Some(b.lower)
        } else {
            None
        };
        (result, dist)
    }

    /// Add the equality `var = value` through the forwarding table.
    pub fn constrain_variable_value(
        &mut self,
        color: Color,
        var: i32,
        value: i64,
    ) -> SolveResult<()> {
        let k = self.forwarding[&var];

        let mut eq = if k < 0 {
            let mut eq = self.subs[(-1 - k) as usize].clone();
            eq.coef[0] -= value;
            eq
        } else {
            let mut eq = Eqn::zero(color);
            eq.coef[k as usize] = 1;
            eq.coef[0] = -value;
            eq
        };
        eq.color = color;
        self.push_eq(eq)
    }
}

impl OmegaSolver {
    /// Constrain the sign of `var` (`1` positive, `-1` negative, `0`
    /// zero), then unprotect it and re-simplify `pb`.
    pub fn constrain_variable_sign(
        &mut self,
        pb: &mut Problem,
        color: Color,
        var: i32,
        sign: i64,
    ) -> SolveResult<OmegaResult> {
        let n_vars = pb.num_vars;
        let k = pb.forwarding[&var];

        if k < 0 {
            let s = (-1 - k) as usize;
            if sign != 0 {
                let mut g = pb.subs[s].clone();
                for c in g.coef[0..=n_vars].iter_mut() {
                    *c *= sign;
                }
                g.coef[0] -= 1;
                g.touched = true;
                g.color = color;
                pb.push_geq(g)?;
            } else {
                let mut e = pb.subs[s].clone();
                e.color = color;
                pb.push_eq(e)?;
            }
        } else if sign != 0 {
            let mut g = Eqn::zero(color);
            g.coef[k as usize] = sign;
            g.coef[0] = -1;
            pb.push_geq(g)?;
        } else {
            let mut e = Eqn::zero(color);
            e.coef[k as usize] = 1;
            pb.push_eq(e)?;
        }

        pb.unprotect_variable(var)?;
        self.simplify_problem(pb)
    }
}

/// Refine the bounds of `var` in the two-column special case: one live
/// column plus either a substitution defining `var` or a defining
/// equality. Returns whether `var` can take the value zero.
fn query_coupled_variable(
    pb: &Problem,
    var: i32,
    l: &mut i64,
    u: &mut i64,
    mut lower_bound: i64,
    mut upper_bound: i64,
) -> bool {
    debug_assert!(pb.forwarding[&var].abs() == 1);
    debug_assert!(pb.num_vars + pb.subs.len() == 2);
    debug_assert!(pb.eqs.len() + pb.subs.len() == 1);

    // Express var in terms of the one remaining column v.
    let (eqn, sign, v) = if pb.forwarding[&var] == -1 {
        (&pb.subs[0], 1, 1usize)
    } else {
        let e = &pb.eqs[0];
        (e, -e.coef[1], 2usize)
    };

    for g in pb.geqs.iter().rev() {
        if g.coef[v] != 0 {
            if g.coef[v] == 1 {
                lower_bound = lower_bound.max(-g.coef[0]);
            } else {
                upper_bound = upper_bound.min(g.coef[0]);
            }
        }
    }

    if lower_bound > upper_bound {
        *l = POS_INFINITY;
        *u = NEG_INFINITY;
        return false;
    }

    let b1 = if lower_bound == NEG_INFINITY {
        if eqn.coef[v] > 0 {
            sign * NEG_INFINITY
        } else {
            -sign * NEG_INFINITY
        }
    } else {
        sign * (eqn.coef[0] + eqn.coef[v] * lower_bound)
    };

    let b2 = if upper_bound == POS_INFINITY {
        if eqn.coef[v] > 0 {
            sign * POS_INFINITY
        } else {
            -sign * POS_INFINITY
        }
    } else {
        sign * (eqn.coef[0] + eqn.coef[v] * upper_bound)
    };

    *l = (*l).max(b1.min(b2));
    *u = (*u).min(b1.max(b2));

    *l <= 0 && 0 <= *u && int_mod(eqn.coef[0], eqn.coef[v].abs()) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Goal;

    fn simplified_range(lo: i64, hi: i64) -> (OmegaSolver, Problem) {
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(1, 1).unwrap();
        pb.init_variables();
        pb.add_inequality(&[-lo, 1], Color::Black).unwrap();
        pb.add_inequality(&[hi, -1], Color::Black).unwrap();
        let r = solver.simplify_problem(&mut pb).unwrap();
        assert_eq!(r, OmegaResult::True);
        (solver, pb)
    }

    #[test]
    fn test_query_simplified_range() {
        let (_, pb) = simplified_range(2, 9);
        assert_eq!(pb.query_variable_bounds(1), Some((2, 9)));
        let b = pb.query_variable(1);
        assert!(!b.coupled);
    }

    #[test]
    fn test_query_substituted_constant() {
        let (_, pb) = simplified_range(4, 4);
        let b = pb.query_variable(1);
        assert_eq!((b.lower, b.upper, b.coupled), (4, 4, false));
    }

    #[test]
    fn test_query_bounds_through_substitution() {
        // x2 = 1 + 3*x1 with 0 <= x1 <= 5 gives x2 in [1, 16].
        let mut pb = Problem::new(1, 0).unwrap();
        pb.var[1] = 1;
        pb.forwarding.insert(1, 1);
        pb.forwarding.insert(2, -1);
        let mut sub = Eqn::from_coeffs(&[1, 3], Color::Black);
        sub.key = 2;
        pb.subs.push(sub);
        let mut lo = Eqn::from_coeffs(&[0, 1], Color::Black);
        lo.key = 1;
        lo.touched = false;
        pb.geqs.push(lo);
        let mut hi = Eqn::from_coeffs(&[5, -1], Color::Black);
        hi.key = -1;
        hi.touched = false;
        pb.geqs.push(hi);
        pb.variables_initialized = true;

        assert_eq!(pb.query_variable_bounds(2), Some((1, 16)));
    }

    #[test]
    fn test_query_signs_even_difference() {
        // d = 2w for a wildcard w: within [-3, 3] the difference can be
        // negative, zero, or positive, with no fixed distance.
        let mut pb = Problem::new(2, 1).unwrap();
        pb.var[1] = 1;
        pb.var[2] = -1;
        pb.forwarding.insert(1, 1);
        pb.eqs
            .push(Eqn::from_coeffs(&[0, 1, -2], Color::Black));
        pb.variables_initialized = true;

        let (mask, dist) = pb.query_variable_signs(1, 1, 2, 4, -3, 3);
        assert_eq!(mask, 1 | 2 | 4);
        assert_eq!(dist, None);
    }

    #[test]
    fn test_query_signs_fixed_distance() {
        // d = 2w with the wildcard pinned to [2, 2] fixes d = 4.
        let mut pb = Problem::new(2, 1).unwrap();
        pb.var[1] = 1;
        pb.var[2] = -1;
        pb.forwarding.insert(1, 1);
        pb.eqs
            .push(Eqn::from_coeffs(&[0, 1, -2], Color::Black));
        pb.variables_initialized = true;

        let (mask, dist) = pb.query_variable_signs(1, 1, 2, 4, 2, 2);
        assert_eq!(mask, 1);
        assert_eq!(dist, Some(4));
    }

    #[test]
    fn test_constrain_value_inside_range() {
        let (mut solver, mut pb) = simplified_range(2, 9);
        pb.constrain_variable_value(Color::Black, 1, 5).unwrap();
        let r = solver.simplify_problem(&mut pb).unwrap();
        assert_eq!(r, OmegaResult::True);
    }

    #[test]
    fn test_constrain_value_outside_range() {
        let (mut solver, mut pb) = simplified_range(2, 9);
        pb.constrain_variable_value(Color::Black, 1, 20).unwrap();
        let r = solver.simplify_problem(&mut pb).unwrap();
        assert_eq!(r, OmegaResult::False);
    }

    #[test]
    fn test_constrain_sign_feasible() {
        let (mut solver, mut pb) = simplified_range(-3, 9);
        let r = solver
            .constrain_variable_sign(&mut pb, Color::Black, 1, -1)
            .unwrap();
        assert_eq!(r, OmegaResult::True);
    }

    #[test]
    fn test_constrain_sign_infeasible() {
        let (mut solver, mut pb) = simplified_range(2, 9);
        let r = solver
            .constrain_variable_sign(&mut pb, Color::Black, 1, -1)
            .unwrap();
        assert_eq!(r, OmegaResult::False);
    }

    #[test]
    fn test_solve_after_constrain_value() {
        let (mut solver, mut pb) = simplified_range(2, 9);
        pb.constrain_variable_value(Color::Black, 1, 3).unwrap();
        let r = solver.solve_problem(&mut pb, Goal::Unknown, None).unwrap();
        assert_eq!(r, OmegaResult::True);
    }
}
