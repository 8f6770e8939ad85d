//! Redundant constraint elimination.
//!
//! Three inequalities are compared through the determinants of their
//! coefficient pairs: when a positive combination of two constraints
//! dominates a third, the third is redundant; when the combination proves
//! the third negative, the whole problem is infeasible. The expensive
//! variants re-solve the problem with one constraint negated.

use crate::context::{Goal, OmegaResult, OmegaSolver};
use crate::eqn::{int_div, Color, Eqn};
use crate::error::SolveResult;
use crate::problem::Problem;
use log::debug;

/// Sign pattern of a constraint row over the problem variables, one bit per
/// column.
fn sign_bits(row: &Eqn, n_vars: usize) -> (u128, u128, u128) {
    let mut pos = 0u128;
    let mut zero = 0u128;
    let mut neg = 0u128;
    let mut bit = 1u128;
    for i in (1..=n_vars).rev() {
        if row.coef[i] > 0 {
            pos |= bit;
        } else if row.coef[i] < 0 {
            neg |= bit;
        } else {
            zero |= bit;
        }
        bit <<= 1;
    }
    (pos, zero, neg)
}

#[inline]
fn implies(a: u128, b: u128) -> bool {
    a == a & b
}

/// First variable pair on which two rows are not proportional, and the
/// corresponding determinant.
fn cross_term(a: &Eqn, b: &Eqn, n_vars: usize) -> Option<(usize, usize, i64)> {
    for p in (2..=n_vars).rev() {
        for q in (1..p).rev() {
            let alpha = a.coef[p] * b.coef[q] - b.coef[p] * a.coef[q];
            if alpha != 0 {
                return Some((p, q, alpha));
            }
        }
    }
    None
}

/// Eliminate free variables that are unbounded on at least one side and
/// unmentioned by equalities and substitutions. Every such variable can
/// absorb its constraints, so the geqs naming it are dropped with it.
/// Columns above `fv` are candidates.
pub(crate) fn free_eliminations(pb: &mut Problem, fv: usize) {
    let mut try_again = true;
    while try_again {
        try_again = false;

        let mut i = pb.num_vars;
        while i > fv {
            let n_vars = pb.num_vars;
            let e = pb.geqs.iter().rposition(|g| g.coef[i] != 0);

            let bounded_both = match e {
                None => false,
                Some(e) => {
                    let pos = pb.geqs[e].coef[i] > 0;
                    pb.geqs[..e].iter().any(|g| {
                        if pos {
                            g.coef[i] < 0
                        } else {
                            g.coef[i] > 0
                        }
                    })
                }
            };

            if !bounded_both
                && pb.subs.iter().all(|s| s.coef[i] == 0)
                && pb.eqs.iter().all(|q| q.coef[i] == 0)
            {
                debug!("free elimination of {}", pb.var_name(i));

                if let Some(e) = e {
                    pb.delete_geq(e);
                    for e2 in (0..e).rev() {
                        if pb.geqs[e2].coef[i] != 0 {
                            pb.delete_geq(e2);
                        }
                    }
                    // Deleting a middle column moves the last one into its
                    // place, which may unblock columns already visited.
                    try_again = i < n_vars;
                }

                pb.delete_variable(i);
            }

            i -= 1;
        }
    }
}

/// Like [`free_eliminations`], but only variables untouched by red
/// constraints are eliminated, so the gist computation stays sound.
pub(crate) fn free_red_eliminations(pb: &mut Problem) {
    let n_vars = pb.num_vars;
    let mut is_red_var = vec![false; n_vars + 1];
    let mut is_dead_var = vec![false; n_vars + 1];
    let mut is_dead_geq = vec![false; pb.geqs.len()];

    for g in pb.geqs.iter() {
        if g.color == Color::Red {
            for i in 1..=n_vars {
                if g.coef[i] != 0 {
                    is_red_var[i] = true;
                }
            }
        }
    }

    let mut try_again = true;
    while try_again {
        try_again = false;

        for i in (1..=n_vars).rev() {
            if is_red_var[i] || is_dead_var[i] {
                continue;
            }

            let e = (0..pb.geqs.len())
                .rev()
                .find(|&e| !is_dead_geq[e] && pb.geqs[e].coef[i] != 0);

            let bounded_both = match e {
                None => false,
                Some(e) => {
                    let pos = pb.geqs[e].coef[i] > 0;
                    (0..e).rev().any(|e2| {
                        !is_dead_geq[e2]
                            && if pos {
                                pb.geqs[e2].coef[i] < 0
                            } else {
                                pb.geqs[e2].coef[i] > 0
                            }
                    })
                }
            };

            if bounded_both
                || pb.subs.iter().any(|s| s.coef[i] != 0)
                || pb.eqs.iter().any(|q| q.coef[i] != 0)
            {
                continue;
            }

            debug!("free red elimination of {}", pb.var_name(i));

            if let Some(e) = e {
                for e2 in (0..=e).rev() {
                    if pb.geqs[e2].coef[i] != 0 {
                        is_dead_geq[e2] = true;
                    }
                }
            }

            try_again = true;
            is_dead_var[i] = true;
        }
    }

    for e in (0..pb.geqs.len()).rev() {
        if is_dead_geq[e] {
            pb.delete_geq(e);
        }
    }

    for i in (1..=n_vars).rev() {
        if is_dead_var[i] {
            pb.delete_variable(i);
        }
    }
}

/// Collapse untouched red geq pairs that bound the same expression from
/// both sides with matching constants into black equalities. Every
/// solution satisfies the pinned value whether or not the red rows are
/// kept, so the equality carries no red restriction.
pub(crate) fn coalesce(pb: &mut Problem) -> SolveResult<()> {
    let reds = pb.geqs.iter().filter(|g| g.color == Color::Red).count();
    if reds < 2 {
        return Ok(());
    }

    let n = pb.geqs.len();
    let mut is_dead = vec![false; n];

    for e in 0..n {
        if pb.geqs[e].color != Color::Red || pb.geqs[e].touched {
            continue;
        }
        for e2 in e + 1..n {
            if !pb.geqs[e2].touched
                && pb.geqs[e].key == -pb.geqs[e2].key
                && pb.geqs[e].coef[0] == -pb.geqs[e2].coef[0]
                && pb.geqs[e2].color == Color::Red
            {
                let mut row = pb.geqs[e].clone();
                row.color = Color::Black;
                pb.push_eq(row)?;
                is_dead[e] = true;
                is_dead[e2] = true;
            }
        }
    }

    for e in (0..n).rev() {
        if is_dead[e] {
            pb.delete_geq(e);
        }
    }

    Ok(())
}

impl OmegaSolver {
    /// Drop inequalities implied by positive combinations of two others.
    /// Returns `false` when a combination proves the problem infeasible.
    /// With `expensive` set, surviving geqs are additionally checked by
    /// negating each one and re-solving.
    pub(crate) fn eliminate_redundant(
        &mut self,
        pb: &mut Problem,
        expensive: bool,
        mut outer: Option<&mut Problem>,
    ) -> SolveResult<bool> {
        let n = pb.geqs.len();
        let mut is_dead = vec![false; n];
        let mut pos = vec![0u128; n];
        let mut zero = vec![0u128; n];
        let mut neg = vec![0u128; n];

        for e in 0..n {
            let (p, z, ng) = sign_bits(&pb.geqs[e], pb.num_vars);
            pos[e] = p;
            zero[e] = z;
            neg[e] = ng;
        }

        for e1 in (0..n).rev() {
            if is_dead[e1] {
                continue;
            }
            for e2 in (0..e1).rev() {
                if is_dead[e2] {
                    continue;
                }

                let (p, q, alpha) =
                    match cross_term(&pb.geqs[e1], &pb.geqs[e2], pb.num_vars) {
                        Some(t) => t,
                        None => continue,
                    };

                let pz = (zero[e1] & zero[e2])
                    | (pos[e1] & neg[e2])
                    | (neg[e1] & pos[e2]);
                let pp = pos[e1] | pos[e2];
                let pn = neg[e1] | neg[e2];

                'e3loop: for e3 in (0..n).rev() {
                    if e3 == e1 || e3 == e2 {
                        continue;
                    }
                    if !implies(zero[e3], pz) {
                        continue;
                    }

                    let mut alpha1 = pb.geqs[e2].coef[q] * pb.geqs[e3].coef[p]
                        - pb.geqs[e2].coef[p] * pb.geqs[e3].coef[q];
                    let mut alpha2 = -(pb.geqs[e1].coef[q] * pb.geqs[e3].coef[p]
                        - pb.geqs[e1].coef[p] * pb.geqs[e3].coef[q]);
                    let mut alpha3 = alpha;

                    if alpha1 * alpha2 <= 0 {
                        continue;
                    }

                    if alpha1 < 0 {
                        alpha1 = -alpha1;
                        alpha2 = -alpha2;
                        alpha3 = -alpha3;
                    }

                    if alpha3 > 0 {
                        // Trying to prove e3 redundant.
                        if !implies(pos[e3], pp) || !implies(neg[e3], pn) {
                            continue;
                        }
                        if pb.geqs[e3].color == Color::Black
                            && (pb.geqs[e1].color == Color::Red
                                || pb.geqs[e2].color == Color::Red)
                        {
                            continue;
                        }

                        for k in (1..=pb.num_vars).rev() {
                            if alpha3 * pb.geqs[e3].coef[k]
                                != alpha1 * pb.geqs[e1].coef[k]
                                    + alpha2 * pb.geqs[e2].coef[k]
                            {
                                continue 'e3loop;
                            }
                        }

                        let c = alpha1 * pb.geqs[e1].coef[0]
                            + alpha2 * pb.geqs[e2].coef[0];
                        if c < alpha3 * (pb.geqs[e3].coef[0] + 1) {
                            debug!("inequality implied by a pair, dropping it");
                            is_dead[e3] = true;
                        }
                    } else {
                        // Trying to prove e3 <= 0 (so e3 = 0), or e3 < 0
                        // (so the problem has no solutions).
                        if !implies(pos[e3], pn) || !implies(neg[e3], pp) {
                            continue;
                        }
                        if pb.geqs[e1].color == Color::Red
                            || pb.geqs[e2].color == Color::Red
                            || pb.geqs[e3].color == Color::Red
                        {
                            continue;
                        }

                        for k in (1..=pb.num_vars).rev() {
                            if alpha3 * pb.geqs[e3].coef[k]
                                != alpha1 * pb.geqs[e1].coef[k]
                                    + alpha2 * pb.geqs[e2].coef[k]
                            {
                                continue 'e3loop;
                            }
                        }

                        let c = alpha1 * pb.geqs[e1].coef[0]
                            + alpha2 * pb.geqs[e2].coef[0];
                        if c < alpha3 * pb.geqs[e3].coef[0] {
                            debug!("pair implies a strictly negative row");
                            return Ok(false);
                        } else if c < alpha3 * (pb.geqs[e3].coef[0] - 1) {
                            debug!("pair forces an inequality tight");
                            let row = pb.geqs[e3].clone();
                            pb.push_eq(row)?;
                            let e = pb.eqs.len() - 1;
                            self.adding_equality_constraint(
                                outer.as_deref_mut(),
                                pb,
                                e,
                            )?;
                            is_dead[e3] = true;
                        }
                    }
                }
            }
        }

        for e in (0..n).rev() {
            if is_dead[e] {
                pb.delete_geq(e);
            }
        }

        if expensive {
            self.conservative += 1;

            let mut e = pb.geqs.len();
            while e > 0 {
                e -= 1;
                let mut trial = pb.clone();
                trial.negate_geq(e);
                trial.safe_vars = 0;
                trial.variables_freed = false;

                if self.solve_problem(&mut trial, Goal::False, None)?
                    == OmegaResult::False
                {
                    pb.delete_geq(e);
                }
            }

            self.conservative -= 1;

            if !self.reduce_with_subs {
                self.resurrect_subs(pb)?;
                debug_assert!(self.no_eqs_in_simplified != 0 || pb.subs.is_empty());
            }
        }

        Ok(true)
    }

    /// For every black inequality whose smallest coefficient magnitude is
    /// large, try to derive an implied constraint with small coefficients
    /// and append it. Returns whether anything was added.
    pub(crate) fn smooth_weird_equations(&mut self, pb: &mut Problem) -> SolveResult<bool> {
        let mut added = false;

        for e1 in (0..pb.geqs.len()).rev() {
            if pb.geqs[e1].color != Color::Black {
                continue;
            }

            let mut g = 999_999i64;
            for v in (1..=pb.num_vars).rev() {
                let c = pb.geqs[e1].coef[v];
                if c != 0 && c.abs() < g {
                    g = c.abs();
                }
            }
            if g <= 20 {
                continue;
            }

            let mut cand = Eqn::zero(Color::Black);
            for v in (1..=pb.num_vars).rev() {
                cand.coef[v] = int_div(6 * pb.geqs[e1].coef[v] + g / 2, g);
            }
            cand.coef[0] = 9997;
            cand.touched = true;

            'e2loop: for e2 in (0..pb.geqs.len()).rev() {
                if e1 == e2 || pb.geqs[e2].color != Color::Black {
                    continue;
                }

                let (p, q, alpha) =
                    match cross_term(&pb.geqs[e1], &pb.geqs[e2], pb.num_vars) {
                        Some(t) => t,
                        None => continue,
                    };

                let mut alpha1 = pb.geqs[e2].coef[q] * cand.coef[p]
                    - pb.geqs[e2].coef[p] * cand.coef[q];
                let mut alpha2 = -(pb.geqs[e1].coef[q] * cand.coef[p]
                    - pb.geqs[e1].coef[p] * cand.coef[q]);
                let mut alpha3 = alpha;

                if alpha1 * alpha2 <= 0 {
                    continue;
                }

                if alpha1 < 0 {
                    alpha1 = -alpha1;
                    alpha2 = -alpha2;
                    alpha3 = -alpha3;
                }

                if alpha3 > 0 {
                    for k in (1..=pb.num_vars).rev() {
                        if alpha3 * cand.coef[k]
                            != alpha1 * pb.geqs[e1].coef[k]
                                + alpha2 * pb.geqs[e2].coef[k]
                        {
                            continue 'e2loop;
                        }
                    }

                    let c = alpha1 * pb.geqs[e1].coef[0]
                        + alpha2 * pb.geqs[e2].coef[0];
                    if c < alpha3 * (cand.coef[0] + 1) {
                        cand.coef[0] = int_div(c, alpha3);
                    }
                }
            }

            if cand.coef[0] < 9997 {
                debug!("smoothing a large-coefficient inequality");
                pb.push_geq(cand)?;
                added = true;
            }
        }

        Ok(added)
    }

    /// Drop red inequalities implied by the black context, first through
    /// determinant comparisons and then, if reds survive, by negate-and-solve
    /// checks. With `eliminate_all` unset, the first non-redundant red
    /// stops the expensive phase.
    pub fn eliminate_red(&mut self, pb: &mut Problem, eliminate_all: bool) -> SolveResult<()> {
        if !pb.eqs.is_empty() {
            self.simplify_problem(pb)?;
        }

        let n = pb.geqs.len();
        let mut is_dead = vec![false; n];

        for e in (0..n).rev() {
            if pb.geqs[e].color != Color::Black || is_dead[e] {
                continue;
            }
            for e2 in (0..e).rev() {
                if pb.geqs[e2].color != Color::Black || is_dead[e2] {
                    continue;
                }

                let (i, j, a) =
                    match cross_term(&pb.geqs[e], &pb.geqs[e2], pb.num_vars) {
                        Some(t) => t,
                        None => continue,
                    };

                for e3 in (0..n).rev() {
                    if pb.geqs[e3].color != Color::Red {
                        continue;
                    }

                    let alpha1 = pb.geqs[e2].coef[j] * pb.geqs[e3].coef[i]
                        - pb.geqs[e2].coef[i] * pb.geqs[e3].coef[j];
                    let alpha2 = -(pb.geqs[e].coef[j] * pb.geqs[e3].coef[i]
                        - pb.geqs[e].coef[i] * pb.geqs[e3].coef[j]);

                    if (a > 0 && alpha1 > 0 && alpha2 > 0)
                        || (a < 0 && alpha1 < 0 && alpha2 < 0)
                    {
                        let mut k = pb.num_vars as i64;
                        let mut c = 0;
                        while k >= 0 {
                            c = alpha1 * pb.geqs[e].coef[k as usize]
                                + alpha2 * pb.geqs[e2].coef[k as usize];
                            if c != a * pb.geqs[e3].coef[k as usize] {
                                break;
                            }
                            k -= 1;
                        }

                        if k < 0
                            || (k == 0
                                && ((a > 0 && c < a * pb.geqs[e3].coef[0])
                                    || (a < 0 && c > a * pb.geqs[e3].coef[0])))
                        {
                            debug!("red inequality implied by black pair");
                            is_dead[e3] = true;
                        }
                    }
                }
            }
        }

        for e in (0..n).rev() {
            if is_dead[e] {
                pb.delete_geq(e);
            }
        }

        if !pb.geqs.iter().any(|g| g.color == Color::Red) {
            debug!("fast red checks sufficed");
            if !self.reduce_with_subs {
                debug_assert!(self.no_eqs_in_simplified != 0 || pb.subs.is_empty());
            }
            return Ok(());
        }

        if !self.verify_simplification && !self.verify_problem(pb)? {
            return Ok(());
        }

        self.conservative += 1;

        let mut e = pb.geqs.len();
        while e > 0 {
            e -= 1;
            if pb.geqs[e].color != Color::Red {
                continue;
            }

            let mut trial = pb.clone();
            trial.negate_geq(e);
            trial.safe_vars = 0;
            trial.variables_freed = false;
            trial.subs.clear();

            if self.solve_problem(&mut trial, Goal::False, None)? == OmegaResult::False {
                debug!("red inequality is redundant");
                pb.delete_geq(e);
            } else if !eliminate_all {
                break;
            }
        }

        self.conservative -= 1;

        if !self.reduce_with_subs {
            debug_assert!(self.no_eqs_in_simplified != 0 || pb.subs.is_empty());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_elimination_drops_unbounded_var() {
        // y only appears with positive sign, so it absorbs its constraint.
        let mut pb = Problem::new(2, 0).unwrap();
        pb.init_variables();
        pb.add_inequality(&[0, 1, 0], Color::Black).unwrap();
        pb.add_inequality(&[-3, 1, 1], Color::Black).unwrap();

        free_eliminations(&mut pb, 1);
        assert_eq!(pb.num_vars, 1);
        assert_eq!(pb.geqs.len(), 1);
        assert_eq!(pb.geqs[0].coef[1], 1);
    }

    #[test]
    fn test_free_elimination_keeps_two_sided_var() {
        let mut pb = Problem::new(1, 0).unwrap();
        pb.init_variables();
        pb.add_inequality(&[0, 1], Color::Black).unwrap();
        pb.add_inequality(&[5, -1], Color::Black).unwrap();

        free_eliminations(&mut pb, 0);
        assert_eq!(pb.num_vars, 1);
        assert_eq!(pb.geqs.len(), 2);
    }

    #[test]
    fn test_eliminate_redundant_drops_implied_row() {
        // x >= 0 and y >= 0 together imply x + y + 1 >= 0.
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(2, 2).unwrap();
        pb.init_variables();
        pb.add_inequality(&[0, 1, 0], Color::Black).unwrap();
        pb.add_inequality(&[0, 0, 1], Color::Black).unwrap();
        pb.add_inequality(&[1, 1, 1], Color::Black).unwrap();

        let feasible = solver.eliminate_redundant(&mut pb, false, None).unwrap();
        assert!(feasible);
        assert_eq!(pb.geqs.len(), 2);
        assert!(pb.geqs.iter().all(|g| g.coef[1] + g.coef[2] == 1));
    }

    #[test]
    fn test_eliminate_redundant_detects_infeasible_combination() {
        // x >= 0, y >= 0, and x + y <= -1 cannot hold together.
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(2, 2).unwrap();
        pb.init_variables();
        pb.add_inequality(&[0, 1, 0], Color::Black).unwrap();
        pb.add_inequality(&[0, 0, 1], Color::Black).unwrap();
        pb.add_inequality(&[-1, -1, -1], Color::Black).unwrap();

        let feasible = solver.eliminate_redundant(&mut pb, false, None).unwrap();
        assert!(!feasible);
    }

    #[test]
    fn test_eliminate_redundant_promotes_tight_row() {
        // x >= 0, y >= 0, and x + y <= 0 force x + y = 0.
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(2, 2).unwrap();
        pb.init_variables();
        pb.add_inequality(&[0, 1, 0], Color::Black).unwrap();
        pb.add_inequality(&[0, 0, 1], Color::Black).unwrap();
        pb.add_inequality(&[0, -1, -1], Color::Black).unwrap();

        let feasible = solver.eliminate_redundant(&mut pb, false, None).unwrap();
        assert!(feasible);
        // The row proven tight, x >= 0, is the one promoted.
        assert_eq!(pb.eqs.len(), 1);
        assert_eq!(&pb.eqs[0].coef[0..3], &[0, 1, 0]);
        assert_eq!(pb.geqs.len(), 2);
        let mut rows: Vec<Vec<i64>> =
            pb.geqs.iter().map(|g| g.coef[0..3].to_vec()).collect();
        rows.sort();
        assert_eq!(rows, vec![vec![0, -1, -1], vec![0, 0, 1]]);
    }

    #[test]
    fn test_smooth_ignores_small_coefficients() {
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(2, 0).unwrap();
        pb.init_variables();
        pb.add_inequality(&[0, 3, 5], Color::Black).unwrap();

        assert!(!solver.smooth_weird_equations(&mut pb).unwrap());
        assert_eq!(pb.geqs.len(), 1);
    }

    #[test]
    fn test_smooth_derives_small_constraint() {
        // 31x + 50y >= 0 with x <= 2 admits the derived row 6x + 10y >= 0.
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(2, 0).unwrap();
        pb.init_variables();
        pb.add_inequality(&[0, 31, 50], Color::Black).unwrap();
        pb.add_inequality(&[2, -1, 0], Color::Black).unwrap();

        assert!(solver.smooth_weird_equations(&mut pb).unwrap());
        assert_eq!(pb.geqs.len(), 3);
        assert_eq!(&pb.geqs[2].coef[0..3], &[0, 6, 10]);
    }

    #[test]
    fn test_coalesce_promotes_opposed_red_pair() {
        let mut pb = Problem::new(2, 2).unwrap();
        pb.init_variables();

        let mut lo = Eqn::from_coeffs(&[-4, 1, 1], Color::Red);
        lo.key = 200;
        lo.touched = false;
        let mut hi = Eqn::from_coeffs(&[4, -1, -1], Color::Red);
        hi.key = -200;
        hi.touched = false;
        pb.push_geq(lo).unwrap();
        pb.push_geq(hi).unwrap();

        coalesce(&mut pb).unwrap();
        assert_eq!(pb.geqs.len(), 0);
        assert_eq!(pb.eqs.len(), 1);
        assert_eq!(&pb.eqs[0].coef[0..3], &[-4, 1, 1]);
        assert_eq!(pb.eqs[0].color, Color::Black);
    }

    #[test]
    fn test_opposed_red_pair_coalesces_to_black_equality() {
        // x >= 3 red and -x >= -3 red pin x = 3 in every solution; the
        // resulting equality must not count as a red restriction.
        let mut pb = Problem::new(1, 1).unwrap();
        pb.init_variables();

        let mut lo = Eqn::from_coeffs(&[-3, 1], Color::Red);
        lo.key = 1;
        lo.touched = false;
        let mut hi = Eqn::from_coeffs(&[3, -1], Color::Red);
        hi.key = -1;
        hi.touched = false;
        pb.push_geq(lo).unwrap();
        pb.push_geq(hi).unwrap();

        coalesce(&mut pb).unwrap();
        assert_eq!(pb.geqs.len(), 0);
        assert_eq!(pb.eqs.len(), 1);
        assert_eq!(&pb.eqs[0].coef[0..2], &[-3, 1]);
        assert_eq!(pb.eqs[0].color, Color::Black);
    }

    #[test]
    fn test_free_red_elimination_spares_red_vars() {
        let mut pb = Problem::new(2, 0).unwrap();
        pb.init_variables();
        // y is red-constrained and must survive; x is one-sided black.
        pb.add_inequality(&[0, 1, 0], Color::Black).unwrap();
        pb.add_inequality(&[0, 0, 1], Color::Red).unwrap();

        free_red_eliminations(&mut pb);
        assert_eq!(pb.num_vars, 1);
        assert_eq!(pb.geqs.len(), 1);
        assert_eq!(pb.geqs[0].color, Color::Red);
    }
}
