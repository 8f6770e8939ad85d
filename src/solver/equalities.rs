//! Equality elimination: the integer GCD test and mod-reduction engine.
//!
//! Equalities are consumed one at a time, most recent first. Unit
//! coefficients allow direct substitution; otherwise the row is tightened
//! by gcd division, reduced symmetrically modulo a small factor through a
//! fresh wildcard, or split into a safe part plus a mod-g companion
//! equation. Substituted-out safe variables are recorded so the caller can
//! still reason about them after simplification.

use crate::context::{Goal, OmegaResult, OmegaSolver};
use crate::eqn::{gcd, int_mod, Color, Eqn};
use crate::error::SolveResult;
use crate::problem::Problem;
use log::debug;

/// Replace `var` with `c * sub` in every row of `pb`. When `var` is a safe
/// non-wildcard, the substitution is recorded under its external id.
pub(crate) fn substitute(pb: &mut Problem, sub: &Eqn, var: usize, c: i64) {
    let n = pb.num_vars;
    let packing: Vec<usize> = (0..=n).rev().filter(|&k| sub.coef[k] != 0).collect();

    if packing.is_empty() {
        for e in pb.eqs.iter_mut() {
            e.coef[var] = 0;
        }
        for e in pb.geqs.iter_mut() {
            if e.coef[var] != 0 {
                e.touched = true;
                e.coef[var] = 0;
            }
        }
        for e in pb.subs.iter_mut() {
            e.coef[var] = 0;
        }

        if pb.safe_var(var) && !pb.wildcard(var) {
            let mut rec = Eqn::zero(Color::Black);
            rec.key = pb.var[var];
            pb.subs.push(rec);
        }
    } else if packing.len() == 1 && packing[0] == 0 {
        // Constant substitution.
        let c = -sub.coef[0] * c;

        for e in pb.eqs.iter_mut() {
            e.coef[0] += e.coef[var] * c;
            e.coef[var] = 0;
        }
        for e in pb.geqs.iter_mut() {
            if e.coef[var] != 0 {
                e.coef[0] += e.coef[var] * c;
                e.coef[var] = 0;
                e.touched = true;
            }
        }
        for e in pb.subs.iter_mut() {
            e.coef[0] += e.coef[var] * c;
            e.coef[var] = 0;
        }

        if pb.safe_var(var) && !pb.wildcard(var) {
            let mut rec = Eqn::zero(Color::Black);
            rec.coef[0] = c;
            rec.key = pb.var[var];
            pb.subs.push(rec);
        }
    } else {
        for e in pb.eqs.iter_mut() {
            let k = e.coef[var];
            if k != 0 {
                let k = c * k;
                e.coef[var] = 0;
                for &j0 in &packing {
                    e.coef[j0] -= sub.coef[j0] * k;
                }
            }
        }
        for e in pb.geqs.iter_mut() {
            let k = e.coef[var];
            if k != 0 {
                let k = c * k;
                e.touched = true;
                e.coef[var] = 0;
                for &j0 in &packing {
                    e.coef[j0] -= sub.coef[j0] * k;
                }
            }
        }
        for e in pb.subs.iter_mut() {
            let k = e.coef[var];
            if k != 0 {
                let k = c * k;
                e.coef[var] = 0;
                for &j0 in &packing {
                    e.coef[j0] -= sub.coef[j0] * k;
                }
            }
        }

        if pb.safe_var(var) && !pb.wildcard(var) {
            let mut rec = Eqn::zero(sub.color);
            for k in 0..=n {
                rec.coef[k] = -c * sub.coef[k];
            }
            rec.key = pb.var[var];
            pb.subs.push(rec);
        }
    }
}

/// Like [`substitute`] but only rewrites red rows; a black row that
/// mentions `var` is left alone and reported through the return value.
pub(crate) fn substitute_red(pb: &mut Problem, sub: &Eqn, var: usize, c: i64) -> bool {
    let n = pb.num_vars;
    let packing: Vec<usize> = (0..=n).rev().filter(|&k| sub.coef[k] != 0).collect();
    let mut found_black = false;

    let subst_one = |e: &mut Eqn, found_black: &mut bool| {
        let k = e.coef[var];
        if k != 0 {
            if e.color == Color::Black {
                *found_black = true;
            } else {
                e.coef[var] = 0;
                for &j0 in &packing {
                    e.coef[j0] -= sub.coef[j0] * k * c;
                }
            }
        }
    };

    for e in pb.eqs.iter_mut() {
        subst_one(e, &mut found_black);
    }
    for e in pb.geqs.iter_mut() {
        let was_red = e.color == Color::Red && e.coef[var] != 0;
        subst_one(e, &mut found_black);
        if was_red {
            e.touched = true;
        }
    }
    for e in pb.subs.iter_mut() {
        subst_one(e, &mut found_black);
    }

    if pb.safe_var(var) && !pb.wildcard(var) {
        found_black = true;
    }
    found_black
}

impl OmegaSolver {
    /// Reduce equality `e` symmetrically modulo `factor`, substituting a
    /// fresh wildcard for variable `j`, then divide the row by `factor`.
    pub(crate) fn do_mod(
        &mut self,
        pb: &mut Problem,
        factor: i64,
        e: usize,
        j: usize,
    ) -> SolveResult<()> {
        let mut eq = pb.eqs[e].clone();
        let mut kill_j = false;

        for k in 0..=pb.num_vars {
            eq.coef[k] = int_mod(eq.coef[k], factor);
            if 2 * eq.coef[k] >= factor {
                eq.coef[k] -= factor;
            }
        }

        let nfactor = eq.coef[j];

        if pb.safe_var(j) && !pb.wildcard(j) {
            let i = self.add_new_wild_card(pb)?;
            // Mirror the column shuffle the wildcard insertion applied to
            // the problem rows.
            eq.coef[pb.num_vars] = eq.coef[i];
            eq.coef[j] = 0;
            eq.coef[i] = -factor;
            kill_j = true;
        } else {
            eq.coef[j] = -factor;
            if !pb.wildcard(j) {
                self.name_wild_card(pb, j);
            }
        }

        substitute(pb, &eq, j, nfactor);

        for k in 0..=pb.num_vars {
            pb.eqs[e].coef[k] /= factor;
        }

        if kill_j {
            pb.delete_variable(j);
        }

        debug!("mod-{} reduction applied to equality {}", factor, e);
        Ok(())
    }

    /// Eliminate variable `i` using the removed equality `row`.
    pub(crate) fn do_elimination(
        &mut self,
        pb: &mut Problem,
        row: Eqn,
        i: usize,
    ) -> SolveResult<()> {
        debug!("eliminating variable {}", pb.var_name(i));

        let mut sub = row.clone();
        let c = sub.coef[i];
        sub.coef[i] = 0;

        if c == 1 || c == -1 {
            if row.color == Color::Red {
                let found_black = substitute_red(pb, &sub, i, c);
                if found_black {
                    self.push_eq_as_geq_pair(pb, &row)?;
                } else {
                    pb.delete_variable(i);
                }
            } else {
                substitute(pb, &sub, i, c);
                pb.delete_variable(i);
            }
        } else {
            let a = c.abs();
            let n = pb.num_vars;
            debug!("non-exact elimination, pivot coefficient {}", c);

            for e in pb.eqs.iter_mut() {
                if e.coef[i] != 0 {
                    for j in 0..=n {
                        e.coef[j] *= a;
                    }
                    let k = e.coef[i];
                    e.coef[i] = 0;
                    if sub.color == Color::Red {
                        e.color = Color::Red;
                    }
                    for j in 0..=n {
                        e.coef[j] -= sub.coef[j] * k / c;
                    }
                }
            }

            for e in pb.geqs.iter_mut() {
                if e.coef[i] != 0 {
                    if sub.color == Color::Red {
                        e.color = Color::Red;
                    }
                    for j in 0..=n {
                        e.coef[j] *= a;
                    }
                    e.touched = true;
                    let k = e.coef[i];
                    e.coef[i] = 0;
                    for j in 0..=n {
                        e.coef[j] -= sub.coef[j] * k / c;
                    }
                }
            }

            debug_assert!(
                pb.subs.iter().all(|s| s.coef[i] == 0),
                "non-unit elimination of a substituted variable"
            );

            if self.in_approximate_mode {
                pb.delete_variable(i);
            } else {
                self.push_eq_as_geq_pair(pb, &row)?;
            }
        }

        Ok(())
    }

    /// Insert `row >= 0` and `-row >= 0` for a removed equality row.
    fn push_eq_as_geq_pair(&mut self, pb: &mut Problem, row: &Eqn) -> SolveResult<()> {
        let n = pb.num_vars;
        let mut pos = row.clone();
        pos.touched = true;
        let mut neg = pos.clone();
        for c in neg.coef[0..=n].iter_mut() {
            *c = -*c;
        }
        pb.push_geq(pos)?;
        pb.push_geq(neg)?;
        Ok(())
    }

    /// Eliminate free wildcards that appear in exactly one equality from
    /// the rest of the system.
    pub(crate) fn cleanout_wildcards(&mut self, pb: &mut Problem) -> SolveResult<()> {
        let n_vars = pb.num_vars;
        let mut renormalize = false;

        for e in (0..pb.eqs.len()).rev() {
            let mut i = n_vars;
            while !pb.safe_var(i) && i > 0 {
                if pb.eqs[e].coef[i] != 0 {
                    // i is the last nonzero free variable; find the next.
                    let mut j = i - 1;
                    while !pb.safe_var(j) && j > 0 {
                        if pb.eqs[e].coef[j] != 0 {
                            break;
                        }
                        j -= 1;
                    }

                    if pb.safe_var(j) || pb.eqs[e].coef[j] == 0 {
                        // i is the only free variable of this equality.
                        let sub = pb.eqs[e].clone();
                        let c = sub.coef[i];
                        let a = c.abs();
                        let sub_color = sub.color;

                        for e2 in 0..pb.eqs.len() {
                            if e2 != e
                                && pb.eqs[e2].coef[i] != 0
                                && (pb.eqs[e2].color == Color::Red
                                    || (pb.eqs[e2].color == Color::Black
                                        && sub_color == Color::Black))
                            {
                                let row = &mut pb.eqs[e2];
                                for v in 0..=n_vars {
                                    row.coef[v] *= a;
                                }
                                let k = row.coef[i];
                                for v in 0..=n_vars {
                                    row.coef[v] -= sub.coef[v] * k / c;
                                }
                                row.coef[i] = 0;
                                row.divide_by_full_gcd(n_vars);
                            }
                        }

                        for row in pb.geqs.iter_mut() {
                            if row.coef[i] != 0
                                && (row.color == Color::Red
                                    || (sub_color == Color::Black
                                        && row.color == Color::Black))
                            {
                                for v in 0..=n_vars {
                                    row.coef[v] *= a;
                                }
                                let k = row.coef[i];
                                for v in 0..=n_vars {
                                    row.coef[v] -= sub.coef[v] * k / c;
                                }
                                row.coef[i] = 0;
                                row.touched = true;
                                renormalize = true;
                            }
                        }

                        for row in pb.subs.iter_mut() {
                            if row.coef[i] != 0
                                && (row.color == Color::Red
                                    || (row.color == Color::Black
                                        && sub_color == Color::Black))
                            {
                                for v in 0..=n_vars {
                                    row.coef[v] *= a;
                                }
                                let k = row.coef[i];
                                for v in 0..=n_vars {
                                    row.coef[v] -= sub.coef[v] * k / c;
                                }
                                row.coef[i] = 0;
                                row.divide_by_full_gcd(n_vars);
                            }
                        }

                        break;
                    }
                }
                i -= 1;
            }
        }

        if renormalize {
            self.normalize_problem(pb, None)?;
        }
        Ok(())
    }

    /// Bring substituted variables back as equalities over fresh safe
    /// columns.
    pub(crate) fn resurrect_subs(&mut self, pb: &mut Problem) -> SolveResult<()> {
        if pb.subs.is_empty() || self.no_eqs_in_simplified != 0 {
            return Ok(());
        }

        debug!("problem reduced, bringing substituted variables back");

        let mut i = 1;
        while pb.safe_var(i) {
            if pb.wildcard(i) {
                pb.unprotect_1(&mut i, None);
            }
            i += 1;
        }

        let m = pb.subs.len();
        if pb.num_vars + m > crate::eqn::MAX_VARS {
            return Err(crate::error::OmegaError::CapacityExceeded {
                what: "variables",
                limit: crate::eqn::MAX_VARS,
            });
        }

        // Single-variable geq keys move with the columns they name.
        for e in 0..pb.geqs.len() {
            if pb.single_var_geq(&pb.geqs[e]) {
                if !pb.safe_var(pb.geqs[e].key.unsigned_abs() as usize) {
                    let shift = if pb.geqs[e].key > 0 { m as i32 } else { -(m as i32) };
                    pb.geqs[e].key += shift;
                }
            } else {
                pb.geqs[e].touched = true;
                pb.geqs[e].key = 0;
            }
        }

        // Shift the free columns up by m.
        let mut i = pb.num_vars;
        while !pb.safe_var(i) && i > 0 {
            pb.var[i + m] = pb.var[i];
            for e in pb.geqs.iter_mut() {
                e.coef[i + m] = e.coef[i];
            }
            for e in pb.eqs.iter_mut() {
                e.coef[i + m] = e.coef[i];
            }
            for e in pb.subs.iter_mut() {
                e.coef[i + m] = e.coef[i];
            }
            i -= 1;
        }

        let mut i = pb.safe_vars + m;
        while i > pb.safe_vars {
            for e in pb.geqs.iter_mut() {
                e.coef[i] = 0;
            }
            for e in pb.eqs.iter_mut() {
                e.coef[i] = 0;
            }
            for e in pb.subs.iter_mut() {
                e.coef[i] = 0;
            }
            i -= 1;
        }

        pb.num_vars += m;

        let subs = std::mem::take(&mut pb.subs);
        for (s, sub) in subs.iter().enumerate().rev() {
            pb.var[pb.safe_vars + 1 + s] = sub.key;
            let mut eq = sub.clone();
            eq.coef[pb.safe_vars + 1 + s] = -1;
            eq.color = Color::Black;
            pb.push_eq(eq)?;
        }

        pb.safe_vars += m;
        self.cleanout_wildcards(pb)
    }

    /// Eliminate every equality of `pb`. Returns `False` on a proven
    /// contradiction, `Unknown` otherwise.
    pub(crate) fn solve_eq(
        &mut self,
        pb: &mut Problem,
        desired: Goal,
    ) -> SolveResult<OmegaResult> {
        if !pb.eqs.is_empty() {
            debug!("solve_eq: {} equalities, may_be_red {}", pb.eqs.len(), self.may_be_red);
        }

        // Process black equalities before red ones.
        if self.may_be_red > 0 && !pb.eqs.is_empty() {
            let mut i = 0;
            let mut j = pb.eqs.len() - 1;
            loop {
                while i <= j && pb.eqs[i].color == Color::Red {
                    i += 1;
                }
                while j > i && pb.eqs[j].color == Color::Black {
                    j -= 1;
                }
                if i >= j {
                    break;
                }
                pb.eqs.swap(i, j);
                i += 1;
                j -= 1;
            }
        }

        let mut e = pb.eqs.len();
        'eqs: while e > 0 {
            e -= 1;

            // Locate the last and second-to-last nonzero coefficients.
            let mut i = pb.num_vars;
            while i > 0 && pb.eqs[e].coef[i] == 0 {
                i -= 1;
            }

            if i == 0 {
                if pb.eqs[e].coef[0] != 0 {
                    debug!("solve_eq: contradictory constant equality");
                    return Ok(OmegaResult::False);
                }
                pb.eqs.remove(e);
                continue;
            }

            let g_signed = pb.eqs[e].coef[i];
            let mut j = i - 1;
            while j > 0 && pb.eqs[e].coef[j] == 0 {
                j -= 1;
            }

            if j == 0 {
                // Single-variable equality: divisibility is the whole test.
                if pb.eqs[e].coef[0] % g_signed != 0 {
                    debug!("solve_eq: single variable fails divisibility");
                    return Ok(OmegaResult::False);
                }
                pb.eqs[e].coef[0] /= g_signed;
                pb.eqs[e].coef[i] = 1;
                let row = pb.eqs.remove(e);
                self.do_elimination(pb, row, i)?;
                continue;
            }

            let mut g = g_signed.abs();
            if g == 1 {
                let row = pb.eqs.remove(e);
                self.do_elimination(pb, row, i)?;
                continue;
            }

            let k = j;
            let mut promotion_possible = pb.safe_var(j)
                && pb.safe_vars + 1 == i
                && !Self::eqn_is_red(&pb.eqs[e], desired)
                && !self.in_approximate_mode;

            // Gcd analysis, restarted after a safety promotion.
            let g2 = loop {
                let mut jj = j;
                let mut g2v;

                if !pb.safe_var(jj) {
                    while g != 1 && jj >= 1 && !pb.safe_var(jj) {
                        g = gcd(pb.eqs[e].coef[jj].abs(), g);
                        jj -= 1;
                    }
                    g2v = g;
                } else if !pb.safe_var(i) {
                    g2v = g;
                } else {
                    g2v = 0;
                }

                while g != 1 && jj > 0 {
                    g = gcd(pb.eqs[e].coef[jj].abs(), g);
                    jj -= 1;
                }

                if g > 1 {
                    if pb.eqs[e].coef[0] % g != 0 {
                        debug!("solve_eq: row gcd fails divisibility");
                        return Ok(OmegaResult::False);
                    }
                    for c in pb.eqs[e].coef[0..=pb.num_vars].iter_mut() {
                        *c /= g;
                    }
                    g2v /= g;
                }

                if g2v > 1 {
                    let owned = pb.eqs[..e].iter().all(|q| q.coef[i] == 0)
                        && pb.geqs.iter().all(|q| q.coef[i] == 0)
                        && pb.subs.iter().all(|q| q.coef[i] == 0);

                    if owned {
                        // No other constraint mentions the variable;
                        // reduce the row symmetrically modulo its
                        // coefficient.
                        let g_own = pb.eqs[e].coef[i].abs();
                        let mut change = false;

                        for jx in (0..i).rev() {
                            let mut t = int_mod(pb.eqs[e].coef[jx], g_own);
                            if 2 * t >= g_own {
                                t -= g_own;
                            }
                            if t != pb.eqs[e].coef[jx] {
                                pb.eqs[e].coef[jx] = t;
                                change = true;
                            }
                        }

                        if change {
                            self.name_wild_card(pb, i);
                            e += 1;
                            continue 'eqs;
                        }
                    }
                }

                if promotion_possible {
                    debug!("promoting {} to safety", pb.var_name(i));
                    pb.safe_vars += 1;
                    if !pb.wildcard(i) {
                        self.name_wild_card(pb, i);
                    }
                    promotion_possible = false;
                    j = k;
                    continue;
                }

                break g2v;
            };

            if g2 > 1 && !self.in_approximate_mode {
                if pb.eqs[e].color == Color::Red {
                    debug!("handling red equality");
                    let row = pb.eqs.remove(e);
                    self.do_elimination(pb, row, i)?;
                    continue;
                }

                // The free part is divisible by g2: keep the safe prefix
                // plus a mod-g2 companion equation over a new wildcard.
                debug!("adding companion equation for safe variables");
                let i_new = self.add_new_wild_card(pb)?;
                let mut comp = pb.eqs[e].clone();
                for c in comp.coef[pb.safe_vars + 1..=pb.num_vars].iter_mut() {
                    *c = 0;
                }
                for jx in 0..=pb.num_vars {
                    comp.coef[jx] = int_mod(comp.coef[jx], g2);
                    if 2 * comp.coef[jx] >= g2 {
                        comp.coef[jx] -= g2;
                    }
                }
                comp.coef[i_new] = g2;
                pb.push_eq(comp)?;
                e += 2;
                continue;
            }

            let sv = if g2 == 0 { 0 } else { pb.safe_vars };

            // Find a variable to eliminate.
            let pivot = if g2 > 1 {
                debug_assert!(self.in_approximate_mode);
                let mut ii = pb.num_vars;
                while ii > sv && pb.eqs[e].coef[ii] == 0 {
                    ii -= 1;
                }
                ii
            } else {
                let mut ii = pb.num_vars;
                while ii > sv && pb.eqs[e].coef[ii].abs() != 1 {
                    ii -= 1;
                }
                ii
            };

            if pivot > sv {
                let row = pb.eqs.remove(e);
                self.do_elimination(pb, row, pivot)?;
            } else {
                // No unit coefficient: mod-reduce. A single odd
                // coefficient lets us use factor 2.
                debug!("mod-reducing equality {}", e);
                let mut j_odd = 0;
                let mut ii = pb.num_vars;
                while ii != sv {
                    if pb.eqs[e].coef[ii] & 1 != 0 {
                        j_odd = ii;
                        ii -= 1;
                        while ii != sv && pb.eqs[e].coef[ii] & 1 == 0 {
                            ii -= 1;
                        }
                        break;
                    }
                    ii -= 1;
                }

                if j_odd != 0 && ii == sv {
                    self.do_mod(pb, 2, e, j_odd)?;
                    e += 1;
                    continue;
                }

                let mut factor = i64::MAX;
                let mut j_min = 0;
                for ii in ((sv + 1)..=pb.num_vars).rev() {
                    let a = pb.eqs[e].coef[ii].abs();
                    if a != 0 && factor > a + 1 {
                        factor = a + 1;
                        j_min = ii;
                    }
                }
                assert!(j_min != sv, "equality has no reducible variable");

                self.do_mod(pb, factor, e, j_min)?;
                e += 1;
            }
        }

        pb.eqs.clear();
        Ok(OmegaResult::Unknown)
    }
}
