//! Inequality solving by Fourier-Motzkin elimination.
//!
//! Variables are eliminated one at a time. When a variable has a unit
//! coefficient somewhere on each side the elimination is exact; otherwise
//! the solver combines the real shadow (a necessary condition) with the
//! dark shadow (a sufficient one), and falls back to splintering the
//! problem into equality cases when the shadows disagree.

use crate::context::{Goal, OmegaResult, OmegaSolver};
use crate::eqn::{check_mul, int_div, Color, Eqn, MAX_GEQS, NEG_INFINITY, POS_INFINITY};
use crate::error::SolveResult;
use crate::problem::Problem;
use crate::solver::normalize::Normalize;
use crate::solver::redundancy::free_eliminations;
use log::debug;

impl OmegaSolver {
    /// Split on a pair of parallel constraints: the expression they bound
    /// can take only `diff + 1` values, and each value is tried as an
    /// equality.
    pub(crate) fn parallel_splinter(
        &mut self,
        pb: &mut Problem,
        e: usize,
        diff: i64,
        desired: Goal,
        mut outer: Option<&mut Problem>,
    ) -> SolveResult<OmegaResult> {
        debug!("using parallel splintering, {} cases", diff + 1);

        let row = pb.geqs[e].clone();
        pb.eqs.clear();
        pb.eqs.push(row);

        for _ in 0..=diff {
            let mut trial = pb.clone();
            if self.solve_problem(&mut trial, desired, outer.as_deref_mut())?
                == OmegaResult::True
            {
                return Ok(OmegaResult::True);
            }
            pb.eqs[0].coef[0] -= 1;
        }

        Ok(OmegaResult::False)
    }

    /// Solve a problem that contains only inequalities.
    pub(crate) fn solve_geq(
        &mut self,
        pb: &mut Problem,
        desired: Goal,
        mut outer: Option<&mut Problem>,
    ) -> SolveResult<OmegaResult> {
        if desired != Goal::Simplify {
            pb.subs.clear();
            pb.safe_vars = 0;
        }

        let mut coupled_subscripts = false;
        let mut smoothed = false;
        let mut tried_eliminating_redundant = false;

        'problem: loop {
            debug_assert!(desired == Goal::Simplify || pb.subs.is_empty());
            debug!("solve_geq({:?}):\n{}", desired, pb);

            let mut n_vars = pb.num_vars;

            if n_vars == 1 {
                let mut u_color = Color::Black;
                let mut l_color = Color::Black;
                let mut upper_bound = POS_INFINITY;
                let mut lower_bound = NEG_INFINITY;

                for e in (0..pb.geqs.len()).rev() {
                    let a = pb.geqs[e].coef[1];
                    let mut c = pb.geqs[e].coef[0];

                    // The row is a*x + c >= 0.
                    if a == 0 {
                        if c < 0 {
                            return Ok(OmegaResult::False);
                        }
                    } else if a > 0 {
                        if a != 1 {
                            c = int_div(c, a);
                        }
                        if lower_bound < -c
                            || (lower_bound == -c
                                && !Self::eqn_is_red(&pb.geqs[e], desired))
                        {
                            lower_bound = -c;
                            l_color = pb.geqs[e].color;
                        }
                    } else {
                        if a != -1 {
                            c = int_div(c, -a);
                        }
                        if upper_bound > c
                            || (upper_bound == c
                                && !Self::eqn_is_red(&pb.geqs[e], desired))
                        {
                            upper_bound = c;
                            u_color = pb.geqs[e].color;
                        }
                    }
                }

                debug!("bounds: {} .. {}", lower_bound, upper_bound);

                if lower_bound > upper_bound {
                    return Ok(OmegaResult::False);
                }

                if desired == Goal::Simplify {
                    pb.geqs.clear();
                    if pb.safe_vars == 1 {
                        if lower_bound == upper_bound
                            && u_color == Color::Black
                            && l_color == Color::Black
                        {
                            let mut eq = Eqn::zero(Color::Black);
                            eq.coef[0] = -lower_bound;
                            eq.coef[1] = 1;
                            pb.eqs.clear();
                            pb.eqs.push(eq);
                            return self.solve_problem(pb, desired, outer);
                        }
                        if lower_bound > NEG_INFINITY {
                            let mut geq = Eqn::zero(l_color);
                            geq.coef[0] = -lower_bound;
                            geq.coef[1] = 1;
                            geq.key = 1;
                            geq.touched = false;
                            pb.geqs.push(geq);
                        }
                        if upper_bound < POS_INFINITY {
                            let mut geq = Eqn::zero(u_color);
                            geq.coef[0] = upper_bound;
                            geq.coef[1] = -1;
                            geq.key = -1;
                            geq.touched = false;
                            pb.geqs.push(geq);
                        }
                    } else {
                        pb.num_vars = 0;
                    }

                    self.problem_reduced(pb)?;
                    return Ok(OmegaResult::False);
                }

                if outer.is_some()
                    && l_color == Color::Black
                    && u_color == Color::Black
                    && self.conservative == 0
                    && lower_bound == upper_bound
                {
                    let mut eq = Eqn::zero(Color::Black);
                    eq.coef[0] = -lower_bound;
                    eq.coef[1] = 1;
                    pb.eqs.clear();
                    pb.eqs.push(eq);
                    self.adding_equality_constraint(outer.as_deref_mut(), pb, 0)?;
                }

                return Ok(OmegaResult::True);
            }

            if !pb.variables_freed {
                pb.variables_freed = true;

                if desired != Goal::Simplify {
                    free_eliminations(pb, 0);
                } else {
                    free_eliminations(pb, pb.safe_vars);
                }

                n_vars = pb.num_vars;

                if n_vars == 1 {
                    continue 'problem;
                }
            }

            match self.normalize_problem(pb, outer.as_deref_mut())? {
                Normalize::False => return Ok(OmegaResult::False),
                Normalize::Coupled => coupled_subscripts = true,
                Normalize::Uncoupled => coupled_subscripts = false,
            }

            n_vars = pb.num_vars;
            debug!("after normalization:\n{}", pb);

            'eliminate: loop {
                let mut eliminate_again = false;

                if !pb.eqs.is_empty() {
                    return self.solve_problem(pb, desired, outer);
                }

                if !coupled_subscripts {
                    if pb.safe_vars == 0 {
                        pb.geqs.clear();
                    } else {
                        for e in (0..pb.geqs.len()).rev() {
                            let v = pb.geqs[e].key.unsigned_abs() as usize;
                            if !pb.safe_var(v) {
                                pb.delete_geq(e);
                            }
                        }
                    }
                    pb.num_vars = pb.safe_vars;

                    if desired == Goal::Simplify {
                        self.problem_reduced(pb)?;
                        return Ok(OmegaResult::False);
                    }
                    return Ok(OmegaResult::True);
                }

                if pb.geqs.is_empty() {
                    if desired == Goal::Simplify {
                        pb.num_vars = pb.safe_vars;
                        self.problem_reduced(pb)?;
                        return Ok(OmegaResult::False);
                    }
                    return Ok(OmegaResult::True);
                }

                if desired == Goal::Simplify && n_vars == pb.safe_vars {
                    self.problem_reduced(pb)?;
                    return Ok(OmegaResult::False);
                }

                if pb.geqs.len() > MAX_GEQS - 30
                    || pb.geqs.len() > 2 * n_vars * n_vars + 4 * n_vars + 10
                {
                    debug!(
                        "{} inequalities over {} variables, eliminating redundant ones",
                        pb.geqs.len(),
                        n_vars
                    );

                    if !self.eliminate_redundant(pb, false, outer.as_deref_mut())? {
                        return Ok(OmegaResult::False);
                    }

                    n_vars = pb.num_vars;

                    if !pb.eqs.is_empty() {
                        return self.solve_problem(pb, desired, outer);
                    }
                }

                let fv = if desired == Goal::Simplify {
                    pb.safe_vars
                } else {
                    0
                };

                // Pick the variable whose elimination is cheapest, preferring
                // exact eliminations.
                let mut best = i64::MAX;
                let mut exact = false;
                let mut lucky_exact = false;
                let mut j = 0usize;
                let mut min_c_j = 0i64;
                let mut j_le = 0usize;
                let mut j_lower_bound_count = 0usize;
                let mut lower_bound_count = 0usize;

                for i in ((fv + 1)..=n_vars).rev() {
                    let mut ub: i64 = -2;
                    let mut lb: i64 = -2;
                    let mut lucky = false;
                    let mut upper_bound_count = 0usize;
                    let mut le = 0usize;
                    let mut min_c = 0i64;
                    let mut max_c = 0i64;
                    lower_bound_count = 0;

                    for e in (0..pb.geqs.len()).rev() {
                        let c = pb.geqs[e].coef[i];
                        if c < 0 {
                            min_c = min_c.min(c);
                            upper_bound_count += 1;
                            if c < -1 {
                                ub = if ub == -2 { e as i64 } else { -1 };
                            }
                        } else if c > 0 {
                            max_c = max_c.max(c);
                            lower_bound_count += 1;
                            le = e;
                            if c > 1 {
                                lb = if lb == -2 { e as i64 } else { -1 };
                            }
                        }
                    }

                    if lower_bound_count == 0 || upper_bound_count == 0 {
                        lower_bound_count = 0;
                        break;
                    }

                    if ub >= 0
                        && lb >= 0
                        && pb.geqs[lb as usize].key == -pb.geqs[ub as usize].key
                    {
                        let lc = pb.geqs[lb as usize].coef[i];
                        let uc = -pb.geqs[ub as usize].coef[i];
                        let diff = lc * pb.geqs[ub as usize].coef[0]
                            + uc * pb.geqs[lb as usize].coef[0];
                        lucky = diff >= (uc - 1) * (lc - 1);
                    }

                    if max_c == 1 || min_c == -1 || lucky || self.in_approximate_mode {
                        let score = (upper_bound_count * lower_bound_count) as i64;
                        if !exact || score < best {
                            best = score;
                            j = i;
                            min_c_j = min_c;
                            j_le = le;
                            j_lower_bound_count = lower_bound_count;
                            exact = true;
                            lucky_exact = lucky;
                            if score == 1 {
                                break;
                            }
                        }
                    } else if !exact {
                        let score = max_c - min_c;
                        if best > score {
                            best = score;
                            j = i;
                            min_c_j = min_c;
                            j_le = le;
                            j_lower_bound_count = lower_bound_count;
                        }
                    }
                }

                if lower_bound_count == 0 {
                    free_eliminations(pb, pb.safe_vars);
                    n_vars = pb.num_vars;
                    continue 'eliminate;
                }

                let mut i = j;
                let min_c = min_c_j;
                let le = j_le;
                let lower_bound_count = j_lower_bound_count;

                let mut max_splinters: i64 = 1;
                for e in (0..pb.geqs.len()).rev() {
                    let c = pb.geqs[e].coef[i];
                    if c > 0 {
                        if c == -min_c {
                            max_splinters += -min_c - 1;
                        } else {
                            max_splinters += check_mul(c - 1, -min_c - 1)? / (-min_c) + 1;
                        }
                    }
                }

                // A redundancy pass sometimes exposes an exact elimination.
                if !exact && !tried_eliminating_redundant {
                    if !self.eliminate_redundant(pb, false, outer.as_deref_mut())? {
                        return Ok(OmegaResult::False);
                    }
                    tried_eliminating_redundant = true;
                    continue 'eliminate;
                }
                tried_eliminating_redundant = false;

                if self.return_single_result != 0 && desired == Goal::Simplify && !exact {
                    self.non_convex = true;
                    self.problem_reduced(pb)?;
                    return Ok(OmegaResult::True);
                }

                let mut parallel_difference = i64::MAX;
                let mut best_parallel_eqn: i64 = -1;

                if !exact {
                    for e1 in (0..pb.geqs.len()).rev() {
                        if pb.geqs[e1].color != Color::Black {
                            continue;
                        }
                        for e2 in (0..e1).rev() {
                            if pb.geqs[e2].color == Color::Black
                                && pb.geqs[e1].key == -pb.geqs[e2].key
                            {
                                let single = pb.single_var_geq(&pb.geqs[e1]) as i64;
                                let diff = (pb.geqs[e1].coef[0] + pb.geqs[e2].coef[0])
                                    * (3 - single)
                                    / 2;
                                if diff < parallel_difference {
                                    parallel_difference = diff;
                                    best_parallel_eqn = e1 as i64;
                                }
                            }
                        }
                    }
                }

                debug!(
                    "eliminating {} ({} splinters max{})",
                    pb.var_name(i),
                    max_splinters,
                    if lucky_exact {
                        ", lucky exact"
                    } else if exact {
                        ", exact"
                    } else {
                        ""
                    }
                );
                debug_assert!(max_splinters >= 1);

                if !exact
                    && desired == Goal::Simplify
                    && best_parallel_eqn >= 0
                    && parallel_difference <= max_splinters
                {
                    return self.parallel_splinter(
                        pb,
                        best_parallel_eqn as usize,
                        parallel_difference,
                        desired,
                        outer,
                    );
                }

                smoothed = false;

                // Move the chosen variable into the last column.
                if i != n_vars {
                    let jcol = pb.num_vars;
                    pb.var.swap(i, jcol);

                    for e in pb.geqs.iter_mut() {
                        if e.coef[i] != e.coef[jcol] {
                            e.touched = true;
                            e.coef.swap(i, jcol);
                        }
                    }
                    for s in pb.subs.iter_mut() {
                        if s.coef[i] != s.coef[jcol] {
                            s.coef.swap(i, jcol);
                        }
                    }

                    i = jcol;
                }

                pb.num_vars -= 1;
                n_vars = pb.num_vars;

                if exact {
                    if n_vars == 1 {
                        // Combine every bound pair down to a range for the
                        // one remaining variable.
                        let mut upper_bound = POS_INFINITY;
                        let mut lower_bound = NEG_INFINITY;
                        let mut ub_color = Color::Black;
                        let mut lb_color = Color::Black;

                        for le2 in (0..pb.geqs.len()).rev() {
                            let lc = pb.geqs[le2].coef[i];
                            if lc == 0 {
                                if pb.geqs[le2].coef[1] == 1 {
                                    let constant = -pb.geqs[le2].coef[0];
                                    if constant > lower_bound
                                        || (constant == lower_bound
                                            && !Self::eqn_is_red(&pb.geqs[le2], desired))
                                    {
                                        lower_bound = constant;
                                        lb_color = pb.geqs[le2].color;
                                    }
                                } else {
                                    let constant = pb.geqs[le2].coef[0];
                                    if constant < upper_bound
                                        || (constant == upper_bound
                                            && !Self::eqn_is_red(&pb.geqs[le2], desired))
                                    {
                                        upper_bound = constant;
                                        ub_color = pb.geqs[le2].color;
                                    }
                                }
                            } else if lc > 0 {
                                for ue in (0..pb.geqs.len()).rev() {
                                    if pb.geqs[ue].coef[i] < 0
                                        && pb.geqs[le2].key != -pb.geqs[ue].key
                                    {
                                        let uc = -pb.geqs[ue].coef[i];
                                        let coefficient = pb.geqs[ue].coef[1] * lc
                                            + pb.geqs[le2].coef[1] * uc;
                                        let constant = pb.geqs[ue].coef[0] * lc
                                            + pb.geqs[le2].coef[0] * uc;
                                        let pair_red = pb.geqs[ue].color == Color::Red
                                            || pb.geqs[le2].color == Color::Red;

                                        if coefficient > 0 {
                                            let constant = -int_div(constant, coefficient);
                                            if constant > lower_bound
                                                || (constant == lower_bound
                                                    && (desired != Goal::Simplify
                                                        || !pair_red))
                                            {
                                                lower_bound = constant;
                                                lb_color = if pair_red {
                                                    Color::Red
                                                } else {
                                                    Color::Black
                                                };
                                            }
                                        } else {
                                            let constant = int_div(constant, -coefficient);
                                            if constant < upper_bound
                                                || (constant == upper_bound && !pair_red)
                                            {
                                                upper_bound = constant;
                                                ub_color = if pair_red {
                                                    Color::Red
                                                } else {
                                                    Color::Black
                                                };
                                            }
                                        }
                                    }
                                }
                            }
                        }

                        pb.geqs.clear();
                        debug!("therefore {} <= {}", lower_bound, upper_bound);

                        if lower_bound > upper_bound {
                            return Ok(OmegaResult::False);
                        }

                        if pb.safe_vars == 1 {
                            if upper_bound == lower_bound
                                && ub_color == Color::Black
                                && lb_color == Color::Black
                                && self.no_eqs_in_simplified == 0
                            {
                                let mut eq = Eqn::zero(Color::Black);
                                eq.coef[1] = -1;
                                eq.coef[0] = upper_bound;
                                pb.eqs.push(eq);

                                if desired == Goal::Simplify {
                                    return self.solve_problem(pb, desired, outer);
                                }
                            }

                            if upper_bound != POS_INFINITY {
                                let mut geq = Eqn::zero(ub_color);
                                geq.coef[1] = -1;
                                geq.coef[0] = upper_bound;
                                geq.key = -1;
                                geq.touched = false;
                                pb.geqs.push(geq);
                            }
                            if lower_bound != NEG_INFINITY {
                                let mut geq = Eqn::zero(lb_color);
                                geq.coef[1] = 1;
                                geq.coef[0] = -lower_bound;
                                geq.key = 1;
                                geq.touched = false;
                                pb.geqs.push(geq);
                            }
                        }

                        if desired == Goal::Simplify {
                            self.problem_reduced(pb)?;
                            return Ok(OmegaResult::False);
                        }

                        if self.conservative == 0 && lower_bound == upper_bound {
                            if let Some(o) = outer.as_deref_mut() {
                                let mut oi = o.num_vars;
                                while oi >= 1 && o.var[oi] != pb.var[1] {
                                    oi -= 1;
                                }
                                if oi >= 1 {
                                    let mut eq = Eqn::zero(Color::Black);
                                    eq.coef[oi] = -1;
                                    eq.coef[0] = upper_bound;
                                    debug!("adding fixed value to outer problem");
                                    o.push_eq(eq)?;
                                }
                            }
                        }

                        return Ok(OmegaResult::True);
                    }

                    eliminate_again = true;

                    if lower_bound_count == 1 {
                        debug!("an in-place elimination");
                        let lc = pb.geqs[le].coef[i];
                        let lbeqn = pb.geqs[le].clone();
                        pb.delete_geq(le);

                        for ue in (0..pb.geqs.len()).rev() {
                            if pb.geqs[ue].coef[i] < 0 {
                                if lbeqn.key == -pb.geqs[ue].key {
                                    pb.delete_geq(ue);
                                } else {
                                    let uc = -pb.geqs[ue].coef[i];
                                    pb.geqs[ue].touched = true;
                                    eliminate_again = false;

                                    if lbeqn.color == Color::Red {
                                        pb.geqs[ue].color = Color::Red;
                                    }

                                    for k in 0..=n_vars {
                                        pb.geqs[ue].coef[k] =
                                            check_mul(pb.geqs[ue].coef[k], lc)?
                                                + check_mul(lbeqn.coef[k], uc)?;
                                    }
                                }
                            }
                        }

                        if eliminate_again {
                            continue 'eliminate;
                        }
                        continue 'problem;
                    }

                    // Full exact step, reusing slots of constraints that die.
                    let mut dead: Vec<usize> = Vec::new();
                    let top_eqn = pb.geqs.len();
                    let mut lb_left = lower_bound_count as i64 - 1;

                    for le2 in (0..top_eqn).rev() {
                        if pb.geqs[le2].coef[i] <= 0 {
                            continue;
                        }
                        let lc = pb.geqs[le2].coef[i];

                        for ue in (0..top_eqn).rev() {
                            if pb.geqs[ue].coef[i] >= 0 {
                                continue;
                            }

                            if pb.geqs[le2].key != -pb.geqs[ue].key {
                                let uc = -pb.geqs[ue].coef[i];
                                eliminate_again = false;

                                let color = if pb.geqs[ue].color == Color::Red
                                    || pb.geqs[le2].color == Color::Red
                                {
                                    Color::Red
                                } else {
                                    Color::Black
                                };
                                let mut row = Eqn::zero(color);
                                for k in (0..=n_vars).rev() {
                                    row.coef[k] = check_mul(pb.geqs[ue].coef[k], lc)?
                                        + check_mul(pb.geqs[le2].coef[k], uc)?;
                                }
                                row.touched = true;

                                if let Some(slot) = dead.pop() {
                                    pb.geqs[slot] = row;
                                } else {
                                    pb.push_geq(row)?;
                                }
                            }

                            if lb_left == 0 {
                                dead.push(ue);
                            }
                        }

                        lb_left -= 1;
                        dead.push(le2);
                    }

                    let mut is_dead = vec![false; pb.geqs.len()];
                    for e in dead {
                        is_dead[e] = true;
                    }
                    for e in (0..pb.geqs.len()).rev() {
                        if is_dead[e] {
                            pb.delete_geq(e);
                        }
                    }

                    if eliminate_again {
                        continue 'eliminate;
                    }
                    continue 'problem;
                }

                // Inexact elimination: build the real shadow (necessary) and
                // the dark shadow (sufficient).
                let mut r_s = Problem::new(pb.num_vars, pb.safe_vars)?;
                let mut i_s = Problem::new(pb.num_vars, pb.safe_vars)?;
                r_s.variables_initialized = true;
                i_s.variables_initialized = true;
                r_s.var[..=n_vars].copy_from_slice(&pb.var[..=n_vars]);
                i_s.var[..=n_vars].copy_from_slice(&pb.var[..=n_vars]);
                r_s.subs = pb.subs.clone();
                i_s.subs = pb.subs.clone();

                let mut possible_easy_int_solution = true;

                for e in 0..pb.geqs.len() {
                    if pb.geqs[e].coef[i] == 0 {
                        r_s.push_geq(pb.geqs[e].clone())?;
                        i_s.push_geq(pb.geqs[e].clone())?;
                    }
                }

                for le2 in (0..pb.geqs.len()).rev() {
                    if pb.geqs[le2].coef[i] <= 0 {
                        continue;
                    }
                    for ue in (0..pb.geqs.len()).rev() {
                        if pb.geqs[ue].coef[i] >= 0 {
                            continue;
                        }
                        let lc = pb.geqs[le2].coef[i];
                        let uc = -pb.geqs[ue].coef[i];

                        if pb.geqs[le2].key != -pb.geqs[ue].key {
                            let color = if pb.geqs[ue].color == Color::Red
                                || pb.geqs[le2].color == Color::Red
                            {
                                Color::Red
                            } else {
                                Color::Black
                            };
                            let mut real = Eqn::zero(color);
                            real.touched = true;

                            if uc == lc {
                                for k in (0..=n_vars).rev() {
                                    real.coef[k] =
                                        pb.geqs[ue].coef[k] + pb.geqs[le2].coef[k];
                                }
                                let mut dark = real.clone();
                                dark.coef[0] -= uc - 1;
                                r_s.push_geq(real)?;
                                i_s.push_geq(dark)?;
                            } else {
                                for k in (0..=n_vars).rev() {
                                    real.coef[k] = check_mul(pb.geqs[ue].coef[k], lc)?
                                        + check_mul(pb.geqs[le2].coef[k], uc)?;
                                }
                                let mut dark = real.clone();
                                dark.coef[0] -= (uc - 1) * (lc - 1);
                                r_s.push_geq(real)?;
                                i_s.push_geq(dark)?;
                            }
                        } else if pb.geqs[ue].coef[0] * lc + pb.geqs[le2].coef[0] * uc
                            - (uc - 1) * (lc - 1)
                            < 0
                        {
                            possible_easy_int_solution = false;
                        }
                    }
                }

                pb.num_vars += 1;

                if desired != Goal::True {
                    let result = match outer.as_deref_mut() {
                        Some(o) => self.solve_geq(&mut r_s, Goal::False, Some(o))?,
                        None => self.solve_geq(&mut r_s, Goal::False, Some(&mut *pb))?,
                    };

                    if result == OmegaResult::False {
                        return Ok(result);
                    }

                    if !pb.eqs.is_empty() {
                        // The shadow solve found a fixed value and pushed an
                        // equality into us.
                        return self.solve_problem(pb, desired, outer);
                    }
                }

                if desired != Goal::False {
                    if possible_easy_int_solution {
                        self.conservative += 1;
                        let result = self.solve_geq(&mut i_s, desired, outer.as_deref_mut());
                        self.conservative -= 1;

                        let result = result?;
                        if result != OmegaResult::False {
                            return Ok(result);
                        }
                    }

                    if !exact
                        && best_parallel_eqn >= 0
                        && parallel_difference <= max_splinters
                    {
                        return self.parallel_splinter(
                            pb,
                            best_parallel_eqn as usize,
                            parallel_difference,
                            desired,
                            outer,
                        );
                    }

                    debug!("have to do exact analysis");
                    self.conservative += 1;

                    let mut lower_bounds: Vec<usize> = (0..pb.geqs.len())
                        .filter(|&e| pb.geqs[e].coef[i] > 1)
                        .collect();
                    lower_bounds.sort_by_key(|&e| pb.geqs[e].coef[i]);

                    let worst = -min_c;

                    for (idx, &e) in lower_bounds.iter().enumerate() {
                        let max_incr =
                            ((pb.geqs[e].coef[i] - 1) * (worst - 1) - 1) / worst;
                        debug!("trying decrements from 0 to {}", max_incr);

                        if max_incr > 50 && !smoothed {
                            match self.smooth_weird_equations(pb) {
                                Ok(true) => {
                                    self.conservative -= 1;
                                    smoothed = true;
                                    continue 'problem;
                                }
                                Ok(false) => {}
                                Err(err) => {
                                    self.conservative -= 1;
                                    return Err(err);
                                }
                            }
                        }

                        let mut pivot = pb.geqs[e].clone();
                        pivot.color = Color::Black;
                        pb.eqs.clear();
                        pb.eqs.push(pivot);
                        pb.geqs[e] = Eqn::zero(Color::Black);

                        for _ in 0..=max_incr {
                            let mut trial = pb.clone();
                            let result =
                                self.solve_problem(&mut trial, desired, outer.as_deref_mut());
                            let result = match result {
                                Ok(r) => r,
                                Err(err) => {
                                    self.conservative -= 1;
                                    return Err(err);
                                }
                            };

                            if result == OmegaResult::True {
                                self.conservative -= 1;
                                return Ok(OmegaResult::True);
                            }

                            pb.eqs[0].coef[0] -= 1;
                        }

                        if idx + 1 < lower_bounds.len() {
                            // This lower bound is exhausted; tighten it and
                            // make sure the rest is still feasible.
                            let mut restored = pb.eqs[0].clone();
                            pb.eqs.clear();
                            restored.touched = true;
                            restored.color = Color::Black;
                            pb.geqs[e] = restored;

                            let mut trial = pb.clone();
                            let result =
                                self.solve_problem(&mut trial, Goal::False, outer.as_deref_mut());
                            let result = match result {
                                Ok(r) => r,
                                Err(err) => {
                                    self.conservative -= 1;
                                    return Err(err);
                                }
                            };

                            if result == OmegaResult::False {
                                break;
                            }
                        }
                    }

                    debug!("exhausted all splinters");
                    self.conservative -= 1;
                    return Ok(OmegaResult::False);
                }

                return Ok(OmegaResult::Unknown);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_var_range_feasible() {
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(1, 0).unwrap();
        pb.init_variables();
        pb.add_inequality(&[-3, 1], Color::Black).unwrap();
        pb.add_inequality(&[5, -1], Color::Black).unwrap();

        let r = solver.solve_geq(&mut pb, Goal::Unknown, None).unwrap();
        assert_eq!(r, OmegaResult::True);
    }

    #[test]
    fn test_single_var_range_infeasible() {
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(1, 0).unwrap();
        pb.init_variables();
        pb.add_inequality(&[-5, 1], Color::Black).unwrap();
        pb.add_inequality(&[3, -1], Color::Black).unwrap();

        let r = solver.solve_geq(&mut pb, Goal::Unknown, None).unwrap();
        assert_eq!(r, OmegaResult::False);
    }

    #[test]
    fn test_exact_elimination_feasible_triangle() {
        // x >= 0, y >= 0, x + y <= 5.
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(2, 0).unwrap();
        pb.init_variables();
        pb.add_inequality(&[0, 1, 0], Color::Black).unwrap();
        pb.add_inequality(&[0, 0, 1], Color::Black).unwrap();
        pb.add_inequality(&[5, -1, -1], Color::Black).unwrap();

        let r = solver.solve_geq(&mut pb, Goal::Unknown, None).unwrap();
        assert_eq!(r, OmegaResult::True);
    }

    #[test]
    fn test_exact_elimination_detects_empty_box() {
        // x + y >= 6 contradicts x <= 2, y <= 2.
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(2, 0).unwrap();
        pb.init_variables();
        pb.add_inequality(&[-6, 1, 1], Color::Black).unwrap();
        pb.add_inequality(&[2, -1, 0], Color::Black).unwrap();
        pb.add_inequality(&[2, 0, -1], Color::Black).unwrap();

        let r = solver.solve_geq(&mut pb, Goal::Unknown, None).unwrap();
        assert_eq!(r, OmegaResult::False);
    }

    #[test]
    fn test_inexact_elimination_through_shadows() {
        // Coefficients above one on both sides force the shadow analysis.
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(2, 0).unwrap();
        pb.init_variables();
        pb.add_inequality(&[-1, 2, 3], Color::Black).unwrap();
        pb.add_inequality(&[10, -3, -2], Color::Black).unwrap();

        let r = solver.solve_geq(&mut pb, Goal::Unknown, None).unwrap();
        assert_eq!(r, OmegaResult::True);
    }

    #[test]
    fn test_unbounded_variable_is_freed() {
        // y has only lower bounds; its constraints evaporate.
        let mut solver = OmegaSolver::new();
        let mut pb = Problem::new(2, 0).unwrap();
        pb.init_variables();
        pb.add_inequality(&[0, 1, 1], Color::Black).unwrap();
        pb.add_inequality(&[4, -1, 0], Color::Black).unwrap();

        let r = solver.solve_geq(&mut pb, Goal::Unknown, None).unwrap();
        assert_eq!(r, OmegaResult::True);
    }
}
