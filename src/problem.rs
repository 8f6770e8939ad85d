//! The `Problem` type: a conjunction of linear equalities and inequalities
//! over integer variables.
//!
//! Columns `1..=safe_vars` hold protected (safe) variables that survive
//! simplification; columns above `safe_vars` hold free variables the solver
//! may eliminate. Wildcard (existentially quantified) variables carry
//! negative external ids. Substituted-out safe variables are remembered in
//! `subs`, and `forwarding` maps an external variable id to its current
//! column (or `-s - 1` when the variable now lives in substitution `s`).

use crate::eqn::{Color, Eqn, MAX_EQS, MAX_GEQS, MAX_VARS};
use crate::error::{OmegaError, SolveResult};
use std::collections::HashMap;
use std::fmt;

/// A conjunction of integer linear constraints.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Number of live variable columns.
    pub num_vars: usize,
    /// Columns `1..=safe_vars` are protected from elimination.
    pub safe_vars: usize,
    /// External id of each column; negative ids are wildcards. `var[0]` is
    /// unused.
    pub var: Vec<i32>,
    /// External id to current column, or `-s - 1` for substitution `s`.
    pub forwarding: HashMap<i32, i32>,
    /// Equalities (`row = 0`).
    pub eqs: Vec<Eqn>,
    /// Inequalities (`row >= 0`).
    pub geqs: Vec<Eqn>,
    /// Recorded substitutions; `key` is the substituted variable's external
    /// id and the row is its value.
    pub subs: Vec<Eqn>,
    /// Version of the key cache the geq keys were assigned under.
    pub hash_version: u64,
    /// Set once `init_variables` ran or variables were given ids.
    pub variables_initialized: bool,
    /// Set when a free-variable elimination removed columns.
    pub variables_freed: bool,
}

impl Problem {
    /// Create a problem with `num_vars` variables, the first `safe_vars` of
    /// which are protected.
    pub fn new(num_vars: usize, safe_vars: usize) -> SolveResult<Self> {
        if num_vars > MAX_VARS {
            return Err(OmegaError::CapacityExceeded {
                what: "variables",
                limit: MAX_VARS,
            });
        }
        debug_assert!(safe_vars <= num_vars);
        Ok(Problem {
            num_vars,
            safe_vars,
            var: vec![0; MAX_VARS + 2],
            forwarding: HashMap::new(),
            eqs: Vec::new(),
            geqs: Vec::new(),
            subs: Vec::new(),
            hash_version: 0,
            variables_initialized: false,
            variables_freed: false,
        })
    }

    /// Give each column its own external id (`var[i] = i`) and point the
    /// forwarding table at the identity.
    pub fn init_variables(&mut self) {
        for i in 0..=self.num_vars {
            self.var[i] = i as i32;
            if i > 0 {
                self.forwarding.insert(i as i32, i as i32);
            }
        }
        self.variables_initialized = true;
    }

    /// Add the equality `coeffs[0] + sum coeffs[i]*x_i = 0`.
    pub fn add_equality(&mut self, coeffs: &[i64], color: Color) -> SolveResult<()> {
        if self.eqs.len() >= MAX_EQS {
            return Err(OmegaError::CapacityExceeded {
                what: "equalities",
                limit: MAX_EQS,
            });
        }
        debug_assert!(coeffs.len() <= self.num_vars + 1);
        self.eqs.push(Eqn::from_coeffs(coeffs, color));
        Ok(())
    }

    /// Add the inequality `coeffs[0] + sum coeffs[i]*x_i >= 0`.
    pub fn add_inequality(&mut self, coeffs: &[i64], color: Color) -> SolveResult<()> {
        if self.geqs.len() >= MAX_GEQS {
            return Err(OmegaError::CapacityExceeded {
                what: "inequalities",
                limit: MAX_GEQS,
            });
        }
        debug_assert!(coeffs.len() <= self.num_vars + 1);
        self.geqs.push(Eqn::from_coeffs(coeffs, color));
        Ok(())
    }

    /// Push an already-built equality row.
    pub fn push_eq(&mut self, e: Eqn) -> SolveResult<()> {
        if self.eqs.len() >= MAX_EQS {
            return Err(OmegaError::CapacityExceeded {
                what: "equalities",
                limit: MAX_EQS,
            });
        }
        self.eqs.push(e);
        Ok(())
    }

    /// Push an already-built inequality row.
    pub fn push_geq(&mut self, e: Eqn) -> SolveResult<()> {
        if self.geqs.len() >= MAX_GEQS {
            return Err(OmegaError::CapacityExceeded {
                what: "inequalities",
                limit: MAX_GEQS,
            });
        }
        self.geqs.push(e);
        Ok(())
    }

    /// True when column `i` holds a protected variable.
    #[inline]
    pub fn safe_var(&self, i: usize) -> bool {
        i >= 1 && i <= self.safe_vars
    }

    /// True when column `i` holds a wildcard variable.
    #[inline]
    pub fn wildcard(&self, i: usize) -> bool {
        self.var[i] < 0
    }

    /// True when a normalized geq constrains a single variable; its key
    /// then encodes the column and sign directly.
    #[inline]
    pub fn single_var_geq(&self, e: &Eqn) -> bool {
        e.key != 0 && (-(MAX_VARS as i32)..=MAX_VARS as i32).contains(&e.key)
    }

    /// Remove inequality `e` by moving the last one into its slot.
    #[inline]
    pub fn delete_geq(&mut self, e: usize) {
        self.geqs.swap_remove(e);
    }

    /// Remove variable column `i`, shuffling the column layout so safe
    /// variables stay contiguous.
    pub fn delete_variable(&mut self, i: usize) {
        let n_vars = self.num_vars;

        if self.safe_var(i) {
            let j = self.safe_vars;

            for e in self.geqs.iter_mut() {
                e.touched = true;
                e.coef[i] = e.coef[j];
                e.coef[j] = e.coef[n_vars];
            }
            for e in self.eqs.iter_mut() {
                e.coef[i] = e.coef[j];
                e.coef[j] = e.coef[n_vars];
            }
            for e in self.subs.iter_mut() {
                e.coef[i] = e.coef[j];
                e.coef[j] = e.coef[n_vars];
            }

            self.var[i] = self.var[j];
            self.var[j] = self.var[n_vars];
            self.safe_vars -= 1;
        } else if i < n_vars {
            for e in self.geqs.iter_mut() {
                if e.coef[n_vars] != 0 {
                    e.coef[i] = e.coef[n_vars];
                    e.touched = true;
                }
            }
            for e in self.eqs.iter_mut() {
                e.coef[i] = e.coef[n_vars];
            }
            for e in self.subs.iter_mut() {
                e.coef[i] = e.coef[n_vars];
            }

            self.var[i] = self.var[n_vars];
        }

        self.num_vars -= 1;
    }

    /// Multiply inequality `e` by -1; `a >= b` becomes `a <= b - 1`.
    pub fn negate_geq(&mut self, e: usize) {
        let n = self.num_vars;
        let geq = &mut self.geqs[e];
        for c in geq.coef[0..=n].iter_mut() {
            *c = -*c;
        }
        geq.coef[0] -= 1;
        geq.touched = true;
    }

    /// Replace equality `eq` by the inequality pair `row >= 0`, `-row >= 0`.
    pub fn convert_eq_to_geqs(&mut self, eq: usize) -> SolveResult<()> {
        let n = self.num_vars;
        let mut pos = self.eqs[eq].clone();
        pos.touched = true;
        let mut neg = pos.clone();
        for c in neg.coef[0..=n].iter_mut() {
            *c = -*c;
        }
        self.push_geq(pos)?;
        self.push_geq(neg)?;
        Ok(())
    }

    /// Move safe column `idx` into the free region. On return `idx` has
    /// been stepped back when a column swap put an unvisited variable in
    /// its place.
    pub fn unprotect_1(&mut self, idx: &mut usize, mut unprotect: Option<&mut Vec<bool>>) {
        if *idx < self.safe_vars {
            let j = self.safe_vars;

            for e in self.geqs.iter_mut() {
                e.touched = true;
                e.coef.swap(*idx, j);
            }
            for e in self.eqs.iter_mut() {
                e.coef.swap(*idx, j);
            }
            for e in self.subs.iter_mut() {
                e.coef.swap(*idx, j);
            }
            if let Some(flags) = unprotect.as_deref_mut() {
                flags.swap(*idx, j);
            }

            self.var.swap(*idx, j);
            if self.var[*idx] > 0 {
                self.forwarding.insert(self.var[*idx], *idx as i32);
            }
            if self.var[j] > 0 {
                self.forwarding.insert(self.var[j], j as i32);
            }
            *idx -= 1;
        }

        self.safe_vars -= 1;
    }

    /// Unprotect every safe wildcard that no substitution refers to.
    pub fn chain_unprotect(&mut self) {
        let mut unprotect = vec![false; MAX_VARS];

        let mut i = 1;
        while self.safe_var(i) {
            unprotect[i] = self.wildcard(i)
                && self.subs.iter().all(|s| s.coef[i] == 0);
            i += 1;
        }

        let mut i = 1;
        while self.safe_var(i) {
            if unprotect[i] {
                self.unprotect_1(&mut i, Some(&mut unprotect));
            }
            i += 1;
        }
    }

    /// Make external variable `var` eligible for elimination again. A
    /// variable that was substituted out simply loses its substitution;
    /// a live column first resurrects every substitution that mentions it,
    /// so no recorded value silently refers to a free variable.
    pub fn unprotect_variable(&mut self, var: i32) -> SolveResult<()> {
        let idx = self.forwarding[&var];

        if idx < 0 {
            let s = (-1 - idx) as usize;
            self.subs.swap_remove(s);
            if s < self.subs.len() {
                let key = self.subs[s].key;
                self.forwarding.insert(key, -(s as i32) - 1);
            }
        } else {
            let mut idx = idx as usize;
            let bring_to_life: Vec<bool> =
                self.subs.iter().map(|s| s.coef[idx] != 0).collect();

            for e2 in (0..bring_to_life.len()).rev() {
                if !bring_to_life[e2] {
                    continue;
                }

                self.num_vars += 1;
                self.safe_vars += 1;
                let n = self.num_vars;
                let j = self.safe_vars;

                // Open up column j for the resurrected variable.
                if j < n {
                    for e in self.geqs.iter_mut() {
                        e.coef[n] = e.coef[j];
                        e.coef[j] = 0;
                    }
                    for e in self.eqs.iter_mut() {
                        e.coef[n] = e.coef[j];
                        e.coef[j] = 0;
                    }
                    for e in self.subs.iter_mut() {
                        e.coef[n] = e.coef[j];
                        e.coef[j] = 0;
                    }
                    self.var[n] = self.var[j];
                    if self.var[n] > 0 {
                        self.forwarding.insert(self.var[n], n as i32);
                    }
                } else {
                    for e in self.geqs.iter_mut() {
                        e.coef[j] = 0;
                    }
                    for e in self.eqs.iter_mut() {
                        e.coef[j] = 0;
                    }
                    for e in self.subs.iter_mut() {
                        e.coef[j] = 0;
                    }
                }

                self.var[j] = self.subs[e2].key;
                self.forwarding.insert(self.subs[e2].key, j as i32);

                let mut eq = self.subs[e2].clone();
                eq.coef[j] = -1;
                self.push_eq(eq)?;

                self.subs.swap_remove(e2);
            }

            self.unprotect_1(&mut idx, None);
        }

        self.chain_unprotect();
        Ok(())
    }

    /// External id of column `i`, for diagnostics.
    pub fn var_name(&self, i: usize) -> String {
        let id = self.var[i];
        if id > 0 {
            format!("x{}", id)
        } else if id < 0 {
            format!("w{}", -id)
        } else {
            "?".to_string()
        }
    }

    fn fmt_row(&self, f: &mut fmt::Formatter<'_>, e: &Eqn, rel: &str) -> fmt::Result {
        let mut first = true;
        for i in (0..=self.num_vars).rev() {
            let c = e.coef[i];
            if c == 0 && !(i == 0 && first) {
                continue;
            }
            if first {
                if i == 0 {
                    write!(f, "{}", c)?;
                } else if c == 1 {
                    write!(f, "{}", self.var_name(i))?;
                } else if c == -1 {
                    write!(f, "-{}", self.var_name(i))?;
                } else {
                    write!(f, "{}{}", c, self.var_name(i))?;
                }
                first = false;
            } else if i == 0 {
                if c < 0 {
                    write!(f, " - {}", -c)?;
                } else {
                    write!(f, " + {}", c)?;
                }
            } else if c == 1 {
                write!(f, " + {}", self.var_name(i))?;
            } else if c == -1 {
                write!(f, " - {}", self.var_name(i))?;
            } else if c < 0 {
                write!(f, " - {}{}", -c, self.var_name(i))?;
            } else {
                write!(f, " + {}{}", c, self.var_name(i))?;
            }
        }
        if e.color == Color::Red {
            write!(f, " {} 0 [red]", rel)
        } else {
            write!(f, " {} 0", rel)
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} vars ({} safe), {} eqs, {} geqs, {} subs",
            self.num_vars,
            self.safe_vars,
            self.eqs.len(),
            self.geqs.len(),
            self.subs.len()
        )?;
        for e in &self.eqs {
            self.fmt_row(f, e, "=")?;
            writeln!(f)?;
        }
        for e in &self.geqs {
            self.fmt_row(f, e, ">=")?;
            writeln!(f)?;
        }
        for s in &self.subs {
            write!(f, "x{} := ", s.key)?;
            self.fmt_row(f, s, "+")?;
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Problem {
        let mut pb = Problem::new(3, 1).unwrap();
        pb.init_variables();
        pb.add_inequality(&[5, 1, 0, 2], Color::Black).unwrap();
        pb.add_inequality(&[-3, 0, 1, -1], Color::Black).unwrap();
        pb.add_equality(&[0, 1, 1, 1], Color::Black).unwrap();
        pb
    }

    #[test]
    fn test_capacity_guard() {
        assert!(Problem::new(MAX_VARS + 1, 0).is_err());
        assert!(Problem::new(MAX_VARS, 0).is_ok());
    }

    #[test]
    fn test_delete_geq_swaps_last() {
        let mut pb = sample();
        pb.delete_geq(0);
        assert_eq!(pb.geqs.len(), 1);
        assert_eq!(pb.geqs[0].coef[0], -3);
    }

    #[test]
    fn test_delete_free_variable() {
        let mut pb = sample();
        // Delete free column 2; column 3 moves into its place.
        pb.delete_variable(2);
        assert_eq!(pb.num_vars, 2);
        assert_eq!(pb.var[2], 3);
        assert_eq!(pb.geqs[0].coef[2], 2);
        assert_eq!(pb.eqs[0].coef[2], 1);
    }

    #[test]
    fn test_delete_safe_variable_keeps_safe_block() {
        let mut pb = sample();
        pb.delete_variable(1);
        assert_eq!(pb.safe_vars, 0);
        assert_eq!(pb.num_vars, 2);
        assert!(pb.geqs.iter().all(|e| e.touched));
    }

    #[test]
    fn test_negate_geq() {
        let mut pb = sample();
        pb.negate_geq(0);
        assert_eq!(&pb.geqs[0].coef[0..4], &[-6, -1, 0, -2]);
    }

    #[test]
    fn test_convert_eq_to_geqs() {
        let mut pb = sample();
        pb.convert_eq_to_geqs(0).unwrap();
        assert_eq!(pb.geqs.len(), 4);
        assert_eq!(&pb.geqs[2].coef[0..4], &[0, 1, 1, 1]);
        assert_eq!(&pb.geqs[3].coef[0..4], &[0, -1, -1, -1]);
    }

    #[test]
    fn test_unprotect_resurrects_substitution() {
        // One live column (y, id 2); x (id 1) was substituted as x = y + 2.
        let mut pb = Problem::new(1, 1).unwrap();
        pb.var[1] = 2;
        pb.forwarding.insert(2, 1);
        pb.forwarding.insert(1, -1);
        let mut sub = Eqn::from_coeffs(&[2, 1], Color::Black);
        sub.key = 1;
        pb.subs.push(sub);
        pb.variables_initialized = true;

        pb.unprotect_variable(2).unwrap();

        // x came back as a column with its defining equality; y is free.
        assert!(pb.subs.is_empty());
        assert_eq!(pb.num_vars, 2);
        assert_eq!(pb.safe_vars, 1);
        assert_eq!(pb.var[1], 1);
        assert_eq!(pb.var[2], 2);
        assert_eq!(pb.eqs.len(), 1);
        assert_eq!(&pb.eqs[0].coef[0..3], &[2, -1, 1]);
    }

    #[test]
    fn test_unprotect_substituted_variable_drops_its_value() {
        let mut pb = Problem::new(1, 1).unwrap();
        pb.var[1] = 2;
        pb.forwarding.insert(2, 1);
        pb.forwarding.insert(1, -1);
        let mut sub = Eqn::from_coeffs(&[7], Color::Black);
        sub.key = 1;
        pb.subs.push(sub);
        pb.variables_initialized = true;

        pb.unprotect_variable(1).unwrap();
        assert!(pb.subs.is_empty());
        assert!(pb.eqs.is_empty());
    }

    #[test]
    fn test_display_mentions_vars() {
        let pb = sample();
        let s = format!("{}", pb);
        assert!(s.contains("x1"));
        assert!(s.contains(">= 0"));
    }
}
