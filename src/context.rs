//! Solver state: the hash-key cache, mode flags, and configuration.
//!
//! Everything here is per-solver rather than per-problem: the key cache is
//! shared by all problems simplified through one `OmegaSolver`, and the mode
//! counters track where we are inside a nested solve (gist computation,
//! approximate mode, conservative sections).

use crate::eqn::{Eqn, HASH_TABLE_SIZE, MAX_KEYS, MAX_VARS, MAX_WILD_CARDS};
use crate::error::{OmegaError, SolveResult};
use crate::problem::Problem;
use serde::{Deserialize, Serialize};

/// Verdict of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OmegaResult {
    /// The conjunction is unsatisfiable over the integers.
    False,
    /// The solver could not decide (only under `Goal::Unknown`).
    Unknown,
    /// The conjunction has an integer solution.
    True,
}

/// What the caller wants from a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Goal {
    /// Only an infeasibility proof is interesting.
    False,
    /// Either verdict is acceptable.
    Unknown,
    /// Only a feasibility proof is interesting.
    True,
    /// Reduce the problem to a simplified equivalent form.
    Simplify,
}

/// A slot of the inequality prototype table. Multi-variable geqs that share
/// a prototype (up to sign) share a key, which makes duplicate detection a
/// table lookup instead of a row comparison.
#[derive(Debug, Clone)]
pub(crate) struct HashEntry {
    /// Prototype coefficients, canonical sign.
    pub coef: Vec<i64>,
    /// Magnitude of the polynomial hash; -1 marks a free slot.
    pub code: i64,
    /// Number of nonzero coefficients minus one, a cheap pre-filter.
    pub top_var: i64,
    /// Key assigned to this prototype.
    pub key: i32,
}

impl HashEntry {
    fn empty() -> Self {
        HashEntry {
            coef: vec![0; MAX_VARS + 2],
            code: -1,
            top_var: 0,
            key: 0,
        }
    }
}

/// The Omega test solver.
///
/// Holds the key cache and mode state shared across solves; individual
/// conjunctions live in [`Problem`] values passed to the solving methods.
pub struct OmegaSolver {
    pub(crate) hash_master: Vec<HashEntry>,
    pub(crate) next_key: i32,
    pub(crate) hash_version: u64,
    /// Key → index of the most recent black geq with that key.
    pub(crate) fast_lookup: Vec<usize>,
    /// Key → index of the most recent red geq with that key.
    pub(crate) fast_lookup_red: Vec<usize>,
    pub(crate) next_wild_card: i32,
    /// Nesting count of regions where red constraints may appear.
    pub(crate) may_be_red: i32,
    /// Nonzero inside sections whose verdicts are approximate; suppresses
    /// equality forwarding to outer problems.
    pub(crate) conservative: u32,
    pub(crate) in_approximate_mode: bool,
    /// When set, equalities promoted from geq pairs keep their color.
    pub(crate) create_color: bool,
    pub(crate) no_eqs_in_simplified: i32,
    pub(crate) return_single_result: i32,
    pub(crate) found_reduction: OmegaResult,
    pub(crate) do_it_again: bool,
    pub(crate) non_convex: bool,
    pub(crate) solve_depth: u32,
    /// Keep substitutions in simplified problems instead of resurrecting
    /// them as equalities.
    pub reduce_with_subs: bool,
    /// Re-verify every reduced problem by an independent solve.
    pub verify_simplification: bool,
    pub(crate) when_reduced: Option<Box<dyn FnMut(&Problem)>>,
}

impl Default for OmegaSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl OmegaSolver {
    /// A fresh solver with an empty key cache.
    pub fn new() -> Self {
        OmegaSolver {
            hash_master: (0..HASH_TABLE_SIZE).map(|_| HashEntry::empty()).collect(),
            next_key: MAX_VARS as i32 + 1,
            hash_version: 0,
            fast_lookup: vec![0; 2 * MAX_KEYS as usize + 1],
            fast_lookup_red: vec![0; 2 * MAX_KEYS as usize + 1],
            next_wild_card: 0,
            may_be_red: 0,
            conservative: 0,
            in_approximate_mode: false,
            create_color: false,
            no_eqs_in_simplified: 0,
            return_single_result: 0,
            found_reduction: OmegaResult::False,
            do_it_again: false,
            non_convex: false,
            solve_depth: 0,
            reduce_with_subs: true,
            verify_simplification: false,
            when_reduced: None,
        }
    }

    /// Keep substitutions in simplified problems (default) or resurrect
    /// them as equalities.
    pub fn with_reduce_with_subs(mut self, v: bool) -> Self {
        self.reduce_with_subs = v;
        self
    }

    /// Independently re-solve every reduced problem as a sanity check.
    pub fn with_verify_simplification(mut self, v: bool) -> Self {
        self.verify_simplification = v;
        self
    }

    /// Install a callback invoked for each reduced problem produced by
    /// [`simplify_problem`](Self::simplify_problem).
    pub fn set_when_reduced(&mut self, f: Option<Box<dyn FnMut(&Problem)>>) {
        self.when_reduced = f;
    }

    /// Whether the last simplification found the problem non-convex
    /// (splintering was required but suppressed).
    pub fn non_convex(&self) -> bool {
        self.non_convex
    }

    /// Fast-lookup slot for a key.
    #[inline]
    pub(crate) fn fl_slot(key: i32) -> usize {
        (MAX_KEYS + key) as usize
    }

    /// Drop every cached prototype and start a new key epoch.
    pub(crate) fn reset_hash_cache(&mut self) {
        self.hash_version += 1;
        self.next_key = MAX_VARS as i32 + 1;
        for entry in self.hash_master.iter_mut() {
            *entry = HashEntry::empty();
        }
    }

    /// Assign a fresh wildcard name to column `i`.
    pub(crate) fn name_wild_card(&mut self, pb: &mut Problem, i: usize) {
        self.next_wild_card -= 1;
        if self.next_wild_card < -MAX_WILD_CARDS {
            self.next_wild_card = -1;
        }
        pb.var[i] = self.next_wild_card;
    }

    /// Insert a fresh safe wildcard column and return its index. Every
    /// existing row gets a zero coefficient for it.
    pub(crate) fn add_new_wild_card(&mut self, pb: &mut Problem) -> SolveResult<usize> {
        if pb.num_vars >= MAX_VARS {
            return Err(OmegaError::CapacityExceeded {
                what: "variables",
                limit: MAX_VARS,
            });
        }

        pb.safe_vars += 1;
        let i = pb.safe_vars;
        pb.num_vars += 1;
        let n = pb.num_vars;

        // Free up column i by moving the free variable there to the end.
        if n != i {
            for e in pb.geqs.iter_mut() {
                if e.coef[i] != 0 {
                    e.touched = true;
                }
                e.coef[n] = e.coef[i];
            }
            for e in pb.eqs.iter_mut() {
                e.coef[n] = e.coef[i];
            }
            for e in pb.subs.iter_mut() {
                e.coef[n] = e.coef[i];
            }
            pb.var[n] = pb.var[i];
        }

        for e in pb.geqs.iter_mut() {
            e.coef[i] = 0;
        }
        for e in pb.eqs.iter_mut() {
            e.coef[i] = 0;
        }
        for e in pb.subs.iter_mut() {
            e.coef[i] = 0;
        }

        self.name_wild_card(pb, i);
        Ok(i)
    }

    /// True when a row should be treated as red for the given goal.
    #[inline]
    pub(crate) fn eqn_is_red(e: &Eqn, desired: Goal) -> bool {
        desired == Goal::Simplify && e.color == crate::eqn::Color::Red
    }
}
