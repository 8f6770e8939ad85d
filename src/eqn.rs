//! Linear constraint representation and integer arithmetic helpers.
//!
//! A constraint is a row of coefficients over the problem variables:
//! `coef[0] + coef[1]*x1 + ... + coef[n]*xn` interpreted as `= 0` when the
//! row lives in the equality list and `>= 0` when it lives in the inequality
//! list. Rows carry a color for gist computation and a hash key assigned
//! during normalization.

use crate::error::{OmegaError, SolveResult};
use num_integer::Integer;
use serde::{Deserialize, Serialize};

/// Maximum number of variables (columns) in a problem.
pub const MAX_VARS: usize = 128;
/// Maximum number of inequalities in a problem.
pub const MAX_GEQS: usize = 256;
/// Maximum number of equalities in a problem.
pub const MAX_EQS: usize = 128;
/// Maximum number of distinct hash keys before the cache is reset.
pub const MAX_KEYS: i32 = 500;
/// Number of slots in the hash prototype table.
pub const HASH_TABLE_SIZE: usize = 550;
/// Maximum number of distinct wildcard names before reuse.
pub const MAX_WILD_CARDS: i32 = 18;
/// Multiplier for the polynomial hash over packed coefficients.
pub const KEY_MULT: i64 = 31;

/// Upper sentinel for variable bounds.
pub const POS_INFINITY: i64 = 0x7FF_FFFF;
/// Lower sentinel for variable bounds.
pub const NEG_INFINITY: i64 = -0x7FF_FFFF;

/// Constraint color, used to compute the "gist" of a problem: red
/// constraints are the ones being tested for redundancy against the black
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// Context constraint.
    Black,
    /// Constraint under test.
    Red,
}

/// One linear constraint: the coefficient row plus normalization state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eqn {
    /// `coef[0]` is the constant term, `coef[i]` the coefficient of
    /// variable `i`. Allocated at full capacity so elimination scratch
    /// columns stay in range.
    pub coef: Vec<i64>,
    /// Hash key assigned by normalization; `±v` for a single-variable row,
    /// larger magnitudes for multi-variable prototypes. 0 means unkeyed.
    pub key: i32,
    /// Set when the row changed since it was last normalized.
    pub touched: bool,
    /// Gist color.
    pub color: Color,
}

impl Eqn {
    /// A zero row of the given color.
    pub fn zero(color: Color) -> Self {
        Eqn {
            coef: vec![0; MAX_VARS + 2],
            key: 0,
            touched: true,
            color,
        }
    }

    /// Build a row from `[constant, c1, ..., cn]`.
    pub fn from_coeffs(coeffs: &[i64], color: Color) -> Self {
        debug_assert!(coeffs.len() <= MAX_VARS + 1);
        let mut e = Eqn::zero(color);
        e.coef[..coeffs.len()].copy_from_slice(coeffs);
        e
    }

    /// True when every coefficient in `1..=n_vars` is zero.
    pub fn is_constant(&self, n_vars: usize) -> bool {
        self.coef[1..=n_vars].iter().all(|&c| c == 0)
    }

    /// Gcd of the variable coefficients in `1..=n_vars` (0 for a constant row).
    pub fn coef_gcd(&self, n_vars: usize) -> i64 {
        self.coef[1..=n_vars]
            .iter()
            .fold(0i64, |g, &c| g.gcd(&c))
    }

    /// Divide the whole row (constant included) by the gcd of its variable
    /// coefficients. Only valid when the row is an equality that is known
    /// to be divisible.
    pub fn divide_by_gcd(&mut self, n_vars: usize) {
        let g = self.coef_gcd(n_vars);
        if g > 1 {
            for c in self.coef[0..=n_vars].iter_mut() {
                *c /= g;
            }
        }
    }

    /// Divide the row by the gcd of all its entries, constant included.
    pub fn divide_by_full_gcd(&mut self, n_vars: usize) {
        let g = self.coef[0..=n_vars]
            .iter()
            .fold(0i64, |g, &c| g.gcd(&c));
        if g > 1 {
            for c in self.coef[0..=n_vars].iter_mut() {
                *c /= g;
            }
        }
    }
}

/// Floor division for a positive divisor.
#[inline]
pub fn int_div(a: i64, b: i64) -> i64 {
    debug_assert!(b > 0);
    if a > 0 {
        a / b
    } else {
        -((-a + b - 1) / b)
    }
}

/// Remainder matching `int_div`, always in `0..b`.
#[inline]
pub fn int_mod(a: i64, b: i64) -> i64 {
    a - b * int_div(a, b)
}

/// Multiply with overflow detection.
#[inline]
pub fn check_mul(x: i64, y: i64) -> SolveResult<i64> {
    x.checked_mul(y).ok_or(OmegaError::Overflow)
}

/// Gcd of two coefficients (non-negative result).
#[inline]
pub fn gcd(a: i64, b: i64) -> i64 {
    a.gcd(&b)
}
