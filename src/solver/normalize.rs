//! Inequality normalization: gcd tightening, canonical keys, and hash-based
//! duplicate elimination.
//!
//! Every touched geq is brought to a canonical form and given a key. Two
//! geqs with the same key constrain the same expression, so only the
//! tighter constant survives; a pair with opposite keys either proves
//! infeasibility, collapses into an equality, or just bounds the expression
//! from both sides.

use crate::context::{OmegaSolver, HashEntry};
use crate::eqn::{int_div, Color, Eqn, HASH_TABLE_SIZE, KEY_MULT, MAX_KEYS};
use crate::error::{OmegaError, SolveResult};
use crate::problem::Problem;
use log::debug;

/// Verdict of normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Normalize {
    /// The geqs are contradictory on their own.
    False,
    /// Every geq constrains a single variable.
    Uncoupled,
    /// At least one geq couples two or more variables.
    Coupled,
}

impl OmegaSolver {
    /// Copy equality `e` of `pb` into the outer problem, translating
    /// columns through variable identity. Skipped in conservative
    /// sections and when a variable of `pb` no longer exists outside.
    pub(crate) fn adding_equality_constraint(
        &mut self,
        outer: Option<&mut Problem>,
        pb: &Problem,
        e: usize,
    ) -> SolveResult<()> {
        let o = match outer {
            Some(o) if self.conservative == 0 => o,
            _ => return Ok(()),
        };

        let mut row = Eqn::zero(Color::Black);
        for i in (1..=pb.num_vars).rev() {
            let mut j = o.num_vars;
            while j >= 1 && o.var[j] != pb.var[i] {
                j -= 1;
            }
            if j == 0 {
                debug!("retracting equality forwarded to outer problem");
                return Ok(());
            }
            row.coef[j] = pb.eqs[e].coef[i];
        }
        row.coef[0] = pb.eqs[e].coef[0];
        debug!("forwarding equality constraint to outer problem");
        o.push_eq(row)
    }

    /// Normalize every touched geq of `pb` and weed out duplicates.
    pub(crate) fn normalize_problem(
        &mut self,
        pb: &mut Problem,
        mut outer: Option<&mut Problem>,
    ) -> SolveResult<Normalize> {
        let n_vars = pb.num_vars;
        let mut coupled = false;
        let mut packing: Vec<usize> = Vec::with_capacity(n_vars + 1);

        let mut e = 0;
        while e < pb.geqs.len() {
            if !pb.geqs[e].touched {
                if !pb.single_var_geq(&pb.geqs[e]) {
                    coupled = true;
                }
            } else {
                packing.clear();
                for k in 1..=n_vars {
                    if pb.geqs[e].coef[k] != 0 {
                        packing.push(k);
                    }
                }

                if packing.is_empty() {
                    // Constant row: contradiction or tautology.
                    if pb.geqs[e].coef[0] < 0 {
                        debug!("normalize: constant geq is negative, no solution");
                        return Ok(Normalize::False);
                    }
                    pb.delete_geq(e);
                    continue;
                } else if packing.len() == 1 {
                    let sv = packing[0];
                    let mut g = pb.geqs[e].coef[sv];

                    if g > 0 {
                        pb.geqs[e].coef[sv] = 1;
                        pb.geqs[e].key = sv as i32;
                    } else {
                        g = -g;
                        pb.geqs[e].coef[sv] = -1;
                        pb.geqs[e].key = -(sv as i32);
                    }
                    if g > 1 {
                        pb.geqs[e].coef[0] = int_div(pb.geqs[e].coef[0], g);
                    }
                } else {
                    coupled = true;
                    let top = packing.len() - 1;

                    // Gcd of the packed coefficients, folding the hash as
                    // we go; a unit coefficient short-circuits the gcd.
                    let mut i0 = top;
                    let i = packing[i0];
                    let lead = pb.geqs[e].coef[i];
                    let mut hash_code = lead.wrapping_mul(i as i64 + 3);
                    let mut g = lead.abs();

                    while i0 > 0 {
                        i0 -= 1;
                        let i = packing[i0];
                        let x = pb.geqs[e].coef[i];
                        hash_code = hash_code
                            .wrapping_mul(KEY_MULT)
                            .wrapping_mul(i as i64 + 3)
                            .wrapping_add(x);

                        if x.abs() == 1 {
                            g = 1;
                            // Finish the hash over the remaining columns.
                            while i0 > 0 {
                                i0 -= 1;
                                let i = packing[i0];
                                hash_code = hash_code
                                    .wrapping_mul(KEY_MULT)
                                    .wrapping_mul(i as i64 + 3)
                                    .wrapping_add(pb.geqs[e].coef[i]);
                            }
                            break;
                        }
                        g = crate::eqn::gcd(x.abs(), g);
                    }

                    if g > 1 {
                        pb.geqs[e].coef[0] = int_div(pb.geqs[e].coef[0], g);
                        let mut i0 = top;
                        let i = packing[i0];
                        pb.geqs[e].coef[i] /= g;
                        hash_code = pb.geqs[e].coef[i].wrapping_mul(i as i64 + 3);
                        while i0 > 0 {
                            i0 -= 1;
                            let i = packing[i0];
                            pb.geqs[e].coef[i] /= g;
                            hash_code = hash_code
                                .wrapping_mul(KEY_MULT)
                                .wrapping_mul(i as i64 + 3)
                                .wrapping_add(pb.geqs[e].coef[i]);
                        }
                    }

                    let g2 = hash_code.wrapping_abs();
                    debug!("normalize: hash code {} for geq {}", hash_code, e);
                    let mut j = (g2 % HASH_TABLE_SIZE as i64).unsigned_abs() as usize;

                    loop {
                        let proto = &self.hash_master[j];

                        if proto.code == g2 && proto.top_var == top as i64 {
                            let matches = packing.iter().all(|&i| {
                                if hash_code >= 0 {
                                    pb.geqs[e].coef[i] == proto.coef[i]
                                } else {
                                    pb.geqs[e].coef[i] == -proto.coef[i]
                                }
                            });
                            if matches {
                                pb.geqs[e].key = if hash_code >= 0 {
                                    proto.key
                                } else {
                                    -proto.key
                                };
                                break;
                            }
                        } else if proto.code < 0 {
                            let key = self.next_key;
                            self.next_key += 1;
                            if key > MAX_KEYS {
                                return Err(OmegaError::CapacityExceeded {
                                    what: "hash keys",
                                    limit: MAX_KEYS as usize,
                                });
                            }

                            let mut coef = vec![0; crate::eqn::MAX_VARS + 2];
                            for &i in &packing {
                                coef[i] = if hash_code >= 0 {
                                    pb.geqs[e].coef[i]
                                } else {
                                    -pb.geqs[e].coef[i]
                                };
                            }
                            self.hash_master[j] = HashEntry {
                                coef,
                                code: g2,
                                top_var: top as i64,
                                key,
                            };
                            pb.geqs[e].key =
                                if hash_code >= 0 { key } else { -key };
                            break;
                        }

                        j = (j + 1) % HASH_TABLE_SIZE;
                    }
                }

                pb.geqs[e].touched = false;
            }

            // Fast-lookup pass: relate this geq to earlier ones with the
            // same or opposite key.
            let e_key = pb.geqs[e].key;
            if e > 0 {
                let c_term = pb.geqs[e].coef[0];

                // Opposite key, black: incompatible constants are a
                // contradiction, exact cancellation becomes an equality.
                let e2 = self.fast_lookup[Self::fl_slot(-e_key)];
                if e2 < e && pb.geqs[e2].key == -e_key && pb.geqs[e2].color == Color::Black {
                    if pb.geqs[e2].coef[0] < -c_term {
                        debug!("normalize: opposite geqs have no solution");
                        return Ok(Normalize::False);
                    }
                    if pb.geqs[e2].coef[0] == -c_term
                        && (self.create_color || pb.geqs[e].color == Color::Black)
                    {
                        let row = pb.geqs[e].clone();
                        let is_black = row.color == Color::Black;
                        pb.push_eq(row)?;
                        if is_black {
                            let idx = pb.eqs.len() - 1;
                            self.adding_equality_constraint(outer.as_deref_mut(), pb, idx)?;
                        }
                    }
                }

                let e2 = self.fast_lookup_red[Self::fl_slot(-e_key)];
                if e2 < e && pb.geqs[e2].key == -e_key && pb.geqs[e2].color == Color::Red {
                    if pb.geqs[e2].coef[0] < -c_term {
                        debug!("normalize: opposite red geqs have no solution");
                        return Ok(Normalize::False);
                    }
                    if pb.geqs[e2].coef[0] == -c_term && self.create_color {
                        let mut row = pb.geqs[e].clone();
                        row.color = Color::Red;
                        pb.push_eq(row)?;
                    }
                }

                // Same key: keep the tighter constant.
                let e2 = self.fast_lookup[Self::fl_slot(e_key)];
                if e2 < e && pb.geqs[e2].key == e_key && pb.geqs[e2].color == Color::Black {
                    if pb.geqs[e2].coef[0] > c_term {
                        if pb.geqs[e].color == Color::Black {
                            pb.geqs[e2].coef[0] = c_term;
                            pb.delete_geq(e);
                            continue;
                        }
                    } else {
                        pb.delete_geq(e);
                        continue;
                    }
                }

                let e2 = self.fast_lookup_red[Self::fl_slot(e_key)];
                if e2 < e && pb.geqs[e2].key == e_key && pb.geqs[e2].color == Color::Red {
                    if pb.geqs[e2].coef[0] >= c_term {
                        pb.geqs[e2].coef[0] = c_term;
                        pb.geqs[e2].color = pb.geqs[e].color;
                    }
                    pb.delete_geq(e);
                    continue;
                }
            }

            if pb.geqs[e].color == Color::Red {
                self.fast_lookup_red[Self::fl_slot(e_key)] = e;
            } else {
                self.fast_lookup[Self::fl_slot(e_key)] = e;
            }

            e += 1;
        }

        self.create_color = false;
        Ok(if coupled {
            Normalize::Coupled
        } else {
            Normalize::Uncoupled
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OmegaSolver;

    fn pb3() -> Problem {
        let mut pb = Problem::new(3, 0).unwrap();
        pb.init_variables();
        pb
    }

    #[test]
    fn test_constant_rows() {
        let mut solver = OmegaSolver::new();
        let mut pb = pb3();
        pb.add_inequality(&[4, 0, 0, 0], Color::Black).unwrap();
        assert_eq!(
            solver.normalize_problem(&mut pb, None).unwrap(),
            Normalize::Uncoupled
        );
        assert!(pb.geqs.is_empty());

        let mut pb = pb3();
        pb.add_inequality(&[-1, 0, 0, 0], Color::Black).unwrap();
        assert_eq!(
            solver.normalize_problem(&mut pb, None).unwrap(),
            Normalize::False
        );
    }

    #[test]
    fn test_single_var_canonical() {
        let mut solver = OmegaSolver::new();
        let mut pb = pb3();
        // 3x1 - 7 >= 0 tightens to x1 >= 3.
        pb.add_inequality(&[-7, 3, 0, 0], Color::Black).unwrap();
        solver.normalize_problem(&mut pb, None).unwrap();
        assert_eq!(pb.geqs[0].key, 1);
        assert_eq!(pb.geqs[0].coef[1], 1);
        assert_eq!(pb.geqs[0].coef[0], -3);
    }

    #[test]
    fn test_gcd_tightening_coupled() {
        let mut solver = OmegaSolver::new();
        let mut pb = pb3();
        // 4x1 + 6x2 - 3 >= 0 tightens to 2x1 + 3x2 - 2 >= 0.
        pb.add_inequality(&[-3, 4, 6, 0], Color::Black).unwrap();
        assert_eq!(
            solver.normalize_problem(&mut pb, None).unwrap(),
            Normalize::Coupled
        );
        assert_eq!(pb.geqs[0].coef[1], 2);
        assert_eq!(pb.geqs[0].coef[2], 3);
        assert_eq!(pb.geqs[0].coef[0], -2);
    }

    #[test]
    fn test_duplicate_keeps_tighter() {
        let mut solver = OmegaSolver::new();
        let mut pb = pb3();
        pb.add_inequality(&[5, 1, 2, 0], Color::Black).unwrap();
        pb.add_inequality(&[3, 1, 2, 0], Color::Black).unwrap();
        solver.normalize_problem(&mut pb, None).unwrap();
        assert_eq!(pb.geqs.len(), 1);
        assert_eq!(pb.geqs[0].coef[0], 3);
    }

    #[test]
    fn test_opposite_pair_promotes_equality() {
        let mut solver = OmegaSolver::new();
        let mut pb = pb3();
        // x1 + 2x2 - 4 >= 0 and 4 - x1 - 2x2 >= 0 force x1 + 2x2 = 4.
        pb.add_inequality(&[-4, 1, 2, 0], Color::Black).unwrap();
        pb.add_inequality(&[4, -1, -2, 0], Color::Black).unwrap();
        solver.normalize_problem(&mut pb, None).unwrap();
        assert_eq!(pb.eqs.len(), 1);
    }

    #[test]
    fn test_opposite_pair_infeasible() {
        let mut solver = OmegaSolver::new();
        let mut pb = pb3();
        // x1 + x2 >= 5 and x1 + x2 <= 3.
        pb.add_inequality(&[-5, 1, 1, 0], Color::Black).unwrap();
        pb.add_inequality(&[3, -1, -1, 0], Color::Black).unwrap();
        assert_eq!(
            solver.normalize_problem(&mut pb, None).unwrap(),
            Normalize::False
        );
    }

    #[test]
    fn test_same_expression_shares_key() {
        let mut solver = OmegaSolver::new();
        let mut pb = pb3();
        pb.add_inequality(&[0, 1, 3, -2], Color::Black).unwrap();
        pb.add_inequality(&[9, -1, -3, 2], Color::Black).unwrap();
        solver.normalize_problem(&mut pb, None).unwrap();
        assert_eq!(pb.geqs[0].key, -pb.geqs[1].key);
    }
}
