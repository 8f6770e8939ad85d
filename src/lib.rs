//! # Omega Solver - Exact Integer Linear Constraint Solver
//!
//! An implementation of the Omega test for deciding and simplifying
//! conjunctions of integer linear constraints, the core predicate of
//! polyhedral dependence analysis:
//! - Exact feasibility tests over the integers (Fourier-Motzkin with
//!   dark-shadow and splintering refinements)
//! - Simplification of constraint systems over protected variables
//! - Gist computation: which "red" constraints actually restrict a
//!   "black" context
//! - Bound, sign, and dependence-distance queries on simplified systems
//!
//! ## Architecture
//!
//! ```text
//! Problem → normalize → solve_eq → solve_geq → (splinter) → verdict
//!                                        ↘ simplify → queries
//! ```
//!
//! ## Example
//!
//! ```rust
//! use omega_solver::prelude::*;
//!
//! let mut solver = OmegaSolver::new();
//! let mut pb = Problem::new(2, 0)?;
//! pb.init_variables();
//! // 2x + 3y = 7, x >= 0, y >= 0
//! pb.add_equality(&[-7, 2, 3], Color::Black)?;
//! pb.add_inequality(&[0, 1, 0], Color::Black)?;
//! pb.add_inequality(&[0, 0, 1], Color::Black)?;
//!
//! let verdict = solver.solve_problem(&mut pb, Goal::Unknown, None)?;
//! assert_eq!(verdict, OmegaResult::True);
//! # Ok::<(), omega_solver::OmegaError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod eqn;
pub mod error;
pub mod problem;
pub mod query;
pub mod solver;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::context::{Goal, OmegaResult, OmegaSolver};
    pub use crate::eqn::{Color, Eqn, NEG_INFINITY, POS_INFINITY};
    pub use crate::error::{OmegaError, SolveResult};
    pub use crate::problem::Problem;
    pub use crate::query::VarBounds;
}

pub use context::{Goal, OmegaResult, OmegaSolver};
pub use eqn::Color;
pub use error::{OmegaError, SolveResult};
pub use problem::Problem;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
