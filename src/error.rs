//! Error types for the solver.
//!
//! Infeasibility is never an error: an unsatisfiable conjunction yields
//! `OmegaResult::False` from the solving entry points. The errors here cover
//! the two ways a well-formed problem can still fail to be solved: running
//! out of room in a fixed-capacity table, and coefficient arithmetic leaving
//! the representable range.

use thiserror::Error;

/// Top-level error type for the solver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OmegaError {
    /// A fixed-capacity table filled up while solving.
    #[error("capacity exceeded: {what} limited to {limit}")]
    CapacityExceeded {
        /// Which table overflowed (variables, equalities, inequalities, keys).
        what: &'static str,
        /// The compile-time ceiling that was hit.
        limit: usize,
    },

    /// A coefficient multiply or combination left the range of i64.
    #[error("coefficient arithmetic overflowed")]
    Overflow,
}

/// Result type using OmegaError.
pub type SolveResult<T> = Result<T, OmegaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OmegaError::CapacityExceeded {
            what: "inequalities",
            limit: 256,
        };
        let s = format!("{}", err);
        assert!(s.contains("inequalities"));
        assert!(s.contains("256"));
    }
}
