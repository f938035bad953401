//! Execution limits for verbs with quadratic or combinatorial output.

use verba_core::{Error, Result};

/// Optional resource guards carried by join, unroll and impute options.
///
/// Every limit defaults to unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Limits {
    /// Bound on `|L| * |R|` for loop and cross joins.
    pub max_pairs: Option<usize>,
    /// Bound on rows emitted by join, unroll and fold.
    pub max_rows: Option<usize>,
    /// Bound on the Cartesian enumeration size of impute and fulfill.
    pub max_expand: Option<usize>,
}

impl Limits {
    /// Creates limits with every guard disabled.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Sets the loop-join pair bound.
    pub fn with_max_pairs(mut self, n: usize) -> Self {
        self.max_pairs = Some(n);
        self
    }

    /// Sets the emitted row bound.
    pub fn with_max_rows(mut self, n: usize) -> Self {
        self.max_rows = Some(n);
        self
    }

    /// Sets the expansion bound.
    pub fn with_max_expand(mut self, n: usize) -> Self {
        self.max_expand = Some(n);
        self
    }

    /// Fails if a loop over `requested` pairs would exceed the bound.
    pub fn check_pairs(&self, operation: &str, requested: usize) -> Result<()> {
        check(self.max_pairs, operation, requested)
    }

    /// Fails if emitting `requested` rows would exceed the bound.
    pub fn check_rows(&self, operation: &str, requested: usize) -> Result<()> {
        check(self.max_rows, operation, requested)
    }

    /// Fails if enumerating `requested` combinations would exceed the bound.
    pub fn check_expand(&self, operation: &str, requested: usize) -> Result<()> {
        check(self.max_expand, operation, requested)
    }
}

fn check(limit: Option<usize>, operation: &str, requested: usize) -> Result<()> {
    match limit {
        Some(limit) if requested > limit => Err(Error::row_limit(operation, limit, requested)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_limits() {
        let limits = Limits::unbounded();
        assert!(limits.check_pairs("cross", usize::MAX).is_ok());
        assert!(limits.check_rows("join", usize::MAX).is_ok());
        assert!(limits.check_expand("impute", usize::MAX).is_ok());
    }

    #[test]
    fn test_limits_reject_excess() {
        let limits = Limits::unbounded()
            .with_max_pairs(10)
            .with_max_rows(5)
            .with_max_expand(3);
        assert!(limits.check_pairs("cross", 10).is_ok());
        assert_eq!(
            limits.check_pairs("cross", 11),
            Err(Error::row_limit("cross", 10, 11))
        );
        assert!(limits.check_rows("join", 6).is_err());
        assert!(limits.check_expand("impute", 4).is_err());
    }
}
