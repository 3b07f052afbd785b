//! Limits and constraints for data tree validation
//!
//! This module defines limits that bound the work of one validation run,
//! protecting against runaway trees and conditions that never settle.

use crate::error::{Error, Result};

/// Limits configuration for a validation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting depth of the data tree
    pub max_tree_depth: usize,

    /// Maximum number of passes over the deferred-resolution queue
    pub max_resolution_passes: usize,

    /// Maximum number of pending items in the deferred-resolution queue
    pub max_deferred_items: usize,

    /// Maximum nesting depth of an if-feature expression
    pub max_expression_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_tree_depth: 1000,
            max_resolution_passes: 64,
            max_deferred_items: 100_000,
            max_expression_depth: 128,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_tree_depth: 100,
            max_resolution_passes: 8,
            max_deferred_items: 10_000,
            max_expression_depth: 32,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_tree_depth: 10_000,
            max_resolution_passes: 1024,
            max_deferred_items: 10_000_000,
            max_expression_depth: 1024,
        }
    }

    /// Check if tree depth is within limits
    pub fn check_tree_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_tree_depth {
            Err(Error::LimitExceeded(format!(
                "data tree depth {} exceeds maximum {}",
                depth, self.max_tree_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the deferred queue can take one more item
    pub fn check_deferred_items(&self, count: usize) -> Result<()> {
        if count >= self.max_deferred_items {
            Err(Error::LimitExceeded(format!(
                "deferred item count {} reached maximum {}",
                count, self.max_deferred_items
            )))
        } else {
            Ok(())
        }
    }

    /// Check if expression nesting depth is within limits
    pub fn check_expression_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_expression_depth {
            Err(Error::LimitExceeded(format!(
                "expression nesting depth {} exceeds maximum {}",
                depth, self.max_expression_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Whether another resolution pass is allowed after `passes` completed ones
    pub fn allows_resolution_pass(&self, passes: usize) -> bool {
        passes < self.max_resolution_passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_tree_depth, 1000);
        assert!(limits.check_tree_depth(500).is_ok());
        assert!(limits.check_tree_depth(1500).is_err());
    }

    #[test]
    fn test_strict_limits() {
        let limits = Limits::strict();
        assert!(limits.max_tree_depth < Limits::default().max_tree_depth);
        assert!(limits.check_tree_depth(150).is_err());
    }

    #[test]
    fn test_permissive_limits() {
        let limits = Limits::permissive();
        assert!(limits.max_tree_depth > Limits::default().max_tree_depth);
        assert!(limits.check_tree_depth(5000).is_ok());
    }

    #[test]
    fn test_check_deferred_items() {
        let limits = Limits::strict();
        assert!(limits.check_deferred_items(9_999).is_ok());
        assert!(limits.check_deferred_items(10_000).is_err());
    }

    #[test]
    fn test_expression_depth() {
        let limits = Limits::strict();
        assert!(limits.check_expression_depth(32).is_ok());
        assert!(matches!(
            limits.check_expression_depth(33),
            Err(Error::LimitExceeded(_))
        ));
        assert!(Limits::permissive().check_expression_depth(500).is_ok());
    }

    #[test]
    fn test_resolution_passes() {
        let limits = Limits::strict();
        assert!(limits.allows_resolution_pass(7));
        assert!(!limits.allows_resolution_pass(8));
    }
}
