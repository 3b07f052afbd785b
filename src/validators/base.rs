//! Base validator infrastructure
//!
//! This module provides the outcome types returned by the validators and the
//! collaborator seams the engine depends on: the `when` expression evaluator
//! and the value comparator.

use std::fmt;

use crate::data_tree::{DataTree, NodeId};

use super::exceptions::{ErrorKind, ValidationError};
use super::schemas::WhenCondition;
use super::simple_types::LeafType;

// =============================================================================
// Collaborators
// =============================================================================

/// Result of evaluating a `when` condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionResult {
    /// The condition holds
    True,
    /// The condition does not hold
    False,
    /// The condition depends on data that is not in the tree yet
    Indeterminate,
}

impl From<bool> for ConditionResult {
    fn from(value: bool) -> Self {
        if value {
            ConditionResult::True
        } else {
            ConditionResult::False
        }
    }
}

/// Evaluator for `when` conditions
///
/// `context` is the context node of the expression: the data node itself
/// for its own condition, the data parent for conditions on enclosing
/// choices and cases (`None` when that parent is the root).
pub trait ConditionEvaluator {
    /// Evaluate a condition in the given context
    fn evaluate(
        &self,
        condition: &WhenCondition,
        tree: &DataTree,
        context: Option<NodeId>,
    ) -> ConditionResult;
}

impl<F> ConditionEvaluator for F
where
    F: Fn(&WhenCondition, &DataTree, Option<NodeId>) -> ConditionResult,
{
    fn evaluate(
        &self,
        condition: &WhenCondition,
        tree: &DataTree,
        context: Option<NodeId>,
    ) -> ConditionResult {
        self(condition, tree, context)
    }
}

/// Comparator deciding value equality under a declared type
pub trait ValueComparator {
    /// Whether two lexical values denote the same value of `ty`
    fn equal(&self, a: &str, b: &str, ty: &LeafType) -> bool;
}

// =============================================================================
// Outcomes
// =============================================================================

/// Outcome of context validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextOutcome {
    /// The node may exist at its position
    Admissible,
    /// The node is rejected; a `ConditionPending` rejection means "re-check
    /// later", every other kind is terminal
    Rejected(ValidationError),
}

impl ContextOutcome {
    /// Check if the node is admissible
    pub fn is_admissible(&self) -> bool {
        matches!(self, ContextOutcome::Admissible)
    }

    /// Check if the node's condition was deferred
    pub fn is_deferred(&self) -> bool {
        self.kind() == Some(ErrorKind::ConditionPending)
    }

    /// Classification of a rejection
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ContextOutcome::Admissible => None,
            ContextOutcome::Rejected(err) => Some(err.kind),
        }
    }
}

/// Outcome of content validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentOutcome {
    /// The node's content is valid in its context
    Success,
    /// A genuine violation; the caller reports it and removes the node
    Failed(ValidationError),
    /// The node lost to another node; the caller removes it without
    /// reporting anything
    Superseded,
}

impl ContentOutcome {
    /// Check if validation succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, ContentOutcome::Success)
    }

    /// The diagnostic of a reported failure
    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            ContentOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Outcome of the uniqueness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueOutcome {
    /// No other instance matches
    NoConflict,
    /// Another instance has the same value or keys
    Duplicate {
        /// The matching instance
        other: NodeId,
        /// Diagnostic for the checked node
        error: ValidationError,
    },
}

impl UniqueOutcome {
    /// Check if a duplicate was found
    pub fn is_duplicate(&self) -> bool {
        matches!(self, UniqueOutcome::Duplicate { .. })
    }
}

/// Outcome of case-conflict resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    /// No data from another case remains; `pruned` lists removed nodes
    NoConflict {
        /// Nodes removed by autodelete
        pruned: Vec<NodeId>,
    },
    /// Data from another case is present and was not removed
    Conflict(ValidationError),
}

impl CaseOutcome {
    /// Check if a conflict is reported
    pub fn is_conflict(&self) -> bool {
        matches!(self, CaseOutcome::Conflict(_))
    }

    /// Nodes removed while resolving
    pub fn pruned(&self) -> &[NodeId] {
        match self {
            CaseOutcome::NoConflict { pruned } => pruned,
            CaseOutcome::Conflict(_) => &[],
        }
    }
}

impl fmt::Display for ContextOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextOutcome::Admissible => write!(f, "admissible"),
            ContextOutcome::Rejected(err) => write!(f, "rejected ({}): {}", err.kind, err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_from_bool() {
        assert_eq!(ConditionResult::from(true), ConditionResult::True);
        assert_eq!(ConditionResult::from(false), ConditionResult::False);
    }

    #[test]
    fn test_context_outcome_classification() {
        let pending = ContextOutcome::Rejected(ValidationError::new(
            ErrorKind::ConditionPending,
            "pending",
        ));
        assert!(pending.is_deferred());
        assert!(!pending.is_admissible());
        assert_eq!(pending.kind(), Some(ErrorKind::ConditionPending));

        let disabled = ContextOutcome::Rejected(ValidationError::new(ErrorKind::Disabled, "off"));
        assert!(!disabled.is_deferred());
        assert_eq!(disabled.to_string(), "rejected (disabled): off");

        assert!(ContextOutcome::Admissible.is_admissible());
        assert_eq!(ContextOutcome::Admissible.kind(), None);
    }

    #[test]
    fn test_case_outcome_pruned() {
        let outcome = CaseOutcome::NoConflict {
            pruned: vec![NodeId::from_raw(1)],
        };
        assert!(!outcome.is_conflict());
        assert_eq!(outcome.pruned(), &[NodeId::from_raw(1)]);
    }

    #[test]
    fn test_content_outcome_error() {
        let failed = ContentOutcome::Failed(ValidationError::new(ErrorKind::MissingKey, "no key"));
        assert!(!failed.is_success());
        assert_eq!(failed.error().unwrap().kind, ErrorKind::MissingKey);
        assert!(ContentOutcome::Superseded.error().is_none());
    }
}
