//! Validation diagnostics
//!
//! This module contains the classification of validation failures and the
//! diagnostic carried by every terminal rejection. Formatting a message for
//! humans is left to the caller; the diagnostic only records what failed and
//! where.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data_tree::NodeId;

/// Classification of a validation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The node's schema is disabled by if-feature
    Disabled,
    /// A when condition evaluated false
    ConditionFalse,
    /// A when condition cannot be evaluated yet; not an error
    ConditionPending,
    /// State data in an edit or configuration context
    AccessViolation,
    /// Out-of-order node in an rpc request or reply
    OrderViolation,
    /// Second instance of a list entry, leaf-list value or single-instance node
    DuplicateInstance,
    /// Data from two cases of the same choice
    CaseConflict,
    /// A list instance lacks one of its keys
    MissingKey,
    /// A mandatory leaf or choice is absent
    MissingElement,
    /// Fewer instances than min-elements
    TooFewElements,
    /// More instances than max-elements
    TooManyElements,
    /// A unique statement is violated
    UniqueViolation,
}

impl ErrorKind {
    /// Name of the constraint class, as used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Disabled => "disabled",
            ErrorKind::ConditionFalse => "condition-false",
            ErrorKind::ConditionPending => "condition-pending",
            ErrorKind::AccessViolation => "access-violation",
            ErrorKind::OrderViolation => "order-violation",
            ErrorKind::DuplicateInstance => "duplicate-instance",
            ErrorKind::CaseConflict => "case-conflict",
            ErrorKind::MissingKey => "missing-key",
            ErrorKind::MissingElement => "missing-element",
            ErrorKind::TooFewElements => "too-few-elements",
            ErrorKind::TooManyElements => "too-many-elements",
            ErrorKind::UniqueViolation => "unique-violation",
        }
    }

    /// Whether the rejection is final (the node must be removed)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ErrorKind::ConditionPending)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic for one rejected data node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Classification
    pub kind: ErrorKind,
    /// Error message
    pub message: String,
    /// Data path of the offending node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Qualified name of the offending node's schema node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_node: Option<String>,
    /// The constraint that failed (expression, key list, case name, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    /// Additional explanation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The offending node, while it is still part of the tree
    #[serde(skip)]
    pub node: Option<NodeId>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: None,
            schema_node: None,
            constraint: None,
            reason: None,
            node: None,
        }
    }

    /// Set the path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the schema node name
    pub fn with_schema_node(mut self, name: impl Into<String>) -> Self {
        self.schema_node = Some(name.into());
        self
    }

    /// Set the constraint
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the offending node
    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref reason) = self.reason {
            write!(f, "\nReason: {}", reason)?;
        }
        if let Some(ref constraint) = self.constraint {
            write!(f, "\nConstraint: {}", constraint)?;
        }
        if let Some(ref path) = self.path {
            write!(f, "\nPath: {}", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new(ErrorKind::DuplicateInstance, "duplicate instance of 'entry'")
            .with_reason("key values are equal")
            .with_constraint("key \"name\"")
            .with_path("/ex:top/entry[name='a']");

        let msg = format!("{}", err);
        assert!(msg.contains("duplicate instance of 'entry'"));
        assert!(msg.contains("Reason:"));
        assert!(msg.contains("Constraint:"));
        assert!(msg.contains("Path:"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::CaseConflict.to_string(), "case-conflict");
        assert!(ErrorKind::ConditionFalse.is_terminal());
        assert!(!ErrorKind::ConditionPending.is_terminal());
    }

    #[test]
    fn test_serialize_skips_empty_fields() {
        let err = ValidationError::new(ErrorKind::Disabled, "disabled")
            .with_node(NodeId::from_raw(3));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "disabled");
        assert!(json.get("path").is_none());
        assert!(json.get("node").is_none());
    }
}
