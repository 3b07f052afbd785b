//! YANG data validators
//!
//! This module contains the schema components and the validation passes
//! for YANG data trees.

// Schema components
pub mod builders;
pub mod features;
pub mod schemas;
pub mod simple_types;

// Shared infrastructure
pub mod base;
pub mod builtins;
pub mod exceptions;
pub mod resolution;
pub mod validation;

// Validation passes
pub mod content;
pub mod context;
pub mod document_validation;
pub mod groups;
pub mod identities;

// Re-exports
pub use base::{
    CaseOutcome, ConditionEvaluator, ConditionResult, ContentOutcome, ContextOutcome,
    UniqueOutcome, ValueComparator,
};
pub use builders::{RpcIds, SchemaBuilder};
pub use builtins::{canonicalize, CanonicalComparator, CanonicalValue};
pub use content::{check_cardinality, check_content, check_resolved_content};
pub use context::check_context;
pub use document_validation::{resolve_deferred, validate_tree, ValidationReport};
pub use exceptions::{ErrorKind, ValidationError};
pub use features::{FeatureSet, IfFeatureExpr};
pub use groups::{find_case_conflicts, resolve_case, CaseSubject};
pub use identities::{check_unique, FieldTuple};
pub use resolution::{DeferReason, DeferredItem, DeferredQueue};
pub use schemas::{Access, Schema, SchemaId, SchemaKind, SchemaNode, WhenCondition};
pub use simple_types::LeafType;
pub use validation::{CasePolicy, DataKind, ValidationContext, ValidationOptions};
