//! Error types for yang-validation
//!
//! This module defines the crate-level error type. Validation outcomes are
//! not errors in this sense: they travel in the outcome enums returned by the
//! validators. `Error` is reserved for schema building problems, misuse of
//! the data tree API and exceeded limits.

use thiserror::Error;

use crate::data_tree::NodeId;
use crate::validators::exceptions::ValidationError;

/// Result type alias using the crate Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for yang-validation operations
#[derive(Error, Debug)]
pub enum Error {
    /// Data tree validation error
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Schema building error
    #[error("schema error: {0}")]
    Schema(String),

    /// Malformed if-feature expression
    #[error("feature expression error: {0}")]
    Feature(String),

    /// Name error (invalid YANG identifier)
    #[error("name error: {0}")]
    Name(String),

    /// The node id does not refer to a live node of the tree
    #[error("unknown data node {0}")]
    UnknownNode(NodeId),

    /// A data node was placed where its schema does not allow it
    #[error("position error: {0}")]
    Position(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
