//! # yang-validation
//!
//! Semantic validation of YANG data trees: the layer that runs after a data
//! tree has been built and before the rest of a system may rely on it.
//!
//! ## Features
//!
//! - Context validation: if-feature gating, `when` conditions with deferred
//!   resolution, access mode, positional order of rpc payloads
//! - Content validation: duplicate list entries and leaf-list values,
//!   missing keys, `unique` statements, single-instance nodes
//! - Choice/case resolution with automatic pruning or reporting
//! - Mandatory nodes and min/max-elements
//! - Canonical value comparison for the built-in types
//!
//! ## Example
//!
//! ```rust
//! use yang_validation::data_tree::DataTree;
//! use yang_validation::namespaces::Module;
//! use yang_validation::validators::{
//!     validate_tree, LeafType, SchemaBuilder, ValidationContext, ValidationOptions,
//! };
//!
//! let mut builder = SchemaBuilder::new(Module::new("ex", "urn:example", "ex"));
//! let top = builder.container(None, "top")?;
//! builder.leaf_list(Some(top), "port", LeafType::Uint16)?;
//! let schema = builder.build()?;
//!
//! let mut tree = DataTree::new(schema);
//! let top = tree.add(None, "top")?;
//! tree.add_value(Some(top), "port", "80")?;
//! tree.add_value(Some(top), "port", "080")?;
//!
//! let mut ctx = ValidationContext::new(ValidationOptions::default());
//! let report = validate_tree(&mut tree, &mut ctx)?;
//! assert_eq!(report.diagnostics.len(), 1);
//! assert_eq!(tree.children(Some(top)).len(), 1);
//! # Ok::<(), yang_validation::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod names;
pub mod namespaces;

// Instance data
pub mod data_tree;

// Validators
pub mod validators;

// Re-exports for convenience
pub use data_tree::{DataNode, DataTree, NodeId};
pub use error::{Error, Result};
pub use limits::Limits;

/// Version of the yang-validation library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
