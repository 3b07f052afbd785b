//! Instance identity
//!
//! This module implements the uniqueness rules for multi-instance nodes:
//! - list instances are identified by their key leaves
//! - leaf-list instances are identified by their value
//! - `unique` statements require a combination of descendant leaf values to
//!   be unique among the instances of a list
//!
//! Values are compared through a [`ValueComparator`] under the declared leaf
//! type, so `"07"` and `"7"` of a `uint8` key identify the same instance.

use crate::data_tree::{DataTree, NodeId};
use crate::error::{Error, Result};

use super::base::{UniqueOutcome, ValueComparator};
use super::exceptions::{ErrorKind, ValidationError};
use super::schemas::{SchemaId, SchemaKind};

/// Tuple of leaf values identifying one instance
///
/// A missing leaf is `None` and never equals anything, not even another
/// missing leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTuple {
    values: Vec<Option<String>>,
}

impl FieldTuple {
    /// Collect the values of `paths` below `node`
    pub fn collect(tree: &DataTree, node: NodeId, paths: &[String]) -> Result<Self> {
        let fields = FieldPaths::resolve(tree, tree.get(node)?.schema, paths);
        Ok(Self::collect_resolved(tree, node, &fields))
    }

    fn collect_resolved(tree: &DataTree, node: NodeId, fields: &FieldPaths) -> Self {
        let values = fields
            .chains
            .iter()
            .map(|chain| {
                chain
                    .as_deref()
                    .and_then(|chain| tree.find_along(node, chain))
                    .and_then(|leaf| tree.value(leaf))
                    .map(str::to_string)
            })
            .collect();
        Self { values }
    }

    /// Whether every field has a value
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }

    /// Field values in path order
    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Field-wise equality; a missing field never matches
    pub fn matches(
        &self,
        other: &FieldTuple,
        tree: &DataTree,
        list: SchemaId,
        paths: &[String],
        comparator: &dyn ValueComparator,
    ) -> bool {
        if self.values.len() != other.values.len() {
            return false;
        }
        let schema = tree.schema();
        self.values
            .iter()
            .zip(&other.values)
            .zip(paths)
            .all(|((a, b), path)| match (a, b) {
                (Some(a), Some(b)) => match schema
                    .resolve_descendant(list, path)
                    .and_then(|leaf| schema.node(leaf).kind.leaf_type())
                {
                    Some(ty) => comparator.equal(a, b, ty),
                    None => a == b,
                },
                _ => false,
            })
    }
}

// field paths resolved against the list schema once per check
struct FieldPaths {
    chains: Vec<Option<Vec<SchemaId>>>,
}

impl FieldPaths {
    fn resolve(tree: &DataTree, list: SchemaId, paths: &[String]) -> Self {
        let schema = tree.schema();
        let chains = paths.iter().map(|path| schema.resolve_path(list, path)).collect();
        Self { chains }
    }
}

/// Check a list or leaf-list instance for another instance with the same
/// identity among its siblings
///
/// The scan starts at `first_sibling`, or at the first sibling of `node`
/// when no hint is given. Lists without keys and nodes of other kinds never
/// have duplicates.
pub fn check_unique(
    tree: &DataTree,
    node: NodeId,
    first_sibling: Option<NodeId>,
    comparator: &dyn ValueComparator,
) -> Result<UniqueOutcome> {
    let run = match first_sibling {
        Some(first) => {
            if !tree.are_siblings(first, node)? {
                return Err(Error::Position(format!(
                    "{} is not a sibling of {}",
                    tree.path(first),
                    tree.path(node)
                )));
            }
            tree.siblings_from(first)?
        }
        None => tree.siblings(node)?,
    };
    find_duplicate(tree, node, run, comparator, &|_| false)
}

/// Find the first instance in `candidates` with the same identity as `node`
pub(crate) fn find_duplicate(
    tree: &DataTree,
    node: NodeId,
    candidates: &[NodeId],
    comparator: &dyn ValueComparator,
    skip: &dyn Fn(NodeId) -> bool,
) -> Result<UniqueOutcome> {
    let subject = tree.get(node)?;
    let schema_id = subject.schema;
    let snode = tree.schema().node(schema_id);

    let keys = match &snode.kind {
        SchemaKind::List { keys, .. } if keys.is_empty() => return Ok(UniqueOutcome::NoConflict),
        SchemaKind::List { keys, .. } => {
            let fields = FieldPaths::resolve(tree, schema_id, keys);
            let own = FieldTuple::collect_resolved(tree, node, &fields);
            Some((keys, fields, own))
        }
        SchemaKind::LeafList { .. } => None,
        _ => return Ok(UniqueOutcome::NoConflict),
    };

    for &other in candidates {
        if other == node || skip(other) {
            continue;
        }
        let Ok(candidate) = tree.get(other) else {
            continue;
        };
        if candidate.schema != schema_id {
            continue;
        }

        let same = match &keys {
            Some((paths, fields, own)) => {
                let theirs = FieldTuple::collect_resolved(tree, other, fields);
                own.matches(&theirs, tree, schema_id, paths, comparator)
            }
            None => match (subject.value(), candidate.value(), snode.kind.leaf_type()) {
                (Some(a), Some(b), Some(ty)) => comparator.equal(a, b, ty),
                _ => false,
            },
        };

        if same {
            let constraint = match &keys {
                Some((paths, _, _)) => format!("key \"{}\"", paths.join(" ")),
                None => format!("leaf-list '{}'", snode.local_name()),
            };
            let error = ValidationError::new(
                ErrorKind::DuplicateInstance,
                format!("duplicate instance of '{}'", snode.local_name()),
            )
            .with_path(tree.path(node))
            .with_schema_node(snode.name.qualified())
            .with_constraint(constraint)
            .with_node(node);
            return Ok(UniqueOutcome::Duplicate { other, error });
        }
    }
    Ok(UniqueOutcome::NoConflict)
}

/// Check the `unique` statements of a list instance against `candidates`
///
/// Returns the first violation. Instances missing any leaf of a statement
/// are exempt from that statement.
pub(crate) fn check_unique_statements(
    tree: &DataTree,
    node: NodeId,
    candidates: &[NodeId],
    comparator: &dyn ValueComparator,
    skip: &dyn Fn(NodeId) -> bool,
) -> Result<Option<ValidationError>> {
    let schema_id = tree.get(node)?.schema;
    let snode = tree.schema().node(schema_id);
    let SchemaKind::List { uniques, .. } = &snode.kind else {
        return Ok(None);
    };

    for paths in uniques {
        let fields = FieldPaths::resolve(tree, schema_id, paths);
        let own = FieldTuple::collect_resolved(tree, node, &fields);
        if !own.is_complete() {
            continue;
        }
        for &other in candidates {
            if other == node || skip(other) || !tree.contains(other) {
                continue;
            }
            if tree.get(other)?.schema != schema_id {
                continue;
            }
            let theirs = FieldTuple::collect_resolved(tree, other, &fields);
            if own.matches(&theirs, tree, schema_id, paths, comparator) {
                return Ok(Some(
                    ValidationError::new(
                        ErrorKind::UniqueViolation,
                        format!("unique constraint of '{}' violated", snode.local_name()),
                    )
                    .with_path(tree.path(node))
                    .with_schema_node(snode.name.qualified())
                    .with_constraint(format!("unique \"{}\"", paths.join(" ")))
                    .with_reason(format!("same values as {}", tree.path(other)))
                    .with_node(node),
                ));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::Module;
    use crate::validators::builders::SchemaBuilder;
    use crate::validators::builtins::CanonicalComparator;
    use crate::validators::schemas::Schema;
    use crate::validators::simple_types::LeafType;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        let mut b = SchemaBuilder::new(Module::new("ex", "urn:example", "ex"));
        let top = b.container(None, "top").unwrap();
        b.leaf_list(Some(top), "port", LeafType::Uint16).unwrap();
        let server = b.list(Some(top), "server", &["host", "port"]).unwrap();
        b.leaf(Some(server), "host", LeafType::String).unwrap();
        b.leaf(Some(server), "port", LeafType::Uint16).unwrap();
        b.leaf(Some(server), "weight", LeafType::Uint8).unwrap();
        let addr = b.container(Some(server), "address").unwrap();
        b.leaf(Some(addr), "ip", LeafType::String).unwrap();
        b.unique(server, &["address/ip"]).unwrap();
        b.build().unwrap()
    }

    fn server(tree: &mut DataTree, top: NodeId, host: Option<&str>, port: &str) -> NodeId {
        let entry = tree.add(Some(top), "server").unwrap();
        if let Some(host) = host {
            tree.add_value(Some(entry), "host", host).unwrap();
        }
        tree.add_value(Some(entry), "port", port).unwrap();
        entry
    }

    #[test]
    fn test_leaf_list_duplicates() {
        let cmp = CanonicalComparator::new();
        let mut tree = DataTree::new(schema());
        let top = tree.add(None, "top").unwrap();
        let a = tree.add_value(Some(top), "port", "1").unwrap();
        let b = tree.add_value(Some(top), "port", "2").unwrap();
        assert_eq!(check_unique(&tree, b, None, &cmp).unwrap(), UniqueOutcome::NoConflict);

        let c = tree.add_value(Some(top), "port", "02").unwrap();
        match check_unique(&tree, c, Some(a), &cmp).unwrap() {
            UniqueOutcome::Duplicate { other, error } => {
                assert_eq!(other, b);
                assert_eq!(error.kind, ErrorKind::DuplicateInstance);
                assert_eq!(error.path.as_deref(), Some("/ex:top/port[.='02']"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_list_keys_decide_identity() {
        let cmp = CanonicalComparator::new();
        let mut tree = DataTree::new(schema());
        let top = tree.add(None, "top").unwrap();
        let a = server(&mut tree, top, Some("h"), "80");
        tree.add_value(Some(a), "weight", "1").unwrap();
        let b = server(&mut tree, top, Some("h"), "080");
        tree.add_value(Some(b), "weight", "2").unwrap();
        let c = server(&mut tree, top, Some("h"), "81");

        assert!(check_unique(&tree, b, None, &cmp).unwrap().is_duplicate());
        assert!(!check_unique(&tree, c, None, &cmp).unwrap().is_duplicate());
    }

    #[test]
    fn test_missing_keys_never_match() {
        let cmp = CanonicalComparator::new();
        let mut tree = DataTree::new(schema());
        let top = tree.add(None, "top").unwrap();
        server(&mut tree, top, None, "80");
        let b = server(&mut tree, top, None, "80");
        assert!(!check_unique(&tree, b, None, &cmp).unwrap().is_duplicate());
    }

    #[test]
    fn test_hint_must_be_a_sibling() {
        let cmp = CanonicalComparator::new();
        let mut tree = DataTree::new(schema());
        let top = tree.add(None, "top").unwrap();
        let a = tree.add_value(Some(top), "port", "1").unwrap();
        assert!(check_unique(&tree, a, Some(top), &cmp).is_err());
    }

    #[test]
    fn test_field_tuple_follows_schema_paths() {
        let mut tree = DataTree::new(schema());
        let top = tree.add(None, "top").unwrap();
        let a = server(&mut tree, top, Some("a"), "1");
        let addr = tree.add(Some(a), "address").unwrap();
        tree.add_value(Some(addr), "ip", "10.0.0.1").unwrap();

        let paths = vec!["address/ip".to_string(), "ex:host".to_string(), "nowhere".to_string()];
        let tuple = FieldTuple::collect(&tree, a, &paths).unwrap();
        assert_eq!(
            tuple.values(),
            &[Some("10.0.0.1".to_string()), Some("a".to_string()), None]
        );
        assert!(!tuple.is_complete());
    }

    #[test]
    fn test_unique_statement() {
        let cmp = CanonicalComparator::new();
        let mut tree = DataTree::new(schema());
        let top = tree.add(None, "top").unwrap();
        let a = server(&mut tree, top, Some("a"), "1");
        let addr = tree.add(Some(a), "address").unwrap();
        tree.add_value(Some(addr), "ip", "10.0.0.1").unwrap();
        let b = server(&mut tree, top, Some("b"), "1");
        let addr = tree.add(Some(b), "address").unwrap();
        tree.add_value(Some(addr), "ip", "10.0.0.1").unwrap();
        let c = server(&mut tree, top, Some("c"), "1");

        let run = tree.children(Some(top)).to_vec();
        let err = check_unique_statements(&tree, b, &run, &cmp, &|_| false)
            .unwrap()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::UniqueViolation);
        assert_eq!(err.constraint.as_deref(), Some("unique \"address/ip\""));

        // no address: exempt
        assert!(check_unique_statements(&tree, c, &run, &cmp, &|_| false)
            .unwrap()
            .is_none());
        // skipped candidates are ignored
        assert!(check_unique_statements(&tree, b, &run, &cmp, &|n| n == a)
            .unwrap()
            .is_none());
    }
}
