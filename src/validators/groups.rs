//! Choice and case resolution
//!
//! A choice partitions its data children into cases, and at most one case
//! may be represented among the children of one data node. This module
//! finds siblings that belong to another case of a choice the checked node
//! (or a schema position where a node is about to be created) belongs to,
//! and either reports them or removes them.
//!
//! Conflicting siblings are collected over a snapshot of the sibling run
//! first and removed afterwards, so removal never disturbs the scan.

use tracing::debug;

use crate::data_tree::{DataTree, NodeId};
use crate::error::{Error, Result};

use super::base::CaseOutcome;
use super::exceptions::{ErrorKind, ValidationError};
use super::schemas::{Schema, SchemaId};

/// What case membership is checked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSubject {
    /// An existing data node
    Node(NodeId),
    /// A schema position where no node exists yet
    Schema(SchemaId),
}

impl From<NodeId> for CaseSubject {
    fn from(node: NodeId) -> Self {
        CaseSubject::Node(node)
    }
}

impl From<SchemaId> for CaseSubject {
    fn from(schema: SchemaId) -> Self {
        CaseSubject::Schema(schema)
    }
}

/// Resolve conflicts between the subject's case and the other cases of its
/// choices
///
/// `first_sibling` is where the sibling scan starts; without it the run is
/// located from the subject node, or for a schema subject at the top level
/// from the tree roots. With `autodelete` the conflicting nodes are removed,
/// unless `protect` is one of them, in which case nothing is removed and
/// the conflict is reported.
pub fn resolve_case(
    tree: &mut DataTree,
    subject: CaseSubject,
    first_sibling: Option<NodeId>,
    autodelete: bool,
    protect: Option<NodeId>,
) -> Result<CaseOutcome> {
    resolve_case_filtered(tree, subject, first_sibling, autodelete, protect, &|_| false)
}

/// [`resolve_case`] ignoring the siblings for which `skip` holds
pub(crate) fn resolve_case_filtered(
    tree: &mut DataTree,
    subject: CaseSubject,
    first_sibling: Option<NodeId>,
    autodelete: bool,
    protect: Option<NodeId>,
    skip: &dyn Fn(NodeId) -> bool,
) -> Result<CaseOutcome> {
    let conflicts = find_case_conflicts(tree, subject, first_sibling, skip)?;
    let Some(&first_conflict) = conflicts.first() else {
        return Ok(CaseOutcome::NoConflict { pruned: Vec::new() });
    };

    let protected = protect.filter(|p| conflicts.contains(p));
    if !autodelete || protected.is_some() {
        let reported = protected.unwrap_or(first_conflict);
        return Ok(CaseOutcome::Conflict(conflict_error(tree, subject, reported)?));
    }

    for node in &conflicts {
        debug!(node = %node, path = %tree.path(*node), "removing data of another case");
        tree.remove(*node)?;
    }
    Ok(CaseOutcome::NoConflict { pruned: conflicts })
}

/// Siblings of the subject that belong to another case of one of its
/// choices, in document order
pub fn find_case_conflicts(
    tree: &DataTree,
    subject: CaseSubject,
    first_sibling: Option<NodeId>,
    skip: &dyn Fn(NodeId) -> bool,
) -> Result<Vec<NodeId>> {
    let schema = tree.schema();
    let (schema_id, own) = match subject {
        CaseSubject::Node(node) => (tree.get(node)?.schema, Some(node)),
        CaseSubject::Schema(id) => {
            schema
                .get(id)
                .ok_or_else(|| Error::Position(format!("unknown schema node {}", id)))?;
            (id, None)
        }
    };

    let cases = schema.case_path(schema_id);
    if cases.is_empty() {
        return Ok(Vec::new());
    }

    let run = sibling_run(tree, schema_id, own, first_sibling)?;
    let mut conflicts = Vec::new();
    for sibling in run {
        if Some(sibling) == own || !tree.contains(sibling) || skip(sibling) {
            continue;
        }
        let sibling_schema = tree.get(sibling)?.schema;
        if in_other_case(schema, &cases, sibling_schema) {
            conflicts.push(sibling);
        }
    }
    Ok(conflicts)
}

fn in_other_case(schema: &Schema, cases: &[(SchemaId, SchemaId)], other: SchemaId) -> bool {
    let other_cases = schema.case_path(other);
    cases.iter().any(|(choice, case)| {
        other_cases
            .iter()
            .any(|(other_choice, other_case)| other_choice == choice && other_case != case)
    })
}

// Snapshot of the sibling run to scan
fn sibling_run(
    tree: &DataTree,
    schema_id: SchemaId,
    own: Option<NodeId>,
    first_sibling: Option<NodeId>,
) -> Result<Vec<NodeId>> {
    match (first_sibling, own) {
        (Some(first), Some(node)) => {
            if !tree.are_siblings(first, node)? {
                return Err(Error::Position(format!(
                    "{} is not a sibling of {}",
                    tree.path(first),
                    tree.path(node)
                )));
            }
            Ok(tree.siblings_from(first)?.to_vec())
        }
        (Some(first), None) => {
            let parent_schema = tree.get(first)?.parent().map(|p| tree.get(p).map(|n| n.schema));
            let parent_schema = parent_schema.transpose()?;
            if tree.schema().data_parent(schema_id) != parent_schema {
                return Err(Error::Position(format!(
                    "'{}' cannot appear next to {}",
                    tree.schema().node(schema_id).local_name(),
                    tree.path(first)
                )));
            }
            Ok(tree.siblings_from(first)?.to_vec())
        }
        (None, Some(node)) => Ok(tree.siblings(node)?.to_vec()),
        (None, None) => {
            if tree.schema().data_parent(schema_id).is_some() {
                return Err(Error::Position(format!(
                    "a first sibling is needed to place '{}'",
                    tree.schema().node(schema_id).local_name()
                )));
            }
            Ok(tree.roots().to_vec())
        }
    }
}

fn conflict_error(tree: &DataTree, subject: CaseSubject, other: NodeId) -> Result<ValidationError> {
    let schema = tree.schema();
    let schema_id = match subject {
        CaseSubject::Node(node) => tree.get(node)?.schema,
        CaseSubject::Schema(id) => id,
    };
    let other_schema = tree.get(other)?.schema;

    // the outermost choice where the two diverge names the constraint
    let own_cases = schema.case_path(schema_id);
    let other_cases = schema.case_path(other_schema);
    let diverging = own_cases.iter().rev().find_map(|(choice, case)| {
        other_cases
            .iter()
            .find(|(c, k)| c == choice && k != case)
            .map(|(_, other_case)| (*choice, *case, *other_case))
    });

    let name = schema.node(schema_id).local_name();
    let mut err = ValidationError::new(
        ErrorKind::CaseConflict,
        format!(
            "'{}' conflicts with existing '{}'",
            name,
            schema.node(other_schema).local_name()
        ),
    )
    .with_schema_node(schema.node(schema_id).name.qualified());

    if let Some((choice, case, other_case)) = diverging {
        err = err
            .with_constraint(format!("choice '{}'", schema.node(choice).local_name()))
            .with_reason(format!(
                "case '{}' and case '{}' are mutually exclusive",
                schema.node(case).local_name(),
                schema.node(other_case).local_name()
            ));
    }

    err = match subject {
        CaseSubject::Node(node) => err.with_path(tree.path(node)).with_node(node),
        CaseSubject::Schema(_) => {
            let parent = tree.get(other)?.parent();
            let base = parent.map(|p| tree.path(p)).unwrap_or_default();
            err.with_path(format!("{}/{}", base, name))
        }
    };
    Ok(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::Module;
    use crate::validators::builders::SchemaBuilder;
    use crate::validators::simple_types::LeafType;
    use std::sync::Arc;

    struct Fixture {
        schema: Arc<Schema>,
        udp_port: SchemaId,
    }

    fn fixture() -> Fixture {
        let mut b = SchemaBuilder::new(Module::new("ex", "urn:example", "ex"));
        let top = b.container(None, "top").unwrap();
        let choice = b.choice(Some(top), "transport").unwrap();
        let tcp = b.case(choice, "tcp").unwrap();
        b.leaf(Some(tcp), "tcp-port", LeafType::Uint16).unwrap();
        b.leaf(Some(tcp), "nodelay", LeafType::Empty).unwrap();
        let udp = b.case(choice, "udp").unwrap();
        let udp_port = b.leaf(Some(udp), "udp-port", LeafType::Uint16).unwrap();
        b.leaf(Some(top), "name", LeafType::String).unwrap();
        Fixture {
            schema: b.build().unwrap(),
            udp_port,
        }
    }

    #[test]
    fn test_no_conflict_within_one_case() {
        let f = fixture();
        let mut tree = DataTree::new(f.schema);
        let top = tree.add(None, "top").unwrap();
        tree.add_value(Some(top), "tcp-port", "80").unwrap();
        let nodelay = tree.add(Some(top), "nodelay").unwrap();
        tree.add_value(Some(top), "name", "x").unwrap();

        let outcome = resolve_case(&mut tree, nodelay.into(), None, true, None).unwrap();
        assert_eq!(outcome, CaseOutcome::NoConflict { pruned: vec![] });
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_autodelete_prunes_other_case() {
        let f = fixture();
        let mut tree = DataTree::new(f.schema);
        let top = tree.add(None, "top").unwrap();
        let port = tree.add_value(Some(top), "tcp-port", "80").unwrap();
        let nodelay = tree.add(Some(top), "nodelay").unwrap();
        let udp = tree.add_value(Some(top), "udp-port", "53").unwrap();

        let outcome = resolve_case(&mut tree, udp.into(), None, true, None).unwrap();
        assert_eq!(outcome.pruned(), &[port, nodelay]);
        assert_eq!(tree.children(Some(top)), &[udp]);
    }

    #[test]
    fn test_report_leaves_tree_untouched() {
        let f = fixture();
        let mut tree = DataTree::new(f.schema);
        let top = tree.add(None, "top").unwrap();
        tree.add_value(Some(top), "tcp-port", "80").unwrap();
        let udp = tree.add_value(Some(top), "udp-port", "53").unwrap();

        let outcome = resolve_case(&mut tree, udp.into(), None, false, None).unwrap();
        let CaseOutcome::Conflict(err) = outcome else {
            panic!("expected a conflict");
        };
        assert_eq!(err.kind, ErrorKind::CaseConflict);
        assert_eq!(err.constraint.as_deref(), Some("choice 'transport'"));
        assert_eq!(err.node, Some(udp));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_protected_node_is_kept() {
        let f = fixture();
        let mut tree = DataTree::new(f.schema);
        let top = tree.add(None, "top").unwrap();
        let port = tree.add_value(Some(top), "tcp-port", "80").unwrap();
        let udp = tree.add_value(Some(top), "udp-port", "53").unwrap();

        let outcome = resolve_case(&mut tree, udp.into(), None, true, Some(port)).unwrap();
        assert!(outcome.is_conflict());
        assert!(tree.contains(port));
        assert!(tree.contains(udp));
    }

    #[test]
    fn test_schema_subject_needs_position() {
        let f = fixture();
        let mut tree = DataTree::new(f.schema);
        let top = tree.add(None, "top").unwrap();
        let port = tree.add_value(Some(top), "tcp-port", "80").unwrap();

        assert!(resolve_case(&mut tree, f.udp_port.into(), None, true, None).is_err());

        let outcome = resolve_case(&mut tree, f.udp_port.into(), Some(port), false, None).unwrap();
        let CaseOutcome::Conflict(err) = outcome else {
            panic!("expected a conflict");
        };
        assert_eq!(err.path.as_deref(), Some("/ex:top/udp-port"));

        let outcome = resolve_case(&mut tree, f.udp_port.into(), Some(port), true, None).unwrap();
        assert_eq!(outcome.pruned(), &[port]);
    }

    #[test]
    fn test_first_sibling_must_share_parent() {
        let f = fixture();
        let mut tree = DataTree::new(f.schema);
        let top = tree.add(None, "top").unwrap();
        let udp = tree.add_value(Some(top), "udp-port", "53").unwrap();
        assert!(resolve_case(&mut tree, udp.into(), Some(top), true, None).is_err());
    }
}
