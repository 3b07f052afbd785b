//! Content validation
//!
//! Checks a linked data node whose children are settled against the rest of
//! its sibling set. The node is compared with the siblings that precede it,
//! which is the state a tree builder sees when it validates nodes as it
//! links them: the later of two duplicates is the duplicate, and data of a
//! newer case replaces data of an older one.
//!
//! Implicit default nodes never win: a default instance that duplicates or
//! conflicts with explicit data is superseded, and explicit data removes the
//! defaults of other cases regardless of the case policy. Siblings whose
//! `when` condition is still pending take no part in any comparison.
//!
//! Mandatory nodes and element counts are a property of a parent's whole
//! child set; [`check_cardinality`] reports them without removing anything.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::data_tree::{DataTree, NodeId};
use crate::error::{Error, Result};

use super::base::{CaseOutcome, ContentOutcome, UniqueOutcome};
use super::exceptions::{ErrorKind, ValidationError};
use super::groups::{find_case_conflicts, resolve_case_filtered, CaseSubject};
use super::identities::{check_unique_statements, find_duplicate};
use super::schemas::{Schema, SchemaId, SchemaKind, SchemaNode};
use super::validation::{DataKind, ValidationContext};

/// Validate the content of `node` in its sibling set
///
/// May remove siblings that lose a case conflict. Returns
/// [`ContentOutcome::Superseded`] when `node` itself lost to another node.
pub fn check_content(
    tree: &mut DataTree,
    node: NodeId,
    ctx: &ValidationContext,
) -> Result<ContentOutcome> {
    content(tree, node, ctx, false)
}

/// Validate the content of a node whose `when` condition was decided after
/// its siblings had been validated
///
/// The node is treated as the newest sibling and compared with every
/// settled sibling on either side of it. Defaults it duplicates are removed.
pub fn check_resolved_content(
    tree: &mut DataTree,
    node: NodeId,
    ctx: &ValidationContext,
) -> Result<ContentOutcome> {
    content(tree, node, ctx, true)
}

fn content(
    tree: &mut DataTree,
    node: NodeId,
    ctx: &ValidationContext,
    resolved: bool,
) -> Result<ContentOutcome> {
    let data = tree.get(node)?;
    let schema_id = data.schema;
    let is_default = data.is_default();
    let schema = Arc::clone(tree.schema());
    let snode = schema.node(schema_id);

    if resolved && !is_default {
        let others: Vec<NodeId> = tree.siblings(node)?.iter().copied().filter(|s| *s != node).collect();
        supersede_defaults(tree, node, snode, &others, ctx)?;
    }

    let siblings = tree.siblings(node)?.to_vec();
    let position = siblings.iter().position(|s| *s == node).unwrap_or(0);
    let others: Vec<NodeId> = siblings.iter().copied().filter(|s| *s != node).collect();
    // linked nodes meet the nodes before them, late nodes meet every settled one
    let settled: &[NodeId] = if resolved { &others } else { &siblings[..position] };
    let following: &[NodeId] = if resolved { &[] } else { &siblings[position + 1..] };
    let candidates = if is_default { &others[..] } else { settled };

    let outcome = match &snode.kind {
        SchemaKind::List { keys, .. } => {
            if let Some(key) = keys.iter().find(|k| tree.find_child(Some(node), k).is_none()) {
                return Ok(ContentOutcome::Failed(
                    ValidationError::new(
                        ErrorKind::MissingKey,
                        format!("list '{}' is missing key '{}'", snode.local_name(), key),
                    )
                    .with_path(tree.path(node))
                    .with_schema_node(snode.name.qualified())
                    .with_constraint(format!("key \"{}\"", keys.join(" ")))
                    .with_node(node),
                ));
            }
            match duplicate(tree, node, candidates, is_default, ctx)? {
                Some(outcome) => Some(outcome),
                None => {
                    let skip = |n: NodeId| ctx.is_pending(n);
                    check_unique_statements(tree, node, settled, ctx.comparator(), &skip)?
                        .map(ContentOutcome::Failed)
                }
            }
        }
        SchemaKind::LeafList { .. } => {
            if snode.is_read_only() {
                None
            } else {
                duplicate(tree, node, candidates, is_default, ctx)?
            }
        }
        SchemaKind::Container { .. }
        | SchemaKind::Leaf { .. }
        | SchemaKind::AnyData
        | SchemaKind::AnyXml
        | SchemaKind::Rpc
        | SchemaKind::Notification => single_instance(tree, node, snode, candidates, is_default, ctx)?,
        SchemaKind::Choice { .. } | SchemaKind::Case | SchemaKind::RpcInput | SchemaKind::RpcOutput => {
            return Err(Error::Position(format!(
                "{} '{}' has no data instances",
                snode.kind.keyword(),
                snode.local_name()
            )));
        }
    };
    if let Some(outcome) = outcome {
        return Ok(outcome);
    }

    if schema.case_path(schema_id).is_empty() {
        return Ok(ContentOutcome::Success);
    }
    resolve_cases(tree, node, following, is_default, ctx)
}

// a late explicit node replaces the defaults it duplicates
fn supersede_defaults(
    tree: &mut DataTree,
    node: NodeId,
    snode: &SchemaNode,
    others: &[NodeId],
    ctx: &ValidationContext,
) -> Result<()> {
    let value = tree.value(node).map(str::to_string);
    let stale: Vec<NodeId> = others
        .iter()
        .copied()
        .filter(|other| {
            let Ok(data) = tree.get(*other) else {
                return false;
            };
            if !data.is_default() || data.schema != snode.id {
                return false;
            }
            match (&snode.kind, snode.kind.leaf_type()) {
                (SchemaKind::List { .. }, _) => false,
                (SchemaKind::LeafList { .. }, Some(ty)) => match (value.as_deref(), data.value()) {
                    (Some(a), Some(b)) => ctx.comparator().equal(a, b, ty),
                    _ => false,
                },
                _ => true,
            }
        })
        .collect();
    for default in stale {
        debug!(node = %default, by = %node, "default superseded by late node");
        tree.remove(default)?;
    }
    Ok(())
}

fn duplicate(
    tree: &DataTree,
    node: NodeId,
    candidates: &[NodeId],
    is_default: bool,
    ctx: &ValidationContext,
) -> Result<Option<ContentOutcome>> {
    let skip = |n: NodeId| ctx.is_pending(n) || tree.get(n).map_or(true, |d| d.is_default());
    match find_duplicate(tree, node, candidates, ctx.comparator(), &skip)? {
        UniqueOutcome::NoConflict => Ok(None),
        UniqueOutcome::Duplicate { other, .. } if is_default => {
            debug!(node = %node, other = %other, "default instance superseded by explicit value");
            Ok(Some(ContentOutcome::Superseded))
        }
        UniqueOutcome::Duplicate { error, .. } => Ok(Some(ContentOutcome::Failed(error))),
    }
}

fn single_instance(
    tree: &DataTree,
    node: NodeId,
    snode: &SchemaNode,
    candidates: &[NodeId],
    is_default: bool,
    ctx: &ValidationContext,
) -> Result<Option<ContentOutcome>> {
    let other = candidates.iter().copied().find(|c| {
        *c != node
            && !ctx.is_pending(*c)
            && tree
                .get(*c)
                .map_or(false, |d| d.schema == snode.id && !d.is_default())
    });
    Ok(match other {
        None => None,
        Some(other) if is_default => {
            debug!(node = %node, other = %other, "default node superseded by explicit node");
            Some(ContentOutcome::Superseded)
        }
        Some(_) => Some(ContentOutcome::Failed(
            ValidationError::new(
                ErrorKind::DuplicateInstance,
                format!("duplicate instance of {} '{}'", snode.kind.keyword(), snode.local_name()),
            )
            .with_path(tree.path(node))
            .with_schema_node(snode.name.qualified())
            .with_node(node),
        )),
    })
}

fn resolve_cases(
    tree: &mut DataTree,
    node: NodeId,
    following: &[NodeId],
    is_default: bool,
    ctx: &ValidationContext,
) -> Result<ContentOutcome> {
    let later: HashSet<NodeId> = following.iter().copied().collect();
    let conflicts = find_case_conflicts(tree, CaseSubject::Node(node), None, &|n| ctx.is_pending(n))?;
    if conflicts.is_empty() {
        return Ok(ContentOutcome::Success);
    }

    let (defaults, explicit): (Vec<NodeId>, Vec<NodeId>) = conflicts
        .into_iter()
        .partition(|n| tree.get(*n).map_or(false, |d| d.is_default()));

    if is_default {
        if explicit.is_empty() {
            return Ok(ContentOutcome::Success);
        }
        debug!(node = %node, "default node superseded by data of another case");
        return Ok(ContentOutcome::Superseded);
    }

    for default in defaults.into_iter().filter(|n| !later.contains(n)) {
        debug!(node = %default, path = %tree.path(default), "removing default of another case");
        tree.remove(default)?;
    }

    if explicit.iter().all(|n| later.contains(n)) {
        return Ok(ContentOutcome::Success);
    }
    let skip = |n: NodeId| ctx.is_pending(n) || later.contains(&n);
    match resolve_case_filtered(
        tree,
        CaseSubject::Node(node),
        None,
        ctx.options.autodelete_cases(),
        None,
        &skip,
    )? {
        CaseOutcome::NoConflict { .. } => Ok(ContentOutcome::Success),
        CaseOutcome::Conflict(err) => Ok(ContentOutcome::Failed(err)),
    }
}

/// Check mandatory nodes and element counts among the children of `parent`
/// (the top level for `None`)
///
/// Skipped for partial data (edit content, get and get-config replies);
/// the top level is only checked for complete data and configuration.
/// Nodes guarded by a `when` condition or a disabled feature are exempt.
pub fn check_cardinality(
    tree: &DataTree,
    parent: Option<NodeId>,
    ctx: &ValidationContext,
) -> Result<Vec<ValidationError>> {
    let mut errors = Vec::new();
    if !ctx.options.checks_cardinality() {
        return Ok(errors);
    }
    let parent_schema = match parent {
        Some(pid) => Some(tree.get(pid)?.schema),
        None => {
            if !matches!(ctx.options.data_kind, DataKind::Data | DataKind::Config) {
                return Ok(errors);
            }
            None
        }
    };

    let scope = Scope { tree, parent, ctx };
    let schema = tree.schema();
    scope.walk(schema, schema.children(parent_schema), &mut errors);
    Ok(errors)
}

struct Scope<'a> {
    tree: &'a DataTree,
    parent: Option<NodeId>,
    ctx: &'a ValidationContext,
}

impl Scope<'_> {
    fn count(&self, schema_id: SchemaId) -> usize {
        self.tree
            .children(self.parent)
            .iter()
            .filter(|c| self.tree.get(**c).map_or(false, |d| d.schema == schema_id))
            .count()
    }

    fn enabled(&self, node: &SchemaNode) -> bool {
        node.if_features.iter().all(|e| e.evaluate(&self.ctx.features))
    }

    fn walk(&self, schema: &Schema, children: &[SchemaId], errors: &mut Vec<ValidationError>) {
        for &sid in children {
            let node = schema.node(sid);
            if !self.enabled(node) {
                continue;
            }
            match &node.kind {
                SchemaKind::Leaf { mandatory: true, .. } if node.when.is_none() => {
                    if self.count(sid) == 0 {
                        errors.push(self.error(
                            node,
                            ErrorKind::MissingElement,
                            format!("missing mandatory leaf '{}'", node.local_name()),
                            "mandatory true".to_string(),
                        ));
                    }
                }
                SchemaKind::List {
                    min_elements,
                    max_elements,
                    ..
                }
                | SchemaKind::LeafList {
                    min_elements,
                    max_elements,
                    ..
                } => {
                    let count = self.count(sid);
                    if count < *min_elements as usize && node.when.is_none() {
                        errors.push(self.error(
                            node,
                            ErrorKind::TooFewElements,
                            format!(
                                "too few '{}' instances ({} of at least {})",
                                node.local_name(),
                                count,
                                min_elements
                            ),
                            format!("min-elements {}", min_elements),
                        ));
                    }
                    if let Some(max) = max_elements.filter(|m| count > *m as usize) {
                        errors.push(self.error(
                            node,
                            ErrorKind::TooManyElements,
                            format!(
                                "too many '{}' instances ({} of at most {})",
                                node.local_name(),
                                count,
                                max
                            ),
                            format!("max-elements {}", max),
                        ));
                    }
                }
                SchemaKind::Choice { mandatory, .. } => {
                    let selected = node.children.iter().copied().find(|case| {
                        schema
                            .data_children(Some(*case))
                            .into_iter()
                            .any(|d| self.count(d) > 0)
                    });
                    match selected {
                        Some(case) => {
                            if self.enabled(schema.node(case)) {
                                self.walk(schema, &schema.node(case).children, errors);
                            }
                        }
                        None if *mandatory && node.when.is_none() => {
                            errors.push(self.error(
                                node,
                                ErrorKind::MissingElement,
                                format!("missing mandatory choice '{}'", node.local_name()),
                                "mandatory true".to_string(),
                            ));
                        }
                        None => {}
                    }
                }
                SchemaKind::RpcInput if self.ctx.options.data_kind == DataKind::RpcRequest => {
                    self.walk(schema, &node.children, errors);
                }
                SchemaKind::RpcOutput if self.ctx.options.data_kind == DataKind::RpcReply => {
                    self.walk(schema, &node.children, errors);
                }
                _ => {}
            }
        }
    }

    fn error(&self, node: &SchemaNode, kind: ErrorKind, message: String, constraint: String) -> ValidationError {
        let path = match self.parent {
            Some(pid) => format!("{}/{}", self.tree.path(pid), node.local_name()),
            None => format!("/{}", node.name.qualified()),
        };
        let err = ValidationError::new(kind, message)
            .with_path(path)
            .with_schema_node(node.name.qualified())
            .with_constraint(constraint);
        match self.parent {
            Some(pid) => err.with_node(pid),
            None => err,
        }
    }
}
