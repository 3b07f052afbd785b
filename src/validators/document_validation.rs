//! Data Tree Validation
//!
//! This module runs the validators over a whole data tree in the fixed
//! traversal order: a node's context is checked before its children are
//! visited, its children are validated before its own content, and siblings
//! are visited in document order. Rejected nodes are removed on the way.
//! Nodes whose `when` condition could not be decided are resolved afterwards
//! in repeated passes over the deferred queue.

use serde::Serialize;
use tracing::{debug, warn};

use crate::data_tree::{DataTree, NodeId};
use crate::error::Result;

use super::base::{ContentOutcome, ContextOutcome};
use super::content::{check_cardinality, check_content, check_resolved_content};
use super::context::check_context;
use super::exceptions::{ErrorKind, ValidationError};
use super::resolution::DeferredItem;
use super::validation::ValidationContext;

/// Summary of a validation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Reported violations, in the order they were found
    pub diagnostics: Vec<ValidationError>,
    /// Data nodes removed from the tree, subtrees included
    pub removed: usize,
    /// Nodes removed silently because another node superseded them
    pub superseded: usize,
    /// Nodes whose condition was deferred at least once
    pub deferred: usize,
    /// Deferred nodes whose condition was later decided
    pub resolved: usize,
    /// Deferred nodes whose condition never became decidable
    pub escalated: usize,
}

impl ValidationReport {
    /// Whether no violation was reported
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Diagnostics of one kind
    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &ValidationError> {
        self.diagnostics.iter().filter(move |e| e.kind == kind)
    }

    /// Turn the first diagnostic into an error
    pub fn into_result(self) -> Result<()> {
        match self.diagnostics.into_iter().next() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Render the report as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn merge(&mut self, other: ValidationReport) {
        self.diagnostics.extend(other.diagnostics);
        self.removed += other.removed;
        self.superseded += other.superseded;
        self.deferred += other.deferred;
        self.resolved += other.resolved;
        self.escalated += other.escalated;
    }
}

/// Validate a whole data tree
///
/// Invalid nodes are removed from the tree; every reported violation ends
/// up in the returned report. Misuse and exceeded limits are errors.
pub fn validate_tree(tree: &mut DataTree, ctx: &mut ValidationContext) -> Result<ValidationReport> {
    let before = tree.len();
    let mut report = ValidationReport::default();

    let roots = tree.roots().to_vec();
    for root in roots {
        validate_node(tree, root, ctx, &mut report)?;
    }

    report.merge(resolve_pending(tree, ctx)?);

    // counts are only final once every pending node is decided
    report_cardinality(tree, ctx, &mut report)?;

    report.removed = before - tree.len();
    debug!(
        diagnostics = report.diagnostics.len(),
        removed = report.removed,
        "data tree validated"
    );
    Ok(report)
}

/// Re-check the nodes in the deferred queue until their conditions settle
///
/// Each pass re-checks every pending node in queue order: an admissible node
/// leaves the queue and has its subtree validated against every settled
/// sibling, a rejected one is removed, and one that is still undecided stays
/// queued and out of its siblings' comparisons. Passes stop
/// when a pass decides nothing or the pass limit is reached; the nodes left
/// over are treated as if their condition were false.
pub fn resolve_deferred(tree: &mut DataTree, ctx: &mut ValidationContext) -> Result<ValidationReport> {
    let before = tree.len();
    let mut report = resolve_pending(tree, ctx)?;
    report.removed = before - tree.len();
    Ok(report)
}

fn resolve_pending(tree: &mut DataTree, ctx: &mut ValidationContext) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    let mut passes = 0;

    while !ctx.queue.is_empty() && ctx.limits.allows_resolution_pass(passes) {
        passes += 1;
        // items stay queued until decided, so undecided ones keep out of comparisons
        let items: Vec<DeferredItem> = ctx.queue.iter().collect();
        let mut decided = 0;

        for item in &items {
            if !tree.contains(item.node) {
                ctx.queue.remove(item.node);
                decided += 1;
                continue;
            }
            match check_context(tree, item.node, ctx)? {
                ContextOutcome::Admissible => {
                    ctx.queue.remove(item.node);
                    decided += 1;
                    report.resolved += 1;
                    finish_node(tree, item.node, ctx, &mut report, true)?;
                }
                ContextOutcome::Rejected(err) if err.kind == ErrorKind::ConditionPending => {}
                ContextOutcome::Rejected(err) => {
                    ctx.queue.remove(item.node);
                    decided += 1;
                    report.resolved += 1;
                    reject(tree, item.node, err, ctx, &mut report)?;
                }
            }
        }

        debug!(pass = passes, pending = items.len(), decided, "resolution pass finished");
        if decided == 0 {
            break;
        }
    }

    for item in ctx.queue.drain() {
        if !tree.contains(item.node) {
            continue;
        }
        warn!(node = %item.node, path = %tree.path(item.node), "condition never became decidable");
        report.escalated += 1;
        let err = ValidationError::new(
            ErrorKind::ConditionFalse,
            format!("when condition of '{}' could not be decided", tree.schema_node(item.node)?.local_name()),
        )
        .with_path(tree.path(item.node))
        .with_schema_node(tree.schema_node(item.node)?.name.qualified())
        .with_reason(format!("{} remained undecided", item.reason))
        .with_node(item.node);
        reject(tree, item.node, err, ctx, &mut report)?;
    }
    Ok(report)
}

fn validate_node(
    tree: &mut DataTree,
    node: NodeId,
    ctx: &mut ValidationContext,
    report: &mut ValidationReport,
) -> Result<()> {
    // pruned by an earlier sibling
    if !tree.contains(node) {
        return Ok(());
    }
    ctx.limits.check_tree_depth(tree.depth(node))?;

    match check_context(tree, node, ctx)? {
        ContextOutcome::Admissible => finish_node(tree, node, ctx, report, false),
        ContextOutcome::Rejected(err) if err.kind == ErrorKind::ConditionPending => {
            report.deferred += 1;
            Ok(())
        }
        ContextOutcome::Rejected(err) => reject(tree, node, err, ctx, report),
    }
}

// children first, then the node's own content; `resolved` nodes left the
// deferred queue after their siblings were validated
fn finish_node(
    tree: &mut DataTree,
    node: NodeId,
    ctx: &mut ValidationContext,
    report: &mut ValidationReport,
    resolved: bool,
) -> Result<()> {
    let children = tree.children(Some(node)).to_vec();
    for child in children {
        validate_node(tree, child, ctx, report)?;
    }

    let outcome = if resolved {
        check_resolved_content(tree, node, ctx)?
    } else {
        check_content(tree, node, ctx)?
    };
    match outcome {
        ContentOutcome::Success => Ok(()),
        ContentOutcome::Failed(err) => reject(tree, node, err, ctx, report),
        ContentOutcome::Superseded => {
            debug!(node = %node, path = %tree.path(node), "removing superseded node");
            tree.remove(node)?;
            report.superseded += 1;
            Ok(())
        }
    }
}

fn reject(
    tree: &mut DataTree,
    node: NodeId,
    err: ValidationError,
    ctx: &ValidationContext,
    report: &mut ValidationReport,
) -> Result<()> {
    let silent = err.kind == ErrorKind::ConditionFalse && ctx.options.when_autodelete;
    debug!(node = %node, path = %tree.path(node), kind = %err.kind, silent, "removing rejected node");
    tree.remove(node)?;
    if !silent {
        report.diagnostics.push(err);
    }
    Ok(())
}

// top level first, then every node in document order
fn report_cardinality(
    tree: &DataTree,
    ctx: &ValidationContext,
    report: &mut ValidationReport,
) -> Result<()> {
    report.diagnostics.extend(check_cardinality(tree, None, ctx)?);
    let mut stack: Vec<NodeId> = tree.roots().iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        report.diagnostics.extend(check_cardinality(tree, Some(node), ctx)?);
        stack.extend(tree.children(Some(node)).iter().rev().copied());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(kind: ErrorKind) -> ValidationError {
        ValidationError::new(kind, kind.as_str())
    }

    #[test]
    fn test_report_merge() {
        let mut report = ValidationReport {
            diagnostics: vec![error(ErrorKind::MissingKey)],
            removed: 1,
            ..Default::default()
        };
        report.merge(ValidationReport {
            diagnostics: vec![error(ErrorKind::ConditionFalse)],
            deferred: 2,
            resolved: 1,
            escalated: 1,
            ..Default::default()
        });

        assert_eq!(report.diagnostics.len(), 2);
        assert_eq!(report.removed, 1);
        assert_eq!(report.deferred, 2);
        assert_eq!(report.errors_of(ErrorKind::ConditionFalse).count(), 1);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_empty_report() {
        let report = ValidationReport::default();
        assert!(report.is_valid());
        assert!(report.to_json().unwrap().contains("\"diagnostics\": []"));
        assert!(report.into_result().is_ok());
    }
}
