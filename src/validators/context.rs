//! Context validation
//!
//! Decides whether a data node may exist at its position at all. The checks
//! run in a fixed order and the first rejection wins:
//! 1. if-feature gating of the node and its choice/case ancestors
//! 2. `when` conditions of the node and its choice/case ancestors
//! 3. access mode (state data in configuration or edit content)
//! 4. positional order inside rpc input and output
//!
//! An undecidable `when` condition parks the node in the deferred queue of
//! the [`ValidationContext`] and rejects it as pending. The tree is never
//! modified here.

use tracing::{debug, trace};

use crate::data_tree::{DataTree, NodeId};
use crate::error::Result;

use super::base::{ConditionResult, ContextOutcome};
use super::exceptions::{ErrorKind, ValidationError};
use super::resolution::DeferReason;
use super::schemas::{SchemaId, SchemaNode};
use super::validation::ValidationContext;

/// Check whether `node` is admissible at its position
pub fn check_context(
    tree: &DataTree,
    node: NodeId,
    ctx: &mut ValidationContext,
) -> Result<ContextOutcome> {
    let schema_id = tree.get(node)?.schema;
    let schema = tree.schema();
    let snode = schema.node(schema_id);
    let ancestors = schema.schema_only_ancestors(schema_id);

    // 1. features
    for sid in std::iter::once(schema_id).chain(ancestors.iter().copied()) {
        let gated = schema.node(sid);
        if let Some(expr) = gated.if_features.iter().find(|e| !e.evaluate(&ctx.features)) {
            trace!(node = %node, feature = %expr, "disabled by if-feature");
            return Ok(reject(
                tree,
                node,
                snode,
                ErrorKind::Disabled,
                format!("'{}' is disabled by if-feature", snode.local_name()),
                format!("if-feature \"{}\"", expr),
            ));
        }
    }

    // 2. when, outermost condition first
    let parent = tree.get(node)?.parent();
    let conditions = ancestors
        .iter()
        .rev()
        .map(|sid| (*sid, parent))
        .chain(std::iter::once((schema_id, Some(node))));
    let mut pending: Option<(SchemaId, DeferReason)> = None;
    for (sid, context_node) in conditions {
        let Some(condition) = schema.node(sid).when.as_ref() else {
            continue;
        };
        match ctx.evaluator().evaluate(condition, tree, context_node) {
            ConditionResult::True => {}
            ConditionResult::False => {
                ctx.queue.remove(node);
                return Ok(reject(
                    tree,
                    node,
                    snode,
                    ErrorKind::ConditionFalse,
                    format!("when condition of '{}' is false", schema.node(sid).local_name()),
                    condition.to_string(),
                ));
            }
            ConditionResult::Indeterminate => {
                if pending.is_none() {
                    let reason = if sid == schema_id {
                        DeferReason::When
                    } else {
                        DeferReason::CaseWhen(sid)
                    };
                    pending = Some((sid, reason));
                }
            }
        }
    }
    if let Some((sid, reason)) = pending {
        if !ctx.queue.contains(node) {
            ctx.limits.check_deferred_items(ctx.queue.len())?;
            ctx.queue.push(node, reason);
            debug!(node = %node, path = %tree.path(node), %reason, "deferring undecided when condition");
        } else {
            trace!(node = %node, "already pending");
        }
        let condition = schema.node(sid).when.as_ref().map(ToString::to_string).unwrap_or_default();
        return Ok(reject(
            tree,
            node,
            snode,
            ErrorKind::ConditionPending,
            format!("when condition of '{}' cannot be decided yet", schema.node(sid).local_name()),
            condition,
        ));
    }
    ctx.queue.remove(node);

    // 3. access mode
    if snode.is_read_only() && ctx.options.data_kind.forbids_state() {
        return Ok(reject(
            tree,
            node,
            snode,
            ErrorKind::AccessViolation,
            format!("state data '{}' is not allowed here", snode.local_name()),
            "config false".to_string(),
        ));
    }

    // 4. order inside rpc input/output
    let io = schema.operation_io(schema_id).filter(|_| ctx.options.checks_order());
    if let Some(io) = io {
        let siblings = tree.siblings(node)?;
        let position = siblings.iter().position(|s| *s == node).unwrap_or(0);
        let later = siblings[..position]
            .iter()
            .filter_map(|s| tree.schema_node(*s).ok())
            .find(|s| s.order > snode.order);
        if let Some(later) = later {
            return Ok(reject(
                tree,
                node,
                snode,
                ErrorKind::OrderViolation,
                format!(
                    "'{}' must precede '{}'",
                    snode.local_name(),
                    later.local_name()
                ),
                format!("{} order", schema.node(io).local_name()),
            ));
        }
    }

    Ok(ContextOutcome::Admissible)
}

fn reject(
    tree: &DataTree,
    node: NodeId,
    snode: &SchemaNode,
    kind: ErrorKind,
    message: String,
    constraint: String,
) -> ContextOutcome {
    ContextOutcome::Rejected(
        ValidationError::new(kind, message)
            .with_path(tree.path(node))
            .with_schema_node(snode.name.qualified())
            .with_constraint(constraint)
            .with_node(node),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::Module;
    use crate::validators::builders::SchemaBuilder;
    use crate::validators::features::FeatureSet;
    use crate::validators::schemas::{Schema, WhenCondition};
    use crate::validators::simple_types::LeafType;
    use crate::validators::validation::ValidationOptions;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        let mut b = SchemaBuilder::new(Module::new("ex", "urn:example", "ex"));
        let top = b.container(None, "top").unwrap();
        let fast = b.leaf(Some(top), "fast", LeafType::Boolean).unwrap();
        b.if_feature(fast, "turbo").unwrap();
        let gated = b.leaf(Some(top), "gated", LeafType::String).unwrap();
        b.when(gated, "../fast = 'true'").unwrap();
        let stats = b.container(Some(top), "stats").unwrap();
        b.read_only(stats).unwrap();
        let choice = b.choice(Some(top), "mode").unwrap();
        let case = b.case(choice, "auto").unwrap();
        b.when(case, "../fast").unwrap();
        b.leaf(Some(case), "interval", LeafType::Uint32).unwrap();
        b.build().unwrap()
    }

    fn evaluator(result: ConditionResult) -> impl Fn(&WhenCondition, &DataTree, Option<NodeId>) -> ConditionResult {
        move |_: &WhenCondition, _: &DataTree, _: Option<NodeId>| result
    }

    #[test]
    fn test_feature_gating() {
        let mut tree = DataTree::new(schema());
        let top = tree.add(None, "top").unwrap();
        let fast = tree.add_value(Some(top), "fast", "true").unwrap();

        let mut ctx = ValidationContext::default();
        let outcome = check_context(&tree, fast, &mut ctx).unwrap();
        assert_eq!(outcome.kind(), Some(ErrorKind::Disabled));

        let mut ctx = ValidationContext::default().with_features(FeatureSet::with_features(["turbo"]));
        assert!(check_context(&tree, fast, &mut ctx).unwrap().is_admissible());
    }

    #[test]
    fn test_when_false_and_pending() {
        let mut tree = DataTree::new(schema());
        let top = tree.add(None, "top").unwrap();
        let gated = tree.add_value(Some(top), "gated", "x").unwrap();

        let mut ctx = ValidationContext::default().with_evaluator(evaluator(ConditionResult::False));
        let outcome = check_context(&tree, gated, &mut ctx).unwrap();
        assert_eq!(outcome.kind(), Some(ErrorKind::ConditionFalse));
        assert!(ctx.queue.is_empty());

        let mut ctx = ValidationContext::default().with_evaluator(evaluator(ConditionResult::Indeterminate));
        assert!(check_context(&tree, gated, &mut ctx).unwrap().is_deferred());
        assert!(check_context(&tree, gated, &mut ctx).unwrap().is_deferred());
        assert_eq!(ctx.queue.len(), 1);
    }

    #[test]
    fn test_case_when_uses_parent_context() {
        let mut tree = DataTree::new(schema());
        let top = tree.add(None, "top").unwrap();
        let interval = tree.add_value(Some(top), "interval", "5").unwrap();

        let mut ctx = ValidationContext::default().with_evaluator(
            move |c: &WhenCondition, _: &DataTree, context: Option<NodeId>| {
                assert_eq!(c.expression, "../fast");
                ConditionResult::from(context == Some(top))
            },
        );
        assert!(check_context(&tree, interval, &mut ctx).unwrap().is_admissible());
    }

    #[test]
    fn test_pending_case_when_reason() {
        let mut tree = DataTree::new(schema());
        let top = tree.add(None, "top").unwrap();
        let interval = tree.add_value(Some(top), "interval", "5").unwrap();

        let mut ctx = ValidationContext::default().with_evaluator(evaluator(ConditionResult::Indeterminate));
        assert!(check_context(&tree, interval, &mut ctx).unwrap().is_deferred());
        let item = ctx.queue.iter().next().unwrap();
        assert!(matches!(item.reason, DeferReason::CaseWhen(_)));
    }

    #[test]
    fn test_access_mode() {
        let mut tree = DataTree::new(schema());
        let top = tree.add(None, "top").unwrap();
        let stats = tree.add(Some(top), "stats").unwrap();

        let mut ctx = ValidationContext::new(ValidationOptions::edit());
        let outcome = check_context(&tree, stats, &mut ctx).unwrap();
        assert_eq!(outcome.kind(), Some(ErrorKind::AccessViolation));

        let mut ctx = ValidationContext::default();
        assert!(check_context(&tree, stats, &mut ctx).unwrap().is_admissible());
    }

    #[test]
    fn test_resolved_condition_leaves_queue() {
        let mut tree = DataTree::new(schema());
        let top = tree.add(None, "top").unwrap();
        let gated = tree.add_value(Some(top), "gated", "x").unwrap();

        let mut ctx = ValidationContext::default().with_evaluator(evaluator(ConditionResult::Indeterminate));
        check_context(&tree, gated, &mut ctx).unwrap();
        assert!(ctx.is_pending(gated));

        let queue = ctx.queue.clone();
        let mut ctx = ValidationContext::default();
        ctx.queue = queue;
        assert!(check_context(&tree, gated, &mut ctx).unwrap().is_admissible());
        assert!(!ctx.is_pending(gated));
    }
}
