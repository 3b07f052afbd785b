//! Shared schema and evaluators for the integration tests

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use yang_validation::data_tree::DataTree;
use yang_validation::namespaces::Module;
use yang_validation::validators::{
    ConditionResult, LeafType, RpcIds, Schema, SchemaBuilder, SchemaId, WhenCondition,
};
use yang_validation::NodeId;

/// Schema ids the tests refer to directly
pub struct Ids {
    pub top: SchemaId,
    pub udp_port: SchemaId,
    pub reset: RpcIds,
}

/// The `ex` module used by most tests
///
/// ```text
/// container top {
///   leaf enabled { type boolean; }
///   leaf turbo { if-feature fast; type boolean; }
///   leaf extra { when "../enabled = 'true'"; type string; }
///   leaf-list value { type int32; }
///   list server { key name; unique port;
///     leaf name { type string; } leaf port { type uint16; } }
///   choice transport {
///     case tcp { leaf tcp-port { type uint16; } leaf nodelay { type empty; } }
///     case udp { leaf udp-port { type uint16; } }
///   }
///   container stats { config false; leaf counter { type uint64; } }
/// }
/// rpc reset {
///   input { leaf delay { type uint32; } }
///   output { leaf x { type string; } leaf y { type string; } leaf z { type string; } }
/// }
/// ```
pub fn schema() -> (Arc<Schema>, Ids) {
    let mut b = SchemaBuilder::new(Module::new("ex", "urn:example:ex", "ex"));
    let top = b.container(None, "top").unwrap();
    b.leaf(Some(top), "enabled", LeafType::Boolean).unwrap();
    let turbo = b.leaf(Some(top), "turbo", LeafType::Boolean).unwrap();
    b.if_feature(turbo, "fast").unwrap();
    let extra = b.leaf(Some(top), "extra", LeafType::String).unwrap();
    b.when(extra, "../enabled = 'true'").unwrap();
    b.leaf_list(Some(top), "value", LeafType::Int32).unwrap();

    let server = b.list(Some(top), "server", &["name"]).unwrap();
    b.leaf(Some(server), "name", LeafType::String).unwrap();
    b.leaf(Some(server), "port", LeafType::Uint16).unwrap();
    b.unique(server, &["port"]).unwrap();

    let transport = b.choice(Some(top), "transport").unwrap();
    let tcp = b.case(transport, "tcp").unwrap();
    b.leaf(Some(tcp), "tcp-port", LeafType::Uint16).unwrap();
    b.leaf(Some(tcp), "nodelay", LeafType::Empty).unwrap();
    let udp = b.case(transport, "udp").unwrap();
    let udp_port = b.leaf(Some(udp), "udp-port", LeafType::Uint16).unwrap();

    let stats = b.container(Some(top), "stats").unwrap();
    b.read_only(stats).unwrap();
    b.leaf(Some(stats), "counter", LeafType::Uint64).unwrap();

    let reset = b.rpc("reset").unwrap();
    b.leaf(Some(reset.input), "delay", LeafType::Uint32).unwrap();
    for name in ["x", "y", "z"] {
        b.leaf(Some(reset.output), name, LeafType::String).unwrap();
    }

    let schema = b.build().unwrap();
    (schema, Ids { top, udp_port, reset })
}

/// Empty tree for the `ex` schema with its `top` container
pub fn tree() -> (DataTree, NodeId) {
    let (schema, _) = schema();
    let mut tree = DataTree::new(schema);
    let top = tree.add(None, "top").unwrap();
    (tree, top)
}

/// Evaluator for `../enabled = 'true'` that reads the `enabled` sibling
pub fn enabled_evaluator(
    condition: &WhenCondition,
    tree: &DataTree,
    context: Option<NodeId>,
) -> ConditionResult {
    assert_eq!(condition.expression, "../enabled = 'true'");
    let parent = context.and_then(|node| tree.get(node).ok()).and_then(|n| n.parent());
    match tree.find_child(parent, "enabled").and_then(|n| tree.value(n)) {
        Some("true") => ConditionResult::True,
        Some(_) => ConditionResult::False,
        None => ConditionResult::Indeterminate,
    }
}

/// Evaluator that is undecided for the first `undecided` calls, then
/// returns `then`
pub fn delayed_evaluator(
    undecided: usize,
    then: ConditionResult,
) -> (
    impl Fn(&WhenCondition, &DataTree, Option<NodeId>) -> ConditionResult,
    Rc<Cell<usize>>,
) {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let evaluator = move |_: &WhenCondition, _: &DataTree, _: Option<NodeId>| {
        counter.set(counter.get() + 1);
        if counter.get() <= undecided {
            ConditionResult::Indeterminate
        } else {
            then
        }
    };
    (evaluator, calls)
}
