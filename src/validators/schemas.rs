//! Compiled schema model
//!
//! A [`Schema`] is an immutable arena of [`SchemaNode`]s addressed by
//! [`SchemaId`]. It is shared behind an `Arc` by every data tree built
//! against it; data nodes only hold the id of their schema node.
//!
//! Choice, case, input and output nodes are schema-only: they never appear
//! as data nodes, and the data parent of a node is its closest data-node
//! ancestor in the schema.

use std::fmt;

use crate::namespaces::{Module, QName};

use super::features::IfFeatureExpr;
use super::simple_types::LeafType;

/// Stable identifier of a schema node inside its [`Schema`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub(crate) usize);

impl SchemaId {
    /// Raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Access mode of a schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    /// Configuration data (config true)
    #[default]
    ReadWrite,
    /// State data (config false)
    ReadOnly,
}

/// A `when` condition attached to a schema node
///
/// The expression text is opaque to the engine; it is handed to a
/// [`ConditionEvaluator`](super::base::ConditionEvaluator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhenCondition {
    /// XPath expression text
    pub expression: String,
}

impl WhenCondition {
    /// Create a new condition
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}

impl fmt::Display for WhenCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "when \"{}\"", self.expression)
    }
}

/// Kind of a schema node with its kind-specific properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    /// container
    Container {
        /// Presence container
        presence: bool,
    },
    /// list
    List {
        /// Key leaf names, in declaration order
        keys: Vec<String>,
        /// unique statements, each a set of descendant leaf paths
        uniques: Vec<Vec<String>>,
        /// min-elements
        min_elements: u32,
        /// max-elements (None = unbounded)
        max_elements: Option<u32>,
    },
    /// leaf
    Leaf {
        /// Value type
        ty: LeafType,
        /// mandatory true
        mandatory: bool,
        /// Default value
        default: Option<String>,
    },
    /// leaf-list
    LeafList {
        /// Value type
        ty: LeafType,
        /// min-elements
        min_elements: u32,
        /// max-elements (None = unbounded)
        max_elements: Option<u32>,
    },
    /// choice
    Choice {
        /// mandatory true
        mandatory: bool,
        /// Name of the default case
        default_case: Option<String>,
    },
    /// case
    Case,
    /// anydata
    AnyData,
    /// anyxml
    AnyXml,
    /// rpc
    Rpc,
    /// rpc input
    RpcInput,
    /// rpc output
    RpcOutput,
    /// notification
    Notification,
}

impl SchemaKind {
    /// Whether instances of this kind appear as data nodes
    pub fn is_data_node(&self) -> bool {
        !matches!(
            self,
            SchemaKind::Choice { .. }
                | SchemaKind::Case
                | SchemaKind::RpcInput
                | SchemaKind::RpcOutput
        )
    }

    /// Whether several instances may share one sibling set
    pub fn is_multi_instance(&self) -> bool {
        matches!(self, SchemaKind::List { .. } | SchemaKind::LeafList { .. })
    }

    /// Whether instances carry a value
    pub fn is_leaf_like(&self) -> bool {
        matches!(self, SchemaKind::Leaf { .. } | SchemaKind::LeafList { .. })
    }

    /// Whether this kind is an rpc input or output
    pub fn is_operation_io(&self) -> bool {
        matches!(self, SchemaKind::RpcInput | SchemaKind::RpcOutput)
    }

    /// The YANG keyword of this kind
    pub fn keyword(&self) -> &'static str {
        match self {
            SchemaKind::Container { .. } => "container",
            SchemaKind::List { .. } => "list",
            SchemaKind::Leaf { .. } => "leaf",
            SchemaKind::LeafList { .. } => "leaf-list",
            SchemaKind::Choice { .. } => "choice",
            SchemaKind::Case => "case",
            SchemaKind::AnyData => "anydata",
            SchemaKind::AnyXml => "anyxml",
            SchemaKind::Rpc => "rpc",
            SchemaKind::RpcInput => "input",
            SchemaKind::RpcOutput => "output",
            SchemaKind::Notification => "notification",
        }
    }

    /// Value type for leaf-like kinds
    pub fn leaf_type(&self) -> Option<&LeafType> {
        match self {
            SchemaKind::Leaf { ty, .. } | SchemaKind::LeafList { ty, .. } => Some(ty),
            _ => None,
        }
    }
}

/// One node of the compiled schema
#[derive(Debug, Clone)]
pub struct SchemaNode {
    /// Id of this node
    pub id: SchemaId,
    /// Qualified name
    pub name: QName,
    /// Kind and kind-specific properties
    pub kind: SchemaKind,
    /// Schema parent
    pub parent: Option<SchemaId>,
    /// Schema children in declaration order
    pub children: Vec<SchemaId>,
    /// if-feature statements; all must hold for the node to be enabled
    pub if_features: Vec<IfFeatureExpr>,
    /// when statement
    pub when: Option<WhenCondition>,
    /// Access mode (after config inheritance)
    pub access: Access,
    /// Depth-first declaration order over the whole schema
    pub order: usize,
    /// Created implicitly (shorthand case)
    pub implicit: bool,
}

impl SchemaNode {
    /// Local name of the node
    pub fn local_name(&self) -> &str {
        &self.name.local_name
    }

    /// Whether the node is state data
    pub fn is_read_only(&self) -> bool {
        self.access == Access::ReadOnly
    }
}

/// Compiled schema: an arena of schema nodes of one module
#[derive(Debug, Clone)]
pub struct Schema {
    /// Module the nodes belong to
    pub module: Module,
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) top_level: Vec<SchemaId>,
}

impl Schema {
    /// Get a schema node
    pub fn node(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// Get a schema node, if the id belongs to this schema
    pub fn get(&self, id: SchemaId) -> Option<&SchemaNode> {
        self.nodes.get(id.0)
    }

    /// Number of schema nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the schema has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level schema nodes in declaration order
    pub fn top_level(&self) -> &[SchemaId] {
        &self.top_level
    }

    /// Iterate over all schema nodes
    pub fn iter(&self) -> impl Iterator<Item = &SchemaNode> {
        self.nodes.iter()
    }

    /// Schema children of a node, or the top-level nodes for `None`
    pub fn children(&self, parent: Option<SchemaId>) -> &[SchemaId] {
        match parent {
            Some(id) => &self.node(id).children,
            None => &self.top_level,
        }
    }

    /// Closest data-node ancestor
    pub fn data_parent(&self, id: SchemaId) -> Option<SchemaId> {
        data_parent_in(&self.nodes, id)
    }

    /// Schema-only ancestors (choice, case, input, output) between a node
    /// and its data parent, nearest first
    pub fn schema_only_ancestors(&self, id: SchemaId) -> Vec<SchemaId> {
        let mut result = Vec::new();
        let mut current = self.node(id).parent;
        while let Some(pid) = current {
            let parent = self.node(pid);
            if parent.kind.is_data_node() {
                break;
            }
            result.push(pid);
            current = parent.parent;
        }
        result
    }

    /// Data nodes that may appear as children of a data node with schema
    /// `parent` (top level for `None`), looking through schema-only nodes
    pub fn data_children(&self, parent: Option<SchemaId>) -> Vec<SchemaId> {
        data_children_in(&self.nodes, self.children(parent))
    }

    /// Find a data child by local name
    pub fn find_data_child(&self, parent: Option<SchemaId>, name: &str) -> Option<SchemaId> {
        self.data_children(parent)
            .into_iter()
            .find(|id| self.node(*id).local_name() == name)
    }

    /// Resolve a relative descendant path such as `address/ip`
    pub fn resolve_descendant(&self, from: SchemaId, path: &str) -> Option<SchemaId> {
        resolve_descendant_in(&self.nodes, from, path)
    }

    /// Resolve a relative descendant path to the data nodes along it, one per
    /// segment
    pub fn resolve_path(&self, from: SchemaId, path: &str) -> Option<Vec<SchemaId>> {
        resolve_path_in(&self.nodes, from, path)
    }

    /// The (choice, case) pairs a node belongs to, innermost first, up to its
    /// data parent
    pub fn case_path(&self, id: SchemaId) -> Vec<(SchemaId, SchemaId)> {
        let mut pairs = Vec::new();
        for ancestor in self.schema_only_ancestors(id) {
            let node = self.node(ancestor);
            if matches!(node.kind, SchemaKind::Case) {
                if let Some(choice) = node.parent {
                    pairs.push((choice, ancestor));
                }
            }
        }
        pairs
    }

    /// The rpc input or output enclosing a node, if any
    pub fn operation_io(&self, id: SchemaId) -> Option<SchemaId> {
        let mut current = self.node(id).parent;
        while let Some(pid) = current {
            let node = self.node(pid);
            if node.kind.is_operation_io() {
                return Some(pid);
            }
            current = node.parent;
        }
        None
    }

    /// Path of schema names from the top, e.g. `/ex:top/entry`
    pub fn schema_path(&self, id: SchemaId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(cid) = current {
            let node = self.node(cid);
            segments.push(node.local_name().to_string());
            current = node.parent;
        }
        segments.reverse();
        format!("/{}:{}", self.module.name, segments.join("/"))
    }
}

pub(crate) fn data_parent_in(nodes: &[SchemaNode], id: SchemaId) -> Option<SchemaId> {
    let mut current = nodes[id.0].parent;
    while let Some(pid) = current {
        if nodes[pid.0].kind.is_data_node() {
            return Some(pid);
        }
        current = nodes[pid.0].parent;
    }
    None
}

pub(crate) fn data_children_in(nodes: &[SchemaNode], children: &[SchemaId]) -> Vec<SchemaId> {
    let mut result = Vec::new();
    for child in children {
        let node = &nodes[child.0];
        if node.kind.is_data_node() {
            result.push(*child);
        } else {
            result.extend(data_children_in(nodes, &node.children));
        }
    }
    result
}

pub(crate) fn resolve_path_in(
    nodes: &[SchemaNode],
    from: SchemaId,
    path: &str,
) -> Option<Vec<SchemaId>> {
    let mut chain = Vec::new();
    let mut current = from;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let (_, local) = crate::names::split_prefixed(segment);
        current = data_children_in(nodes, &nodes[current.0].children)
            .into_iter()
            .find(|id| nodes[id.0].name.local_name == local)?;
        chain.push(current);
    }
    (!chain.is_empty()).then_some(chain)
}

pub(crate) fn resolve_descendant_in(
    nodes: &[SchemaNode],
    from: SchemaId,
    path: &str,
) -> Option<SchemaId> {
    resolve_path_in(nodes, from, path).and_then(|chain| chain.last().copied())
}
