//! Data tree
//!
//! A [`DataTree`] holds the instance data validated against a [`Schema`].
//! Nodes live in an arena and are addressed by [`NodeId`]s that stay stable
//! for the lifetime of the tree. Each node owns the ordered list of its
//! children; siblings are derived from the parent's list (or the ordered
//! top-level list), never stored as links.
//!
//! Removing a node unlinks it from its parent and tombstones it together
//! with its subtree. A removed node is never resurrected, so a scan that
//! iterates over a snapshot of a sibling list only has to skip tombstones.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::validators::schemas::{Schema, SchemaId, SchemaKind, SchemaNode};
use crate::validators::simple_types::LeafType;

/// Stable identifier of a data node inside its [`DataTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Build an id from a raw arena index
    pub fn from_raw(index: usize) -> Self {
        NodeId(index)
    }

    /// Raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One instance in the data tree
#[derive(Debug, Clone)]
pub struct DataNode {
    /// Schema node this instance belongs to
    pub schema: SchemaId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    value: Option<String>,
    is_default: bool,
    removed: bool,
}

impl DataNode {
    /// Parent data node (None for top-level nodes)
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in document order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Value of a leaf or leaf-list instance
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Whether the node was instantiated implicitly from a schema default
    pub fn is_default(&self) -> bool {
        self.is_default
    }
}

/// Arena-backed data tree bound to one schema
#[derive(Debug, Clone)]
pub struct DataTree {
    schema: Arc<Schema>,
    nodes: Vec<DataNode>,
    roots: Vec<NodeId>,
}

impl DataTree {
    /// Create an empty tree for the schema
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// The schema the tree is built against
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Append a node for `schema_id` under `parent` (top level for `None`)
    ///
    /// The schema node must be a data child of the parent's schema node, and
    /// a value must be given exactly when the schema node is a leaf or
    /// leaf-list.
    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        schema_id: SchemaId,
        value: Option<&str>,
    ) -> Result<NodeId> {
        self.insert_node(parent, schema_id, value, false)
    }

    /// Append a node by local name, without a value
    ///
    /// Leaves of type `empty` get the empty value.
    pub fn add(&mut self, parent: Option<NodeId>, name: &str) -> Result<NodeId> {
        let schema_id = self.lookup_child(parent, name)?;
        let value = match self.schema.node(schema_id).kind.leaf_type() {
            Some(LeafType::Empty) => Some(""),
            _ => None,
        };
        self.insert_node(parent, schema_id, value, false)
    }

    /// Append a leaf or leaf-list instance by local name
    pub fn add_value(&mut self, parent: Option<NodeId>, name: &str, value: &str) -> Result<NodeId> {
        let schema_id = self.lookup_child(parent, name)?;
        self.insert_node(parent, schema_id, Some(value), false)
    }

    /// Append an implicitly created default instance by local name
    pub fn add_default(&mut self, parent: Option<NodeId>, name: &str, value: Option<&str>) -> Result<NodeId> {
        let schema_id = self.lookup_child(parent, name)?;
        self.insert_node(parent, schema_id, value, true)
    }

    fn lookup_child(&self, parent: Option<NodeId>, name: &str) -> Result<SchemaId> {
        let parent_schema = match parent {
            Some(pid) => Some(self.get(pid)?.schema),
            None => None,
        };
        self.schema
            .find_data_child(parent_schema, name)
            .ok_or_else(|| {
                Error::Position(format!(
                    "no data node '{}' under {}",
                    name,
                    match parent {
                        Some(pid) => self.path(pid),
                        None => "the top level".to_string(),
                    }
                ))
            })
    }

    fn insert_node(
        &mut self,
        parent: Option<NodeId>,
        schema_id: SchemaId,
        value: Option<&str>,
        is_default: bool,
    ) -> Result<NodeId> {
        let snode = self
            .schema
            .get(schema_id)
            .ok_or_else(|| Error::Position(format!("unknown schema node {}", schema_id)))?;
        if !snode.kind.is_data_node() {
            return Err(Error::Position(format!(
                "{} '{}' cannot be instantiated",
                snode.kind.keyword(),
                snode.local_name()
            )));
        }

        let parent_schema = match parent {
            Some(pid) => Some(self.get(pid)?.schema),
            None => None,
        };
        if self.schema.data_parent(schema_id) != parent_schema {
            return Err(Error::Position(format!(
                "'{}' is not a child of {}",
                snode.local_name(),
                match parent {
                    Some(pid) => self.path(pid),
                    None => "the top level".to_string(),
                }
            )));
        }
        if snode.kind.is_leaf_like() != value.is_some() {
            return Err(Error::Position(if value.is_some() {
                format!("{} '{}' cannot carry a value", snode.kind.keyword(), snode.local_name())
            } else {
                format!("{} '{}' requires a value", snode.kind.keyword(), snode.local_name())
            }));
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(DataNode {
            schema: schema_id,
            parent,
            children: Vec::new(),
            value: value.map(str::to_string),
            is_default,
            removed: false,
        });
        match parent {
            Some(pid) => self.nodes[pid.0].children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Unlink a node and tombstone it with its whole subtree
    ///
    /// Returns the number of nodes removed.
    pub fn remove(&mut self, node: NodeId) -> Result<usize> {
        let parent = self.get(node)?.parent;
        match parent {
            Some(pid) => self.nodes[pid.0].children.retain(|c| *c != node),
            None => self.roots.retain(|c| *c != node),
        }

        let mut removed = 0;
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let slot = &mut self.nodes[current.0];
            if slot.removed {
                continue;
            }
            slot.removed = true;
            removed += 1;
            stack.extend(slot.children.iter().copied());
        }
        Ok(removed)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Get a live node
    pub fn get(&self, node: NodeId) -> Result<&DataNode> {
        match self.nodes.get(node.0) {
            Some(slot) if !slot.removed => Ok(slot),
            _ => Err(Error::UnknownNode(node)),
        }
    }

    /// Whether the id refers to a live node
    pub fn contains(&self, node: NodeId) -> bool {
        self.get(node).is_ok()
    }

    /// Schema node of a live node
    pub fn schema_node(&self, node: NodeId) -> Result<&SchemaNode> {
        Ok(self.schema.node(self.get(node)?.schema))
    }

    /// Schema kind of a live node
    pub fn kind(&self, node: NodeId) -> Result<&SchemaKind> {
        Ok(&self.schema_node(node)?.kind)
    }

    /// Value of a live leaf-like node
    pub fn value(&self, node: NodeId) -> Option<&str> {
        self.get(node).ok().and_then(DataNode::value)
    }

    /// Children of a node, or the top-level nodes for `None`
    pub fn children(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(pid) => self.nodes.get(pid.0).map(|n| n.children.as_slice()).unwrap_or(&[]),
            None => &self.roots,
        }
    }

    /// Top-level nodes in document order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// The sibling run a node belongs to, the node itself included
    pub fn siblings(&self, node: NodeId) -> Result<&[NodeId]> {
        let parent = self.get(node)?.parent;
        Ok(self.children(parent))
    }

    /// First node of the sibling run a node belongs to
    pub fn first_sibling(&self, node: NodeId) -> Result<NodeId> {
        Ok(self.siblings(node)?.first().copied().unwrap_or(node))
    }

    /// The part of a sibling run that starts at `first`
    pub fn siblings_from(&self, first: NodeId) -> Result<&[NodeId]> {
        let siblings = self.siblings(first)?;
        let start = siblings.iter().position(|s| *s == first).unwrap_or(0);
        Ok(&siblings[start..])
    }

    /// Whether two live nodes share a parent
    pub fn are_siblings(&self, a: NodeId, b: NodeId) -> Result<bool> {
        Ok(self.get(a)?.parent == self.get(b)?.parent)
    }

    /// Find the first child instance of the schema node `name` resolves to
    /// under the parent's schema node
    pub fn find_child(&self, parent: Option<NodeId>, name: &str) -> Option<NodeId> {
        let schema_id = self.lookup_child(parent, name).ok()?;
        self.find_instance(parent, schema_id)
    }

    /// Find the first child instance of a schema node
    pub fn find_instance(&self, parent: Option<NodeId>, schema_id: SchemaId) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.get(*c).map_or(false, |d| d.schema == schema_id))
    }

    /// Find a descendant along a chain of schema nodes, as returned by
    /// [`Schema::resolve_path`]
    pub fn find_along(&self, from: NodeId, chain: &[SchemaId]) -> Option<NodeId> {
        chain
            .iter()
            .try_fold(from, |current, id| self.find_instance(Some(current), *id))
    }

    /// Find a descendant leaf along a relative path such as `address/ip`
    pub fn find_descendant(&self, from: NodeId, path: &str) -> Option<NodeId> {
        let chain = self.schema.resolve_path(self.get(from).ok()?.schema, path)?;
        self.find_along(from, &chain)
    }

    /// Nesting depth (top-level nodes have depth 1)
    pub fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = Some(node);
        while let Some(cid) = current {
            depth += 1;
            current = self.nodes.get(cid.0).and_then(|n| n.parent);
        }
        depth
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| !n.removed).count()
    }

    /// Check if the tree has no live nodes
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Data path of a node, e.g. `/ex:top/entry[name='a']/value`
    pub fn path(&self, node: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(node);
        while let Some(cid) = current {
            let Some(slot) = self.nodes.get(cid.0) else {
                break;
            };
            segments.push(self.segment(cid, slot));
            current = slot.parent;
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    fn segment(&self, id: NodeId, slot: &DataNode) -> String {
        let snode = self.schema.node(slot.schema);
        let mut segment = if slot.parent.is_none() {
            snode.name.qualified()
        } else {
            snode.local_name().to_string()
        };
        match &snode.kind {
            SchemaKind::List { keys, .. } => {
                for key in keys {
                    if let Some(value) = self.find_child(Some(id), key).and_then(|k| self.value(k)) {
                        segment.push_str(&format!("[{}='{}']", key, value));
                    }
                }
            }
            SchemaKind::LeafList { .. } => {
                if let Some(value) = slot.value.as_deref() {
                    segment.push_str(&format!("[.='{}']", value));
                }
            }
            _ => {}
        }
        segment
    }
}
