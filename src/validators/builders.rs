//! Schema builder
//!
//! [`SchemaBuilder`] assembles a [`Schema`] node by node and checks the
//! structural rules of the compiled model when [`SchemaBuilder::build`] is
//! called:
//! - identifiers are valid and unique among the data children of a parent
//! - a data node added directly under a choice gets an implicit case
//! - config false is inherited by descendants
//! - list keys name direct leaf children, unique paths name descendant leaves
//! - choice defaults name an existing case

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::names::validate_identifier;
use crate::namespaces::Module;

use super::features::IfFeatureExpr;
use super::schemas::{
    data_children_in, data_parent_in, resolve_descendant_in, Access, Schema, SchemaId,
    SchemaKind, SchemaNode, WhenCondition,
};
use super::simple_types::LeafType;

/// Ids of an rpc and its input/output nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcIds {
    /// The rpc node
    pub rpc: SchemaId,
    /// Its input node
    pub input: SchemaId,
    /// Its output node
    pub output: SchemaId,
}

/// Builder for a compiled [`Schema`]
#[derive(Debug)]
pub struct SchemaBuilder {
    module: Module,
    nodes: Vec<SchemaNode>,
    top_level: Vec<SchemaId>,
}

impl SchemaBuilder {
    /// Create a builder for the nodes of one module
    pub fn new(module: Module) -> Self {
        Self {
            module,
            nodes: Vec::new(),
            top_level: Vec::new(),
        }
    }

    /// Add a node of any kind under `parent` (top level for `None`)
    pub fn add(&mut self, parent: Option<SchemaId>, name: &str, kind: SchemaKind) -> Result<SchemaId> {
        validate_identifier(name)?;

        let parent = match parent {
            Some(pid) => {
                let parent_kind = self.get(pid)?.kind.clone();
                match (&parent_kind, &kind) {
                    // shorthand: a data node or choice directly under a choice
                    (SchemaKind::Choice { .. }, SchemaKind::Case) => Some(pid),
                    (SchemaKind::Choice { .. }, k) if k.is_data_node() || is_choice(k) => {
                        if matches!(k, SchemaKind::Rpc | SchemaKind::Notification) {
                            return Err(self.misplaced(&kind, name, Some(pid)));
                        }
                        Some(self.push(Some(pid), name, SchemaKind::Case, true)?)
                    }
                    (SchemaKind::Rpc, SchemaKind::RpcInput | SchemaKind::RpcOutput) => {
                        let taken = self.nodes[pid.0]
                            .children
                            .iter()
                            .any(|c| self.nodes[c.0].kind == kind);
                        if taken {
                            return Err(self.misplaced(&kind, name, Some(pid)));
                        }
                        Some(pid)
                    }
                    (
                        SchemaKind::Container { .. }
                        | SchemaKind::List { .. }
                        | SchemaKind::Case
                        | SchemaKind::RpcInput
                        | SchemaKind::RpcOutput
                        | SchemaKind::Notification,
                        k,
                    ) if is_body_kind(k) => Some(pid),
                    _ => return Err(self.misplaced(&kind, name, Some(pid))),
                }
            }
            None => {
                if !(is_body_kind(&kind) || matches!(kind, SchemaKind::Rpc | SchemaKind::Notification)) {
                    return Err(self.misplaced(&kind, name, None));
                }
                None
            }
        };

        self.push(parent, name, kind, false)
    }

    fn push(
        &mut self,
        parent: Option<SchemaId>,
        name: &str,
        kind: SchemaKind,
        implicit: bool,
    ) -> Result<SchemaId> {
        let id = SchemaId(self.nodes.len());

        if kind.is_data_node() {
            // names must be unique among the data children of the data parent
            let data_parent = match parent {
                Some(pid) if self.nodes[pid.0].kind.is_data_node() => Some(pid),
                Some(pid) => data_parent_in(&self.nodes, pid),
                None => None,
            };
            let siblings = match data_parent {
                Some(dp) => data_children_in(&self.nodes, &self.nodes[dp.0].children),
                None => data_children_in(&self.nodes, &self.top_level),
            };
            if siblings.iter().any(|s| self.nodes[s.0].name.local_name == name) {
                return Err(Error::Schema(format!(
                    "duplicate data node name '{}' under {}",
                    name,
                    self.describe(data_parent)
                )));
            }
        } else if let Some(pid) = parent {
            if self.nodes[pid.0].children.iter().any(|c| self.nodes[c.0].name.local_name == name) {
                return Err(Error::Schema(format!(
                    "duplicate {} name '{}' under {}",
                    kind.keyword(),
                    name,
                    self.describe(Some(pid))
                )));
            }
        }

        self.nodes.push(SchemaNode {
            id,
            name: self.module.qname(name),
            kind,
            parent,
            children: Vec::new(),
            if_features: Vec::new(),
            when: None,
            access: Access::ReadWrite,
            order: 0,
            implicit,
        });
        match parent {
            Some(pid) => self.nodes[pid.0].children.push(id),
            None => self.top_level.push(id),
        }
        Ok(id)
    }

    /// Add a non-presence container
    pub fn container(&mut self, parent: Option<SchemaId>, name: &str) -> Result<SchemaId> {
        self.add(parent, name, SchemaKind::Container { presence: false })
    }

    /// Add a presence container
    pub fn presence_container(&mut self, parent: Option<SchemaId>, name: &str) -> Result<SchemaId> {
        self.add(parent, name, SchemaKind::Container { presence: true })
    }

    /// Add a list with the given key leaf names
    pub fn list(&mut self, parent: Option<SchemaId>, name: &str, keys: &[&str]) -> Result<SchemaId> {
        self.add(
            parent,
            name,
            SchemaKind::List {
                keys: keys.iter().map(|k| k.to_string()).collect(),
                uniques: Vec::new(),
                min_elements: 0,
                max_elements: None,
            },
        )
    }

    /// Add an optional leaf
    pub fn leaf(&mut self, parent: Option<SchemaId>, name: &str, ty: LeafType) -> Result<SchemaId> {
        self.add(
            parent,
            name,
            SchemaKind::Leaf {
                ty,
                mandatory: false,
                default: None,
            },
        )
    }

    /// Add a leaf-list
    pub fn leaf_list(&mut self, parent: Option<SchemaId>, name: &str, ty: LeafType) -> Result<SchemaId> {
        self.add(
            parent,
            name,
            SchemaKind::LeafList {
                ty,
                min_elements: 0,
                max_elements: None,
            },
        )
    }

    /// Add an optional choice
    pub fn choice(&mut self, parent: Option<SchemaId>, name: &str) -> Result<SchemaId> {
        self.add(
            parent,
            name,
            SchemaKind::Choice {
                mandatory: false,
                default_case: None,
            },
        )
    }

    /// Add a case to a choice
    pub fn case(&mut self, choice: SchemaId, name: &str) -> Result<SchemaId> {
        self.add(Some(choice), name, SchemaKind::Case)
    }

    /// Add an anydata node
    pub fn anydata(&mut self, parent: Option<SchemaId>, name: &str) -> Result<SchemaId> {
        self.add(parent, name, SchemaKind::AnyData)
    }

    /// Add an rpc together with its input and output
    pub fn rpc(&mut self, name: &str) -> Result<RpcIds> {
        let rpc = self.add(None, name, SchemaKind::Rpc)?;
        let input = self.add(Some(rpc), "input", SchemaKind::RpcInput)?;
        let output = self.add(Some(rpc), "output", SchemaKind::RpcOutput)?;
        Ok(RpcIds { rpc, input, output })
    }

    /// Add a top-level notification
    pub fn notification(&mut self, name: &str) -> Result<SchemaId> {
        self.add(None, name, SchemaKind::Notification)
    }

    /// Attach an if-feature statement
    pub fn if_feature(&mut self, id: SchemaId, expression: &str) -> Result<()> {
        let expr = IfFeatureExpr::parse(expression)?;
        self.get_mut(id)?.if_features.push(expr);
        Ok(())
    }

    /// Attach a when statement
    pub fn when(&mut self, id: SchemaId, expression: &str) -> Result<()> {
        let node = self.get_mut(id)?;
        if node.kind.is_operation_io() {
            return Err(Error::Schema(format!(
                "when is not allowed on '{}'",
                node.name.local_name
            )));
        }
        node.when = Some(WhenCondition::new(expression));
        Ok(())
    }

    /// Mark a node config false
    pub fn read_only(&mut self, id: SchemaId) -> Result<()> {
        self.get(id)?;
        if self.in_operation(id) {
            return Err(Error::Schema(format!(
                "config is not allowed inside an operation ('{}')",
                self.nodes[id.0].name.local_name
            )));
        }
        self.get_mut(id)?.access = Access::ReadOnly;
        Ok(())
    }

    /// Mark a leaf or choice mandatory
    pub fn mandatory(&mut self, id: SchemaId) -> Result<()> {
        match &mut self.get_mut(id)?.kind {
            SchemaKind::Leaf { mandatory, .. } | SchemaKind::Choice { mandatory, .. } => {
                *mandatory = true;
                Ok(())
            }
            other => Err(Error::Schema(format!("mandatory is not allowed on a {}", other.keyword()))),
        }
    }

    /// Set a leaf default value
    pub fn default_value(&mut self, id: SchemaId, value: &str) -> Result<()> {
        match &mut self.get_mut(id)?.kind {
            SchemaKind::Leaf { default, .. } => {
                *default = Some(value.to_string());
                Ok(())
            }
            other => Err(Error::Schema(format!("default value is not allowed on a {}", other.keyword()))),
        }
    }

    /// Set the default case of a choice
    pub fn default_case(&mut self, choice: SchemaId, case: &str) -> Result<()> {
        match &mut self.get_mut(choice)?.kind {
            SchemaKind::Choice { default_case, .. } => {
                *default_case = Some(case.to_string());
                Ok(())
            }
            other => Err(Error::Schema(format!("default case is not allowed on a {}", other.keyword()))),
        }
    }

    /// Set min-elements/max-elements of a list or leaf-list
    pub fn elements(&mut self, id: SchemaId, min: u32, max: Option<u32>) -> Result<()> {
        match &mut self.get_mut(id)?.kind {
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
                *min_elements = min;
                *max_elements = max;
                Ok(())
            }
            other => Err(Error::Schema(format!("min/max-elements is not allowed on a {}", other.keyword()))),
        }
    }

    /// Add a unique statement to a list
    pub fn unique(&mut self, list: SchemaId, paths: &[&str]) -> Result<()> {
        match &mut self.get_mut(list)?.kind {
            SchemaKind::List { uniques, .. } => {
                uniques.push(paths.iter().map(|p| p.to_string()).collect());
                Ok(())
            }
            other => Err(Error::Schema(format!("unique is not allowed on a {}", other.keyword()))),
        }
    }

    /// Finish the schema
    pub fn build(mut self) -> Result<Arc<Schema>> {
        // config inheritance; parents always precede their children
        for index in 0..self.nodes.len() {
            if let Some(pid) = self.nodes[index].parent {
                if self.nodes[pid.0].access == Access::ReadOnly {
                    self.nodes[index].access = Access::ReadOnly;
                }
            }
        }

        let mut order = 0;
        let top = self.top_level.clone();
        for id in top {
            self.assign_order(id, &mut order);
        }

        for index in 0..self.nodes.len() {
            self.check_node(SchemaId(index))?;
        }

        Ok(Arc::new(Schema {
            module: self.module,
            nodes: self.nodes,
            top_level: self.top_level,
        }))
    }

    fn assign_order(&mut self, id: SchemaId, order: &mut usize) {
        self.nodes[id.0].order = *order;
        *order += 1;
        let children = self.nodes[id.0].children.clone();
        for child in children {
            self.assign_order(child, order);
        }
    }

    fn check_node(&self, id: SchemaId) -> Result<()> {
        let node = &self.nodes[id.0];
        let name = &node.name.local_name;
        match &node.kind {
            SchemaKind::List {
                keys,
                uniques,
                min_elements,
                max_elements,
            } => {
                if keys.is_empty() && node.access == Access::ReadWrite && !self.in_operation(id) {
                    return Err(Error::Schema(format!("config list '{}' has no keys", name)));
                }
                for key in keys {
                    let found = node.children.iter().find(|c| self.nodes[c.0].name.local_name == *key);
                    match found.map(|c| &self.nodes[c.0].kind) {
                        Some(SchemaKind::Leaf { .. }) => {}
                        _ => {
                            return Err(Error::Schema(format!(
                                "key '{}' of list '{}' is not a child leaf",
                                key, name
                            )))
                        }
                    }
                }
                for unique in uniques {
                    for path in unique {
                        let target = resolve_descendant_in(&self.nodes, id, path);
                        if !matches!(target.map(|t| &self.nodes[t.0].kind), Some(SchemaKind::Leaf { .. })) {
                            return Err(Error::Schema(format!(
                                "unique path '{}' of list '{}' does not name a descendant leaf",
                                path, name
                            )));
                        }
                    }
                }
                check_bounds(name, *min_elements, *max_elements)?;
            }
            SchemaKind::LeafList {
                min_elements,
                max_elements,
                ..
            } => check_bounds(name, *min_elements, *max_elements)?,
            SchemaKind::Leaf {
                mandatory: true,
                default: Some(_),
                ..
            } => {
                return Err(Error::Schema(format!(
                    "leaf '{}' cannot be both mandatory and have a default",
                    name
                )))
            }
            SchemaKind::Choice {
                mandatory,
                default_case: Some(case),
            } => {
                if *mandatory {
                    return Err(Error::Schema(format!(
                        "choice '{}' cannot be both mandatory and have a default case",
                        name
                    )));
                }
                if !node.children.iter().any(|c| self.nodes[c.0].name.local_name == *case) {
                    return Err(Error::Schema(format!(
                        "default case '{}' of choice '{}' does not exist",
                        case, name
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn in_operation(&self, id: SchemaId) -> bool {
        let mut current = Some(id);
        while let Some(cid) = current {
            let node = &self.nodes[cid.0];
            if matches!(node.kind, SchemaKind::Rpc | SchemaKind::Notification) {
                return true;
            }
            current = node.parent;
        }
        false
    }

    fn get(&self, id: SchemaId) -> Result<&SchemaNode> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| Error::Schema(format!("unknown schema node {}", id)))
    }

    fn get_mut(&mut self, id: SchemaId) -> Result<&mut SchemaNode> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| Error::Schema(format!("unknown schema node {}", id)))
    }

    fn describe(&self, id: Option<SchemaId>) -> String {
        match id {
            Some(id) => format!("'{}'", self.nodes[id.0].name.local_name),
            None => "the top level".to_string(),
        }
    }

    fn misplaced(&self, kind: &SchemaKind, name: &str, parent: Option<SchemaId>) -> Error {
        let place = match parent {
            Some(pid) => format!("a {} ('{}')", self.nodes[pid.0].kind.keyword(), self.nodes[pid.0].name.local_name),
            None => "the top level".to_string(),
        };
        Error::Schema(format!("{} '{}' is not allowed in {}", kind.keyword(), name, place))
    }
}

fn is_choice(kind: &SchemaKind) -> bool {
    matches!(kind, SchemaKind::Choice { .. })
}

// kinds allowed in the body of a container, list, case, input, output or notification
fn is_body_kind(kind: &SchemaKind) -> bool {
    matches!(
        kind,
        SchemaKind::Container { .. }
            | SchemaKind::List { .. }
            | SchemaKind::Leaf { .. }
            | SchemaKind::LeafList { .. }
            | SchemaKind::Choice { .. }
            | SchemaKind::AnyData
            | SchemaKind::AnyXml
    )
}

fn check_bounds(name: &str, min: u32, max: Option<u32>) -> Result<()> {
    match max {
        Some(0) => Err(Error::Schema(format!("max-elements of '{}' must be positive", name))),
        Some(max) if max < min => Err(Error::Schema(format!(
            "min-elements {} of '{}' exceeds max-elements {}",
            min, name, max
        ))),
        _ => Ok(()),
    }
}
