//! Validation infrastructure
//!
//! This module provides the immutable options of one validation run (what
//! kind of data the tree represents, how case conflicts and false `when`
//! conditions are handled) and the validation context that carries them
//! together with the collaborators and the deferred-resolution queue.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data_tree::{DataTree, NodeId};
use crate::error::Result;
use crate::limits::Limits;

use super::base::{ConditionEvaluator, ConditionResult, ValueComparator};
use super::builtins::CanonicalComparator;
use super::features::FeatureSet;
use super::resolution::DeferredQueue;
use super::schemas::WhenCondition;

/// What a data tree represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataKind {
    /// Complete datastore contents (configuration and state)
    #[default]
    Data,
    /// Complete configuration datastore contents
    Config,
    /// Reply to a get operation (partial, state allowed)
    Get,
    /// Reply to a get-config operation (partial, no state)
    GetConfig,
    /// Content of an edit operation (partial, no state)
    Edit,
    /// rpc or action input
    RpcRequest,
    /// rpc or action output
    RpcReply,
    /// Notification content
    Notification,
}

impl DataKind {
    /// Whether the data may be incomplete
    pub fn is_partial(&self) -> bool {
        matches!(self, DataKind::Edit | DataKind::Get | DataKind::GetConfig)
    }

    /// Whether state (read-only) data is forbidden
    pub fn forbids_state(&self) -> bool {
        matches!(self, DataKind::Edit | DataKind::Config | DataKind::GetConfig)
    }

    /// Whether the data is an rpc payload
    pub fn is_rpc(&self) -> bool {
        matches!(self, DataKind::RpcRequest | DataKind::RpcReply)
    }
}

/// Handling of case conflicts found by the content validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CasePolicy {
    /// Remove the data of the other case; the newest selection wins
    #[default]
    AutoDelete,
    /// Report a case conflict and keep the tree unchanged
    Report,
}

/// Options of one validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// What the tree represents
    pub data_kind: DataKind,
    /// Case conflict handling
    pub case_policy: CasePolicy,
    /// Remove nodes whose when condition is false without reporting them
    pub when_autodelete: bool,
}

impl ValidationOptions {
    /// Create default options (complete data, auto-delete case conflicts)
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Options for edit content
    pub fn edit() -> Self {
        Self::new().with_data_kind(DataKind::Edit)
    }

    /// Options for rpc input
    pub fn rpc_request() -> Self {
        Self::new().with_data_kind(DataKind::RpcRequest)
    }

    /// Options for rpc output
    pub fn rpc_reply() -> Self {
        Self::new().with_data_kind(DataKind::RpcReply)
    }

    /// Set the data kind
    pub fn with_data_kind(mut self, data_kind: DataKind) -> Self {
        self.data_kind = data_kind;
        self
    }

    /// Set the case conflict policy
    pub fn with_case_policy(mut self, policy: CasePolicy) -> Self {
        self.case_policy = policy;
        self
    }

    /// Enable silent removal of nodes with a false when condition
    pub fn with_when_autodelete(mut self, enabled: bool) -> Self {
        self.when_autodelete = enabled;
        self
    }

    /// Whether the tree is edit content
    pub fn is_edit(&self) -> bool {
        self.data_kind == DataKind::Edit
    }

    /// Whether positional ordering is enforced
    pub fn checks_order(&self) -> bool {
        self.data_kind.is_rpc()
    }

    /// Whether mandatory and element-count rules apply
    pub fn checks_cardinality(&self) -> bool {
        !self.data_kind.is_partial()
    }

    /// Whether case conflicts are resolved by pruning
    pub fn autodelete_cases(&self) -> bool {
        self.case_policy == CasePolicy::AutoDelete
    }
}

/// Validation context for one run over a data tree
///
/// Holds the options, the enabled features, the limits, the `when`
/// evaluator and value comparator, and the queue of nodes whose conditions
/// are still pending.
pub struct ValidationContext {
    /// Options of the run
    pub options: ValidationOptions,
    /// Enabled features
    pub features: FeatureSet,
    /// Resource limits
    pub limits: Limits,
    /// Nodes with pending `when` conditions
    pub queue: DeferredQueue,
    evaluator: Box<dyn ConditionEvaluator>,
    comparator: Box<dyn ValueComparator>,
}

fn always_true(_: &WhenCondition, _: &DataTree, _: Option<NodeId>) -> ConditionResult {
    ConditionResult::True
}

impl ValidationContext {
    /// Create a context with the given options
    ///
    /// Without an evaluator every `when` condition holds.
    pub fn new(options: ValidationOptions) -> Self {
        Self {
            options,
            features: FeatureSet::new(),
            limits: Limits::default(),
            queue: DeferredQueue::new(),
            evaluator: Box::new(always_true),
            comparator: Box::new(CanonicalComparator::new()),
        }
    }

    /// Set the enabled features
    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the `when` evaluator
    pub fn with_evaluator(mut self, evaluator: impl ConditionEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    /// Set the value comparator
    pub fn with_comparator(mut self, comparator: impl ValueComparator + 'static) -> Self {
        self.comparator = Box::new(comparator);
        self
    }

    /// The `when` evaluator
    pub fn evaluator(&self) -> &dyn ConditionEvaluator {
        self.evaluator.as_ref()
    }

    /// The value comparator
    pub fn comparator(&self) -> &dyn ValueComparator {
        self.comparator.as_ref()
    }

    /// Whether a node's condition is pending
    pub fn is_pending(&self, node: NodeId) -> bool {
        self.queue.contains(node)
    }
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::new(ValidationOptions::default())
    }
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("options", &self.options)
            .field("features", &self.features)
            .field("limits", &self.limits)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}
