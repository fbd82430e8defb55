//! Typed stage templates.
//!
//! Connection and condition kinds are closed enums tagged on `type`, so an
//! unknown kind fails when the template is parsed rather than when it is
//! first resolved.

use crate::model::Direction;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

/// Raw metadata block (`data:`) mapping field names to descriptors.
pub type DataBlock = IndexMap<String, serde_json::Value>;

/// Port templates keyed by direction, then by port name.
pub type PortMap = IndexMap<Direction, IndexMap<String, PortTemplate>>;

fn default_item() -> String {
    "item".to_string()
}

/// Treats an explicit `null` like a missing key.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The `stages` section: stage kind to template.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphConfig {
    /// Stage templates in declaration order.
    #[serde(default, deserialize_with = "nullable")]
    pub stages: IndexMap<String, StageTemplate>,
}

/// Template for one stage kind.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StageTemplate {
    /// Default stage metadata.
    #[serde(default, deserialize_with = "nullable")]
    pub data: DataBlock,
    /// Workspaces, stage-scope ports and conditional branches.
    #[serde(flatten)]
    pub body: StageBody,
}

/// The cascading part of a stage template. Conditional branches carry the
/// same shape, so they may add workspaces, stage ports or further branches.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StageBody {
    /// Workspaces in declaration order.
    #[serde(default, deserialize_with = "nullable")]
    pub workspaces: IndexMap<String, WorkspaceTemplate>,
    /// Ports declared directly on the stage.
    #[serde(default, deserialize_with = "nullable")]
    pub ports: PortMap,
    /// Branches taken when all of their conditions hold.
    #[serde(default, deserialize_with = "nullable")]
    pub conditional: Vec<Conditional<StageBody>>,
}

/// Template for one workspace.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkspaceTemplate {
    /// Workspace metadata.
    #[serde(default, deserialize_with = "nullable")]
    pub data: DataBlock,
    /// Ports and conditional branches.
    #[serde(flatten)]
    pub body: PortBody,
}

/// The cascading part of a workspace template.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PortBody {
    /// Ports in declaration order.
    #[serde(default, deserialize_with = "nullable")]
    pub ports: PortMap,
    /// Branches taken when all of their conditions hold.
    #[serde(default, deserialize_with = "nullable")]
    pub conditional: Vec<Conditional<PortBody>>,
}

/// A conditional branch: a body that only applies when every condition
/// holds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Conditional<T> {
    /// Conditions, evaluated in order with short-circuit.
    #[serde(default, deserialize_with = "nullable")]
    pub conditions: Vec<ConditionSpec>,
    /// The branch contents.
    #[serde(flatten)]
    pub body: T,
}

/// Template for one port.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PortTemplate {
    /// Accepts more than one connection.
    #[serde(default)]
    pub multi: bool,
    /// Merged into a same-named port at stage scope.
    #[serde(default)]
    pub promote: bool,
    /// Port metadata.
    #[serde(default, deserialize_with = "nullable")]
    pub data: DataBlock,
    /// Connections feeding this port.
    #[serde(default, deserialize_with = "nullable")]
    pub connections: Vec<ConnectionSpec>,
}

/// How the source of a connection is found.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionSpec {
    /// A port inside the same stage.
    Internal(InternalConnection),
    /// One connection per qualifying item of a runtime sequence.
    External(ExternalConnection),
    /// A port on the enclosing stage.
    Promoted(PromotedConnection),
    /// A port on a named child workspace.
    Demoted(DemotedConnection),
}

impl ConnectionSpec {
    /// Returns the configuration name of the connection type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Internal(_) => "internal",
            Self::External(_) => "external",
            Self::Promoted(_) => "promoted",
            Self::Demoted(_) => "demoted",
        }
    }

    /// Returns the metadata copied onto each resolved connection.
    #[must_use]
    pub fn data(&self) -> &DataBlock {
        match self {
            Self::Internal(spec) => &spec.data,
            Self::External(spec) => &spec.data,
            Self::Promoted(spec) => &spec.data,
            Self::Demoted(spec) => &spec.data,
        }
    }
}

/// `type: internal`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InternalConnection {
    /// Child workspace of the stage holding the source port.
    pub workspace: Option<String>,
    /// Source port direction; defaults to output.
    pub port_type: Option<Direction>,
    /// Source port name.
    pub port_name: String,
    /// Group expression.
    pub group: Option<String>,
    /// Connection metadata.
    #[serde(default, deserialize_with = "nullable")]
    pub data: DataBlock,
}

/// `type: external` (alias `foreach`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExternalConnection {
    /// Child workspace of each item's node holding the source port.
    pub workspace: Option<String>,
    /// Source port direction; defaults to output.
    pub port_type: Option<Direction>,
    /// Source port name.
    pub port_name: String,
    /// The loop driving the fan-out.
    pub foreach: ForeachSpec,
    /// Connection metadata.
    #[serde(default, deserialize_with = "nullable")]
    pub data: DataBlock,
}

/// `type: promoted`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PromotedConnection {
    /// Stage port direction; defaults to input.
    pub port_type: Option<Direction>,
    /// Stage port name; defaults to the target's name.
    pub port_name: Option<String>,
    /// Group expression.
    pub group: Option<String>,
    /// Connection metadata.
    #[serde(default, deserialize_with = "nullable")]
    pub data: DataBlock,
}

/// `type: demoted`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DemotedConnection {
    /// Child workspace holding the source port.
    pub workspace: String,
    /// Source port direction; defaults to the target's direction.
    pub port_type: Option<Direction>,
    /// Source port name; defaults to the target's name.
    pub port_name: Option<String>,
    /// Group expression.
    pub group: Option<String>,
    /// Connection metadata.
    #[serde(default, deserialize_with = "nullable")]
    pub data: DataBlock,
}

/// A `foreach` block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForeachSpec {
    /// Expression resolving to the sequence to iterate.
    #[serde(rename = "loop")]
    pub loop_over: String,
    /// Expression resolving to the source node, with `item` bound.
    #[serde(default = "default_item")]
    pub item: String,
    /// Per-item gate.
    #[serde(default, deserialize_with = "nullable")]
    pub conditions: Vec<ConditionSpec>,
    /// Group expression, with `item` bound.
    pub group: Option<String>,
}

/// A condition gating a conditional branch or a foreach item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConditionSpec {
    /// Truthiness of an expression, optionally inverted.
    Boolean {
        /// Expression to test.
        source: String,
        /// Negates the result.
        #[serde(default)]
        invert: bool,
    },
    /// Compares two expressions.
    Comparison {
        /// Left-hand expression.
        source: String,
        /// Right-hand expression.
        target: String,
        /// Operator.
        comparison: ComparisonOperator,
    },
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    /// `source` is a member of `target`.
    In,
}
