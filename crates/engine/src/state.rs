//! Snapshot types: what the session holds and what observers receive.

use serde::{Deserialize, Serialize};

use nodes::Node;

use crate::{ExecutionContext, GraphModel};

/// Tag recorded with every graph mutation so observers can render the latest
/// change without diffing. The engine never branches on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LastAction {
    AddNode,
    AddEdge,
    RemoveNode,
    RemoveEdge,
    SelectNode,
    SelectEdge,
    DeselectNode,
    DeselectEdge,
    UpdateNode,
    UpdateEdge,
    ResetGraph,
    #[default]
    None,
}

/// The item a mutation acted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActedOn {
    Node { id: String, name: String },
    Edge { source: String, target: String },
}

impl ActedOn {
    pub fn node(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Node {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn edge(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Edge {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Topology plus the bookkeeping of the last edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    pub graph: GraphModel,
    pub last_action: LastAction,
    pub acted_on: Option<ActedOn>,
    /// What `acted_on` held before the most recent selection.
    pub last_acted_on: Option<ActedOn>,
    /// Display name of the node last acted on, if any.
    pub name: Option<String>,
}

/// Everything a session owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub graph_state: GraphState,
    pub execution: ExecutionContext,
    pub selected_node: Option<Node>,
}

/// Serialized notification sent on the message channel after a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateBundle {
    pub action: LastAction,
    pub acted_on: Option<ActedOn>,
    pub graph: GraphModel,
}

impl From<&GraphState> for StateBundle {
    fn from(state: &GraphState) -> Self {
        Self {
            action: state.last_action,
            acted_on: state.acted_on.clone(),
            graph: state.graph.clone(),
        }
    }
}
