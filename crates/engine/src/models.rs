//! Serializable domain models shared by the session and the CLI.

use serde::{Deserialize, Serialize};

use nodes::{Node, VariableMap};

use crate::{EngineError, GraphModel};
use crate::validator::{ContractMap, VariableContract};

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// Directed edge: `source` runs before `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowDefinition
// ---------------------------------------------------------------------------

/// A complete workflow as stored on disk: node records, edges and the
/// variables available before the first node runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub initial_variables: Vec<String>,
    /// Seed values for the global variable scope.
    #[serde(default)]
    pub global_variables: VariableMap,
}

impl WorkflowDefinition {
    /// Build the graph topology described by this definition.
    ///
    /// # Errors
    /// [`EngineError::NodeNotFound`] if an edge references a node that is not
    /// listed in `nodes`.
    pub fn graph(&self) -> Result<GraphModel, EngineError> {
        GraphModel::from_parts(
            self.nodes.iter().map(|n| n.id.clone()),
            self.edges.iter().cloned(),
        )
    }

    /// Variable contracts of every listed node, keyed by node id.
    pub fn contracts(&self) -> ContractMap {
        self.nodes
            .iter()
            .map(|n| (n.id.clone(), VariableContract::from(n)))
            .collect()
    }
}
