//! Collaborator contracts: resolving nodes by id and executing a single node.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{Node, NodeError, NodeLookup};

/// Variable name → value.
pub type VariableMap = HashMap<String, String>;

/// Read-only view of a run passed to every node during execution.
///
/// Defined here (in the nodes crate) so both the engine and individual node
/// implementations can import it without a circular dependency.
#[derive(Debug, Clone, Default)]
pub struct NodeContext {
    /// Zero-based position of the node in the execution order.
    pub position: usize,
    /// Number of nodes in the execution order.
    pub total: usize,
    /// Variables produced so far in this run.
    pub local_variables: VariableMap,
    /// Variables that outlive a single run.
    pub global_variables: VariableMap,
}

/// Resolves node records by identifier.
///
/// A missing node is a normal answer (`NodeLookup::NotFound`), not an error.
#[async_trait]
pub trait NodeRepository: Send + Sync {
    async fn get_node_by_id(&self, id: &str) -> NodeLookup;

    /// Display name of the node, if it exists.
    async fn node_name(&self, id: &str) -> Option<String> {
        self.get_node_by_id(id)
            .await
            .into_option()
            .map(|node| node.display_name().to_owned())
    }
}

/// The core node trait.
///
/// The runner hands over the node record and its prompt already rendered
/// with the current variable scopes. The returned map holds the node's
/// output variables.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    async fn execute(
        &self,
        node: &Node,
        prompt: &str,
        ctx: &NodeContext,
    ) -> Result<VariableMap, NodeError>;
}
