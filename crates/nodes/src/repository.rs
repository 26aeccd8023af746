//! In-memory `NodeRepository`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{Node, NodeLookup, NodeRepository};

/// A `NodeRepository` backed by a map, for the CLI and tests.
#[derive(Debug, Default)]
pub struct InMemoryNodeRepository {
    nodes: RwLock<HashMap<String, Node>>,
}

impl InMemoryNodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository holding `nodes`. Later duplicates replace earlier ones.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let nodes = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    /// Insert or replace a node. Returns the previous record, if any.
    pub async fn insert(&self, node: Node) -> Option<Node> {
        let previous = self.nodes.write().await.insert(node.id.clone(), node);
        if let Some(old) = &previous {
            debug!("node '{}' replaced", old.id);
        }
        previous
    }

    pub async fn remove(&self, id: &str) -> Option<Node> {
        self.nodes.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }
}

#[async_trait]
impl NodeRepository for InMemoryNodeRepository {
    async fn get_node_by_id(&self, id: &str) -> NodeLookup {
        self.nodes.read().await.get(id).cloned().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeType;

    #[tokio::test]
    async fn lookup_found_and_not_found() {
        let repo = InMemoryNodeRepository::from_nodes([Node::new("a", NodeType::Prompt)]);

        assert!(repo.get_node_by_id("a").await.is_found());
        assert_eq!(repo.get_node_by_id("ghost").await, NodeLookup::NotFound);
    }

    #[tokio::test]
    async fn node_name_uses_display_name() {
        let repo = InMemoryNodeRepository::new();
        repo.insert(Node::new("a", NodeType::Prompt).with_name("Draft")).await;
        repo.insert(Node::new("b", NodeType::Prompt)).await;

        assert_eq!(repo.node_name("a").await.as_deref(), Some("Draft"));
        assert_eq!(repo.node_name("b").await.as_deref(), Some("b"));
        assert_eq!(repo.node_name("c").await, None);
    }

    #[tokio::test]
    async fn insert_replaces_and_remove_deletes() {
        let repo = InMemoryNodeRepository::new();
        assert!(repo.insert(Node::new("a", NodeType::Prompt)).await.is_none());
        assert!(repo.insert(Node::new("a", NodeType::Process)).await.is_some());
        assert_eq!(repo.len().await, 1);

        assert!(repo.remove("a").await.is_some());
        assert!(repo.is_empty().await);
    }
}
