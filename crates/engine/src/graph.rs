//! `GraphModel` — the mutable workflow topology.
//!
//! Invariants:
//! 1. Node ids are unique; re-adding a node is a no-op.
//! 2. Every edge references two nodes present in the graph.
//! 3. Re-adding an existing edge is a no-op.
//!
//! Nodes and edges keep insertion order, so every query and every
//! enumeration built on top of this type is deterministic.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{EngineError, models::Edge};

/// Why a graph admits no topological ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphDefect {
    /// At least one directed cycle exists.
    Cycle,
    /// The undirected graph has more than one component.
    Disconnected { components: usize },
}

impl std::fmt::Display for GraphDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cycle => write!(f, "graph contains a cycle"),
            Self::Disconnected { components } => {
                write!(f, "graph has {components} disconnected components")
            }
        }
    }
}

/// Raw serialized form; validated on the way in.
#[derive(Deserialize)]
struct GraphParts {
    #[serde(default)]
    nodes: Vec<String>,
    #[serde(default)]
    edges: Vec<Edge>,
}

/// Directed graph of node ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GraphParts")]
pub struct GraphModel {
    nodes: Vec<String>,
    edges: Vec<Edge>,
}

impl TryFrom<GraphParts> for GraphModel {
    type Error = EngineError;

    fn try_from(parts: GraphParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts.nodes, parts.edges)
    }
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph by replaying `add_node` for every node, then `add_edge`
    /// for every edge. Duplicates collapse.
    ///
    /// # Errors
    /// [`EngineError::NodeNotFound`] if an edge references an unknown node.
    pub fn from_parts(
        nodes: impl IntoIterator<Item = String>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Result<Self, EngineError> {
        let mut graph = Self::new();
        for id in nodes {
            graph.add_node(id);
        }
        for edge in edges {
            graph.add_edge(&edge.source, &edge.target)?;
        }
        Ok(graph)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Insert `id` if absent. Returns `true` if the graph changed.
    pub fn add_node(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.has_node(&id) {
            return false;
        }
        self.nodes.push(id);
        true
    }

    /// Remove `id` and every edge touching it. Returns `true` if the node existed.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n != id);
        if self.nodes.len() == before {
            return false;
        }
        self.edges.retain(|e| e.source != id && e.target != id);
        true
    }

    /// Insert the edge `source → target`. Returns `true` if the graph changed.
    ///
    /// # Errors
    /// [`EngineError::NodeNotFound`] if either endpoint is missing.
    pub fn add_edge(&mut self, source: &str, target: &str) -> Result<bool, EngineError> {
        for endpoint in [source, target] {
            if !self.has_node(endpoint) {
                return Err(EngineError::NodeNotFound(endpoint.to_owned()));
            }
        }
        if self.has_edge(source, target) {
            return Ok(false);
        }
        self.edges.push(Edge::new(source, target));
        Ok(true)
    }

    /// Remove the edge `source → target`. Returns `true` if it existed.
    pub fn remove_edge(&mut self, source: &str, target: &str) -> bool {
        let before = self.edges.len();
        self.edges
            .retain(|e| !(e.source == source && e.target == target));
        self.edges.len() != before
    }

    /// Drop every node and edge.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n == id)
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target)
    }

    /// Node ids in insertion order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct successors of `id`, in edge insertion order. Empty if none.
    pub fn successors(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.source == id)
            .map(|e| e.target.as_str())
            .collect()
    }

    /// Direct predecessors of `id`, in edge insertion order. Empty if none.
    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.target == id)
            .map(|e| e.source.as_str())
            .collect()
    }

    /// One topological ordering (Kahn's algorithm), or `None` if a cycle exists.
    pub fn topological_sort(&self) -> Option<Vec<String>> {
        // Build adjacency list and in-degree map.
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut in_degree: HashMap<&str, usize> = HashMap::new();

        for node in &self.nodes {
            adjacency.entry(node.as_str()).or_default();
            in_degree.entry(node.as_str()).or_insert(0);
        }

        for edge in &self.edges {
            adjacency
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
            *in_degree.entry(edge.target.as_str()).or_insert(0) += 1;
        }

        // Seed the queue with nodes that have no incoming edges, in
        // insertion order so the result is stable.
        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .map(String::as_str)
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();

        let mut sorted: Vec<String> = Vec::with_capacity(self.nodes.len());

        while let Some(node_id) = queue.pop_front() {
            sorted.push(node_id.to_owned());

            if let Some(neighbours) = adjacency.get(node_id) {
                for &neighbour in neighbours {
                    let deg = in_degree.entry(neighbour).or_insert(0);
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(neighbour);
                    }
                }
            }
        }

        // If we didn't visit every node the graph contains a cycle.
        (sorted.len() == self.nodes.len()).then_some(sorted)
    }

    /// `true` iff no directed cycle exists.
    pub fn is_acyclic(&self) -> bool {
        self.topological_sort().is_some()
    }

    /// Number of weakly-connected components. The empty graph counts as one.
    pub fn component_count(&self) -> usize {
        if self.nodes.is_empty() {
            return 1;
        }

        let mut neighbours: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            neighbours
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
            neighbours
                .entry(edge.target.as_str())
                .or_default()
                .push(edge.source.as_str());
        }

        let mut seen: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        let mut components = 0;

        for start in &self.nodes {
            if !seen.insert(start.as_str()) {
                continue;
            }
            components += 1;

            let mut queue = VecDeque::from([start.as_str()]);
            while let Some(id) = queue.pop_front() {
                for &next in neighbours.get(id).into_iter().flatten() {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        components
    }

    /// `true` iff the graph, ignoring direction, is one component.
    pub fn is_single_component(&self) -> bool {
        self.component_count() == 1
    }

    /// The first structural reason this graph has no topological ordering.
    pub fn defect(&self) -> Option<GraphDefect> {
        if !self.is_acyclic() {
            return Some(GraphDefect::Cycle);
        }
        match self.component_count() {
            1 => None,
            components => Some(GraphDefect::Disconnected { components }),
        }
    }

    /// Every node with a directed path to `id`, nearest first. Excludes `id`.
    pub fn ancestors(&self, id: &str) -> Vec<&str> {
        let mut seen: HashSet<&str> = HashSet::from([id]);
        let mut found = Vec::new();
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            for parent in self.predecessors(current) {
                if seen.insert(parent) {
                    found.push(parent);
                    queue.push_back(parent);
                }
            }
        }

        found
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> GraphModel {
        GraphModel::from_parts(
            nodes.iter().map(|n| n.to_string()),
            edges.iter().map(|(s, t)| Edge::new(*s, *t)),
        )
        .expect("edges reference known nodes")
    }

    #[test]
    fn add_node_is_idempotent() {
        let mut g = GraphModel::new();
        assert!(g.add_node("n"));
        assert!(!g.add_node("n"));
        assert_eq!(g.nodes(), ["n"]);
    }

    #[test]
    fn add_edge_is_idempotent() {
        let mut g = graph(&["a", "b"], &[]);
        assert!(g.add_edge("a", "b").expect("known nodes"));
        assert!(!g.add_edge("a", "b").expect("known nodes"));
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn edge_to_missing_node_is_rejected() {
        let mut g = graph(&["a"], &[]);
        assert!(matches!(
            g.add_edge("a", "ghost"),
            Err(EngineError::NodeNotFound(id)) if id == "ghost"
        ));
        assert!(matches!(
            g.add_edge("ghost", "a"),
            Err(EngineError::NodeNotFound(id)) if id == "ghost"
        ));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let mut g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(g.remove_node("b"));
        assert!(!g.remove_node("b"));
        assert_eq!(g.nodes(), ["a", "c"]);
        assert_eq!(g.edges(), [Edge::new("a", "c")]);
    }

    #[test]
    fn remove_edge_mutates_edge_set() {
        let mut g = graph(&["a", "b"], &[("a", "b")]);
        assert!(g.remove_edge("a", "b"));
        assert!(!g.has_edge("a", "b"));
        assert!(!g.remove_edge("a", "b"));
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn successors_and_predecessors() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        assert_eq!(g.successors("a"), vec!["b", "c"]);
        assert_eq!(g.predecessors("d"), vec!["b", "c"]);
        assert!(g.successors("d").is_empty());
        assert!(g.predecessors("missing").is_empty());
    }

    #[test]
    fn acyclicity() {
        assert!(graph(&["a", "b"], &[("a", "b")]).is_acyclic());
        assert!(!graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]).is_acyclic());
        assert!(!graph(&["a"], &[("a", "a")]).is_acyclic());
        assert!(GraphModel::new().is_acyclic());
    }

    #[test]
    fn connectivity_ignores_direction() {
        assert!(GraphModel::new().is_single_component());
        assert!(graph(&["solo"], &[]).is_single_component());
        assert!(graph(&["a", "b", "c"], &[("a", "c"), ("b", "c")]).is_single_component());

        let split = graph(&["a", "b", "c", "d"], &[("a", "b"), ("c", "d")]);
        assert_eq!(split.component_count(), 2);
        assert_eq!(split.defect(), Some(GraphDefect::Disconnected { components: 2 }));
    }

    #[test]
    fn reset_empties_graph() {
        let mut g = graph(&["a", "b"], &[("a", "b")]);
        g.reset();
        assert_eq!(g, GraphModel::new());
    }

    #[test]
    fn ancestors_walk_backwards() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        assert_eq!(g.ancestors("d"), vec!["b", "c", "a"]);
        assert!(g.ancestors("a").is_empty());
    }

    #[test]
    fn deserialisation_validates_edges() {
        let ok: GraphModel = serde_json::from_str(
            r#"{"nodes":["a","b","a"],"edges":[{"source":"a","target":"b"}]}"#,
        )
        .expect("valid graph");
        assert_eq!(ok.node_count(), 2);

        let bad = serde_json::from_str::<GraphModel>(
            r#"{"nodes":["a"],"edges":[{"source":"a","target":"b"}]}"#,
        );
        assert!(bad.is_err());
    }
}
