//! Enumeration of every topological ordering of a `GraphModel`.
//!
//! Graphs with a cycle or with more than one weakly-connected component
//! admit no orderings at all; the empty graph admits exactly one (the empty
//! ordering).
//!
//! The search is a complete backtracking walk. At each depth every
//! unvisited node whose in-degree has dropped to zero is a candidate. The
//! in-degree table and visited flags are shared by the whole walk, so each
//! `enter` is paired with a `leave` before the next sibling is tried.

use std::ops::ControlFlow;

use tracing::debug;

use crate::GraphModel;

/// Index-based snapshot of a graph plus the mutable search state.
struct Search<'g> {
    ids: Vec<&'g str>,
    successors: Vec<Vec<usize>>,
    in_degree: Vec<usize>,
    visited: Vec<bool>,
    stack: Vec<usize>,
}

impl<'g> Search<'g> {
    fn new(graph: &'g GraphModel) -> Self {
        let ids: Vec<&str> = graph.nodes().iter().map(String::as_str).collect();
        let index_of = |id: &str| ids.iter().position(|n| *n == id);

        let mut successors = vec![Vec::new(); ids.len()];
        let mut in_degree = vec![0; ids.len()];
        for edge in graph.edges() {
            // GraphModel guarantees both endpoints exist.
            if let (Some(s), Some(t)) = (index_of(edge.source.as_str()), index_of(edge.target.as_str())) {
                successors[s].push(t);
                in_degree[t] += 1;
            }
        }

        Self {
            visited: vec![false; ids.len()],
            stack: Vec::with_capacity(ids.len()),
            ids,
            successors,
            in_degree,
        }
    }

    fn enter(&mut self, node: usize) {
        self.visited[node] = true;
        self.stack.push(node);
        for &next in &self.successors[node] {
            self.in_degree[next] -= 1;
        }
    }

    fn leave(&mut self, node: usize) {
        for &next in &self.successors[node] {
            self.in_degree[next] += 1;
        }
        self.visited[node] = false;
        self.stack.pop();
    }

    fn walk<F>(&mut self, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&[&str]) -> ControlFlow<()>,
    {
        if self.stack.len() == self.ids.len() {
            let order: Vec<&str> = self.stack.iter().map(|&i| self.ids[i]).collect();
            return visit(&order);
        }

        for node in 0..self.ids.len() {
            if self.visited[node] || self.in_degree[node] != 0 {
                continue;
            }
            self.enter(node);
            let flow = self.walk(visit);
            self.leave(node);
            if flow.is_break() {
                return flow;
            }
        }

        ControlFlow::Continue(())
    }
}

/// Call `visit` with every topological ordering of `graph`, in a fixed order
/// derived from node insertion order, until it returns `Break`.
///
/// Returns `Break` if the visitor stopped the walk early.
pub fn for_each_order<F>(graph: &GraphModel, mut visit: F) -> ControlFlow<()>
where
    F: FnMut(&[&str]) -> ControlFlow<()>,
{
    if !graph.is_acyclic() || !graph.is_single_component() {
        debug!(
            nodes = graph.node_count(),
            "graph is cyclic or disconnected; no orderings"
        );
        return ControlFlow::Continue(());
    }

    Search::new(graph).walk(&mut visit)
}

/// Every topological ordering of `graph`. Empty if the graph is cyclic or
/// disconnected.
pub fn enumerate_all_orders(graph: &GraphModel) -> Vec<Vec<String>> {
    let mut orders = Vec::new();
    let _ = for_each_order(graph, |order| {
        orders.push(order.iter().map(|id| id.to_string()).collect());
        ControlFlow::Continue(())
    });
    orders
}

/// Number of topological orderings, without materialising them.
pub fn count_orders(graph: &GraphModel) -> usize {
    let mut count = 0;
    let _ = for_each_order(graph, |_| {
        count += 1;
        ControlFlow::Continue(())
    });
    count
}
