//! `Session` — the single owner of a `SystemState` for one editing/execution
//! session.
//!
//! Every graph mutation:
//! 1. changes the `GraphModel`,
//! 2. records a `LastAction` tag and the item acted on,
//! 3. invalidates a held execution order if the topology changed,
//! 4. sends a serialized `StateBundle` on the message channel (best effort).
//!
//! Node records are resolved through the `NodeRepository`; the session never
//! stores node content in the graph.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nodes::{Node, NodeLookup, NodeRepository, NodeType};

use crate::{
    ActedOn, EngineError, ExecutionContext, GraphModel, LastAction, MessageChannel,
    StateBundle, StateStore, SystemState,
};
use crate::validator::{find_satisfiable_order, ContractMap, VariableContract};

/// A session shared between tasks. Every operation takes the one lock.
pub type SharedSession = Arc<Mutex<Session>>;

pub struct Session {
    state: SystemState,
    repository: Arc<dyn NodeRepository>,
    channel: Option<Arc<dyn MessageChannel>>,
}

impl Session {
    /// A session over an empty state.
    pub fn new(repository: Arc<dyn NodeRepository>) -> Self {
        Self {
            state: SystemState::default(),
            repository,
            channel: None,
        }
    }

    /// Start from a snapshot held in `store`.
    pub async fn open(store: &dyn StateStore, repository: Arc<dyn NodeRepository>) -> Self {
        Self::new(repository).with_state(store.get_snapshot().await)
    }

    pub fn with_state(mut self, state: SystemState) -> Self {
        self.state = state;
        self
    }

    pub fn with_channel(mut self, channel: Arc<dyn MessageChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Write the current state back to `store`.
    pub async fn commit(&self, store: &dyn StateStore) {
        store.set_snapshot(self.state.clone()).await;
    }

    /// End the session, returning its state.
    pub fn close(self) -> SystemState {
        self.state
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> &SystemState {
        &self.state
    }

    pub fn graph(&self) -> &GraphModel {
        &self.state.graph_state.graph
    }

    pub fn execution(&self) -> &ExecutionContext {
        &self.state.execution
    }

    pub fn execution_mut(&mut self) -> &mut ExecutionContext {
        &mut self.state.execution
    }

    pub fn repository(&self) -> &Arc<dyn NodeRepository> {
        &self.repository
    }

    // -----------------------------------------------------------------------
    // Graph mutation
    // -----------------------------------------------------------------------

    pub async fn add_node(&mut self, id: &str) {
        let changed = self.state.graph_state.graph.add_node(id);
        let name = self.repository.node_name(id).await;
        self.record_node(LastAction::AddNode, id, name.clone().unwrap_or_default(), name, changed)
            .await;
    }

    pub async fn remove_node(&mut self, id: &str) {
        let name = self.repository.node_name(id).await;
        let changed = self.state.graph_state.graph.remove_node(id);
        let acted_name = name.clone().unwrap_or_else(|| "unknown".to_owned());
        self.record_node(LastAction::RemoveNode, id, acted_name, name, changed)
            .await;
    }

    /// # Errors
    /// [`EngineError::NodeNotFound`] if either endpoint is not in the graph.
    pub async fn add_edge(&mut self, source: &str, target: &str) -> Result<(), EngineError> {
        let changed = self.state.graph_state.graph.add_edge(source, target)?;
        self.record_edge(LastAction::AddEdge, source, target, changed)
            .await;
        Ok(())
    }

    pub async fn remove_edge(&mut self, source: &str, target: &str) {
        let changed = self.state.graph_state.graph.remove_edge(source, target);
        self.record_edge(LastAction::RemoveEdge, source, target, changed)
            .await;
    }

    /// Tag an edit of a node's record (held by the repository).
    pub async fn update_node(&mut self, id: &str) {
        let name = self.repository.node_name(id).await;
        self.record_node(LastAction::UpdateNode, id, name.clone().unwrap_or_default(), name, false)
            .await;
    }

    /// Tag an edit of an edge's attributes.
    pub async fn update_edge(&mut self, source: &str, target: &str) {
        self.record_edge(LastAction::UpdateEdge, source, target, false)
            .await;
    }

    pub async fn reset_graph(&mut self) {
        self.state.graph_state.graph.reset();
        self.state.graph_state.acted_on = None;
        self.state.graph_state.name = None;
        self.finish(LastAction::ResetGraph, true).await;
    }

    /// Clear the last-action bookkeeping.
    pub async fn reset_last_action(&mut self) {
        self.state.graph_state.acted_on = None;
        self.finish(LastAction::None, false).await;
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Select a node known to the repository. Returns `false` (and changes
    /// nothing) if the repository does not have it.
    pub async fn select_node(&mut self, id: &str) -> bool {
        let node = match self.repository.get_node_by_id(id).await {
            NodeLookup::Found(node) => node,
            NodeLookup::NotFound => {
                debug!("select ignored: node '{}' not in repository", id);
                return false;
            }
        };

        let graph_state = &mut self.state.graph_state;
        graph_state.last_acted_on = graph_state.acted_on.take();
        graph_state.acted_on = Some(ActedOn::node(id, node.display_name()));
        graph_state.name = Some(node.display_name().to_owned());
        self.state.selected_node = Some(node);
        self.finish(LastAction::SelectNode, false).await;
        true
    }

    pub async fn deselect_node(&mut self) {
        self.state.selected_node = None;
        self.state.graph_state.name = None;
        self.finish(LastAction::DeselectNode, false).await;
    }

    pub async fn select_edge(&mut self, source: &str, target: &str) {
        let graph_state = &mut self.state.graph_state;
        graph_state.last_acted_on = graph_state.acted_on.take();
        graph_state.acted_on = Some(ActedOn::edge(source, target));
        graph_state.name = None;
        self.finish(LastAction::SelectEdge, false).await;
    }

    pub async fn deselect_edge(&mut self) {
        self.state.graph_state.acted_on = None;
        self.finish(LastAction::DeselectEdge, false).await;
    }

    /// Remove the node recorded as last acted on, if that was a node.
    pub async fn remove_selected_node(&mut self) {
        if let Some(ActedOn::Node { id, .. }) = self.state.graph_state.acted_on.clone() {
            self.remove_node(&id).await;
        }
    }

    /// Remove the selected edge. Only acts right after `select_edge`.
    pub async fn remove_selected_edge(&mut self) {
        if self.state.graph_state.last_action != LastAction::SelectEdge {
            debug!("no edge selected; nothing removed");
            return;
        }
        if let Some(ActedOn::Edge { source, target }) = self.state.graph_state.acted_on.clone() {
            self.remove_edge(&source, &target).await;
        }
    }

    /// Replace the graph with `process`: nodes the repository does not know
    /// are skipped, and edges are added source by source in topological order.
    pub async fn load_process(&mut self, process: &GraphModel) {
        self.reset_graph().await;

        for id in process.nodes() {
            if self.repository.get_node_by_id(id).await.is_found() {
                self.add_node(id).await;
            } else {
                warn!("process node '{}' not in repository; skipped", id);
            }
        }

        let sources = process
            .topological_sort()
            .unwrap_or_else(|| process.nodes().to_vec());
        for source in &sources {
            for target in process.successors(source) {
                if let Err(e) = self.add_edge(source, target).await {
                    warn!("process edge {} -> {} skipped: {}", source, target, e);
                }
            }
        }

        info!(
            nodes = self.graph().node_count(),
            edges = self.graph().edge_count(),
            "process loaded"
        );
    }

    // -----------------------------------------------------------------------
    // Planning
    // -----------------------------------------------------------------------

    /// Contracts of every graph node the repository knows. Unknown nodes are
    /// left out, so any ordering containing them is rejected.
    pub async fn variable_contracts(&self) -> ContractMap {
        let mut contracts = ContractMap::new();
        for id in self.graph().nodes() {
            match self.repository.get_node_by_id(id).await {
                NodeLookup::Found(node) => {
                    contracts.insert(id.clone(), VariableContract::from(&node));
                }
                NodeLookup::NotFound => debug!("no contract for node '{}'", id),
            }
        }
        contracts
    }

    /// First ordering of the current graph that satisfies every node's inputs.
    ///
    /// # Errors
    /// See [`find_satisfiable_order`].
    pub async fn find_plan(
        &self,
        initial_variables: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, EngineError> {
        let contracts = self.variable_contracts().await;
        find_satisfiable_order(self.graph(), initial_variables, &contracts, cancel)
    }

    /// [`Session::find_plan`] seeded with the selected process's initial
    /// variables.
    ///
    /// # Errors
    /// [`EngineError::NoProcessSelected`] unless a `Process` node is selected.
    pub async fn find_plan_for_selected_process(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, EngineError> {
        let initial = match &self.state.selected_node {
            Some(node) if node.node_type == NodeType::Process => node.initial_variables(),
            _ => return Err(EngineError::NoProcessSelected),
        };
        self.find_plan(&initial, cancel).await
    }

    /// Begin a run over `order`.
    ///
    /// # Errors
    /// See [`ExecutionContext::start`].
    pub fn start_execution(&mut self, order: Vec<String>) -> Result<(), EngineError> {
        self.state.execution.start(order)
    }

    pub fn set_local_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.state.execution.set_local_variable(name, value);
    }

    pub fn set_global_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.state.execution.set_global_variable(name, value);
    }

    pub fn global_variable_names(&self) -> Vec<&str> {
        self.state.execution.global_variable_names()
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Records of every ancestor of `id` the repository knows, nearest first.
    pub async fn ancestors(&self, id: &str) -> Vec<Node> {
        let mut found = Vec::new();
        for ancestor in self.graph().ancestors(id) {
            if let NodeLookup::Found(node) = self.repository.get_node_by_id(ancestor).await {
                found.push(node);
            }
        }
        found
    }

    /// Output variables of the node right before `id` in the execution order.
    pub async fn parent_output_variables(&self, id: &str) -> Option<Vec<String>> {
        let parent = self.state.execution.previous_node(id)?;
        self.repository
            .get_node_by_id(parent)
            .await
            .into_option()
            .map(|node| node.output_variables)
    }

    // -----------------------------------------------------------------------
    // Internal: bookkeeping and notification
    // -----------------------------------------------------------------------

    async fn record_node(
        &mut self,
        action: LastAction,
        id: &str,
        acted_name: String,
        name: Option<String>,
        changed: bool,
    ) {
        self.state.graph_state.acted_on = Some(ActedOn::node(id, acted_name));
        self.state.graph_state.name = name;
        self.finish(action, changed).await;
    }

    async fn record_edge(&mut self, action: LastAction, source: &str, target: &str, changed: bool) {
        self.state.graph_state.acted_on = Some(ActedOn::edge(source, target));
        self.state.graph_state.name = None;
        self.finish(action, changed).await;
    }

    async fn finish(&mut self, action: LastAction, topology_changed: bool) {
        self.state.graph_state.last_action = action;

        if topology_changed && !self.state.execution.order().is_empty() {
            debug!("graph changed; execution order invalidated");
            self.state.execution.invalidate();
        }

        self.publish().await;
    }

    async fn publish(&self) {
        let Some(channel) = &self.channel else {
            return;
        };

        let bundle = StateBundle::from(&self.state.graph_state);
        match serde_json::to_string(&bundle) {
            Ok(message) => {
                if let Err(e) = channel.send(message).await {
                    warn!("state notification dropped: {}", e);
                }
            }
            Err(e) => warn!("state notification not serialized: {}", e),
        }
    }
}
