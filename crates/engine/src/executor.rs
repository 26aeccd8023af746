//! Workflow execution engine.
//!
//! `WorkflowExecutor` drives a started `ExecutionContext` node by node:
//! 1. Resolves the current node through the `NodeRepository`.
//! 2. Renders its prompt template with the merged scope (locals shadow globals).
//! 3. Dispatches it to the `ExecutableNode` registered for its type.
//! 4. Stores the returned output variables in the local scope.
//! 5. Advances the cursor.
//!
//! `NodeError::Retryable` is retried up to `max_retries` with exponential
//! back-off; `NodeError::Fatal` aborts immediately.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use nodes::{ExecutableNode, Node, NodeContext, NodeError, NodeLookup, NodeRepository, NodeType, VariableMap};

use crate::{Cursor, EngineError, ExecutionContext};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of times a retryable node failure will be retried.
    pub max_retries: u32,
    /// Base delay for exponential back-off between retries.
    pub retry_base_delay: Duration,
    /// Upper bound on a single back-off delay.
    pub max_retry_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// Node registry
// ---------------------------------------------------------------------------

/// Maps node types to `ExecutableNode` implementations.
pub type NodeRegistry = HashMap<NodeType, Arc<dyn ExecutableNode>>;

// ---------------------------------------------------------------------------
// Output of a completed execution
// ---------------------------------------------------------------------------

/// The result of running an order to completion.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Node ids in the order they were executed.
    pub executed: Vec<String>,
    /// The local scope after the last node.
    pub local_variables: VariableMap,
}

// ---------------------------------------------------------------------------
// WorkflowExecutor
// ---------------------------------------------------------------------------

/// Stateless orchestrator; all run state lives in the `ExecutionContext`.
pub struct WorkflowExecutor {
    repository: Arc<dyn NodeRepository>,
    registry: NodeRegistry,
    config: ExecutorConfig,
}

impl WorkflowExecutor {
    pub fn new(
        repository: Arc<dyn NodeRepository>,
        registry: NodeRegistry,
        config: ExecutorConfig,
    ) -> Self {
        Self { repository, registry, config }
    }

    /// Execute every remaining node of a running context.
    ///
    /// # Errors
    /// Anything [`WorkflowExecutor::step`] returns. The cursor stays on the
    /// failing node.
    #[instrument(skip(self, ctx), fields(nodes = ctx.order().len()))]
    pub async fn run(&self, ctx: &mut ExecutionContext) -> Result<ExecutionResult, EngineError> {
        let mut executed = Vec::with_capacity(ctx.order().len());

        while ctx.is_running() {
            executed.push(self.step(ctx).await?);
        }

        info!("execution finished after {} nodes", executed.len());
        Ok(ExecutionResult {
            executed,
            local_variables: ctx.local_variables().clone(),
        })
    }

    /// Execute the node under the cursor, then advance. Returns its id.
    ///
    /// # Errors
    /// - [`EngineError::ExecutionNotStarted`] / [`EngineError::AdvancePastCompletion`]
    ///   if the context is not running.
    /// - [`EngineError::NodeNotFound`] if the repository lacks the node.
    /// - [`EngineError::NodeFatal`] / [`EngineError::NodeRetryExhausted`] on node failure.
    pub async fn step(&self, ctx: &mut ExecutionContext) -> Result<String, EngineError> {
        let (node_id, position) = match (ctx.cursor(), ctx.current_node()) {
            (Cursor::Running(index), Some(id)) => (id.to_owned(), index),
            (Cursor::Completed, _) => return Err(EngineError::AdvancePastCompletion),
            _ => return Err(EngineError::ExecutionNotStarted),
        };

        let node = match self.repository.get_node_by_id(&node_id).await {
            NodeLookup::Found(node) => node,
            NodeLookup::NotFound => {
                error!("node '{}' missing from repository", node_id);
                return Err(EngineError::NodeNotFound(node_id));
            }
        };

        let node_impl = self.registry.get(&node.node_type).ok_or_else(|| {
            EngineError::NodeFatal {
                node_id: node_id.clone(),
                message: format!("no implementation registered for node type '{}'", node.node_type),
            }
        })?;

        let prompt = ctx.render(node.prompt_template().unwrap_or_default());
        let node_ctx = NodeContext {
            position,
            total: ctx.order().len(),
            local_variables: ctx.local_variables().clone(),
            global_variables: ctx.global_variables().clone(),
        };

        let outputs = match self
            .execute_with_retry(&node, node_impl.as_ref(), &prompt, &node_ctx)
            .await
        {
            Ok(outputs) => outputs,
            Err(engine_err) => {
                error!("node '{}' failed: {}", node_id, engine_err);
                return Err(engine_err);
            }
        };

        for declared in &node.output_variables {
            if !outputs.contains_key(declared) {
                warn!("node '{}' did not produce declared output '{}'", node_id, declared);
            }
        }
        for (name, value) in outputs {
            ctx.set_local_variable(name, value);
        }

        info!("node '{}' succeeded", node_id);
        ctx.advance()?;
        Ok(node_id)
    }

    // -----------------------------------------------------------------------
    // Internal: execute a single node with retry logic.
    // -----------------------------------------------------------------------

    async fn execute_with_retry(
        &self,
        node: &Node,
        node_impl: &dyn ExecutableNode,
        prompt: &str,
        ctx: &NodeContext,
    ) -> Result<VariableMap, EngineError> {
        let mut attempts = 0u32;

        loop {
            match node_impl.execute(node, prompt, ctx).await {
                Ok(outputs) => return Ok(outputs),

                Err(NodeError::Fatal(msg)) => {
                    return Err(EngineError::NodeFatal {
                        node_id: node.id.clone(),
                        message: msg,
                    });
                }

                Err(NodeError::Retryable(msg)) => {
                    attempts += 1;
                    if attempts > self.config.max_retries {
                        return Err(EngineError::NodeRetryExhausted {
                            node_id: node.id.clone(),
                            message: msg,
                        });
                    }

                    let delay = self.backoff_delay(attempts);

                    warn!(
                        "node '{}' retryable error (attempt {}/{}), retrying in {:?}: {}",
                        node.id, attempts, self.config.max_retries, delay, msg
                    );

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// `retry_base_delay * 2^(attempt - 1)`, capped at `max_retry_delay`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt.saturating_sub(1))
            .and_then(|factor| self.config.retry_base_delay.checked_mul(factor))
            .map_or(self.config.max_retry_delay, |delay| {
                delay.min(self.config.max_retry_delay)
            })
    }
}
