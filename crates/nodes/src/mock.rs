//! `MockNode` — a test double for `ExecutableNode`.
//!
//! Useful in unit and integration tests where a real node implementation is
//! either unavailable or irrelevant.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::{ExecutableNode, Node, NodeContext, NodeError, VariableMap};

/// Behaviour injected into `MockNode` at construction time.
pub enum MockBehaviour {
    /// Produce `"<node id>:<output name>"` for every declared output variable.
    Produce,
    /// Fail with a `Retryable` error for the first `n` calls, then `Produce`.
    FlakyFor(usize),
    /// Fail with a `Retryable` error.
    FailRetryable(String),
    /// Fail with a `Fatal` error.
    FailFatal(String),
}

/// A mock node that records every prompt it receives and returns a
/// programmer-specified result.
pub struct MockNode {
    /// What the node will do when `execute` is called.
    pub behaviour: MockBehaviour,
    /// `(node id, rendered prompt)` for every call, in call order.
    pub calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockNode {
    fn with_behaviour(behaviour: MockBehaviour) -> Self {
        Self {
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always succeeds.
    pub fn producing() -> Self {
        Self::with_behaviour(MockBehaviour::Produce)
    }

    /// Create a mock that fails retryably `failures` times before succeeding.
    pub fn flaky(failures: usize) -> Self {
        Self::with_behaviour(MockBehaviour::FlakyFor(failures))
    }

    /// Create a mock that always fails with a `Fatal` error.
    pub fn failing_fatal(msg: impl Into<String>) -> Self {
        Self::with_behaviour(MockBehaviour::FailFatal(msg.into()))
    }

    /// Create a mock that always fails with a `Retryable` error.
    pub fn failing_retryable(msg: impl Into<String>) -> Self {
        Self::with_behaviour(MockBehaviour::FailRetryable(msg.into()))
    }

    /// Number of times this node has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Ids of the nodes executed, in call order.
    pub fn executed_ids(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }
}

fn produce(node: &Node) -> VariableMap {
    node.output_variables
        .iter()
        .map(|name| (name.clone(), format!("{}:{}", node.id, name)))
        .collect()
}

#[async_trait]
impl ExecutableNode for MockNode {
    async fn execute(
        &self,
        node: &Node,
        prompt: &str,
        _ctx: &NodeContext,
    ) -> Result<VariableMap, NodeError> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.push((node.id.clone(), prompt.to_owned()));
            calls.len()
        };

        match &self.behaviour {
            MockBehaviour::Produce => Ok(produce(node)),
            MockBehaviour::FlakyFor(n) if call_number <= *n => {
                Err(NodeError::Retryable(format!("attempt {call_number} failed")))
            }
            MockBehaviour::FlakyFor(_) => Ok(produce(node)),
            MockBehaviour::FailRetryable(msg) => Err(NodeError::Retryable(msg.clone())),
            MockBehaviour::FailFatal(msg)     => Err(NodeError::Fatal(msg.clone())),
        }
    }
}
