//! `EchoNode` — a built-in node that copies its rendered prompt into every
//! declared output variable. Used by the CLI's `run` command for dry runs.

use async_trait::async_trait;

use crate::{ExecutableNode, Node, NodeContext, NodeError, VariableMap};

#[derive(Debug, Default, Clone, Copy)]
pub struct EchoNode;

#[async_trait]
impl ExecutableNode for EchoNode {
    async fn execute(
        &self,
        node: &Node,
        prompt: &str,
        _ctx: &NodeContext,
    ) -> Result<VariableMap, NodeError> {
        Ok(node
            .output_variables
            .iter()
            .map(|name| (name.clone(), prompt.to_owned()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_output_receives_the_prompt() {
        let node = Node::prompt("a", "ignored").with_outputs(["x", "y"]);
        let out = EchoNode
            .execute(&node, "rendered", &NodeContext::default())
            .await
            .expect("echo never fails");

        assert_eq!(out.len(), 2);
        assert_eq!(out["x"], "rendered");
        assert_eq!(out["y"], "rendered");
    }
}
