//! The node record shared by the repository, the engine and the CLI.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// NodeType
// ---------------------------------------------------------------------------

/// Type tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// A templated prompt that consumes and produces variables.
    Prompt,
    /// A process: a stored workflow graph plus its initial variables.
    Process,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prompt => write!(f, "Prompt"),
            Self::Process => write!(f, "Process"),
        }
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A unit of work in the workflow graph.
///
/// `content` is opaque to the engine. Built-in helpers only look at two keys:
/// `prompt` (the template rendered before execution) and
/// `initial_variables` (for `Process` nodes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique, stable identifier (referenced by edges).
    pub id: String,
    /// Human readable label. Falls back to `id` when empty.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type_name")]
    pub node_type: NodeType,
    /// Variables that must be available before this node runs.
    #[serde(default)]
    pub input_variables: Vec<String>,
    /// Variables this node makes available to later nodes.
    #[serde(default)]
    pub output_variables: Vec<String>,
    #[serde(default)]
    pub content: Value,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            node_type,
            input_variables: Vec::new(),
            output_variables: Vec::new(),
            content: Value::Null,
        }
    }

    /// Shorthand for a `Prompt` node with the given template.
    pub fn prompt(id: impl Into<String>, template: impl Into<String>) -> Self {
        let template: String = template.into();
        Self::new(id, NodeType::Prompt).with_content(serde_json::json!({ "prompt": template }))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_variables = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_variables = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_content(mut self, content: Value) -> Self {
        self.content = content;
        self
    }

    /// Name shown to users; the id when no name was given.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// The prompt template stored under `content.prompt`, if any.
    pub fn prompt_template(&self) -> Option<&str> {
        self.content.get("prompt").and_then(Value::as_str)
    }

    /// Initial variables of a `Process` node (`content.initial_variables`).
    ///
    /// Always empty for other node types. Non-string entries are skipped.
    pub fn initial_variables(&self) -> Vec<String> {
        if self.node_type != NodeType::Process {
            return Vec::new();
        }
        self.content
            .get("initial_variables")
            .and_then(Value::as_array)
            .map(|vars| {
                vars.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// NodeLookup
// ---------------------------------------------------------------------------

/// Result of resolving a node id through a repository.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeLookup {
    Found(Node),
    NotFound,
}

impl NodeLookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Convert into an `Option`, dropping the distinction's name.
    pub fn into_option(self) -> Option<Node> {
        match self {
            Self::Found(node) => Some(node),
            Self::NotFound => None,
        }
    }
}

impl From<Option<Node>> for NodeLookup {
    fn from(node: Option<Node>) -> Self {
        match node {
            Some(node) => Self::Found(node),
            None => Self::NotFound,
        }
    }
}
