//! `nodes` crate — the node record, the collaborator traits the engine needs
//! to resolve and execute nodes, and the built-in node implementations.
//!
//! The engine never interprets a node's content payload itself; it goes
//! through [`NodeRepository`] to find nodes and [`ExecutableNode`] to run them.

pub mod error;
pub mod node;
pub mod traits;
pub mod repository;
pub mod echo;
pub mod mock;

pub use error::NodeError;
pub use node::{Node, NodeLookup, NodeType};
pub use repository::InMemoryNodeRepository;
pub use traits::{ExecutableNode, NodeContext, NodeRepository, VariableMap};
