//! `engine` crate — workflow graph model, order enumeration, variable
//! dependency validation, and the execution stepper.
//!
//! Data flows `GraphModel` → [`topo`] → [`validator`] → `ExecutionContext`,
//! which a `WorkflowExecutor` (or any caller) then drives node by node.

pub mod models;
pub mod error;
pub mod graph;
pub mod topo;
pub mod validator;
pub mod context;
pub mod state;
pub mod store;
pub mod channel;
pub mod session;
pub mod executor;

pub use models::{Edge, WorkflowDefinition};
pub use error::EngineError;
pub use graph::{GraphDefect, GraphModel};
pub use topo::{count_orders, enumerate_all_orders, for_each_order};
pub use validator::{check_order, find_satisfiable_order, ContractMap, VariableContract};
pub use context::{substitute, Cursor, ExecutionContext};
pub use state::{ActedOn, GraphState, LastAction, StateBundle, SystemState};
pub use store::{InMemoryStateStore, StateStore};
pub use channel::{ChannelError, MessageChannel, MpscChannel};
pub use session::{Session, SharedSession};
pub use executor::{ExecutionResult, ExecutorConfig, NodeRegistry, WorkflowExecutor};
