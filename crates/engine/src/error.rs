//! Engine-level error types.

use thiserror::Error;

/// Errors produced by the engine (graph edits, planning and execution).
///
/// Structural problems of a whole graph (cycles, disconnected parts) are not
/// errors: the enumerator reports them as "no orderings".
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Graph / lookup errors ------

    /// A node id is absent from the graph or the repository.
    #[error("node '{0}' not found")]
    NodeNotFound(String),

    // ------ Planning errors ------

    /// A node needs a variable nobody produced before it.
    #[error("node '{node_id}' requires variable '{variable}' which is not available")]
    MissingVariable {
        node_id: String,
        variable: String,
    },

    /// No ordering satisfies every node's input variables.
    #[error("no execution order satisfies all variable dependencies ({orderings_checked} orderings checked)")]
    UnsatisfiedDependency { orderings_checked: usize },

    /// The caller cancelled the search before it finished.
    #[error("order search cancelled after {orderings_checked} orderings")]
    ValidationCancelled { orderings_checked: usize },

    /// Planning from the selected process was requested but no process is selected.
    #[error("no process node is selected")]
    NoProcessSelected,

    // ------ Stepper errors ------

    #[error("cannot start an execution with an empty order")]
    EmptyOrder,

    #[error("an execution is already running")]
    RunInProgress,

    #[error("execution has not been started")]
    ExecutionNotStarted,

    /// `advance` was called after the last node completed.
    #[error("execution already completed; cannot advance past the last node")]
    AdvancePastCompletion,

    // ------ Node execution errors ------

    /// A node failed with a fatal error; the run is aborted.
    #[error("node '{node_id}' failed fatally: {message}")]
    NodeFatal {
        node_id: String,
        message: String,
    },

    /// A node's retryable error was exhausted.
    #[error("node '{node_id}' exceeded retry limit: {message}")]
    NodeRetryExhausted {
        node_id: String,
        message: String,
    },
}
