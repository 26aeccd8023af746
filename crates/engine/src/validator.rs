//! Variable-dependency validation over topological orderings.
//!
//! An ordering is *satisfiable* when, scanning it left to right with a
//! running set of available variables (seeded with the initial variables),
//! every node finds all of its inputs in the set; each node's outputs join
//! the set once it has been checked.
//!
//! The first satisfiable ordering in enumeration order wins.

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use nodes::Node;

use crate::{EngineError, GraphModel};
use crate::topo::for_each_order;

/// Declared input and output variable names of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableContract {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl VariableContract {
    pub fn new<I, O, S, T>(inputs: I, outputs: O) -> Self
    where
        I: IntoIterator<Item = S>,
        O: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<&Node> for VariableContract {
    fn from(node: &Node) -> Self {
        Self {
            inputs: node.input_variables.clone(),
            outputs: node.output_variables.clone(),
        }
    }
}

/// Node id → contract.
pub type ContractMap = HashMap<String, VariableContract>;

/// Check a single ordering.
///
/// # Errors
/// - [`EngineError::NodeNotFound`] if a node in `order` has no contract.
/// - [`EngineError::MissingVariable`] for the first unmet input.
pub fn check_order<S: AsRef<str>>(
    order: &[S],
    initial_variables: &[String],
    contracts: &ContractMap,
) -> Result<(), EngineError> {
    let mut available: HashSet<&str> = initial_variables.iter().map(String::as_str).collect();

    for node_id in order {
        let node_id = node_id.as_ref();
        let contract = contracts
            .get(node_id)
            .ok_or_else(|| EngineError::NodeNotFound(node_id.to_owned()))?;

        if let Some(missing) = contract
            .inputs
            .iter()
            .find(|var| !available.contains(var.as_str()))
        {
            return Err(EngineError::MissingVariable {
                node_id: node_id.to_owned(),
                variable: missing.clone(),
            });
        }

        available.extend(contract.outputs.iter().map(String::as_str));
    }

    Ok(())
}

/// Find the first topological ordering of `graph` under which every node's
/// input variables are available when it runs.
///
/// Orderings that fail (missing variable, node without a contract) are
/// skipped. `cancel` is checked before each ordering.
///
/// # Errors
/// - [`EngineError::UnsatisfiedDependency`] if no ordering qualifies,
///   including when the graph has no orderings at all.
/// - [`EngineError::ValidationCancelled`] if `cancel` fired first.
pub fn find_satisfiable_order(
    graph: &GraphModel,
    initial_variables: &[String],
    contracts: &ContractMap,
    cancel: &CancellationToken,
) -> Result<Vec<String>, EngineError> {
    let mut checked = 0usize;
    let mut cancelled = false;
    let mut found: Option<Vec<String>> = None;

    let _ = for_each_order(graph, |order| {
        if cancel.is_cancelled() {
            cancelled = true;
            return ControlFlow::Break(());
        }
        checked += 1;

        match check_order(order, initial_variables, contracts) {
            Ok(()) => {
                found = Some(order.iter().map(|id| id.to_string()).collect());
                ControlFlow::Break(())
            }
            Err(reason) => {
                debug!(ordering = checked, %reason, "ordering rejected");
                ControlFlow::Continue(())
            }
        }
    });

    if let Some(order) = found {
        info!(orderings_checked = checked, ?order, "satisfiable order found");
        return Ok(order);
    }
    if cancelled {
        return Err(EngineError::ValidationCancelled {
            orderings_checked: checked,
        });
    }
    Err(EngineError::UnsatisfiedDependency {
        orderings_checked: checked,
    })
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Edge;

    fn diamond() -> GraphModel {
        GraphModel::from_parts(
            ["A", "B", "C", "D"].map(String::from),
            [("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")].map(|(s, t)| Edge::new(s, t)),
        )
        .expect("valid diamond")
    }

    fn diamond_contracts() -> ContractMap {
        let none: [&str; 0] = [];
        ContractMap::from([
            ("A".to_string(), VariableContract::new(none, ["x"])),
            ("B".to_string(), VariableContract::new(["x"], ["y"])),
            ("C".to_string(), VariableContract::new(["x"], ["z"])),
            ("D".to_string(), VariableContract::new(["y", "z"], none)),
        ])
    }

    #[test]
    fn diamond_is_satisfiable() {
        let order = find_satisfiable_order(
            &diamond(),
            &[],
            &diamond_contracts(),
            &CancellationToken::new(),
        )
        .expect("diamond is satisfiable");

        assert_eq!(order, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn never_produced_variable_is_unsatisfiable() {
        let mut contracts = diamond_contracts();
        contracts.insert("D".into(), VariableContract::new(["y", "z", "w"], Vec::<String>::new()));

        let result =
            find_satisfiable_order(&diamond(), &[], &contracts, &CancellationToken::new());

        assert!(matches!(
            result,
            Err(EngineError::UnsatisfiedDependency { orderings_checked: 2 })
        ));
    }

    #[test]
    fn initial_variables_seed_the_running_set() {
        let mut contracts = diamond_contracts();
        contracts.insert("A".into(), VariableContract::new(["seed"], ["x"]));

        let cancel = CancellationToken::new();
        assert!(find_satisfiable_order(&diamond(), &[], &contracts, &cancel).is_err());
        assert!(find_satisfiable_order(&diamond(), &["seed".into()], &contracts, &cancel).is_ok());
    }

    #[test]
    fn later_ordering_can_satisfy() {
        // B needs z which only C produces: only [A, C, B, D] works.
        let mut contracts = diamond_contracts();
        contracts.insert("B".into(), VariableContract::new(["x", "z"], ["y"]));

        let order = find_satisfiable_order(
            &diamond(),
            &[],
            &contracts,
            &CancellationToken::new(),
        )
        .expect("second ordering satisfies");

        assert_eq!(order, vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn missing_contract_rejects_ordering_not_search() {
        let mut contracts = diamond_contracts();
        contracts.remove("C");

        assert!(matches!(
            check_order(&["A", "B", "C", "D"], &[], &contracts),
            Err(EngineError::NodeNotFound(id)) if id == "C"
        ));
        assert!(matches!(
            find_satisfiable_order(&diamond(), &[], &contracts, &CancellationToken::new()),
            Err(EngineError::UnsatisfiedDependency { orderings_checked: 2 })
        ));
    }

    #[test]
    fn check_order_reports_first_missing_variable() {
        assert!(matches!(
            check_order(&["B", "A", "C", "D"], &[], &diamond_contracts()),
            Err(EngineError::MissingVariable { node_id, variable }) if node_id == "B" && variable == "x"
        ));
    }

    #[test]
    fn cyclic_graph_reports_unsatisfied() {
        let graph = GraphModel::from_parts(
            ["a", "b"].map(String::from),
            [Edge::new("a", "b"), Edge::new("b", "a")],
        )
        .expect("known nodes");

        assert!(matches!(
            find_satisfiable_order(&graph, &[], &ContractMap::new(), &CancellationToken::new()),
            Err(EngineError::UnsatisfiedDependency { orderings_checked: 0 })
        ));
    }

    #[test]
    fn cancellation_is_distinct_from_unsatisfied() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            find_satisfiable_order(&diamond(), &[], &diamond_contracts(), &cancel),
            Err(EngineError::ValidationCancelled { orderings_checked: 0 })
        ));
    }
}
