//! `flowplan` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate` — check a workflow JSON file and print its execution order.
//! - `orders`   — list every topological ordering of a workflow.
//! - `run`      — plan a workflow and dry-run it with the echo node.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine::{
    count_orders, for_each_order, EngineError, ExecutorConfig, GraphModel, NodeRegistry, Session,
    WorkflowDefinition, WorkflowExecutor,
};
use nodes::echo::EchoNode;
use nodes::{ExecutableNode, InMemoryNodeRepository, NodeType};

use crate::signal::spawn_ctrl_c_canceller;

mod signal;

#[derive(Parser)]
#[command(
    name = "flowplan",
    about = "Plan and step through variable-dependent workflow graphs",
    version
)]
struct Cli {
    /// Log filter directive (e.g. `info`, `engine=debug`).
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
    /// Print every topological ordering of the workflow graph.
    Orders {
        path: PathBuf,
        /// Stop after this many orderings.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Plan the workflow and execute it with the echo node.
    Run {
        path: PathBuf,
        /// Retries for retryable node failures.
        #[arg(long, default_value_t = 3)]
        max_retries: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).context("invalid log filter")?)
        .init();

    match cli.command {
        Command::Validate { path } => validate(&path).await,
        Command::Orders { path, limit } => orders(&path, limit),
        Command::Run { path, max_retries } => run(&path, max_retries).await,
    }
}

fn load(path: &Path) -> anyhow::Result<WorkflowDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).context("invalid workflow JSON")
}

/// Session over the definition's nodes, with its graph loaded and globals set.
async fn open_session(def: &WorkflowDefinition) -> anyhow::Result<Session> {
    let graph = def.graph()?;
    let repo = Arc::new(InMemoryNodeRepository::from_nodes(def.nodes.clone()));

    let mut session = Session::new(repo);
    session.load_process(&graph).await;
    for (name, value) in &def.global_variables {
        session.set_global_variable(name.as_str(), value.as_str());
    }
    Ok(session)
}

async fn validate(path: &Path) -> anyhow::Result<()> {
    let def = load(path)?;
    let graph = def.graph()?;

    if let Some(defect) = graph.defect() {
        eprintln!("❌ Validation failed: {defect}");
        std::process::exit(1);
    }

    let session = open_session(&def).await?;
    let cancel = spawn_ctrl_c_canceller();

    match session.find_plan(&def.initial_variables, &cancel).await {
        Ok(order) => {
            println!("✅ Workflow is valid. Execution order: {order:?}");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Validation failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Orderings collected under an optional limit.
#[derive(Debug, PartialEq)]
struct Listing {
    orders: Vec<Vec<String>>,
    /// More orderings existed past the limit.
    truncated: bool,
}

fn collect_orders(graph: &GraphModel, limit: Option<usize>) -> Listing {
    let limit = limit.unwrap_or(usize::MAX);
    let mut orders = Vec::new();
    let mut truncated = false;

    let _ = for_each_order(graph, |order| {
        if orders.len() == limit {
            truncated = true;
            return ControlFlow::Break(());
        }
        orders.push(order.iter().map(|id| id.to_string()).collect());
        ControlFlow::Continue(())
    });

    Listing { orders, truncated }
}

fn orders(path: &Path, limit: Option<usize>) -> anyhow::Result<()> {
    let def = load(path)?;
    let graph = def.graph()?;

    if limit == Some(0) {
        info!("--limit 0: nothing to print ({} orderings)", count_orders(&graph));
        return Ok(());
    }

    let listing = collect_orders(&graph, limit);
    for order in &listing.orders {
        println!("{}", order.join(" -> "));
    }

    if listing.orders.is_empty() {
        match graph.defect() {
            Some(defect) => println!("no orderings: {defect}"),
            None => println!("no orderings"),
        }
    } else if listing.truncated {
        info!(
            "stopped after {} of {} orderings",
            listing.orders.len(),
            count_orders(&graph)
        );
    }
    Ok(())
}

async fn run(path: &Path, max_retries: u32) -> anyhow::Result<()> {
    let def = load(path)?;
    let mut session = open_session(&def).await?;
    let cancel = spawn_ctrl_c_canceller();

    let order = match session.find_plan(&def.initial_variables, &cancel).await {
        Ok(order) => order,
        Err(e @ EngineError::ValidationCancelled { .. }) => return Err(e.into()),
        Err(e) => {
            eprintln!("❌ No valid plan: {e}");
            std::process::exit(1);
        }
    };

    let echo: Arc<dyn ExecutableNode> = Arc::new(EchoNode);
    let registry = NodeRegistry::from([
        (NodeType::Prompt, echo.clone()),
        (NodeType::Process, echo),
    ]);
    let config = ExecutorConfig {
        max_retries,
        ..ExecutorConfig::default()
    };
    let executor = WorkflowExecutor::new(session.repository().clone(), registry, config);

    session.start_execution(order)?;
    let result = executor.run(session.execution_mut()).await?;

    println!("Executed: {}", result.executed.join(" -> "));
    let mut variables: Vec<_> = result.local_variables.into_iter().collect();
    variables.sort();
    for (name, value) in variables {
        println!("  {name} = {value}");
    }
    Ok(())
}
