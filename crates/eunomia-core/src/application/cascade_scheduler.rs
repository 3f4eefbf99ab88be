use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::application::node_executor::NodeExecutor;
use crate::domain::graph::NodeId;
use crate::domain::store::{GraphStore, GraphTransaction};
use crate::CoreError;

/// Outcome of a committed cascade
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    /// Node that triggered the cascade
    pub start: Option<NodeId>,
    /// Every node executed, in execution order
    pub visited: Vec<NodeId>,
    /// Nodes whose transformation was invoked, in execution order
    pub transformed: Vec<NodeId>,
    /// Nodes whose execution reached at least one downstream node
    pub propagated: Vec<NodeId>,
}

impl CascadeReport {
    /// Whether a node was executed during the cascade
    pub fn visited_node(&self, node: NodeId) -> bool {
        self.visited.contains(&node)
    }
}

/// Propagates a node's re-evaluation through the graph.
///
/// Each cascade runs in a single store transaction. Every affected node is
/// executed at most once, breadth first from the start node, and either all
/// parameter writes commit or none do.
pub struct CascadeScheduler {
    store: Arc<dyn GraphStore>,
    executor: NodeExecutor,
}

impl CascadeScheduler {
    /// Create a cascade scheduler
    pub fn new(store: Arc<dyn GraphStore>, executor: NodeExecutor) -> Self {
        Self { store, executor }
    }

    /// The executor used for every node
    pub fn executor(&self) -> &NodeExecutor {
        &self.executor
    }

    /// The store cascades run against
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Run a cascade from `start` and commit it
    pub async fn run_cascade(&self, start: NodeId) -> Result<CascadeReport, CoreError> {
        let mut tx = self.store.begin().await?;

        match self.traverse(tx.as_mut(), start).await {
            Ok(report) => {
                tx.commit().await?;
                info!(
                    start = %start,
                    visited = report.visited.len(),
                    transformed = report.transformed.len(),
                    "Cascade committed"
                );
                Ok(report)
            }
            Err(e) => {
                error!(start = %start, error = %e, "Cascade failed, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Breadth-first traversal inside an already open transaction.
    ///
    /// Used by [`run_cascade`](Self::run_cascade); callers that group the
    /// cascade with their own edits can run it on their transaction and
    /// commit once.
    pub async fn traverse(
        &self,
        tx: &mut dyn GraphTransaction,
        start: NodeId,
    ) -> Result<CascadeReport, CoreError> {
        if tx.find_node(start).await?.is_none() {
            return Err(CoreError::NodeNotFound(start.to_string()));
        }

        let mut report = CascadeReport {
            start: Some(start),
            ..Default::default()
        };
        let mut queue = VecDeque::from([start]);
        let mut visited = HashSet::new();

        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }

            let outcome = self.executor.run_node(tx, node).await?;
            report.visited.push(node);

            if outcome.transformed {
                report.transformed.push(node);
            }
            if !outcome.downstream.is_empty() {
                report.propagated.push(node);
            }

            for next in outcome.downstream {
                if !visited.contains(&next) {
                    queue.push_back(next);
                }
            }

            debug!(node = %node, queued = queue.len(), "Node executed");
        }

        Ok(report)
    }
}
