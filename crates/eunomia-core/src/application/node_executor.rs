use std::collections::BTreeSet;
use tracing::{debug, trace};

use crate::application::callback_registry::{CallbackRegistry, ParameterMap, PortInputs};
use crate::domain::graph::{NodeId, PortDirection};
use crate::domain::store::GraphTransaction;
use crate::domain::value::cast;
use crate::CoreError;

/// Options controlling how a node's outputs are applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Fail instead of skipping when a transformation names an output port
    /// the node does not have
    pub strict_output_ports: bool,
}

/// What happened when a node was executed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeOutcome {
    /// The node's transformation was invoked
    pub transformed: bool,
    /// Distinct nodes whose input ports received a value, ordered by id
    pub downstream: BTreeSet<NodeId>,
}

/// Runs one node's transformation and pushes its outputs downstream
#[derive(Debug, Clone)]
pub struct NodeExecutor {
    registry: CallbackRegistry,
    options: ExecutorOptions,
}

impl NodeExecutor {
    /// Create a node executor
    pub fn new(registry: CallbackRegistry) -> Self {
        Self::with_options(registry, ExecutorOptions::default())
    }

    /// Create a node executor with explicit options
    pub fn with_options(registry: CallbackRegistry, options: ExecutorOptions) -> Self {
        Self { registry, options }
    }

    /// The registry transformations are resolved from
    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    /// Execute a node inside `tx`.
    ///
    /// A node without a callback binding is not transformed. One whose
    /// transformation returns nothing is transformed but writes nothing. In
    /// both cases the downstream set is empty.
    pub async fn run_node(
        &self,
        tx: &mut dyn GraphTransaction,
        node_id: NodeId,
    ) -> Result<NodeOutcome, CoreError> {
        let Some(binding) = tx.node_callback(node_id).await? else {
            trace!(node = %node_id, "Node has no callback, nothing to run");
            return Ok(NodeOutcome::default());
        };

        let transformation = self.registry.resolve(&binding.callback_name)?;

        let inputs = self.load_inputs(tx, node_id).await?;

        debug!(
            node = %node_id,
            callback = %binding.callback_name,
            inputs = inputs.len(),
            "Running node callback"
        );

        let mut outcome = NodeOutcome {
            transformed: true,
            downstream: BTreeSet::new(),
        };

        let outputs = match transformation.transform(&inputs)? {
            Some(outputs) if !outputs.is_empty() => outputs,
            _ => {
                debug!(node = %node_id, "Callback produced no outputs");
                return Ok(outcome);
            }
        };

        for (port_name, params) in &outputs {
            let Some(port) = tx
                .find_port_by_name(node_id, port_name, PortDirection::Output)
                .await?
            else {
                if self.options.strict_output_ports {
                    return Err(CoreError::ValidationError(format!(
                        "Callback '{}' wrote to unknown output port '{}' on node {}",
                        binding.callback_name, port_name, node_id
                    )));
                }
                debug!(node = %node_id, port = %port_name, "Skipping output for missing port");
                continue;
            };

            let stored: Vec<(&str, String)> = params
                .iter()
                .map(|(key, value)| (key.as_str(), value.to_stored_string()))
                .collect();

            for (key, value) in &stored {
                tx.upsert_parameter(port.id, key, value).await?;
            }

            for connection in tx.outgoing_connections(port.id).await? {
                let Some(target) = tx.find_port(connection.to_port_id).await? else {
                    return Err(CoreError::PortNotFound(format!(
                        "Connection {} targets missing port {}",
                        connection.id, connection.to_port_id
                    )));
                };

                for (key, value) in &stored {
                    tx.upsert_parameter(target.id, key, value).await?;
                }

                trace!(
                    from_port = %port.id,
                    to_port = %target.id,
                    to_node = %target.node_id,
                    "Propagated parameters"
                );
                outcome.downstream.insert(target.node_id);
            }
        }

        Ok(outcome)
    }

    async fn load_inputs(
        &self,
        tx: &mut dyn GraphTransaction,
        node_id: NodeId,
    ) -> Result<PortInputs, CoreError> {
        let mut inputs = PortInputs::new();
        for port in tx.node_ports(node_id, Some(PortDirection::Input)).await? {
            let params: ParameterMap = tx
                .port_parameters(port.id)
                .await?
                .into_iter()
                .map(|param| (param.key, cast(&param.value)))
                .collect();
            inputs.insert(port.name, params);
        }
        Ok(inputs)
    }
}
