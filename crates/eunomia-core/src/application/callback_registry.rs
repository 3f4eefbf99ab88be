use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::store::{GraphStore, GraphTransaction};
use crate::domain::value::Scalar;
use crate::CoreError;

/// Parameters of one port, keyed by parameter key
pub type ParameterMap = BTreeMap<String, Scalar>;

/// Input parameters of a node, keyed by input port name
pub type PortInputs = BTreeMap<String, ParameterMap>;

/// Output parameters produced by a node, keyed by output port name
pub type PortOutputs = BTreeMap<String, ParameterMap>;

/// A pure transformation from a node's inputs to its outputs.
///
/// Returning `Ok(None)` (or an empty map) means the node has nothing to publish.
#[cfg_attr(test, mockall::automock)]
pub trait Transformation: Send + Sync {
    /// Compute outputs from the given inputs
    fn transform(&self, inputs: &PortInputs) -> Result<Option<PortOutputs>, CoreError>;
}

impl<F> Transformation for F
where
    F: Fn(&PortInputs) -> Result<Option<PortOutputs>, CoreError> + Send + Sync,
{
    fn transform(&self, inputs: &PortInputs) -> Result<Option<PortOutputs>, CoreError> {
        self(inputs)
    }
}

/// Immutable mapping from callback names to transformations.
///
/// Built once at startup with [`CallbackRegistry::builder`].
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    callbacks: Arc<HashMap<String, Arc<dyn Transformation>>>,
}

impl CallbackRegistry {
    /// Start building a registry
    pub fn builder() -> CallbackRegistryBuilder {
        CallbackRegistryBuilder::default()
    }

    /// Look up a transformation by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Transformation>> {
        self.callbacks.get(name).cloned()
    }

    /// Look up a transformation, treating a missing name as a configuration error
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Transformation>, CoreError> {
        self.get(name).ok_or_else(|| {
            CoreError::ConfigurationError(format!("Callback '{}' is not registered", name))
        })
    }

    /// Whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.callbacks.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.callbacks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered transformations
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Check that every callback binding in the transaction resolves.
    ///
    /// All unresolved bindings are reported in a single `ConfigurationError`.
    pub async fn validate_bindings(&self, tx: &mut dyn GraphTransaction) -> Result<(), CoreError> {
        let bindings = tx.list_callbacks().await?;
        let missing: Vec<String> = bindings
            .iter()
            .filter(|binding| !self.contains(&binding.callback_name))
            .map(|binding| format!("node {} -> '{}'", binding.node_id, binding.callback_name))
            .collect();

        if missing.is_empty() {
            debug!(bindings = bindings.len(), "All callback bindings resolve");
            Ok(())
        } else {
            warn!(missing = missing.len(), "Unresolved callback bindings");
            Err(CoreError::ConfigurationError(format!(
                "Unregistered callbacks: {}",
                missing.join(", ")
            )))
        }
    }

    /// Validate the bindings currently committed in a store
    pub async fn validate_store(&self, store: &dyn GraphStore) -> Result<(), CoreError> {
        let mut tx = store.begin().await?;
        let result = self.validate_bindings(tx.as_mut()).await;
        tx.rollback().await?;
        result
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callbacks", &self.names())
            .finish()
    }
}

/// Collects transformations before the registry is frozen
#[derive(Default)]
pub struct CallbackRegistryBuilder {
    callbacks: HashMap<String, Arc<dyn Transformation>>,
}

impl CallbackRegistryBuilder {
    /// Register a transformation under a name. A later registration under
    /// the same name replaces the earlier one.
    pub fn register<T>(mut self, name: impl Into<String>, transformation: T) -> Self
    where
        T: Transformation + 'static,
    {
        let name = name.into();
        if self
            .callbacks
            .insert(name.clone(), Arc::new(transformation))
            .is_some()
        {
            warn!(callback = %name, "Callback registered twice, keeping the latest");
        }
        self
    }

    /// Register a closure. Unlike [`register`](Self::register) this lets the
    /// compiler infer the closure's signature.
    pub fn register_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&PortInputs) -> Result<Option<PortOutputs>, CoreError> + Send + Sync + 'static,
    {
        self.register(name, f)
    }

    /// Freeze the registry
    pub fn build(self) -> CallbackRegistry {
        CallbackRegistry {
            callbacks: Arc::new(self.callbacks),
        }
    }
}
