//! Transformations that remember how they were called.

use parking_lot::Mutex;
use std::sync::Arc;

use eunomia_core::{CoreError, PortInputs, PortOutputs, Transformation};

type TransformFn = dyn Fn(&PortInputs) -> Result<Option<PortOutputs>, CoreError> + Send + Sync;

/// Wraps a transformation and records every input it receives.
///
/// Clones share the same record, so a test can keep one handle and register
/// the other.
#[derive(Clone)]
pub struct RecordingTransformation {
    inner: Arc<TransformFn>,
    calls: Arc<Mutex<Vec<PortInputs>>>,
}

impl RecordingTransformation {
    /// Record calls to `f`
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&PortInputs) -> Result<Option<PortOutputs>, CoreError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(f),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A transformation that never publishes anything
    pub fn silent() -> Self {
        Self::new(|_| Ok(None))
    }

    /// Number of invocations so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Inputs of every invocation, oldest first
    pub fn calls(&self) -> Vec<PortInputs> {
        self.calls.lock().clone()
    }

    /// Inputs of the most recent invocation
    pub fn last_inputs(&self) -> Option<PortInputs> {
        self.calls.lock().last().cloned()
    }
}

impl Transformation for RecordingTransformation {
    fn transform(&self, inputs: &PortInputs) -> Result<Option<PortOutputs>, CoreError> {
        self.calls.lock().push(inputs.clone());
        (self.inner)(inputs)
    }
}

/// Build `PortOutputs` with a single port
pub fn single_output(port: &str, params: eunomia_core::ParameterMap) -> PortOutputs {
    PortOutputs::from([(port.to_string(), params)])
}
