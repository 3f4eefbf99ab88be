use thiserror::Error;

/// Core error type for the Eunomia engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Node type not found
    #[error("Node type not found: {0}")]
    NodeTypeNotFound(String),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Connection not found
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    /// A node is bound to a callback name that was never registered
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A transformation reported a failure while executing
    #[error("Callback error: {0}")]
    CallbackError(String),

    /// A graph invariant was violated
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The graph store rejected a read or write
    #[error("State store error: {0}")]
    StateStoreError(String),

    /// Input/output error
    #[error("Input/output error: {0}")]
    IOError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Whether this error came from the underlying store rather than the graph itself
    pub fn is_store_failure(&self) -> bool {
        matches!(self, CoreError::StateStoreError(_) | CoreError::IOError(_))
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::IOError(err.to_string())
    }
}

impl From<String> for CoreError {
    fn from(err: String) -> Self {
        CoreError::Other(err)
    }
}

impl From<&str> for CoreError {
    fn from(err: &str) -> Self {
        CoreError::Other(err.to_string())
    }
}
