/// Named transformations and their registry
pub mod callback_registry;

/// Execution of a single node
pub mod node_executor;

/// Breadth-first, transactional propagation
pub mod cascade_scheduler;
