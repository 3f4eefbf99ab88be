/// Graph entities and their invariants
pub mod graph;

/// Scalar values and casting of stored parameters
pub mod value;

/// Graph store interfaces
pub mod store;
