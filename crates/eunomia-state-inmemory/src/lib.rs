//! In-memory graph store for the Eunomia engine
//!
//! This crate provides an in-memory implementation of the `GraphStore`
//! interface defined in the eunomia-core crate. It is primarily useful for
//! development, testing, and simple deployments where persistence is not required.
//!
//! Transactions work on a private copy of the graph and replace the shared
//! graph on commit. Only one transaction is open at a time; `begin` waits
//! until the previous one has committed or rolled back.

pub mod store;
pub use store::{GraphSnapshot, InMemoryGraphStore, InMemoryTransaction};
