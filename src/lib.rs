//! Eunomia - node graph propagation engine
//!
//! Wires the core engine to a store chosen by configuration, ships the
//! built-in transformations and seeds the default graph.

pub mod callbacks;
pub mod config;
pub mod engine;
pub mod seed;

pub use callbacks::{builtin_builder, builtin_registry};
pub use config::{EngineConfig, RejectedSetting};
pub use engine::{Engine, GraphDump, NodeRef};
pub use seed::{seed_defaults, seed_store, SeedReport};
