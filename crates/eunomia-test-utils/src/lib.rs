//! Testing utilities for the Eunomia engine.
//!
//! This crate provides graph fixtures, a fault-injecting store wrapper and
//! recording transformations shared by the workspace's tests.

pub mod builders;
pub mod faults;
pub mod recording;

pub use builders::{GraphBuilder, GraphHandles};
pub use faults::{FaultPlan, FaultyGraphStore};
pub use recording::{single_output, RecordingTransformation};
