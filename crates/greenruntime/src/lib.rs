//! Workflow execution runtime
//!
//! This crate compiles graph definitions against a node registry, routes
//! between nodes, persists checkpoints and drives runs through suspension
//! and resumption at the approval gate.

mod compiler;
pub mod diagram;
mod executor;
mod registry;
mod router;
mod runtime;
mod store;

pub use compiler::{compile, CompiledGraph};
pub use executor::{GraphExecutor, RunResult};
pub use registry::{NodeFactory, NodeMetadata, NodeRegistry};
pub use router::{holds, Route, Router};
pub use runtime::{RuntimeConfig, WorkflowRuntime};
pub use store::{CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore};
