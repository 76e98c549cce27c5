//! Workflow execution: graph building, input interpolation, step
//! dispatch, budget enforcement, and result aggregation.
//!
//! The top-level entry point is [`engine::WorkflowEngine`], which drives a
//! validated [`graph::ExecutionGraph`] to completion.

pub mod aggregate;
pub mod budget;
pub mod definition;
pub mod engine;
pub mod graph;
pub mod interpolate;
pub mod runner;
pub mod templates;

pub use engine::WorkflowEngine;
pub use graph::{ExecutionGraph, build_graph};
