//! Domain types for the Forge workflow orchestrator.
//!
//! This crate is pure data: workflow definitions, step and run results,
//! typed task payloads, session configuration, and the error taxonomy.
//! It has no IO and no async code; the engine lives in `forge-core`.

pub mod config;
pub mod error;
pub mod report;
pub mod task;
pub mod workflow;
