//! Forge orchestration engine.
//!
//! Executes agent workflows as dependency DAGs: validates definitions,
//! resolves inter-step input references, dispatches ready steps
//! concurrently, and enforces retry, timeout, and budget policy. Agent
//! tasks are opaque async capabilities registered in a [`task::TaskRegistry`].

pub mod task;
pub mod workflow;
