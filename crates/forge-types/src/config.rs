//! Session-level engine configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Engine-wide defaults applied to every run unless the workflow
/// definition overrides them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Default budget ceiling in USD for definitions without one.
    /// `None` disables budget enforcement entirely.
    pub budget_usd: Option<f64>,

    /// Default per-attempt step timeout in seconds, applied to steps
    /// without their own `timeout_secs`. `None` leaves such steps
    /// unbounded.
    pub default_step_timeout_secs: Option<u64>,

    /// Default workflow deadline in seconds for definitions without one.
    pub default_workflow_timeout_secs: u64,

    /// Cap on how many steps of the same parallel group run at once.
    /// `None` treats group labels as advisory only.
    pub max_group_concurrency: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            budget_usd: Some(10.0),
            default_step_timeout_secs: None,
            default_workflow_timeout_secs: 3600,
            max_group_concurrency: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
