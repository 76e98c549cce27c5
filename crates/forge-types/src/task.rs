//! The task-invocation contract between the engine and bound agents.
//!
//! The engine treats an agent task as an opaque asynchronous capability:
//! it hands over a [`TaskInvocation`] with resolved inputs and receives a
//! [`TaskOutcome`] -- a tagged success payload or a failure, either of
//! which may carry a nonzero incurred cost.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::report::{ChangePlan, EvalResult, Finding};

// ---------------------------------------------------------------------------
// TaskInvocation
// ---------------------------------------------------------------------------

/// One invocation of a bound agent task, as handed to `AgentTask::invoke`.
#[derive(Debug, Clone)]
pub struct TaskInvocation {
    /// The workflow run this invocation belongs to.
    pub run_id: Uuid,
    /// The step being executed.
    pub step_id: String,
    /// The step's human-readable task description (opaque to the engine).
    pub description: String,
    /// Inputs with all references resolved to concrete values.
    pub inputs: HashMap<String, Value>,
    /// Remaining time budget for this attempt, if the step has a timeout.
    pub deadline: Option<Duration>,
}

// ---------------------------------------------------------------------------
// TaskOutput
// ---------------------------------------------------------------------------

/// Tagged output payload of a successful task.
///
/// The engine stays agnostic to task internals but type-checks outputs
/// structurally: a closed set of variants, each serializable to JSON for
/// input interpolation by downstream steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum TaskOutput {
    /// A list of analysis findings.
    Findings(Vec<Finding>),
    /// A proposed set of code/config changes.
    ChangePlan(ChangePlan),
    /// An evaluation or test outcome.
    EvalResult(EvalResult),
    /// Arbitrary JSON payload.
    Generic(Value),
}

impl TaskOutput {
    /// Short tag for logging and display.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskOutput::Findings(_) => "findings",
            TaskOutput::ChangePlan(_) => "change_plan",
            TaskOutput::EvalResult(_) => "eval_result",
            TaskOutput::Generic(_) => "generic",
        }
    }

    /// JSON view used for reference resolution (`$step.field...`).
    ///
    /// Each variant is exposed under a stable top-level key so downstream
    /// steps can address it: `findings`, `change_plan`, `eval_result`, or
    /// `result` for generic payloads.
    pub fn to_value(&self) -> Value {
        match self {
            TaskOutput::Findings(findings) => json!({ "findings": findings }),
            TaskOutput::ChangePlan(plan) => json!({ "change_plan": plan }),
            TaskOutput::EvalResult(eval) => json!({ "eval_result": eval }),
            TaskOutput::Generic(value) => json!({ "result": value }),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskOutcome
// ---------------------------------------------------------------------------

/// Successful completion of one task attempt.
#[derive(Debug, Clone)]
pub struct TaskSuccess {
    pub output: TaskOutput,
    /// Cost incurred by this attempt in USD.
    pub cost_usd: f64,
    /// Tokens consumed by this attempt.
    pub tokens_used: u64,
}

/// Failure of one task attempt. Partial cost is legitimate on failure.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub error: String,
    /// Cost incurred before the attempt failed, in USD.
    pub cost_usd: f64,
    /// Tokens consumed before the attempt failed.
    pub tokens_used: u64,
}

/// What an agent task returns from one invocation.
pub type TaskOutcome = Result<TaskSuccess, TaskFailure>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
