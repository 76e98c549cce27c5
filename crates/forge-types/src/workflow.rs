//! Workflow domain types for Forge.
//!
//! A [`WorkflowDefinition`] is the immutable description of a run: an
//! ordered list of [`WorkflowStep`]s bound to agent tasks, plus run-level
//! policy (stop-on-failure, timeout, budget ceiling). Execution tracking
//! lives in [`StepResult`] and [`WorkflowResult`]; the definition itself is
//! never mutated by the engine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::report::{ChangePlan, EvalResult, Finding};
use crate::task::TaskOutput;

// ---------------------------------------------------------------------------
// Workflow Definition
// ---------------------------------------------------------------------------

/// A complete workflow definition, immutable once submitted.
///
/// YAML files, built-in templates, and programmatic callers all produce
/// this struct; it is the single input to `WorkflowEngine::submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// UUIDv7, assigned at construction when not present in the source.
    #[serde(default = "Uuid::now_v7")]
    pub id: Uuid,
    /// Workflow name (alphanumeric, hyphens, underscores).
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Semantic version string.
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Ordered list of step definitions forming the workflow DAG.
    pub steps: Vec<WorkflowStep>,
    /// Workflow-level inputs, addressable from steps as `$workflow.<key>`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub inputs: HashMap<String, Value>,
    /// Stop dispatching new steps after the first failure.
    #[serde(default = "default_stop_on_failure")]
    pub stop_on_failure: bool,
    /// Overall deadline in seconds, measured from first dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Budget ceiling in USD. Absent means the session default applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_usd: Option<f64>,
    /// Extensible metadata (not interpreted by the engine).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_stop_on_failure() -> bool {
    true
}

impl WorkflowDefinition {
    /// Create a definition with default policy (stop on failure, no
    /// explicit timeout or budget).
    pub fn new(name: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            description: None,
            version: default_version(),
            tags: Vec::new(),
            steps,
            inputs: HashMap::new(),
            stop_on_failure: default_stop_on_failure(),
            timeout_secs: None,
            budget_usd: None,
            metadata: HashMap::new(),
        }
    }

    /// Look up a step by id.
    pub fn step(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }
}

// ---------------------------------------------------------------------------
// Step Definition
// ---------------------------------------------------------------------------

/// A single step in the workflow DAG, bound to an agent task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Step id, unique within a workflow (e.g. "analyze").
    pub id: String,
    /// Name of the agent task that executes this step (opaque reference).
    pub agent: String,
    /// Human-readable task description passed through to the agent.
    pub task: String,
    /// Step ids this step depends on (DAG edges).
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Input mapping. String values starting with `$` are references of
    /// the form `$<step>.<field>...` or `$workflow.<key>`; everything else
    /// passes through as a literal.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub inputs: HashMap<String, Value>,
    /// Advisory grouping label for steps intended to run concurrently.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_group: Option<String>,
    /// Number of retries after a failed attempt (0 = single attempt).
    #[serde(default)]
    pub retry_count: u32,
    /// Delay between attempts in milliseconds.
    #[serde(default)]
    pub retry_delay_ms: u64,
    /// Per-attempt timeout in seconds. Absent means no enforced cap
    /// (unless the session config supplies a default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl WorkflowStep {
    /// Create a step with no dependencies, inputs, or retry policy.
    pub fn new(
        id: impl Into<String>,
        agent: impl Into<String>,
        task: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent: agent.into(),
            task: task.into(),
            depends_on: Vec::new(),
            inputs: HashMap::new(),
            parallel_group: None,
            retry_count: 0,
            retry_delay_ms: 0,
            timeout_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Step status
// ---------------------------------------------------------------------------

/// Lifecycle status of a step within one run.
///
/// Transitions: `pending -> ready -> running -> {succeeded | failed |
/// timed_out}`, with `skipped` reachable from `pending` or `ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Ready,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Skipped,
}

impl StepStatus {
    /// True for states a step can never leave.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded
                | StepStatus::Failed
                | StepStatus::TimedOut
                | StepStatus::Skipped
        )
    }

    /// True only for `succeeded`.
    pub fn is_success(&self) -> bool {
        matches!(self, StepStatus::Succeeded)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Ready => "ready",
            StepStatus::Running => "running",
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
            StepStatus::TimedOut => "timed_out",
            StepStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Why a step was skipped instead of dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A direct or transitive dependency did not succeed.
    DependencyFailed,
    /// An earlier failure halted dispatch (`stop_on_failure = true`).
    StopOnFailure,
    /// The budget ceiling was reached before dispatch.
    BudgetExceeded,
    /// The workflow deadline expired.
    WorkflowTimeout,
    /// The run was cancelled by the caller.
    Cancelled,
}

// ---------------------------------------------------------------------------
// Step result
// ---------------------------------------------------------------------------

/// Terminal record for one step, produced exactly once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    /// Terminal status (`succeeded`, `failed`, `timed_out`, `skipped`).
    pub status: StepStatus,
    /// Output payload of the successful attempt, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<TaskOutput>,
    /// Last error detail when the step failed or timed out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Populated iff `status == skipped`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    /// Attempts consumed (0 for steps that never dispatched).
    pub attempts: u32,
    /// Wall-clock duration across all attempts, in milliseconds.
    pub duration_ms: u64,
    /// Cost incurred across all attempts (failed attempts included), USD.
    pub cost_usd: f64,
    /// Tokens consumed across all attempts.
    pub tokens_used: u64,
}

impl StepResult {
    /// A `skipped` result for a step that was never dispatched.
    pub fn skipped(step_id: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Skipped,
            output: None,
            error: None,
            skip_reason: Some(reason),
            attempts: 0,
            duration_ms: 0,
            cost_usd: 0.0,
            tokens_used: 0,
        }
    }

    /// A `failed` result for a step that could not be dispatched (e.g.
    /// input resolution failed or the agent reference is unknown).
    pub fn dispatch_failed(step_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Failed,
            output: None,
            error: Some(error.into()),
            skip_reason: None,
            attempts: 0,
            duration_ms: 0,
            cost_usd: 0.0,
            tokens_used: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow result
// ---------------------------------------------------------------------------

/// Consolidated outcome of one workflow run.
///
/// Step results appear in completion order, not declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub run_id: Uuid,
    pub workflow_id: Uuid,
    pub workflow_name: String,
    /// True iff no step ended `failed`/`timed_out` and the run was not
    /// halted by a workflow timeout or cancellation.
    pub success: bool,
    /// Per-step terminal records in completion order.
    pub steps: Vec<StepResult>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub total_cost_usd: f64,
    pub total_tokens: u64,
}

impl WorkflowResult {
    /// Look up one step's result by id.
    pub fn step(&self, step_id: &str) -> Option<&StepResult> {
        self.steps.iter().find(|r| r.step_id == step_id)
    }

    /// All findings across succeeded steps, in completion order.
    pub fn findings(&self) -> Vec<&Finding> {
        self.steps
            .iter()
            .filter_map(|r| match &r.output {
                Some(TaskOutput::Findings(findings)) => Some(findings.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// All change plans across succeeded steps, in completion order.
    pub fn change_plans(&self) -> Vec<&ChangePlan> {
        self.steps
            .iter()
            .filter_map(|r| match &r.output {
                Some(TaskOutput::ChangePlan(plan)) => Some(plan),
                _ => None,
            })
            .collect()
    }

    /// All evaluation results across succeeded steps, in completion order.
    pub fn eval_results(&self) -> Vec<&EvalResult> {
        self.steps
            .iter()
            .filter_map(|r| match &r.output {
                Some(TaskOutput::EvalResult(eval)) => Some(eval),
                _ => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
