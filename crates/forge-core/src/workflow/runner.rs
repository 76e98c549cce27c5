//! Single-step execution: attempts, retry delay, and per-attempt timeout.
//!
//! The runner owns everything between "step dispatched" and "terminal
//! `StepResult`": it invokes the bound task up to `retry_count + 1`
//! times, sleeps `retry_delay_ms` between attempts, caps each attempt
//! with `tokio::time::timeout` when a timeout applies, and accumulates
//! cost and token usage across all attempts, failed ones included.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, warn};
use uuid::Uuid;

use forge_types::task::{TaskInvocation, TaskOutcome};
use forge_types::workflow::{StepResult, StepStatus, WorkflowStep};

use crate::task::BoxAgentTask;

// ---------------------------------------------------------------------------
// StepRunner
// ---------------------------------------------------------------------------

/// Executes one step to a terminal result. Stateless between steps.
#[derive(Debug, Clone)]
pub struct StepRunner {
    /// Session-level default per-attempt timeout for steps without one.
    default_timeout: Option<Duration>,
}

impl StepRunner {
    pub fn new(default_timeout: Option<Duration>) -> Self {
        Self { default_timeout }
    }

    /// Run a step with already-resolved inputs until it succeeds or its
    /// attempts are exhausted.
    ///
    /// The result is `succeeded` on the first successful attempt,
    /// `timed_out` if the final attempt hit its deadline, and `failed`
    /// otherwise. `attempts`, `cost_usd`, and `tokens_used` cover every
    /// attempt made.
    pub async fn run(
        &self,
        step: &WorkflowStep,
        task: &BoxAgentTask,
        inputs: HashMap<String, Value>,
        run_id: Uuid,
    ) -> StepResult {
        let attempt_timeout = step
            .timeout_secs
            .map(Duration::from_secs)
            .or(self.default_timeout);
        let max_attempts = step.retry_count + 1;

        let started = Instant::now();
        let mut total_cost = 0.0_f64;
        let mut total_tokens = 0_u64;
        let mut last_error = String::new();
        let mut last_timed_out = false;

        for attempt in 1..=max_attempts {
            if attempt > 1 && step.retry_delay_ms > 0 {
                sleep(Duration::from_millis(step.retry_delay_ms)).await;
            }

            let invocation = TaskInvocation {
                run_id,
                step_id: step.id.clone(),
                description: step.task.clone(),
                inputs: inputs.clone(),
                deadline: attempt_timeout,
            };

            debug!(step = %step.id, agent = %step.agent, attempt, max_attempts, "invoking step");

            let outcome = self.attempt(task, invocation, attempt_timeout).await;
            match outcome {
                Some(Ok(success)) => {
                    total_cost += success.cost_usd;
                    total_tokens += success.tokens_used;
                    return StepResult {
                        step_id: step.id.clone(),
                        status: StepStatus::Succeeded,
                        output: Some(success.output),
                        error: None,
                        skip_reason: None,
                        attempts: attempt,
                        duration_ms: started.elapsed().as_millis() as u64,
                        cost_usd: total_cost,
                        tokens_used: total_tokens,
                    };
                }
                Some(Err(failure)) => {
                    total_cost += failure.cost_usd;
                    total_tokens += failure.tokens_used;
                    warn!(step = %step.id, attempt, error = %failure.error, "step attempt failed");
                    last_error = failure.error;
                    last_timed_out = false;
                }
                None => {
                    warn!(step = %step.id, attempt, "step attempt timed out");
                    last_error = match attempt_timeout {
                        Some(t) => format!("attempt timed out after {}s", t.as_secs()),
                        None => "attempt timed out".to_string(),
                    };
                    last_timed_out = true;
                }
            }
        }

        StepResult {
            step_id: step.id.clone(),
            status: if last_timed_out {
                StepStatus::TimedOut
            } else {
                StepStatus::Failed
            },
            output: None,
            error: Some(last_error),
            skip_reason: None,
            attempts: max_attempts,
            duration_ms: started.elapsed().as_millis() as u64,
            cost_usd: total_cost,
            tokens_used: total_tokens,
        }
    }

    /// One attempt. `None` means the attempt hit its deadline; partial
    /// cost from a timed-out attempt is unknowable and counts as zero.
    async fn attempt(
        &self,
        task: &BoxAgentTask,
        invocation: TaskInvocation,
        attempt_timeout: Option<Duration>,
    ) -> Option<TaskOutcome> {
        match attempt_timeout {
            Some(limit) => timeout(limit, task.invoke(invocation)).await.ok(),
            None => Some(task.invoke(invocation).await),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
