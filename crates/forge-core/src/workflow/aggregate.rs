//! Terminal result collection and run-level consolidation.
//!
//! Every step of a run reports exactly one terminal [`StepResult`] here,
//! in completion order. The aggregator also serves as the source of
//! resolved outputs for downstream input interpolation, and folds
//! everything into the final [`WorkflowResult`] when the run ends.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use forge_types::workflow::{
    SkipReason, StepResult, StepStatus, WorkflowDefinition, WorkflowResult,
};

// ---------------------------------------------------------------------------
// ResultAggregator
// ---------------------------------------------------------------------------

/// Collects terminal step results for one run.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Mutex<Vec<StepResult>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step's terminal result. Called at most once per step.
    pub fn record(&self, result: StepResult) {
        self.lock().push(result);
    }

    /// Ids of all steps with a recorded terminal result.
    pub fn terminal_ids(&self) -> HashSet<String> {
        self.lock().iter().map(|r| r.step_id.clone()).collect()
    }

    /// Ids of steps that terminated without succeeding.
    pub fn unsuccessful_ids(&self) -> HashSet<String> {
        self.lock()
            .iter()
            .filter(|r| !r.status.is_success())
            .map(|r| r.step_id.clone())
            .collect()
    }

    /// True if any recorded step failed or timed out (skips excluded).
    pub fn has_failure(&self) -> bool {
        self.lock()
            .iter()
            .any(|r| matches!(r.status, StepStatus::Failed | StepStatus::TimedOut))
    }

    /// JSON views of all succeeded outputs, keyed by step id, for input
    /// interpolation.
    pub fn completed_outputs(&self) -> HashMap<String, Value> {
        self.lock()
            .iter()
            .filter(|r| r.status.is_success())
            .filter_map(|r| r.output.as_ref().map(|o| (r.step_id.clone(), o.to_value())))
            .collect()
    }

    /// Fold everything into the final run result.
    ///
    /// The run is successful iff no step failed or timed out and the run
    /// was not halted by the workflow deadline or a cancellation. Skipped
    /// steps alone do not fail a run that was halted by budget policy.
    pub fn finish(
        self,
        run_id: Uuid,
        definition: &WorkflowDefinition,
        started_at: DateTime<Utc>,
        halt: Option<SkipReason>,
    ) -> WorkflowResult {
        let steps = self.results.into_inner().unwrap_or_else(|e| e.into_inner());

        let halted_abnormally = matches!(
            halt,
            Some(SkipReason::WorkflowTimeout) | Some(SkipReason::Cancelled)
        );
        let any_failure = steps
            .iter()
            .any(|r| matches!(r.status, StepStatus::Failed | StepStatus::TimedOut));

        let completed_at = Utc::now();
        let duration_ms = (completed_at - started_at).num_milliseconds().max(0) as u64;

        WorkflowResult {
            run_id,
            workflow_id: definition.id,
            workflow_name: definition.name.clone(),
            success: !any_failure && !halted_abnormally,
            total_cost_usd: steps.iter().map(|r| r.cost_usd).sum(),
            total_tokens: steps.iter().map(|r| r.tokens_used).sum(),
            steps,
            started_at,
            completed_at,
            duration_ms,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StepResult>> {
        self.results.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use forge_types::task::TaskOutput;
    use forge_types::workflow::WorkflowStep;

    fn succeeded(step_id: &str, cost: f64, tokens: u64) -> StepResult {
        StepResult {
            step_id: step_id.to_string(),
            status: StepStatus::Succeeded,
            output: Some(TaskOutput::Generic(json!({ "from": step_id }))),
            error: None,
            skip_reason: None,
            attempts: 1,
            duration_ms: 5,
            cost_usd: cost,
            tokens_used: tokens,
        }
    }

    fn failed(step_id: &str) -> StepResult {
        StepResult {
            step_id: step_id.to_string(),
            status: StepStatus::Failed,
            output: None,
            error: Some("boom".to_string()),
            skip_reason: None,
            attempts: 1,
            duration_ms: 5,
            cost_usd: 0.0,
            tokens_used: 0,
        }
    }

    fn definition() -> WorkflowDefinition {
        WorkflowDefinition::new("wf", vec![WorkflowStep::new("a", "agent", "t")])
    }

    #[test]
    fn outputs_indexed_by_step_id() {
        let agg = ResultAggregator::new();
        agg.record(succeeded("a", 0.01, 10));
        agg.record(failed("b"));

        let outputs = agg.completed_outputs();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs["a"]["result"]["from"], "a");
        assert!(agg.has_failure());
        assert_eq!(agg.terminal_ids().len(), 2);
        assert_eq!(agg.unsuccessful_ids(), HashSet::from(["b".to_string()]));
    }

    #[test]
    fn finish_sums_cost_and_tokens_in_completion_order() {
        let agg = ResultAggregator::new();
        agg.record(succeeded("b", 0.02, 200));
        agg.record(succeeded("a", 0.01, 100));

        let result = agg.finish(Uuid::now_v7(), &definition(), Utc::now(), None);
        assert!(result.success);
        assert_eq!(result.steps[0].step_id, "b");
        assert_eq!(result.steps[1].step_id, "a");
        assert!((result.total_cost_usd - 0.03).abs() < 1e-9);
        assert_eq!(result.total_tokens, 300);
    }

    #[test]
    fn failure_makes_run_unsuccessful() {
        let agg = ResultAggregator::new();
        agg.record(succeeded("a", 0.0, 0));
        agg.record(failed("b"));
        let result = agg.finish(Uuid::now_v7(), &definition(), Utc::now(), None);
        assert!(!result.success);
    }

    #[test]
    fn skips_alone_do_not_fail_a_budget_halted_run() {
        let agg = ResultAggregator::new();
        agg.record(succeeded("a", 5.0, 1000));
        agg.record(StepResult::skipped("b", SkipReason::BudgetExceeded));
        let result = agg.finish(
            Uuid::now_v7(),
            &definition(),
            Utc::now(),
            Some(SkipReason::BudgetExceeded),
        );
        assert!(result.success);
    }

    #[test]
    fn workflow_timeout_fails_the_run() {
        let agg = ResultAggregator::new();
        agg.record(succeeded("a", 0.0, 0));
        agg.record(StepResult::skipped("b", SkipReason::WorkflowTimeout));
        let result = agg.finish(
            Uuid::now_v7(),
            &definition(),
            Utc::now(),
            Some(SkipReason::WorkflowTimeout),
        );
        assert!(!result.success);
    }
}
