//! Dependency-driven workflow execution.
//!
//! `WorkflowEngine` drives a validated definition to completion:
//!
//! 1. Validate the definition and build the dependency graph.
//! 2. Dispatch every step whose dependencies have all succeeded, each on
//!    its own `JoinSet` task.
//! 3. On each completion, record the result, charge the budget, and
//!    re-evaluate readiness; steps downstream of a non-succeeded step
//!    are cascade-skipped.
//! 4. A failure (with `stop_on_failure`), budget exhaustion, the
//!    workflow deadline, or a cancellation halts new dispatches; steps
//!    already running drain to their natural end.
//!
//! Step scheduling is event-driven rather than wave-based: a step
//! dispatches the moment its last dependency succeeds, so independent
//! branches never wait on each other.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use forge_types::config::SessionConfig;
use forge_types::error::DefinitionError;
use forge_types::workflow::{
    SkipReason, StepResult, StepStatus, WorkflowDefinition, WorkflowResult,
};

use crate::task::TaskRegistry;

use super::aggregate::ResultAggregator;
use super::budget::{BudgetGuard, BudgetStatus};
use super::definition::validate;
use super::graph::ExecutionGraph;
use super::interpolate::resolve_inputs;
use super::runner::StepRunner;

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Executes workflow definitions against a registry of agent tasks.
///
/// The engine is stateless across runs apart from cancellation tokens;
/// submitting the same definition twice produces two independent runs.
pub struct WorkflowEngine {
    registry: Arc<TaskRegistry>,
    session: SessionConfig,
    cancellation_tokens: DashMap<Uuid, CancellationToken>,
}

impl WorkflowEngine {
    pub fn new(registry: Arc<TaskRegistry>, session: SessionConfig) -> Self {
        Self {
            registry,
            session,
            cancellation_tokens: DashMap::new(),
        }
    }

    /// Execute a workflow definition to completion.
    ///
    /// Returns `Err` only for invalid definitions; execution problems
    /// (step failures, timeouts, budget exhaustion) are reported inside
    /// the [`WorkflowResult`].
    pub async fn submit(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<WorkflowResult, DefinitionError> {
        let graph = validate(definition)?;

        let run_id = Uuid::now_v7();
        let cancel = CancellationToken::new();
        self.cancellation_tokens.insert(run_id, cancel.clone());

        info!(
            run_id = %run_id,
            workflow = definition.name.as_str(),
            steps = definition.steps.len(),
            "starting workflow run"
        );

        let result = self.drive(definition, &graph, run_id, cancel).await;
        self.cancellation_tokens.remove(&run_id);

        info!(
            run_id = %run_id,
            workflow = definition.name.as_str(),
            success = result.success,
            cost_usd = result.total_cost_usd,
            duration_ms = result.duration_ms,
            "workflow run finished"
        );

        Ok(result)
    }

    /// Request cancellation of a running workflow.
    ///
    /// Pending steps are skipped; running steps drain to their natural
    /// end. Returns false if no such run is active.
    pub fn cancel(&self, run_id: Uuid) -> bool {
        match self.cancellation_tokens.get(&run_id) {
            Some(token) => {
                token.cancel();
                info!(run_id = %run_id, "workflow cancellation requested");
                true
            }
            None => false,
        }
    }

    async fn drive(
        &self,
        definition: &WorkflowDefinition,
        graph: &ExecutionGraph,
        run_id: Uuid,
        cancel: CancellationToken,
    ) -> WorkflowResult {
        let started_at = Utc::now();
        let deadline = Instant::now()
            + Duration::from_secs(
                definition
                    .timeout_secs
                    .unwrap_or(self.session.default_workflow_timeout_secs),
            );

        let budget = BudgetGuard::new(definition.budget_usd.or(self.session.budget_usd));
        let runner = Arc::new(StepRunner::new(
            self.session.default_step_timeout_secs.map(Duration::from_secs),
        ));
        let aggregator = ResultAggregator::new();

        let mut pending: HashSet<String> =
            definition.steps.iter().map(|s| s.id.clone()).collect();
        let mut halt: Option<SkipReason> = None;
        let mut join_set: JoinSet<StepResult> = JoinSet::new();
        let mut task_steps: HashMap<tokio::task::Id, String> = HashMap::new();
        let mut group_semaphores: HashMap<String, Arc<Semaphore>> = HashMap::new();

        loop {
            // Skip-cascade and dispatch, to a fixpoint: recording a skip
            // can make further downstream steps skippable.
            let mut progressed = true;
            while progressed {
                progressed = false;

                let terminal = aggregator.terminal_ids();
                let unsuccessful = aggregator.unsuccessful_ids();

                let mut to_skip: Vec<(String, SkipReason)> = Vec::new();
                let mut ready: Vec<String> = Vec::new();
                for id in &pending {
                    let deps = graph.dependencies(id);
                    if deps.iter().any(|d| unsuccessful.contains(d)) {
                        to_skip.push((id.clone(), SkipReason::DependencyFailed));
                    } else if let Some(reason) = halt {
                        to_skip.push((id.clone(), reason));
                    } else if deps.iter().all(|d| terminal.contains(d)) {
                        ready.push(id.clone());
                    }
                }
                // Stable dispatch order for steps that become ready together.
                ready.sort_by_key(|id| {
                    graph.topo_order().iter().position(|s| s == id)
                });

                for (id, reason) in to_skip {
                    debug!(run_id = %run_id, step = id.as_str(), reason = ?reason, "skipping step");
                    pending.remove(&id);
                    aggregator.record(StepResult::skipped(id, reason));
                    progressed = true;
                }

                for id in ready {
                    if let Some(reason) = halt {
                        pending.remove(&id);
                        aggregator.record(StepResult::skipped(id, reason));
                        progressed = true;
                        continue;
                    }
                    if !budget.admit() {
                        warn!(
                            run_id = %run_id,
                            step = id.as_str(),
                            spent_usd = budget.spent_usd(),
                            "budget exhausted before dispatch"
                        );
                        pending.remove(&id);
                        aggregator.record(StepResult::skipped(id, SkipReason::BudgetExceeded));
                        progressed = true;
                        continue;
                    }

                    // Definition is validated, so the step must exist.
                    let Some(step) = definition.step(&id).cloned() else {
                        continue;
                    };

                    let inputs = match resolve_inputs(&step, definition, &aggregator.completed_outputs()) {
                        Ok(inputs) => inputs,
                        Err(e) => {
                            warn!(run_id = %run_id, step = id.as_str(), error = %e, "input resolution failed");
                            pending.remove(&id);
                            aggregator.record(StepResult::dispatch_failed(id, e.to_string()));
                            if definition.stop_on_failure && halt.is_none() {
                                halt = Some(SkipReason::StopOnFailure);
                            }
                            progressed = true;
                            continue;
                        }
                    };

                    let Some(task) = self.registry.get(&step.agent) else {
                        warn!(run_id = %run_id, step = id.as_str(), agent = step.agent.as_str(), "unknown agent");
                        pending.remove(&id);
                        aggregator.record(StepResult::dispatch_failed(
                            id,
                            format!("unknown agent '{}'", step.agent),
                        ));
                        if definition.stop_on_failure && halt.is_none() {
                            halt = Some(SkipReason::StopOnFailure);
                        }
                        progressed = true;
                        continue;
                    };

                    let semaphore = match (&step.parallel_group, self.session.max_group_concurrency)
                    {
                        (Some(group), Some(limit)) => Some(Arc::clone(
                            group_semaphores
                                .entry(group.clone())
                                .or_insert_with(|| Arc::new(Semaphore::new(limit))),
                        )),
                        _ => None,
                    };

                    debug!(run_id = %run_id, step = id.as_str(), agent = step.agent.as_str(), "dispatching step");
                    pending.remove(&id);
                    let runner = Arc::clone(&runner);
                    let handle = join_set.spawn(async move {
                        let _permit = match semaphore {
                            Some(s) => s.acquire_owned().await.ok(),
                            None => None,
                        };
                        runner.run(&step, &task, inputs, run_id).await
                    });
                    task_steps.insert(handle.id(), id);
                }
            }

            if join_set.is_empty() && pending.is_empty() {
                break;
            }

            tokio::select! {
                Some(joined) = join_set.join_next_with_id() => {
                    let result = match joined {
                        Ok((task_id, result)) => {
                            task_steps.remove(&task_id);
                            result
                        }
                        Err(join_err) => {
                            let step_id = task_steps
                                .remove(&join_err.id())
                                .unwrap_or_else(|| "<unknown>".to_string());
                            StepResult::dispatch_failed(step_id, format!("step task aborted: {join_err}"))
                        }
                    };

                    match budget.record(result.cost_usd) {
                        BudgetStatus::Warning => warn!(
                            run_id = %run_id,
                            spent_usd = budget.spent_usd(),
                            ceiling_usd = budget.ceiling_usd(),
                            "budget 80% threshold crossed"
                        ),
                        BudgetStatus::Exhausted => warn!(
                            run_id = %run_id,
                            spent_usd = budget.spent_usd(),
                            ceiling_usd = budget.ceiling_usd(),
                            "budget exhausted"
                        ),
                        BudgetStatus::Ok => {}
                    }

                    let failed = matches!(result.status, StepStatus::Failed | StepStatus::TimedOut);
                    debug!(
                        run_id = %run_id,
                        step = result.step_id.as_str(),
                        status = %result.status,
                        attempts = result.attempts,
                        cost_usd = result.cost_usd,
                        "step finished"
                    );
                    aggregator.record(result);

                    if failed && definition.stop_on_failure && halt.is_none() {
                        warn!(run_id = %run_id, "halting dispatch after step failure");
                        halt = Some(SkipReason::StopOnFailure);
                    }
                }
                _ = sleep_until(deadline), if halt.is_none() => {
                    warn!(run_id = %run_id, "workflow deadline expired");
                    halt = Some(SkipReason::WorkflowTimeout);
                }
                _ = cancel.cancelled(), if halt.is_none() => {
                    warn!(run_id = %run_id, "workflow cancelled");
                    halt = Some(SkipReason::Cancelled);
                }
            }
        }

        aggregator.finish(run_id, definition, started_at, halt)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde_json::{Value, json};

    use forge_types::task::{TaskFailure, TaskInvocation, TaskOutcome, TaskOutput, TaskSuccess};
    use forge_types::workflow::WorkflowStep;

    use crate::task::AgentTask;

    // -----------------------------------------------------------------------
    // Scripted task harness
    // -----------------------------------------------------------------------

    /// Per-step behavior for the scripted agent.
    #[derive(Clone)]
    enum Script {
        /// Succeed with the given payload and cost after a delay.
        Succeed { payload: Value, cost: f64, delay_ms: u64 },
        /// Fail with the given message and cost.
        Fail { error: String, cost: f64 },
        /// Echo resolved inputs back as the generic output.
        EchoInputs,
    }

    /// One agent shared by every step; behavior is keyed by step id.
    /// Records invocation order for assertions.
    struct ScriptedAgent {
        scripts: HashMap<String, Script>,
        invocations: Arc<Mutex<Vec<String>>>,
        running: Arc<AtomicU32>,
        max_running: Arc<AtomicU32>,
    }

    impl ScriptedAgent {
        fn new(scripts: Vec<(&str, Script)>) -> Self {
            Self {
                scripts: scripts
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                invocations: Arc::new(Mutex::new(Vec::new())),
                running: Arc::new(AtomicU32::new(0)),
                max_running: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    impl AgentTask for ScriptedAgent {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn invoke(&self, invocation: TaskInvocation) -> TaskOutcome {
            self.invocations
                .lock()
                .unwrap()
                .push(invocation.step_id.clone());

            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);

            let script = self
                .scripts
                .get(&invocation.step_id)
                .cloned()
                .unwrap_or(Script::EchoInputs);

            let outcome = match script {
                Script::Succeed { payload, cost, delay_ms } => {
                    if delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                    Ok(TaskSuccess {
                        output: TaskOutput::Generic(payload),
                        cost_usd: cost,
                        tokens_used: 100,
                    })
                }
                Script::Fail { error, cost } => Err(TaskFailure {
                    error,
                    cost_usd: cost,
                    tokens_used: 50,
                }),
                Script::EchoInputs => Ok(TaskSuccess {
                    output: TaskOutput::Generic(json!(invocation.inputs)),
                    cost_usd: 0.0,
                    tokens_used: 0,
                }),
            };

            self.running.fetch_sub(1, Ordering::SeqCst);
            outcome
        }
    }

    fn engine_with(agent: ScriptedAgent, session: SessionConfig) -> WorkflowEngine {
        let mut registry = TaskRegistry::new();
        registry.register(agent);
        WorkflowEngine::new(Arc::new(registry), session)
    }

    fn unlimited_session() -> SessionConfig {
        SessionConfig {
            budget_usd: None,
            ..SessionConfig::default()
        }
    }

    fn step(id: &str, depends_on: Vec<&str>) -> WorkflowStep {
        let mut s = WorkflowStep::new(id, "scripted", format!("run {id}"));
        s.depends_on = depends_on.into_iter().map(String::from).collect();
        s
    }

    fn ok(payload: Value) -> Script {
        Script::Succeed { payload, cost: 0.0, delay_ms: 0 }
    }

    // -----------------------------------------------------------------------
    // Ordering and data flow
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn linear_chain_runs_in_dependency_order() {
        let agent = ScriptedAgent::new(vec![
            ("a", ok(json!({ "value": 1 }))),
            ("b", Script::EchoInputs),
            ("c", ok(json!(null))),
        ]);
        let invocations = Arc::clone(&agent.invocations);
        let engine = engine_with(agent, unlimited_session());

        let mut b = step("b", vec!["a"]);
        b.inputs.insert("from_a".to_string(), json!("$a.result.value"));
        let def = WorkflowDefinition::new(
            "chain",
            vec![step("a", vec![]), b, step("c", vec!["b"])],
        );

        let result = engine.submit(&def).await.unwrap();
        assert!(result.success);
        assert_eq!(result.steps.len(), 3);
        assert_eq!(*invocations.lock().unwrap(), vec!["a", "b", "c"]);

        // b saw a's output, resolved through the reference.
        let b_result = result.step("b").unwrap();
        let output = b_result.output.as_ref().unwrap().to_value();
        assert_eq!(output["result"]["from_a"], 1);
    }

    #[tokio::test]
    async fn resubmission_produces_independent_runs() {
        let agent = ScriptedAgent::new(vec![("a", ok(json!(1)))]);
        let engine = engine_with(agent, unlimited_session());
        let def = WorkflowDefinition::new("again", vec![step("a", vec![])]);

        let first = engine.submit(&def).await.unwrap();
        let second = engine.submit(&def).await.unwrap();
        assert!(first.success && second.success);
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(first.workflow_id, second.workflow_id);
    }

    // -----------------------------------------------------------------------
    // Failure handling
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn failure_cascades_and_stop_on_failure_halts_dispatch() {
        // a fails immediately; b depends on a; d succeeds slowly; c
        // depends on d and must never dispatch once the run is halted.
        let agent = ScriptedAgent::new(vec![
            ("a", Script::Fail { error: "boom".to_string(), cost: 0.0 }),
            ("d", Script::Succeed { payload: json!(1), cost: 0.0, delay_ms: 500 }),
            ("c", ok(json!(2))),
        ]);
        let invocations = Arc::clone(&agent.invocations);
        let engine = engine_with(agent, unlimited_session());

        let def = WorkflowDefinition::new(
            "halting",
            vec![
                step("a", vec![]),
                step("b", vec!["a"]),
                step("d", vec![]),
                step("c", vec!["d"]),
            ],
        );

        let result = engine.submit(&def).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.steps.len(), 4, "every step gets a terminal result");

        assert_eq!(result.step("a").unwrap().status, StepStatus::Failed);
        let b = result.step("b").unwrap();
        assert_eq!(b.status, StepStatus::Skipped);
        assert_eq!(b.skip_reason, Some(SkipReason::DependencyFailed));

        // d was already running when a failed, so it drains to success.
        assert_eq!(result.step("d").unwrap().status, StepStatus::Succeeded);
        let c = result.step("c").unwrap();
        assert_eq!(c.status, StepStatus::Skipped);
        assert_eq!(c.skip_reason, Some(SkipReason::StopOnFailure));

        assert!(!invocations.lock().unwrap().contains(&"c".to_string()));
    }

    #[tokio::test]
    async fn independent_branch_completes_when_stop_on_failure_disabled() {
        let agent = ScriptedAgent::new(vec![
            ("a", Script::Fail { error: "boom".to_string(), cost: 0.0 }),
            ("d", ok(json!(1))),
            ("c", ok(json!(2))),
        ]);
        let engine = engine_with(agent, unlimited_session());

        let mut def = WorkflowDefinition::new(
            "branches",
            vec![
                step("a", vec![]),
                step("b", vec!["a"]),
                step("d", vec![]),
                step("c", vec!["d"]),
            ],
        );
        def.stop_on_failure = false;

        let result = engine.submit(&def).await.unwrap();
        assert!(!result.success, "a failed");
        assert_eq!(result.step("c").unwrap().status, StepStatus::Succeeded);
        assert_eq!(result.step("d").unwrap().status, StepStatus::Succeeded);
        assert_eq!(
            result.step("b").unwrap().skip_reason,
            Some(SkipReason::DependencyFailed)
        );
    }

    #[tokio::test]
    async fn interpolation_failure_fails_only_the_referencing_step() {
        let agent = ScriptedAgent::new(vec![
            ("a", ok(json!({ "value": 1 }))),
            ("good", Script::EchoInputs),
        ]);
        let engine = engine_with(agent, unlimited_session());

        let mut bad = step("bad", vec!["a"]);
        bad.inputs
            .insert("x".to_string(), json!("$a.result.missing"));
        let mut def = WorkflowDefinition::new(
            "iso",
            vec![step("a", vec![]), bad, step("good", vec!["a"])],
        );
        def.stop_on_failure = false;

        let result = engine.submit(&def).await.unwrap();
        let bad = result.step("bad").unwrap();
        assert_eq!(bad.status, StepStatus::Failed);
        assert_eq!(bad.attempts, 0);
        assert!(bad.error.as_deref().unwrap().contains("missing"));
        assert_eq!(result.step("good").unwrap().status, StepStatus::Succeeded);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn unknown_agent_fails_at_dispatch() {
        let agent = ScriptedAgent::new(vec![]);
        let engine = engine_with(agent, unlimited_session());

        let mut def = WorkflowDefinition::new("ghost", vec![step("a", vec![])]);
        def.steps[0].agent = "nonexistent".to_string();

        let result = engine.submit(&def).await.unwrap();
        let a = result.step("a").unwrap();
        assert_eq!(a.status, StepStatus::Failed);
        assert!(a.error.as_deref().unwrap().contains("unknown agent"));
    }

    // -----------------------------------------------------------------------
    // Budget
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn budget_exhaustion_skips_later_steps() {
        let agent = ScriptedAgent::new(vec![
            ("a", Script::Succeed { payload: json!(1), cost: 3.0, delay_ms: 0 }),
            ("b", Script::Succeed { payload: json!(2), cost: 3.0, delay_ms: 0 }),
            ("c", ok(json!(3))),
        ]);
        let engine = engine_with(agent, unlimited_session());

        let mut def = WorkflowDefinition::new(
            "spend",
            vec![step("a", vec![]), step("b", vec!["a"]), step("c", vec!["b"])],
        );
        def.budget_usd = Some(5.0);

        let result = engine.submit(&def).await.unwrap();
        // a: spend 3.0 < 5.0, b admitted; b: spend 6.0, c denied.
        assert_eq!(result.step("a").unwrap().status, StepStatus::Succeeded);
        assert_eq!(result.step("b").unwrap().status, StepStatus::Succeeded);
        let c = result.step("c").unwrap();
        assert_eq!(c.status, StepStatus::Skipped);
        assert_eq!(c.skip_reason, Some(SkipReason::BudgetExceeded));

        // Nothing failed, so the run itself is still successful.
        assert!(result.success);
        assert!((result.total_cost_usd - 6.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn session_budget_applies_when_definition_has_none() {
        let agent = ScriptedAgent::new(vec![
            ("a", Script::Succeed { payload: json!(1), cost: 2.0, delay_ms: 0 }),
            ("b", ok(json!(2))),
        ]);
        let session = SessionConfig {
            budget_usd: Some(1.0),
            ..SessionConfig::default()
        };
        let engine = engine_with(agent, session);

        let def =
            WorkflowDefinition::new("caps", vec![step("a", vec![]), step("b", vec!["a"])]);
        let result = engine.submit(&def).await.unwrap();
        assert_eq!(
            result.step("b").unwrap().skip_reason,
            Some(SkipReason::BudgetExceeded)
        );
    }

    // -----------------------------------------------------------------------
    // Deadline and cancellation
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn workflow_deadline_skips_pending_steps() {
        let agent = ScriptedAgent::new(vec![(
            "slow",
            Script::Succeed { payload: json!(1), cost: 0.0, delay_ms: 10_000 },
        )]);
        let engine = engine_with(agent, unlimited_session());

        let mut def = WorkflowDefinition::new(
            "deadline",
            vec![step("slow", vec![]), step("after", vec!["slow"])],
        );
        def.timeout_secs = Some(1);

        let result = engine.submit(&def).await.unwrap();
        assert!(!result.success);
        // The running step drains to its natural completion.
        assert_eq!(result.step("slow").unwrap().status, StepStatus::Succeeded);
        let after = result.step("after").unwrap();
        assert_eq!(after.status, StepStatus::Skipped);
        assert_eq!(after.skip_reason, Some(SkipReason::WorkflowTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_skips_pending_steps() {
        let agent = ScriptedAgent::new(vec![(
            "slow",
            Script::Succeed { payload: json!(1), cost: 0.0, delay_ms: 60_000 },
        )]);
        let engine = Arc::new(engine_with(agent, unlimited_session()));

        let def = WorkflowDefinition::new(
            "cancelled",
            vec![step("slow", vec![]), step("after", vec!["slow"])],
        );

        let submit = {
            let engine = Arc::clone(&engine);
            let def = def.clone();
            tokio::spawn(async move { engine.submit(&def).await })
        };

        // Let the run register its cancellation token and dispatch.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let run_id = engine
            .cancellation_tokens
            .iter()
            .next()
            .map(|e| *e.key())
            .unwrap();
        assert!(engine.cancel(run_id));

        let result = submit.await.unwrap().unwrap();
        assert!(!result.success);
        assert_eq!(
            result.step("after").unwrap().skip_reason,
            Some(SkipReason::Cancelled)
        );
        assert!(!engine.cancel(run_id), "token removed after the run");
    }

    // -----------------------------------------------------------------------
    // Parallel groups
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn group_concurrency_limit_serializes_group_members() {
        let agent = ScriptedAgent::new(vec![
            ("x", Script::Succeed { payload: json!(1), cost: 0.0, delay_ms: 100 }),
            ("y", Script::Succeed { payload: json!(2), cost: 0.0, delay_ms: 100 }),
        ]);
        let max_running = Arc::clone(&agent.max_running);
        let session = SessionConfig {
            budget_usd: None,
            max_group_concurrency: Some(1),
            ..SessionConfig::default()
        };
        let engine = engine_with(agent, session);

        let mut x = step("x", vec![]);
        x.parallel_group = Some("scan".to_string());
        let mut y = step("y", vec![]);
        y.parallel_group = Some("scan".to_string());
        let def = WorkflowDefinition::new("grouped", vec![x, y]);

        let result = engine.submit(&def).await.unwrap();
        assert!(result.success);
        assert_eq!(max_running.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn independent_steps_run_concurrently_without_limit() {
        let agent = ScriptedAgent::new(vec![
            ("x", Script::Succeed { payload: json!(1), cost: 0.0, delay_ms: 100 }),
            ("y", Script::Succeed { payload: json!(2), cost: 0.0, delay_ms: 100 }),
        ]);
        let max_running = Arc::clone(&agent.max_running);
        let engine = engine_with(agent, unlimited_session());

        let def = WorkflowDefinition::new("parallel", vec![step("x", vec![]), step("y", vec![])]);
        let result = engine.submit(&def).await.unwrap();
        assert!(result.success);
        assert_eq!(max_running.load(Ordering::SeqCst), 2);
    }

    // -----------------------------------------------------------------------
    // Validation at submission
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn invalid_definition_rejected_before_any_dispatch() {
        let agent = ScriptedAgent::new(vec![]);
        let invocations = Arc::clone(&agent.invocations);
        let engine = engine_with(agent, unlimited_session());

        let def = WorkflowDefinition::new(
            "cyclic",
            vec![step("a", vec!["b"]), step("b", vec!["a"])],
        );
        let err = engine.submit(&def).await.unwrap_err();
        assert!(matches!(err, DefinitionError::CyclicDependency(_)));
        assert!(invocations.lock().unwrap().is_empty());
    }
}
