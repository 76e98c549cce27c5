//! Placeholder agent tasks for CLI runs.
//!
//! The CLI executes workflows without a live agent backend: every agent
//! name referenced by the definition is bound to a [`PlaceholderAgent`]
//! that echoes its task description and resolved inputs. This exercises
//! the full scheduling, interpolation, and policy machinery; swap the
//! registry for real agent bindings to do real work.

use std::sync::Arc;

use serde_json::json;

use forge_core::task::{AgentTask, TaskRegistry};
use forge_types::task::{TaskInvocation, TaskOutcome, TaskOutput, TaskSuccess};
use forge_types::workflow::WorkflowDefinition;

/// Echoes the invocation back as a generic output, at zero cost.
pub struct PlaceholderAgent {
    name: String,
}

impl PlaceholderAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl AgentTask for PlaceholderAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, invocation: TaskInvocation) -> TaskOutcome {
        tracing::info!(
            agent = self.name.as_str(),
            step = invocation.step_id.as_str(),
            "placeholder agent invoked"
        );
        Ok(TaskSuccess {
            output: TaskOutput::Generic(json!({
                "agent": self.name,
                "task": invocation.description,
                "inputs": invocation.inputs,
            })),
            cost_usd: 0.0,
            tokens_used: 0,
        })
    }
}

/// Build a registry binding every agent the definition references to a
/// placeholder.
pub fn placeholder_registry(definition: &WorkflowDefinition) -> Arc<TaskRegistry> {
    let mut registry = TaskRegistry::new();
    for step in &definition.steps {
        if registry.get(&step.agent).is_none() {
            registry.register(PlaceholderAgent::new(step.agent.clone()));
        }
    }
    Arc::new(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_types::workflow::WorkflowStep;

    #[test]
    fn registry_covers_every_referenced_agent() {
        let def = WorkflowDefinition::new(
            "covered",
            vec![
                WorkflowStep::new("a", "security_analyzer", "scan"),
                WorkflowStep::new("b", "debugger", "fix"),
                WorkflowStep::new("c", "security_analyzer", "rescan"),
            ],
        );
        let registry = placeholder_registry(&def);
        assert!(registry.get("security_analyzer").is_some());
        assert!(registry.get("debugger").is_some());
        assert_eq!(registry.names().len(), 2);
    }

    #[tokio::test]
    async fn placeholder_echoes_inputs() {
        let agent = PlaceholderAgent::new("tester");
        let invocation = TaskInvocation {
            run_id: uuid::Uuid::now_v7(),
            step_id: "verify".to_string(),
            description: "Verify fixes".to_string(),
            inputs: std::collections::HashMap::from([("k".to_string(), json!("v"))]),
            deadline: None,
        };
        let success = agent.invoke(invocation).await.unwrap();
        let value = success.output.to_value();
        assert_eq!(value["result"]["agent"], "tester");
        assert_eq!(value["result"]["inputs"]["k"], "v");
    }
}
