//! Agent task trait, type erasure, and the name-indexed registry.
//!
//! `AgentTask` is the seam between the engine and whatever actually does
//! the work (an LLM-backed agent, a subprocess, a test double). The trait
//! uses RPITIT, so dynamic dispatch goes through an object-safe
//! `AgentTaskDyn` companion with boxed futures:
//! 1. Define `AgentTaskDyn` with `invoke_boxed` returning a pinned future
//! 2. Blanket-impl `AgentTaskDyn` for all `T: AgentTask`
//! 3. `BoxAgentTask` wraps `Box<dyn AgentTaskDyn>` and delegates

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use forge_types::task::{TaskInvocation, TaskOutcome};

// ---------------------------------------------------------------------------
// AgentTask
// ---------------------------------------------------------------------------

/// An asynchronous agent capability a workflow step can bind to.
///
/// One invocation corresponds to one attempt; the engine handles retries
/// and timeouts outside the task. Implementations report the cost and
/// token usage of each attempt, including failed ones.
pub trait AgentTask: Send + Sync {
    /// Registry name steps refer to via their `agent` field.
    fn name(&self) -> &str;

    /// Execute one attempt with fully resolved inputs.
    fn invoke(&self, invocation: TaskInvocation) -> impl Future<Output = TaskOutcome> + Send;
}

// ---------------------------------------------------------------------------
// AgentTaskDyn / BoxAgentTask
// ---------------------------------------------------------------------------

/// Object-safe version of [`AgentTask`] with boxed futures.
///
/// Exists solely to enable dynamic dispatch (`dyn AgentTaskDyn`). A
/// blanket implementation covers all types implementing `AgentTask`.
pub trait AgentTaskDyn: Send + Sync {
    fn name(&self) -> &str;

    fn invoke_boxed(
        &self,
        invocation: TaskInvocation,
    ) -> Pin<Box<dyn Future<Output = TaskOutcome> + Send + '_>>;
}

/// Blanket implementation: any `AgentTask` automatically implements `AgentTaskDyn`.
impl<T: AgentTask> AgentTaskDyn for T {
    fn name(&self) -> &str {
        AgentTask::name(self)
    }

    fn invoke_boxed(
        &self,
        invocation: TaskInvocation,
    ) -> Pin<Box<dyn Future<Output = TaskOutcome> + Send + '_>> {
        Box::pin(self.invoke(invocation))
    }
}

/// Type-erased agent task for runtime binding by name.
pub struct BoxAgentTask {
    inner: Box<dyn AgentTaskDyn + Send + Sync>,
}

impl BoxAgentTask {
    /// Wrap a concrete `AgentTask` in a type-erased box.
    pub fn new<T: AgentTask + 'static>(task: T) -> Self {
        Self {
            inner: Box::new(task),
        }
    }

    /// Registry name of the wrapped task.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Execute one attempt with fully resolved inputs.
    pub async fn invoke(&self, invocation: TaskInvocation) -> TaskOutcome {
        self.inner.invoke_boxed(invocation).await
    }
}

// ---------------------------------------------------------------------------
// TaskRegistry
// ---------------------------------------------------------------------------

/// Name-indexed registry of agent tasks available to the engine.
///
/// A step whose `agent` field names a task not present here fails at
/// dispatch time; the definition itself stays valid.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<BoxAgentTask>>,
}

impl TaskRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Register a task under its own name. Replaces any existing entry.
    pub fn register<T: AgentTask + 'static>(&mut self, task: T) {
        let boxed = BoxAgentTask::new(task);
        self.tasks.insert(boxed.name().to_string(), Arc::new(boxed));
    }

    /// Look up a task by name.
    pub fn get(&self, name: &str) -> Option<Arc<BoxAgentTask>> {
        self.tasks.get(name).cloned()
    }

    /// All registered task names.
    pub fn names(&self) -> Vec<&str> {
        self.tasks.keys().map(|s| s.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
