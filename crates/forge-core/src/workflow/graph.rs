//! Dependency graph construction and validation.
//!
//! Uses `petgraph` to model step dependencies as a directed graph.
//! Validation runs before any step is dispatched: duplicate ids, unknown
//! dependencies, self-dependencies, and cycles all reject the whole
//! submission. Cycle errors name the full path (e.g. `a -> b -> a`).

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use forge_types::error::DefinitionError;
use forge_types::workflow::WorkflowDefinition;

// ---------------------------------------------------------------------------
// ExecutionGraph
// ---------------------------------------------------------------------------

/// Validated dependency structure of one workflow, keyed by step id.
///
/// Holds both edge directions: `dependencies` (what a step waits on) for
/// readiness checks, and `dependents` (who waits on a step) for cascade
/// skips after a failure.
#[derive(Debug)]
pub struct ExecutionGraph {
    dependencies: HashMap<String, Vec<String>>,
    dependents: HashMap<String, Vec<String>>,
    topo_order: Vec<String>,
}

impl ExecutionGraph {
    /// Direct dependencies of a step.
    pub fn dependencies(&self, step_id: &str) -> &[String] {
        self.dependencies
            .get(step_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Steps that directly depend on the given step.
    pub fn dependents(&self, step_id: &str) -> &[String] {
        self.dependents
            .get(step_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All step ids in a valid topological order.
    pub fn topo_order(&self) -> &[String] {
        &self.topo_order
    }

    /// Every step reachable downstream of the given step.
    pub fn transitive_dependents(&self, step_id: &str) -> HashSet<String> {
        let mut visited = HashSet::new();
        let mut stack: Vec<&str> = vec![step_id];
        while let Some(current) = stack.pop() {
            for dep in self.dependents(current) {
                if visited.insert(dep.clone()) {
                    stack.push(dep.as_str());
                }
            }
        }
        visited
    }
}

// ---------------------------------------------------------------------------
// Graph construction
// ---------------------------------------------------------------------------

/// Build and validate the dependency graph of a workflow definition.
///
/// Checks, in order: duplicate step ids, unknown dependency references,
/// self-dependencies, cycles. The first violation found is returned.
pub fn build_graph(definition: &WorkflowDefinition) -> Result<ExecutionGraph, DefinitionError> {
    let steps = &definition.steps;

    let mut known: HashSet<&str> = HashSet::with_capacity(steps.len());
    for step in steps {
        if !known.insert(step.id.as_str()) {
            return Err(DefinitionError::DuplicateStep(step.id.clone()));
        }
    }

    for step in steps {
        if let Some(dep) = step.depends_on.iter().find(|d| !known.contains(d.as_str())) {
            return Err(DefinitionError::UnknownDependency {
                step: step.id.clone(),
                missing: dep.clone(),
            });
        }
    }

    for step in steps {
        if step.depends_on.iter().any(|d| *d == step.id) {
            return Err(DefinitionError::SelfDependency(step.id.clone()));
        }
    }

    // Directed graph with edges dependency -> dependent
    let mut graph = DiGraph::<&str, ()>::new();
    let mut node_of: HashMap<&str, NodeIndex> = HashMap::with_capacity(steps.len());
    for step in steps {
        node_of.insert(step.id.as_str(), graph.add_node(step.id.as_str()));
    }
    for step in steps {
        for dep in &step.depends_on {
            graph.add_edge(node_of[dep.as_str()], node_of[step.id.as_str()], ());
        }
    }

    let sorted = toposort(&graph, None).map_err(|cycle| {
        let start = graph[cycle.node_id()];
        DefinitionError::CyclicDependency(cycle_path(steps, start))
    })?;

    let mut dependencies = HashMap::with_capacity(steps.len());
    let mut dependents: HashMap<String, Vec<String>> = HashMap::with_capacity(steps.len());
    for step in steps {
        dependencies.insert(step.id.clone(), step.depends_on.clone());
        dependents.entry(step.id.clone()).or_default();
        for dep in &step.depends_on {
            dependents
                .entry(dep.clone())
                .or_default()
                .push(step.id.clone());
        }
    }

    let topo_order = sorted.into_iter().map(|n| graph[n].to_string()).collect();

    Ok(ExecutionGraph {
        dependencies,
        dependents,
        topo_order,
    })
}

/// Reconstruct a cycle path starting from a node toposort flagged.
///
/// Walks `depends_on` edges until a step repeats, then renders the loop
/// as `"a -> b -> a"`.
fn cycle_path(steps: &[forge_types::workflow::WorkflowStep], start: &str) -> String {
    let deps: HashMap<&str, &[String]> = steps
        .iter()
        .map(|s| (s.id.as_str(), s.depends_on.as_slice()))
        .collect();

    let mut path: Vec<&str> = vec![start];
    let mut current = start;

    // The flagged node sits on a cycle, so following any dependency chain
    // from it must revisit a node eventually.
    loop {
        let Some(next) = deps
            .get(current)
            .and_then(|d| d.iter().find(|dep| deps.contains_key(dep.as_str())))
        else {
            return format!("cycle involving step '{start}'");
        };
        let next = next.as_str();
        if let Some(pos) = path.iter().position(|&id| id == next) {
            let mut cycle: Vec<&str> = path[pos..].to_vec();
            cycle.push(next);
            cycle.reverse();
            return cycle.join(" -> ");
        }
        path.push(next);
        current = next;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
