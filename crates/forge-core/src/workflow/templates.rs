//! Built-in workflow templates for common engineering flows.
//!
//! Each template is a ready-to-submit [`WorkflowDefinition`]; callers
//! typically adjust budget or inputs before submission. Template names
//! double as CLI shorthand for `forge run <name>`.

use forge_types::workflow::{WorkflowDefinition, WorkflowStep};

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// All built-in template names.
pub fn template_names() -> Vec<&'static str> {
    vec![
        "full_stack_feature",
        "security_audit",
        "code_quality",
        "rag_implementation",
    ]
}

/// Build a template definition by name.
pub fn template(name: &str) -> Option<WorkflowDefinition> {
    match name {
        "full_stack_feature" => Some(full_stack_feature()),
        "security_audit" => Some(security_audit()),
        "code_quality" => Some(code_quality()),
        "rag_implementation" => Some(rag_implementation()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Template definitions
// ---------------------------------------------------------------------------

fn described(mut def: WorkflowDefinition, description: &str) -> WorkflowDefinition {
    def.description = Some(description.to_string());
    def
}

fn with_deps(mut step: WorkflowStep, deps: &[&str]) -> WorkflowStep {
    step.depends_on = deps.iter().map(|s| s.to_string()).collect();
    step
}

fn in_group(mut step: WorkflowStep, group: &str) -> WorkflowStep {
    step.parallel_group = Some(group.to_string());
    step
}

fn with_input(mut step: WorkflowStep, key: &str, reference: &str) -> WorkflowStep {
    step.inputs
        .insert(key.to_string(), serde_json::Value::String(reference.to_string()));
    step
}

/// End-to-end workflow for implementing a new feature.
fn full_stack_feature() -> WorkflowDefinition {
    described(
        WorkflowDefinition::new(
            "full_stack_feature",
            vec![
                WorkflowStep::new(
                    "analyze",
                    "backend_analyzer",
                    "Analyze existing codebase for integration points",
                ),
                with_deps(
                    WorkflowStep::new("design_api", "api_architect", "Design API endpoints for the feature"),
                    &["analyze"],
                ),
                with_deps(
                    WorkflowStep::new("design_db", "database_architect", "Design database schema changes"),
                    &["analyze"],
                ),
                with_input(
                    with_deps(
                        WorkflowStep::new("implement", "improver", "Implement the feature"),
                        &["design_api", "design_db"],
                    ),
                    "api_design",
                    "$design_api.result",
                ),
                with_deps(
                    WorkflowStep::new("test", "tester", "Create comprehensive tests"),
                    &["implement"],
                ),
                with_deps(
                    WorkflowStep::new("security", "security_analyzer", "Security review of new code"),
                    &["implement"],
                ),
                with_deps(
                    WorkflowStep::new("document", "documenter", "Update documentation"),
                    &["test", "security"],
                ),
            ],
        ),
        "End-to-end workflow for implementing a new feature",
    )
}

/// Comprehensive security review of the codebase.
fn security_audit() -> WorkflowDefinition {
    described(
        WorkflowDefinition::new(
            "security_audit",
            vec![
                WorkflowStep::new("scan", "security_analyzer", "Scan for security vulnerabilities"),
                in_group(
                    WorkflowStep::new("api_review", "api_architect", "Review API security patterns"),
                    "review",
                ),
                in_group(
                    WorkflowStep::new("db_review", "database_architect", "Review database security"),
                    "review",
                ),
                with_input(
                    with_deps(
                        WorkflowStep::new("fix", "debugger", "Fix identified vulnerabilities"),
                        &["scan", "api_review", "db_review"],
                    ),
                    "findings",
                    "$scan.findings",
                ),
                with_deps(
                    WorkflowStep::new("verify", "tester", "Verify security fixes"),
                    &["fix"],
                ),
            ],
        ),
        "Comprehensive security review of the codebase",
    )
}

/// Improve overall code quality and maintainability.
fn code_quality() -> WorkflowDefinition {
    described(
        WorkflowDefinition::new(
            "code_quality",
            vec![
                in_group(
                    WorkflowStep::new("analyze_backend", "backend_analyzer", "Analyze backend code quality"),
                    "analyze",
                ),
                in_group(
                    WorkflowStep::new("analyze_frontend", "frontend_analyzer", "Analyze frontend code quality"),
                    "analyze",
                ),
                with_input(
                    with_deps(
                        WorkflowStep::new("refactor", "improver", "Refactor code based on findings"),
                        &["analyze_backend", "analyze_frontend"],
                    ),
                    "backend_findings",
                    "$analyze_backend.findings",
                ),
                with_deps(
                    WorkflowStep::new("test", "tester", "Ensure tests pass after refactoring"),
                    &["refactor"],
                ),
                with_deps(
                    WorkflowStep::new("cleanup", "project_steward", "Clean up project structure"),
                    &["test"],
                ),
            ],
        ),
        "Improve overall code quality and maintainability",
    )
}

/// Design and implement a RAG pipeline.
fn rag_implementation() -> WorkflowDefinition {
    described(
        WorkflowDefinition::new(
            "rag_implementation",
            vec![
                WorkflowStep::new(
                    "analyze_data",
                    "chunking_strategist",
                    "Analyze data and design chunking strategy",
                ),
                with_deps(
                    WorkflowStep::new(
                        "design_embeddings",
                        "embedding_architect",
                        "Select and configure embedding model",
                    ),
                    &["analyze_data"],
                ),
                with_deps(
                    WorkflowStep::new(
                        "design_retrieval",
                        "vector_search_architect",
                        "Design vector search pipeline",
                    ),
                    &["design_embeddings"],
                ),
                with_deps(
                    WorkflowStep::new("design_rag", "rag_architect", "Design complete RAG pipeline"),
                    &["design_retrieval"],
                ),
                with_deps(
                    WorkflowStep::new("evaluate", "eval_architect", "Design evaluation framework"),
                    &["design_rag"],
                ),
            ],
        ),
        "Design and implement a RAG pipeline",
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
