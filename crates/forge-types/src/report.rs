//! Typed payloads produced by agent tasks.
//!
//! Analysis agents emit [`Finding`]s, action agents emit [`ChangePlan`]s,
//! and verification agents emit [`EvalResult`]s. All three are plain data
//! carried inside a step's output; the engine never interprets their
//! contents beyond field access during input interpolation.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

/// Severity levels for findings, from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSeverity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

/// Categories of findings across agent domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    Security,
    Performance,
    Bug,
    CodeSmell,
    Architecture,
    Accessibility,
    TestCoverage,
    Documentation,
    DataQuality,
    Other,
}

/// A source location a finding points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
}

/// An issue, observation, or recommendation produced by an analysis step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable identifier within the producing run (e.g. "SEC-001").
    pub id: String,
    /// Name of the agent that produced this finding.
    pub agent: String,
    pub severity: FindingSeverity,
    pub category: FindingCategory,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// Confidence in the finding, 0.0 to 1.0.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

fn default_confidence() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// ChangePlan
// ---------------------------------------------------------------------------

/// Kinds of file changes a plan can propose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Create,
    Modify,
    Delete,
    Rename,
}

/// A single proposed change to one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub file: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// A set of coordinated changes proposed by an action step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePlan {
    /// Stable identifier within the producing run (e.g. "CP-001").
    pub id: String,
    /// Name of the agent that produced this plan.
    pub agent: String,
    pub title: String,
    pub description: String,
    pub changes: Vec<Change>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests_to_run: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rollback_steps: Vec<String>,
}

// ---------------------------------------------------------------------------
// EvalResult
// ---------------------------------------------------------------------------

/// Overall status of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalStatus {
    Passed,
    Failed,
    Partial,
    Error,
    Skipped,
}

/// A single named metric from an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalMetric {
    pub name: String,
    pub value: f64,
    /// Unit label ("count", "percent", "seconds", ...).
    pub unit: String,
}

/// The outcome of an evaluation, test run, or quality check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    /// Stable identifier within the producing run (e.g. "EVAL-001").
    pub id: String,
    /// Name of the agent that produced this result.
    pub agent: String,
    pub name: String,
    pub status: EvalStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<EvalMetric>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub passed_checks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_checks: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
