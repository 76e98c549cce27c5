//! Input reference resolution (`$step.field` interpolation).
//!
//! Before a step dispatches, its declared inputs are resolved against the
//! outputs recorded so far. String values starting with `$` are
//! references; everything else passes through untouched. Resolution is
//! performed fresh at dispatch time and never cached, so a reference
//! always sees the latest recorded output.
//!
//! Reference grammar:
//! - `$workflow.<key>...` reads from the definition's workflow inputs
//! - `$<step>.<field>...` reads from a declared step's recorded output;
//!   numeric path segments index into arrays
//! - `$name` with no dot, or a source that is neither `workflow` nor a
//!   declared step, passes through as a literal string

use std::collections::HashMap;

use serde_json::{Value, json};

use forge_types::error::InterpolationError;
use forge_types::workflow::{WorkflowDefinition, WorkflowStep};

// ---------------------------------------------------------------------------
// Resolution entry point
// ---------------------------------------------------------------------------

/// Resolve one step's input map against recorded upstream outputs.
///
/// `outputs` maps step ids to the JSON view of their successful output.
/// A resolution failure fails only the referencing step; the caller
/// records that as a step failure and leaves siblings untouched.
pub fn resolve_inputs(
    step: &WorkflowStep,
    definition: &WorkflowDefinition,
    outputs: &HashMap<String, Value>,
) -> Result<HashMap<String, Value>, InterpolationError> {
    let mut resolved = HashMap::with_capacity(step.inputs.len());
    for (key, value) in &step.inputs {
        let value = match value.as_str() {
            Some(s) if s.starts_with('$') => resolve_reference(s, definition, outputs)?,
            _ => value.clone(),
        };
        resolved.insert(key.clone(), value);
    }
    Ok(resolved)
}

fn resolve_reference(
    reference: &str,
    definition: &WorkflowDefinition,
    outputs: &HashMap<String, Value>,
) -> Result<Value, InterpolationError> {
    let body = &reference[1..];
    if body.is_empty() {
        return Err(InterpolationError::MalformedReference(reference.to_string()));
    }

    let Some((source, path)) = body.split_once('.') else {
        // `$name` with no field path is a literal, not a reference.
        return Ok(Value::String(reference.to_string()));
    };
    if source.is_empty() || path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(InterpolationError::MalformedReference(reference.to_string()));
    }

    let root = if source == "workflow" {
        json!(definition.inputs)
    } else if definition.step(source).is_some() {
        outputs
            .get(source)
            .cloned()
            .ok_or_else(|| InterpolationError::UnresolvedReference(reference.to_string()))?
    } else {
        // Unknown source: treat the whole string as a literal.
        return Ok(Value::String(reference.to_string()));
    };

    traverse(source, &root, path)
}

/// Walk a dot-separated path into a JSON value. Numeric segments index
/// arrays; everything else is an object key.
fn traverse(source: &str, root: &Value, path: &str) -> Result<Value, InterpolationError> {
    let mut current = root;
    let mut walked: Vec<&str> = Vec::new();

    for segment in path.split('.') {
        let missing = || InterpolationError::MissingField {
            step: source.to_string(),
            field: join_path(&walked, Some(segment)),
        };

        current = match current {
            Value::Array(items) => {
                let index: usize = segment.parse().map_err(|_| missing())?;
                items
                    .get(index)
                    .ok_or_else(|| InterpolationError::IndexOutOfRange {
                        step: source.to_string(),
                        field: join_path(&walked, None),
                        index,
                        len: items.len(),
                    })?
            }
            Value::Object(map) => map.get(segment).ok_or_else(missing)?,
            _ => return Err(missing()),
        };
        walked.push(segment);
    }

    Ok(current.clone())
}

fn join_path(walked: &[&str], tail: Option<&str>) -> String {
    let mut parts: Vec<&str> = walked.to_vec();
    if let Some(tail) = tail {
        parts.push(tail);
    }
    parts.join(".")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
