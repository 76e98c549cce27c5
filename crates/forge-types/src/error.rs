//! Error taxonomy for workflow validation and input resolution.

use thiserror::Error;

// ---------------------------------------------------------------------------
// DefinitionError
// ---------------------------------------------------------------------------

/// Structural problems with a workflow definition, detected before any
/// step is dispatched. Submission with any of these is rejected whole.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("workflow has no steps")]
    Empty,

    #[error("invalid workflow name '{0}' (alphanumeric, hyphens, underscores only)")]
    InvalidName(String),

    #[error("duplicate step id '{0}'")]
    DuplicateStep(String),

    #[error("step '{step}' depends on unknown step '{missing}'")]
    UnknownDependency { step: String, missing: String },

    #[error("step '{0}' depends on itself")]
    SelfDependency(String),

    #[error("dependency cycle: {0}")]
    CyclicDependency(String),

    #[error("failed to parse workflow definition: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// InterpolationError
// ---------------------------------------------------------------------------

/// Failures while resolving a step's `$`-references against upstream
/// outputs. Marks the referencing step failed; siblings are unaffected.
#[derive(Debug, Error)]
pub enum InterpolationError {
    /// The referenced step is declared but recorded no output.
    #[error("reference '{0}' points at a step with no recorded output")]
    UnresolvedReference(String),

    #[error("step '{step}' output has no field '{field}'")]
    MissingField { step: String, field: String },

    #[error("index {index} out of range for '{step}.{field}' (length {len})")]
    IndexOutOfRange {
        step: String,
        field: String,
        index: usize,
        len: usize,
    },

    #[error("malformed reference '{0}'")]
    MalformedReference(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_error_messages() {
        let err = DefinitionError::UnknownDependency {
            step: "fix".to_string(),
            missing: "analyz".to_string(),
        };
        assert_eq!(err.to_string(), "step 'fix' depends on unknown step 'analyz'");

        let err = DefinitionError::CyclicDependency("a -> b -> a".to_string());
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn interpolation_error_messages() {
        let err = InterpolationError::IndexOutOfRange {
            step: "scan".to_string(),
            field: "findings".to_string(),
            index: 5,
            len: 2,
        };
        assert!(err.to_string().contains("index 5"));
        assert!(err.to_string().contains("scan.findings"));
    }
}
