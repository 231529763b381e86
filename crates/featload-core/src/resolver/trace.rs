//! Resolution tracing for `featload explain`.
//!
//! Provides step-by-step traces of a load decision for debugging and
//! understanding why a specifier was reported loaded, found or missing.

use serde::Serialize;

/// Schema version for the explain output format.
/// Bump when the trace structure changes incompatibly.
pub const EXPLAIN_SCHEMA_VERSION: u32 = 1;

/// A single step in the resolution trace.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveTraceStep {
    /// Step name (e.g., "classify_feature", "feature_provided", "find_file")
    pub step: &'static str,
    /// Whether this step succeeded
    pub ok: bool,
    /// Human-readable description of what happened
    pub detail: String,
    /// Path involved in this step, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Additional notes for this step
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl ResolveTraceStep {
    /// Create a new trace step.
    pub fn new(step: &'static str, ok: bool, detail: impl Into<String>) -> Self {
        Self {
            step,
            ok,
            detail: detail.into(),
            path: None,
            notes: Vec::new(),
        }
    }

    /// Set the path for this step.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add a note to this step.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Complete resolution trace.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveTrace {
    /// Ordered list of resolution steps
    pub steps: Vec<ResolveTraceStep>,
}

impl ResolveTrace {
    /// Create a new empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step to the trace.
    pub fn add_step(&mut self, step: ResolveTraceStep) {
        self.steps.push(step);
    }

    /// Names of the recorded steps, in order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.step).collect()
    }
}

/// Step names used in resolution tracing.
pub mod steps {
    pub const CLASSIFY_FEATURE: &str = "classify_feature";
    pub const FEATURE_PROVIDED: &str = "feature_provided";
    pub const FIND_FILE: &str = "find_file";
    pub const EXPANDED_PROVIDED: &str = "expanded_provided";
    pub const FINAL_OUTCOME: &str = "final_outcome";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_serialization() {
        let mut trace = ResolveTrace::new();
        trace.add_step(ResolveTraceStep::new(
            steps::CLASSIFY_FEATURE,
            true,
            "no extension",
        ));
        trace.add_step(
            ResolveTraceStep::new(steps::FIND_FILE, true, "found")
                .with_path("/app/lib/foo.rb")
                .with_note("searched 2 directories"),
        );
        trace.add_step(ResolveTraceStep::new(
            steps::EXPANDED_PROVIDED,
            false,
            "not loaded",
        ));

        assert_eq!(
            trace.step_names(),
            vec![steps::CLASSIFY_FEATURE, steps::FIND_FILE, steps::EXPANDED_PROVIDED]
        );

        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json["steps"][0]["ok"], true);
        assert!(json["steps"][0].get("path").is_none());
        assert_eq!(json["steps"][1]["path"], "/app/lib/foo.rb");
        assert_eq!(json["steps"][1]["notes"][0], "searched 2 directories");
        assert_eq!(json["steps"][2]["ok"], false);
    }
}
