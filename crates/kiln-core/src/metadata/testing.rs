//! Declared data tests
//!
//! Tests are only recorded here; running them belongs to the executor.

use serde::{Deserialize, Serialize};

/// Bare test names accepted on a column
pub const COLUMN_TESTS: &[&str] = &[
    "not_null",
    "unique",
    "accepted_values",
    "relationships",
    "positive",
    "non_negative",
];

/// Bare test names accepted on a model
pub const MODEL_TESTS: &[&str] = &["row_count_gt_0", "no_duplicates", "unique"];

/// Test severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestSeverity {
    /// Failure fails the run (default)
    #[default]
    Error,
    /// Failure is reported only
    Warning,
}

/// Structured test declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSpec {
    /// Test name; may be a custom test outside the built-in vocabulary
    pub name: String,

    /// Test parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Map<String, serde_json::Value>>,

    /// Severity override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<TestSeverity>,
}

/// A declared test: bare name or structured object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestRef {
    /// `not_null`
    Name(String),
    /// `{name: accepted_values, params: {values: [a, b]}}`
    Spec(TestSpec),
}

impl TestRef {
    /// Test name regardless of form
    pub fn name(&self) -> &str {
        match self {
            TestRef::Name(name) => name,
            TestRef::Spec(spec) => &spec.name,
        }
    }

    /// Effective severity (error unless overridden)
    pub fn severity(&self) -> TestSeverity {
        match self {
            TestRef::Name(_) => TestSeverity::default(),
            TestRef::Spec(spec) => spec.severity.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_and_structured_forms() {
        let tests: Vec<TestRef> = serde_json::from_value(json!([
            "not_null",
            {"name": "accepted_values", "params": {"values": ["a", "b"]}, "severity": "warning"}
        ]))
        .unwrap();
        assert_eq!(tests[0].name(), "not_null");
        assert_eq!(tests[0].severity(), TestSeverity::Error);
        assert_eq!(tests[1].name(), "accepted_values");
        assert_eq!(tests[1].severity(), TestSeverity::Warning);
    }

    #[test]
    fn test_vocabularies_differ() {
        assert!(COLUMN_TESTS.contains(&"not_null"));
        assert!(!MODEL_TESTS.contains(&"not_null"));
        assert!(MODEL_TESTS.contains(&"row_count_gt_0"));
        assert!(!COLUMN_TESTS.contains(&"row_count_gt_0"));
    }
}
