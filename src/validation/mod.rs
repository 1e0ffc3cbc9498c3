//! Request input validation.
//!
//! Every parameterized route checks its body, query string or path against a
//! declarative [`Schema`] before any service code runs. Handlers normally use
//! the [`ValidatedJson`], [`ValidatedQuery`] and [`ValidatedPath`] extractors;
//! routes that need a custom rejection call [`Schema::safe_parse`] directly.

pub mod extract;
pub mod schema;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use extract::{RequestSchema, ValidatedJson, ValidatedPath, ValidatedQuery};
pub use schema::{Field, FieldKind, Schema, ROOT_PATH};

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted path from the input root, e.g. `steps.1.subject`
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", summarize(.issues))]
pub struct ValidationError {
    issues: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(issues: Vec<FieldError>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[FieldError] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<FieldError> {
        self.issues
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

fn summarize(issues: &[FieldError]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.path, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of [`Schema::safe_parse`]. Consumed once by the caller.
#[derive(Debug)]
pub enum ValidationResult<T> {
    Success(T),
    Failure(ValidationError),
}

impl<T> ValidationResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ValidationResult::Success(_))
    }

    pub fn into_result(self) -> Result<T, ValidationError> {
        match self {
            ValidationResult::Success(data) => Ok(data),
            ValidationResult::Failure(err) => Err(err),
        }
    }
}

/// Remove every top-level key whose value is `null`.
///
/// Stored rows come back with SQL NULLs; services treat a missing key as
/// "absent". Other keys, including nested nulls, are left untouched.
pub fn strip_nulls(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn strip_nulls_removes_only_null_keys() {
        let input = as_map(json!({"a": null, "b": 0, "c": "", "d": false, "e": {"inner": null}}));
        let out = strip_nulls(input);
        assert!(!out.contains_key("a"));
        assert_eq!(out["b"], json!(0));
        assert_eq!(out["c"], json!(""));
        assert_eq!(out["d"], json!(false));
        assert_eq!(out["e"], json!({"inner": null}));
    }

    #[test]
    fn strip_nulls_is_idempotent() {
        let inputs = vec![
            json!({}),
            json!({"a": null}),
            json!({"a": 1, "b": null, "c": [null]}),
            json!({"x": {"y": null}, "z": null}),
        ];
        for input in inputs {
            let once = strip_nulls(as_map(input));
            let twice = strip_nulls(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn validation_error_display_lists_paths() {
        let err = ValidationError::new(vec![FieldError::new("name", "Required"), FieldError::new("age", "Bad")]);
        assert_eq!(err.to_string(), "name: Required; age: Bad");
        assert!(err.has_path("age"));
    }
}
