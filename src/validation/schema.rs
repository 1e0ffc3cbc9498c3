use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::ValidateEmail;

use super::{FieldError, ValidationError, ValidationResult};
use crate::error::ApiError;

/// Path reported when the input as a whole is wrong.
pub const ROOT_PATH: &str = "(root)";

#[derive(Debug, Clone)]
pub enum FieldKind {
    String,
    Email,
    /// http or https URL
    Url,
    Integer,
    Boolean,
    Uuid,
    Enum(&'static [&'static str]),
    StringArray,
    /// Array whose elements are objects checked against a nested schema
    Array(Box<Schema>),
    Object(Box<Schema>),
}

impl FieldKind {
    fn expected(&self) -> &'static str {
        match self {
            FieldKind::String | FieldKind::Email | FieldKind::Url | FieldKind::Uuid | FieldKind::Enum(_) => "string",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::StringArray | FieldKind::Array(_) => "array",
            FieldKind::Object(_) => "object",
        }
    }
}

/// One key of an object schema.
///
/// `min`/`max` bound the character count for string kinds, the value for
/// integers and the element count for arrays.
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    kind: FieldKind,
    required: bool,
    nullable: bool,
    min: Option<i64>,
    max: Option<i64>,
}

impl Field {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            nullable: false,
            min: None,
            max: None,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn email(name: &'static str) -> Self {
        Self::new(name, FieldKind::Email)
    }

    pub fn url(name: &'static str) -> Self {
        Self::new(name, FieldKind::Url)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn uuid(name: &'static str) -> Self {
        Self::new(name, FieldKind::Uuid)
    }

    pub fn one_of(name: &'static str, values: &'static [&'static str]) -> Self {
        Self::new(name, FieldKind::Enum(values))
    }

    pub fn string_array(name: &'static str) -> Self {
        Self::new(name, FieldKind::StringArray)
    }

    pub fn array(name: &'static str, element: Schema) -> Self {
        Self::new(name, FieldKind::Array(Box::new(element)))
    }

    pub fn object(name: &'static str, inner: Schema) -> Self {
        Self::new(name, FieldKind::Object(Box::new(inner)))
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Accept an explicit `null`. Combine with `optional()` for
    /// `T | null | undefined`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }
}

/// Declarative description of an object-shaped input.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
    coerce_strings: bool,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            coerce_strings: false,
        }
    }

    /// Query strings and path segments arrive as text. A coercing schema
    /// accepts `"42"` for an integer field and `"true"` for a boolean one.
    pub fn coercing(mut self) -> Self {
        self.coerce_strings = true;
        self
    }

    /// Every field optional and nullable. Used for PATCH bodies.
    pub fn partial(mut self) -> Self {
        for field in &mut self.fields {
            field.required = false;
            field.nullable = true;
        }
        self
    }

    /// Check `input` and return the cleaned object: unknown keys dropped,
    /// coerced values substituted. Every failing field is reported, in
    /// declaration order.
    pub fn validate(&self, input: &Value) -> Result<Map<String, Value>, ValidationError> {
        let mut issues = Vec::new();
        let cleaned = self.check_object(input, "", &mut issues);

        match cleaned {
            Some(map) if issues.is_empty() => Ok(map),
            _ => Err(ValidationError::new(issues)),
        }
    }

    /// Non-throwing mode: the caller inspects the result.
    pub fn safe_parse<T: DeserializeOwned>(&self, input: &Value) -> ValidationResult<T> {
        let cleaned = match self.validate(input) {
            Ok(map) => map,
            Err(err) => return ValidationResult::Failure(err),
        };

        match serde_json::from_value::<T>(Value::Object(cleaned)) {
            Ok(data) => ValidationResult::Success(data),
            Err(e) => ValidationResult::Failure(ValidationError::new(vec![FieldError::new(ROOT_PATH, e.to_string())])),
        }
    }

    /// Throwing mode: a failure becomes a `VALIDATION_ERROR` ready for `?`.
    pub fn parse<T: DeserializeOwned>(&self, input: &Value) -> Result<T, ApiError> {
        self.safe_parse(input).into_result().map_err(ApiError::from)
    }

    fn check_object(&self, input: &Value, prefix: &str, issues: &mut Vec<FieldError>) -> Option<Map<String, Value>> {
        let obj = match input {
            Value::Object(obj) => obj,
            other => {
                let path = if prefix.is_empty() { ROOT_PATH } else { prefix };
                issues.push(FieldError::new(path, format!("Expected object, received {}", type_name(other))));
                return None;
            }
        };

        let mut cleaned = Map::new();
        for field in &self.fields {
            let path = join_path(prefix, field.name);
            match obj.get(field.name) {
                None => {
                    if field.required {
                        issues.push(FieldError::new(path, "Required"));
                    }
                }
                Some(Value::Null) => {
                    if field.nullable {
                        cleaned.insert(field.name.to_string(), Value::Null);
                    } else if field.required {
                        issues.push(FieldError::new(path, "Required"));
                    } else {
                        issues.push(FieldError::new(path, format!("Expected {}, received null", field.kind.expected())));
                    }
                }
                Some(value) => {
                    if let Some(v) = self.check_value(field, value, &path, issues) {
                        cleaned.insert(field.name.to_string(), v);
                    }
                }
            }
        }

        Some(cleaned)
    }

    fn check_value(&self, field: &Field, value: &Value, path: &str, issues: &mut Vec<FieldError>) -> Option<Value> {
        let mismatch = |issues: &mut Vec<FieldError>| {
            issues.push(FieldError::new(
                path,
                format!("Expected {}, received {}", field.kind.expected(), type_name(value)),
            ));
            None
        };

        match &field.kind {
            FieldKind::String => {
                let Some(s) = value.as_str() else { return mismatch(issues) };
                self.check_length(field, s, path, issues)
            }
            FieldKind::Email => {
                let Some(s) = value.as_str() else { return mismatch(issues) };
                if !s.validate_email() {
                    issues.push(FieldError::new(path, "Invalid email"));
                    return None;
                }
                self.check_length(field, s, path, issues)
            }
            FieldKind::Url => {
                let Some(s) = value.as_str() else { return mismatch(issues) };
                match url::Url::parse(s) {
                    Ok(u) if u.scheme() == "http" || u.scheme() == "https" => self.check_length(field, s, path, issues),
                    _ => {
                        issues.push(FieldError::new(path, "Invalid url"));
                        None
                    }
                }
            }
            FieldKind::Uuid => {
                let Some(s) = value.as_str() else { return mismatch(issues) };
                match Uuid::parse_str(s) {
                    Ok(id) => Some(Value::String(id.to_string())),
                    Err(_) => {
                        issues.push(FieldError::new(path, "Invalid uuid"));
                        None
                    }
                }
            }
            FieldKind::Enum(values) => {
                let Some(s) = value.as_str() else { return mismatch(issues) };
                if values.contains(&s) {
                    Some(value.clone())
                } else {
                    let expected = values.iter().map(|v| format!("'{}'", v)).collect::<Vec<_>>().join(" | ");
                    issues.push(FieldError::new(
                        path,
                        format!("Invalid enum value. Expected {}, received '{}'", expected, s),
                    ));
                    None
                }
            }
            FieldKind::Integer => {
                let n = match value {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) if self.coerce_strings => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                let Some(n) = n else { return mismatch(issues) };
                if let Some(min) = field.min {
                    if n < min {
                        issues.push(FieldError::new(path, format!("Number must be greater than or equal to {}", min)));
                        return None;
                    }
                }
                if let Some(max) = field.max {
                    if n > max {
                        issues.push(FieldError::new(path, format!("Number must be less than or equal to {}", max)));
                        return None;
                    }
                }
                Some(Value::from(n))
            }
            FieldKind::Boolean => match value {
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::String(s) if self.coerce_strings && (s == "true" || s == "false") => Some(Value::Bool(s == "true")),
                _ => mismatch(issues),
            },
            FieldKind::StringArray => {
                let Some(items) = value.as_array() else { return mismatch(issues) };
                let before = issues.len();
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        issues.push(FieldError::new(
                            join_path(path, &i.to_string()),
                            format!("Expected string, received {}", type_name(item)),
                        ));
                    }
                }
                if issues.len() > before {
                    return None;
                }
                self.check_items(field, items.len(), path, issues).map(|_| value.clone())
            }
            FieldKind::Array(element) => {
                let Some(items) = value.as_array() else { return mismatch(issues) };
                let before = issues.len();
                let mut cleaned = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = join_path(path, &i.to_string());
                    if let Some(map) = element.check_object(item, &item_path, issues) {
                        cleaned.push(Value::Object(map));
                    }
                }
                if issues.len() > before {
                    return None;
                }
                self.check_items(field, items.len(), path, issues).map(|_| Value::Array(cleaned))
            }
            FieldKind::Object(inner) => {
                let before = issues.len();
                let map = inner.check_object(value, path, issues)?;
                if issues.len() > before {
                    return None;
                }
                Some(Value::Object(map))
            }
        }
    }

    fn check_length(&self, field: &Field, s: &str, path: &str, issues: &mut Vec<FieldError>) -> Option<Value> {
        let len = s.chars().count() as i64;
        if let Some(min) = field.min {
            if len < min {
                issues.push(FieldError::new(path, format!("String must contain at least {} character(s)", min)));
                return None;
            }
        }
        if let Some(max) = field.max {
            if len > max {
                issues.push(FieldError::new(path, format!("String must contain at most {} character(s)", max)));
                return None;
            }
        }
        Some(Value::String(s.to_string()))
    }

    fn check_items(&self, field: &Field, count: usize, path: &str, issues: &mut Vec<FieldError>) -> Option<()> {
        let count = count as i64;
        if let Some(min) = field.min {
            if count < min {
                issues.push(FieldError::new(path, format!("Array must contain at least {} element(s)", min)));
                return None;
            }
        }
        if let Some(max) = field.max {
            if count > max {
                issues.push(FieldError::new(path, format!("Array must contain at most {} element(s)", max)));
                return None;
            }
        }
        Some(())
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
