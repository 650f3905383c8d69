//! Structural validation of tool arguments against a JSON Schema subset.
//!
//! Tool servers publish input schemas in JSON Schema form. The registry checks
//! arguments locally before dispatching `tools/call` so that malformed calls
//! are rejected without a transport round trip. The supported keywords are
//! `type`, `properties`, `required`, `additionalProperties`, `enum` and
//! `items`. Unknown keywords are ignored.

use serde_json::{Map, Value};
use thiserror::Error;

/// A single location where arguments do not satisfy a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {reason}")]
pub struct SchemaViolation {
    path: String,
    reason: String,
}

impl SchemaViolation {
    pub(crate) fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_owned(),
            reason: reason.into(),
        }
    }

    /// Returns the JSON path of the offending value, rooted at `$`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns a human-readable description of the mismatch.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Validates `arguments` against `schema`.
///
/// A schema that is not a JSON object (or is an empty object) accepts every
/// value.
///
/// # Errors
///
/// Returns the first [`SchemaViolation`] encountered.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), SchemaViolation> {
    validate_at("$", schema, arguments)
}

fn validate_at(path: &str, schema: &Value, value: &Value) -> Result<(), SchemaViolation> {
    let Some(keywords) = schema.as_object() else {
        return Ok(());
    };

    if let Some(expected) = keywords.get("type") {
        check_type(path, expected, value)?;
    }

    if let Some(Value::Array(allowed)) = keywords.get("enum")
        && !allowed.contains(value)
    {
        return Err(SchemaViolation::new(
            path,
            format!("value {value} is not one of the allowed values"),
        ));
    }

    if let Value::Object(fields) = value {
        check_object(path, keywords, fields)?;
    }

    if let (Value::Array(elements), Some(item_schema)) = (value, keywords.get("items")) {
        for (index, element) in elements.iter().enumerate() {
            validate_at(&format!("{path}[{index}]"), item_schema, element)?;
        }
    }

    Ok(())
}

fn check_object(
    path: &str,
    keywords: &Map<String, Value>,
    fields: &Map<String, Value>,
) -> Result<(), SchemaViolation> {
    if let Some(Value::Array(required)) = keywords.get("required") {
        let missing = required
            .iter()
            .filter_map(Value::as_str)
            .find(|field| !fields.contains_key(*field));
        if let Some(field) = missing {
            return Err(SchemaViolation::new(
                path,
                format!("missing required property '{field}'"),
            ));
        }
    }

    let properties = keywords.get("properties").and_then(Value::as_object);
    for (field, field_value) in fields {
        let field_path = format!("{path}.{field}");
        match properties.and_then(|declared| declared.get(field)) {
            Some(field_schema) => validate_at(&field_path, field_schema, field_value)?,
            None => match keywords.get("additionalProperties") {
                Some(Value::Bool(false)) => {
                    return Err(SchemaViolation::new(
                        &field_path,
                        "additional property is not allowed",
                    ));
                }
                Some(extra_schema @ Value::Object(_)) => {
                    validate_at(&field_path, extra_schema, field_value)?;
                }
                _ => {}
            },
        }
    }

    Ok(())
}

fn check_type(path: &str, expected: &Value, value: &Value) -> Result<(), SchemaViolation> {
    let matches = match expected {
        Value::String(type_name) => matches_type(type_name, value),
        Value::Array(type_names) => type_names
            .iter()
            .filter_map(Value::as_str)
            .any(|type_name| matches_type(type_name, value)),
        _ => true,
    };

    if matches {
        Ok(())
    } else {
        Err(SchemaViolation::new(
            path,
            format!("expected {expected}, found {}", type_name_of(value)),
        ))
    }
}

fn matches_type(type_name: &str, value: &Value) -> bool {
    match type_name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => is_integer(value),
        _ => true,
    }
}

fn is_integer(value: &Value) -> bool {
    if value.is_i64() || value.is_u64() {
        return true;
    }
    value
        .as_f64()
        .is_some_and(|number| number.is_finite() && number.fract().abs() < f64::EPSILON)
}

const fn type_name_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
