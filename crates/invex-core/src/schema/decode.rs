//! Check a raw extraction response against a [`Schema`] and build the record.
//!
//! Every field is visited and all violations are reported together, so a
//! single failed extraction shows everything that was wrong with it. Values
//! that pass are canonicalized in place (numbers become decimal strings,
//! dates are trimmed) before the typed conversion.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use super::{FieldSpec, FieldType, ObjectSpec, Schema};
use crate::error::{SchemaError, Violation};

/// Decode a raw response into a typed record.
pub fn decode<T: DeserializeOwned>(schema: &Schema, raw: &str) -> Result<T, SchemaError> {
    let body = strip_code_fence(raw);
    let mut value: Value =
        serde_json::from_str(body).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;

    let mut violations = Vec::new();
    check_object(&schema.root, &mut value, "", &mut violations);

    if !violations.is_empty() {
        debug!("Response failed {} schema check(s)", violations.len());
        return Err(SchemaError::Violations(violations));
    }

    trace!("Canonical response: {}", value);

    serde_json::from_value(value)
        .map_err(|e| SchemaError::Violations(vec![Violation::new("", e.to_string())]))
}

/// Parse a JSON number or numeric string as a decimal.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Some providers wrap JSON in a markdown fence even in structured mode.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn check_object(spec: &ObjectSpec, value: &mut Value, path: &str, out: &mut Vec<Violation>) {
    let Value::Object(map) = value else {
        out.push(Violation::new(path, format!("expected an object, got {}", kind_of(value))));
        return;
    };

    for field in &spec.fields {
        let field_path = join_path(path, field.name);
        match map.get_mut(field.name) {
            None if field.required => {
                out.push(Violation::new(field_path, "required field is missing"));
            }
            Some(Value::Null) if field.required => {
                out.push(Violation::new(field_path, "required field is null"));
            }
            None | Some(Value::Null) => {}
            Some(v) => check_field(field, v, &field_path, out),
        }
    }
}

fn check_field(field: &FieldSpec, value: &mut Value, path: &str, out: &mut Vec<Violation>) {
    match &field.ty {
        FieldType::Text => match value {
            Value::String(s) => {
                if field.non_empty && s.trim().is_empty() {
                    out.push(Violation::new(path, "must not be blank"));
                }
            }
            other => out.push(Violation::new(
                path,
                format!("expected text, got {}", kind_of(other)),
            )),
        },
        FieldType::Number => match parse_decimal(value) {
            Some(d) if field.non_negative && d.is_sign_negative() && !d.is_zero() => {
                out.push(Violation::new(path, format!("must not be negative, got {}", d)));
            }
            Some(d) => *value = Value::String(d.to_string()),
            None if is_numeric(value) => out.push(Violation::new(path, "number out of range")),
            None => out.push(Violation::new(
                path,
                format!("expected a number, got {}", describe(value)),
            )),
        },
        FieldType::Date => {
            let parsed = value
                .as_str()
                .map(str::trim)
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
            match parsed {
                Some(date) => *value = Value::String(date.format("%Y-%m-%d").to_string()),
                None => out.push(Violation::new(
                    path,
                    format!("expected a date in YYYY-MM-DD format, got {}", describe(value)),
                )),
            }
        }
        FieldType::List(item_spec) => match value {
            Value::Array(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    check_object(item_spec, item, &format!("{}[{}]", path, i), out);
                }
            }
            other => out.push(Violation::new(
                path,
                format!("expected an array, got {}", kind_of(other)),
            )),
        },
    }
}

/// A number too large (or too precise) to become a `Decimal`.
fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
        _ => false,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "text",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{:?}", s),
        other => kind_of(other).to_string(),
    }
}
