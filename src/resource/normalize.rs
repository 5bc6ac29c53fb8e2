//! Schema-driven normalization and semantic equality.
//!
//! Both sides of a comparison are serialized to JSON and reduced to a
//! canonical form: server-assigned and sensitive fields are removed, zero and
//! default values are dropped, expressions are trimmed, and set-valued fields
//! are sorted and deduplicated. Two resources are equivalent when their
//! canonical forms are equal.

use serde_json::{Map, Value};

use super::schema::{self, FieldKind, FieldSchema};
use super::Resource;

/// Canonical JSON form of a resource.
#[must_use]
pub fn canonical_value(resource: &Resource) -> Value {
    // Plain data structs with string keys always serialize.
    let raw = resource.to_value().unwrap_or_default();
    normalize_object(resource.kind().schema(), "", &raw).unwrap_or_else(|| Value::Object(Map::new()))
}

/// True when `desired` and `actual` describe the same resource.
#[must_use]
pub fn equivalent(desired: &Resource, actual: &Resource) -> bool {
    desired.kind() == actual.kind() && canonical_value(desired) == canonical_value(actual)
}

/// Dotted paths of fields that differ between `desired` and `actual`.
#[must_use]
pub fn changed_fields(desired: &Resource, actual: &Resource) -> Vec<String> {
    let mut changed = Vec::new();
    diff_values("", &canonical_value(desired), &canonical_value(actual), &mut changed);
    changed
}

/// Proto3 zero value: the service omits these, so absence and zero agree.
/// Enum zero values (`*_UNSPECIFIED`) are handled per field.
pub(crate) fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

fn normalize_object(schema: &'static [FieldSchema], prefix: &str, value: &Value) -> Option<Value> {
    let Value::Object(map) = value else {
        return Some(value.clone());
    };
    let normalized: Map<String, Value> = map
        .iter()
        .filter_map(|(key, child)| {
            let path = join(prefix, key);
            let child = match schema::lookup(schema, &path) {
                Some(field) if !field.is_compared() => None,
                Some(field) => normalize_field(schema, field, child),
                None => Some(child.clone()),
            };
            child.map(|child| (key.clone(), child))
        })
        .collect();
    (!normalized.is_empty()).then_some(Value::Object(normalized))
}

fn normalize_field(schema: &'static [FieldSchema], field: &FieldSchema, value: &Value) -> Option<Value> {
    let value = match (field.kind, value) {
        (FieldKind::Expression, Value::String(s)) => Value::String(s.trim().to_owned()),
        (FieldKind::Message, Value::Object(_)) => normalize_object(schema, field.path, value)?,
        (FieldKind::Set, Value::Array(items)) => {
            let mut items: Vec<Value> = items
                .iter()
                .filter_map(|item| normalize_element(schema, field.path, item))
                .collect();
            items.sort_by_cached_key(Value::to_string);
            items.dedup();
            Value::Array(items)
        }
        (FieldKind::List, Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| normalize_element(schema, field.path, item).unwrap_or(Value::Null))
                .collect(),
        ),
        _ => value.clone(),
    };

    let unspecified = field.kind == FieldKind::Enum
        && value.as_str().is_some_and(|s| s.ends_with("_UNSPECIFIED"));
    if is_zero(&value) || unspecified || field.default_value().is_some_and(|default| default == value) {
        None
    } else {
        Some(value)
    }
}

fn normalize_element(schema: &'static [FieldSchema], path: &str, item: &Value) -> Option<Value> {
    match item {
        Value::Object(_) => normalize_object(schema, path, item),
        Value::String(s) => Some(Value::String(s.clone())),
        other => (!is_zero(other)).then(|| other.clone()),
    }
}

fn diff_values(path: &str, desired: &Value, actual: &Value, changed: &mut Vec<String>) {
    match (desired, actual) {
        (Value::Object(d), Value::Object(a)) => {
            let keys: std::collections::BTreeSet<&String> = d.keys().chain(a.keys()).collect();
            for key in keys {
                let null = Value::Null;
                diff_values(
                    &join(path, key),
                    d.get(key).unwrap_or(&null),
                    a.get(key).unwrap_or(&null),
                    changed,
                );
            }
        }
        (d, a) if d != a => changed.push(path.to_owned()),
        _ => {}
    }
}
