//! Static per-kind field schema.
//!
//! Each kind lists every field a payload may carry, by dotted camelCase path.
//! The table is the single source of truth for the spec validator, the
//! normalizer and the `schema` command. Fields of repeated messages share the
//! path of their container (`withViews.name`).

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Value shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Plain string.
    Text,
    /// Query-language expression; surrounding whitespace is insignificant.
    Expression,
    /// 32 or 64-bit integer.
    Integer,
    /// Floating point number.
    Number,
    /// Boolean.
    Bool,
    /// Enumeration; `*_UNSPECIFIED` is the zero value.
    Enum,
    /// Nested message.
    Message,
    /// Repeated field whose order and duplicates are insignificant.
    Set,
    /// Repeated field whose order is significant.
    List,
    /// RFC 3339 timestamp.
    Timestamp,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Expression => "expression",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Enum => "enum",
            Self::Message => "message",
            Self::Set => "set",
            Self::List => "list",
            Self::Timestamp => "timestamp",
        };
        f.write_str(s)
    }
}

/// Whether a user must supply the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Must be present and non-empty when its parent is present.
    Required,
    /// May be omitted.
    Optional,
}

/// Who owns the field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldRole {
    /// Declared by the user.
    User,
    /// Filled in by the service; never compared.
    ServerAssigned,
}

/// One row of a kind's schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSchema {
    /// Dotted camelCase path.
    pub path: &'static str,
    /// Value shape.
    pub kind: FieldKind,
    /// Required or optional.
    pub presence: Presence,
    /// User or server owned.
    pub role: FieldRole,
    /// Secret value the service never echoes back.
    pub sensitive: bool,
    /// Default as a JSON literal, when it differs from the zero value.
    pub default: Option<&'static str>,
}

impl FieldSchema {
    const fn new(path: &'static str, kind: FieldKind, presence: Presence, role: FieldRole) -> Self {
        Self {
            path,
            kind,
            presence,
            role,
            sensitive: false,
            default: None,
        }
    }

    const fn required(path: &'static str, kind: FieldKind) -> Self {
        Self::new(path, kind, Presence::Required, FieldRole::User)
    }

    const fn optional(path: &'static str, kind: FieldKind) -> Self {
        Self::new(path, kind, Presence::Optional, FieldRole::User)
    }

    const fn server(path: &'static str, kind: FieldKind) -> Self {
        Self::new(path, kind, Presence::Optional, FieldRole::ServerAssigned)
    }

    const fn secret(mut self) -> Self {
        self.sensitive = true;
        self
    }

    const fn with_default(mut self, literal: &'static str) -> Self {
        self.default = Some(literal);
        self
    }

    /// Last path segment.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.path.rsplit('.').next().unwrap_or(self.path)
    }

    /// Parsed default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<Value> {
        self.default.and_then(|literal| serde_json::from_str(literal).ok())
    }

    /// True if the field takes part in equivalence.
    #[must_use]
    pub const fn is_compared(&self) -> bool {
        matches!(self.role, FieldRole::User) && !self.sensitive
    }
}

use FieldKind::{Bool, Enum, Expression, Integer, List, Message, Number, Set, Text, Timestamp};

/// Table fields.
pub const TABLE_SCHEMA: &[FieldSchema] = &[
    FieldSchema::server("tableId", Text),
    FieldSchema::required("tableName", Text),
    FieldSchema::required("timeColumnName", Text),
    FieldSchema::required("entityKeyColumnName", Text),
    FieldSchema::optional("subsortColumnName", Text),
    FieldSchema::optional("groupingId", Text),
    FieldSchema::optional("source", Message),
    FieldSchema::optional("source.kaskada", Message),
    FieldSchema::optional("source.pulsar", Message),
    FieldSchema::required("source.pulsar.config", Message),
    FieldSchema::required("source.pulsar.config.brokerServiceUrl", Text),
    FieldSchema::optional("source.pulsar.config.adminServiceUrl", Text),
    FieldSchema::optional("source.pulsar.config.authPlugin", Text),
    FieldSchema::optional("source.pulsar.config.authParams", Text).secret(),
    FieldSchema::optional("source.pulsar.config.tenant", Text).with_default("\"public\""),
    FieldSchema::optional("source.pulsar.config.namespace", Text).with_default("\"default\""),
    FieldSchema::required("source.pulsar.config.topicName", Text),
    FieldSchema::optional("source.kafka", Message),
    FieldSchema::required("source.kafka.config", Message),
    FieldSchema::required("source.kafka.config.hosts", List),
    FieldSchema::required("source.kafka.config.topic", Text),
    FieldSchema::optional("source.kafka.config.schemaRegistryUrl", Text),
    FieldSchema::server("createTime", Timestamp),
    FieldSchema::server("updateTime", Timestamp),
    FieldSchema::server("version", Integer),
    FieldSchema::server("fileCount", Integer),
];

/// View fields.
pub const VIEW_SCHEMA: &[FieldSchema] = &[
    FieldSchema::server("viewId", Text),
    FieldSchema::required("viewName", Text),
    FieldSchema::required("expression", Expression),
    FieldSchema::server("analysis", Message),
    FieldSchema::server("createTime", Timestamp),
    FieldSchema::server("updateTime", Timestamp),
];

/// Materialization fields.
pub const MATERIALIZATION_SCHEMA: &[FieldSchema] = &[
    FieldSchema::server("materializationId", Text),
    FieldSchema::required("materializationName", Text),
    FieldSchema::required("query", Expression),
    FieldSchema::optional("withViews", Set),
    FieldSchema::required("withViews.name", Text),
    FieldSchema::required("withViews.expression", Expression),
    FieldSchema::required("destination", Message),
    FieldSchema::optional("destination.objectStore", Message),
    FieldSchema::optional("destination.objectStore.format", Enum),
    FieldSchema::required("destination.objectStore.outputPrefixUri", Text),
    FieldSchema::optional("destination.redis", Message),
    FieldSchema::required("destination.redis.hostName", Text),
    FieldSchema::optional("destination.redis.port", Integer).with_default("6379"),
    FieldSchema::optional("destination.redis.useTls", Bool),
    FieldSchema::optional("destination.redis.databaseNumber", Integer),
    FieldSchema::optional("destination.redis.password", Text).secret(),
    FieldSchema::optional("destination.redis.tlsCert", Text),
    FieldSchema::optional("destination.redis.tlsKey", Text).secret(),
    FieldSchema::optional("destination.redis.tlsCaCert", Text),
    FieldSchema::optional("destination.redis.insecureSkipVerify", Bool),
    FieldSchema::optional("destination.pulsar", Message),
    FieldSchema::required("destination.pulsar.config", Message),
    FieldSchema::required("destination.pulsar.config.brokerServiceUrl", Text),
    FieldSchema::optional("destination.pulsar.config.adminServiceUrl", Text),
    FieldSchema::optional("destination.pulsar.config.authPlugin", Text),
    FieldSchema::optional("destination.pulsar.config.authParams", Text).secret(),
    FieldSchema::optional("destination.pulsar.config.tenant", Text).with_default("\"public\""),
    FieldSchema::optional("destination.pulsar.config.namespace", Text)
        .with_default("\"default\""),
    FieldSchema::required("destination.pulsar.config.topicName", Text),
    FieldSchema::optional("slice", Message),
    FieldSchema::optional("slice.percent", Message),
    FieldSchema::optional("slice.percent.percent", Number),
    FieldSchema::optional("slice.entityKeys", Message),
    FieldSchema::optional("slice.entityKeys.entityKeys", Set),
    FieldSchema::server("schema", Message),
    FieldSchema::server("analysis", Message),
    FieldSchema::server("createTime", Timestamp),
    FieldSchema::server("version", Integer),
];

/// Finds the row for `path`.
#[must_use]
pub fn lookup(schema: &'static [FieldSchema], path: &str) -> Option<&'static FieldSchema> {
    schema.iter().find(|field| field.path == path)
}

/// Required user fields that are absent or empty in `value`.
///
/// A nested field is only required when its parent is present, so an unset
/// `destination.redis` does not demand a `hostName`.
#[must_use]
pub fn missing_required_fields(schema: &'static [FieldSchema], value: &Value) -> Vec<&'static str> {
    let mut missing = Vec::new();
    for field in schema {
        if field.presence != Presence::Required || field.role != FieldRole::User {
            continue;
        }
        let (parent, leaf) = match field.path.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, field.path),
        };
        let parents = match parent {
            Some(parent) => values_at(value, parent),
            None => vec![value],
        };
        let absent = parents
            .into_iter()
            .any(|parent| parent.get(leaf).is_none_or(super::normalize::is_zero));
        if absent {
            missing.push(field.path);
        }
    }
    missing
}

/// Every object reachable at `path`, flattening repeated fields on the way.
fn values_at<'a>(root: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![root];
    for segment in path.split('.') {
        current = current
            .into_iter()
            .filter_map(|v| v.get(segment))
            .flat_map(|v| match v {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                Value::Null => Vec::new(),
                other => vec![other],
            })
            .collect();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;
    use serde_json::json;

    #[test]
    fn test_every_parent_path_is_declared() {
        for kind in ResourceKind::ALL {
            let schema = kind.schema();
            for field in schema {
                if let Some((parent, _)) = field.path.rsplit_once('.') {
                    let parent = lookup(schema, parent)
                        .unwrap_or_else(|| panic!("{kind}: no parent for {}", field.path));
                    assert!(matches!(
                        parent.kind,
                        FieldKind::Message | FieldKind::Set | FieldKind::List
                    ));
                }
            }
        }
    }

    #[test]
    fn test_name_fields_are_required() {
        for kind in ResourceKind::ALL {
            let field = lookup(kind.schema(), kind.name_field()).unwrap();
            assert_eq!(field.presence, Presence::Required);
            assert_eq!(field.role, FieldRole::User);
        }
    }

    #[test]
    fn test_defaults_parse() {
        for kind in ResourceKind::ALL {
            for field in kind.schema() {
                if field.default.is_some() {
                    assert!(field.default_value().is_some(), "{}", field.path);
                }
            }
        }
    }

    #[test]
    fn test_missing_required_top_level() {
        let value = json!({ "tableName": "t", "timeColumnName": "" });
        assert_eq!(
            missing_required_fields(TABLE_SCHEMA, &value),
            vec!["timeColumnName", "entityKeyColumnName"]
        );
    }

    #[test]
    fn test_nested_required_only_when_parent_present() {
        let value = json!({
            "materializationName": "m",
            "query": "t",
            "destination": { "objectStore": { "outputPrefixUri": "s3://b/p" } },
        });
        assert!(missing_required_fields(MATERIALIZATION_SCHEMA, &value).is_empty());

        let value = json!({
            "materializationName": "m",
            "query": "t",
            "destination": { "redis": { "port": 6379 } },
            "withViews": [{ "name": "a", "expression": "t" }, { "name": "b" }],
        });
        assert_eq!(
            missing_required_fields(MATERIALIZATION_SCHEMA, &value),
            vec!["withViews.expression", "destination.redis.hostName"]
        );
    }

    #[test]
    fn test_field_name() {
        let field = lookup(MATERIALIZATION_SCHEMA, "destination.redis.tlsKey").unwrap();
        assert_eq!(field.name(), "tlsKey");
        assert!(field.sensitive);
        assert!(!field.is_compared());
    }
}
