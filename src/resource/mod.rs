//! Resource model for the Kaskada control plane.
//!
//! Tables, views and materializations are represented by one payload type per
//! kind. The same payload type carries both the desired definition read from a
//! sync spec and the live version returned by the API; server-assigned fields
//! are simply absent on the desired side.
//!
//! Identity is `(kind, name)` ([`ResourceRef`]). Semantic equality is driven by
//! the per-kind field schema in [`schema`] and implemented in [`normalize`].

mod materialization;
mod normalize;
mod references;
mod schema;
mod table;
mod view;

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub use materialization::{
    Destination, EntityKeysSlice, FileFormat, Materialization, ObjectStoreDestination,
    PercentSlice, PulsarDestination, RedisDestination, SliceRequest, WithView,
};
pub use normalize::{canonical_value, changed_fields, equivalent};
pub use references::expression_identifiers;
pub use schema::{FieldKind, FieldRole, FieldSchema, Presence, missing_required_fields};
pub use table::{KafkaConfig, KafkaSource, KaskadaSource, PulsarConfig, PulsarSource, Table, TableSource};
pub use view::View;

/// Enumerated tag for each manageable entity type.
///
/// The declaration order is also the tie-break order used when planning.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A table of events.
    Table,
    /// A named expression over tables and other views.
    View,
    /// A query continuously written to a destination.
    Materialization,
}

impl ResourceKind {
    /// Every kind, in planning order.
    pub const ALL: [Self; 3] = [Self::Table, Self::View, Self::Materialization];

    /// Fully qualified type identity, stable across releases.
    ///
    /// Downstream tooling greps plan output for these strings.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Table => "*kaskadav1alpha.Table",
            Self::View => "*kaskadav1alpha.View",
            Self::Materialization => "*kaskadav1alpha.Materialization",
        }
    }

    /// Lowercase singular label (`table`), also the JSON envelope key.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::View => "view",
            Self::Materialization => "materialization",
        }
    }

    /// Collection segment of the REST path and JSON list key (`tables`).
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Table => "tables",
            Self::View => "views",
            Self::Materialization => "materializations",
        }
    }

    /// Field holding the user-assigned name.
    #[must_use]
    pub const fn name_field(self) -> &'static str {
        match self {
            Self::Table => "tableName",
            Self::View => "viewName",
            Self::Materialization => "materializationName",
        }
    }

    /// Field schema for this kind.
    #[must_use]
    pub const fn schema(self) -> &'static [FieldSchema] {
        match self {
            Self::Table => schema::TABLE_SCHEMA,
            Self::View => schema::VIEW_SCHEMA,
            Self::Materialization => schema::MATERIALIZATION_SCHEMA,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// `(kind, name)` pair uniquely identifying a resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceRef {
    /// Resource kind.
    pub kind: ResourceKind,
    /// User-assigned name, unique per kind.
    pub name: String,
}

impl ResourceRef {
    /// Creates a new reference.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind={} name={}", self.kind, self.name)
    }
}

/// A resource definition of any kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resource {
    /// A table.
    Table(Table),
    /// A view.
    View(View),
    /// A materialization.
    Materialization(Materialization),
}

impl Resource {
    /// Returns the resource kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Table(_) => ResourceKind::Table,
            Self::View(_) => ResourceKind::View,
            Self::Materialization(_) => ResourceKind::Materialization,
        }
    }

    /// Returns the user-assigned name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Table(t) => &t.table_name,
            Self::View(v) => &v.view_name,
            Self::Materialization(m) => &m.materialization_name,
        }
    }

    /// Returns the identity of this resource.
    #[must_use]
    pub fn reference(&self) -> ResourceRef {
        ResourceRef::new(self.kind(), self.name())
    }

    /// Expressions evaluated by this resource.
    #[must_use]
    pub fn expressions(&self) -> Vec<&str> {
        match self {
            Self::Table(_) => Vec::new(),
            Self::View(v) => vec![v.expression.as_str()],
            Self::Materialization(m) => std::iter::once(m.query.as_str())
                .chain(m.with_views.iter().map(|w| w.expression.as_str()))
                .collect(),
        }
    }

    /// Names this resource's expressions may resolve to other resources.
    ///
    /// Names defined locally through a materialization's `withViews` shadow
    /// global views and are not returned.
    #[must_use]
    pub fn referenced_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self
            .expressions()
            .into_iter()
            .flat_map(expression_identifiers)
            .collect();

        if let Self::Materialization(m) = self {
            for local in &m.with_views {
                names.remove(&local.name);
            }
        }
        names
    }

    /// Serializes the payload into its wire representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be represented as JSON.
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// Parses a payload of the given kind from its wire representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not match the kind's shape.
    pub fn from_value(kind: ResourceKind, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            ResourceKind::Table => Self::Table(serde_json::from_value(value)?),
            ResourceKind::View => Self::View(serde_json::from_value(value)?),
            ResourceKind::Materialization => {
                Self::Materialization(serde_json::from_value(value)?)
            }
        })
    }

    /// One-line human description used by list/get output.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Table(t) => t.describe(),
            Self::View(v) => v.describe(),
            Self::Materialization(m) => m.describe(),
        }
    }
}

impl From<Table> for Resource {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

impl From<View> for Resource {
    fn from(view: View) -> Self {
        Self::View(view)
    }
}

impl From<Materialization> for Resource {
    fn from(materialization: Materialization) -> Self {
        Self::Materialization(materialization)
    }
}

/// Collapses an expression onto one line for display.
fn single_line(expression: &str) -> String {
    expression.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Accepts proto-JSON int64 values, which arrive either as numbers or strings.
fn deserialize_int64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Number(i64),
        Text(String),
    }

    match Option::<Int64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Int64::Number(n)) => Ok(Some(n)),
        Some(Int64::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_type_names_are_stable() {
        assert_eq!(ResourceKind::Table.to_string(), "*kaskadav1alpha.Table");
        assert_eq!(ResourceKind::View.to_string(), "*kaskadav1alpha.View");
        assert_eq!(
            ResourceKind::Materialization.to_string(),
            "*kaskadav1alpha.Materialization"
        );
    }

    #[test]
    fn test_refs_order_by_kind_then_name() {
        let mut refs = vec![
            ResourceRef::new(ResourceKind::Materialization, "a"),
            ResourceRef::new(ResourceKind::View, "b"),
            ResourceRef::new(ResourceKind::Table, "z"),
            ResourceRef::new(ResourceKind::Table, "a"),
        ];
        refs.sort();
        let rendered: Vec<String> = refs.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "kind=*kaskadav1alpha.Table name=a",
                "kind=*kaskadav1alpha.Table name=z",
                "kind=*kaskadav1alpha.View name=b",
                "kind=*kaskadav1alpha.Materialization name=a",
            ]
        );
    }

    #[test]
    fn test_materialization_local_views_shadow_references() {
        let mat = Materialization {
            materialization_name: String::from("m"),
            query: String::from("{ x: local.a, y: purchases.b }"),
            with_views: vec![WithView {
                name: String::from("local"),
                expression: String::from("other_view | last()"),
            }],
            ..Materialization::default()
        };
        let names = Resource::from(mat).referenced_names();
        assert!(names.contains("purchases"));
        assert!(names.contains("other_view"));
        assert!(!names.contains("local"));
    }

    #[test]
    fn test_int64_accepts_strings_and_numbers() {
        let table: Table = serde_json::from_value(serde_json::json!({
            "tableName": "t",
            "timeColumnName": "time",
            "entityKeyColumnName": "key",
            "version": "42",
        }))
        .unwrap();
        assert_eq!(table.version, Some(42));

        let table: Table = serde_json::from_value(serde_json::json!({
            "tableName": "t",
            "version": 7,
        }))
        .unwrap();
        assert_eq!(table.version, Some(7));
    }

    #[test]
    fn test_from_value_round_trips_kind() {
        let value = serde_json::json!({ "viewName": "v", "expression": "t.x" });
        let resource = Resource::from_value(ResourceKind::View, value).unwrap();
        assert_eq!(resource.reference(), ResourceRef::new(ResourceKind::View, "v"));
    }
}
