//! Materialization payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::table::PulsarConfig;

/// A query whose results are continuously written to a destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Materialization {
    /// Server-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materialization_id: Option<String>,
    /// User-assigned name.
    pub materialization_name: String,
    /// Query expression.
    #[serde(default)]
    pub query: String,
    /// Views defined only for this materialization.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub with_views: Vec<WithView>,
    /// Where results are written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
    /// Subset of entities to materialize.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice: Option<SliceRequest>,
    /// Server-computed output schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
    /// Server-computed analysis of the query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<serde_json::Value>,
    /// Server-assigned creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    /// Server-assigned version.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::deserialize_int64"
    )]
    pub version: Option<i64>,
}

/// A view scoped to a single materialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithView {
    /// Local name.
    pub name: String,
    /// Expression defining the view.
    #[serde(default)]
    pub expression: String,
}

/// Materialization destination; exactly one variant is expected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Files under an object store prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_store: Option<ObjectStoreDestination>,
    /// A Redis instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisDestination>,
    /// A Pulsar topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulsar: Option<PulsarDestination>,
}

/// Output file format for object store destinations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    /// Not specified; the service picks.
    #[default]
    #[serde(rename = "FILE_FORMAT_UNSPECIFIED")]
    Unspecified,
    /// Apache Parquet.
    #[serde(rename = "FILE_FORMAT_PARQUET")]
    Parquet,
    /// Comma-separated values.
    #[serde(rename = "FILE_FORMAT_CSV")]
    Csv,
}

/// Object store destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStoreDestination {
    /// File format.
    #[serde(default)]
    pub format: FileFormat,
    /// Prefix URI results are written under.
    #[serde(default)]
    pub output_prefix_uri: String,
}

/// Redis destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedisDestination {
    /// Host name.
    #[serde(default)]
    pub host_name: String,
    /// Port.
    #[serde(default)]
    pub port: i32,
    /// Whether to connect over TLS.
    #[serde(default)]
    pub use_tls: bool,
    /// Database number.
    #[serde(default)]
    pub database_number: i32,
    /// Password. Never returned by the service.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Client certificate.
    #[serde(default)]
    pub tls_cert: String,
    /// Client key. Never returned by the service.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tls_key: String,
    /// CA certificate.
    #[serde(default)]
    pub tls_ca_cert: String,
    /// Skip certificate verification.
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

/// Pulsar destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulsarDestination {
    /// Connection settings.
    #[serde(default)]
    pub config: PulsarConfig,
}

/// Entity slice; at most one variant is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceRequest {
    /// A percentage of entities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<PercentSlice>,
    /// An explicit set of entity keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_keys: Option<EntityKeysSlice>,
}

/// Percentage slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentSlice {
    /// Percentage of entities, 0-100.
    #[serde(default)]
    pub percent: f64,
}

/// Entity-key slice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityKeysSlice {
    /// Entity keys to include.
    #[serde(default)]
    pub entity_keys: Vec<String>,
}

impl Materialization {
    /// Short description: destination and query on one line.
    #[must_use]
    pub fn describe(&self) -> String {
        let destination = match &self.destination {
            Some(Destination {
                object_store: Some(o),
                ..
            }) => format!("objectStore({})", o.output_prefix_uri),
            Some(Destination { redis: Some(r), .. }) => format!("redis({}:{})", r.host_name, r.port),
            Some(Destination {
                pulsar: Some(p), ..
            }) => format!("pulsar({})", p.config.topic_name),
            _ => String::from("none"),
        };
        format!(
            "destination={destination} query={}",
            super::single_line(&self.query)
        )
    }
}
