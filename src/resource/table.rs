//! Table payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A table of time-stamped, entity-keyed events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Server-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    /// User-assigned name.
    pub table_name: String,
    /// Column holding the event time.
    #[serde(default)]
    pub time_column_name: String,
    /// Column holding the entity key.
    #[serde(default)]
    pub entity_key_column_name: String,
    /// Column used to order events sharing a timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsort_column_name: Option<String>,
    /// Grouping the entity keys belong to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouping_id: Option<String>,
    /// Where events are read from. Absent means Kaskada-managed storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TableSource>,
    /// Server-assigned creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    /// Server-assigned update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    /// Server-assigned data version.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::deserialize_int64"
    )]
    pub version: Option<i64>,
    /// Server-reported number of loaded files.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::deserialize_int64"
    )]
    pub file_count: Option<i64>,
}

/// Table source; at most one variant is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSource {
    /// Kaskada-managed storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kaskada: Option<KaskadaSource>,
    /// A Pulsar topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulsar: Option<PulsarSource>,
    /// A Kafka topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka: Option<KafkaSource>,
}

/// Kaskada-managed storage (no options).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KaskadaSource {}

/// Pulsar-backed table source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulsarSource {
    /// Connection settings.
    #[serde(default)]
    pub config: PulsarConfig,
}

/// Kafka-backed table source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaSource {
    /// Connection settings.
    #[serde(default)]
    pub config: KafkaConfig,
}

/// Pulsar connection settings, shared by sources and destinations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulsarConfig {
    /// Broker URL, e.g. `pulsar://127.0.0.1:6650`.
    #[serde(default)]
    pub broker_service_url: String,
    /// Admin URL, e.g. `http://127.0.0.1:8080`.
    #[serde(default)]
    pub admin_service_url: String,
    /// Authentication plugin class.
    #[serde(default)]
    pub auth_plugin: String,
    /// Authentication parameters. Never returned by the service.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_params: String,
    /// Tenant.
    #[serde(default)]
    pub tenant: String,
    /// Namespace.
    #[serde(default)]
    pub namespace: String,
    /// Topic name.
    #[serde(default)]
    pub topic_name: String,
}

/// Kafka connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KafkaConfig {
    /// Bootstrap hosts.
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Topic name.
    #[serde(default)]
    pub topic: String,
    /// Schema registry URL.
    #[serde(default)]
    pub schema_registry_url: String,
}

impl Table {
    /// Short description: column roles and source.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = vec![
            format!("time={}", self.time_column_name),
            format!("entity={}", self.entity_key_column_name),
        ];
        if let Some(subsort) = self.subsort_column_name.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("subsort={subsort}"));
        }
        if let Some(grouping) = self.grouping_id.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("grouping={grouping}"));
        }
        let source = match &self.source {
            Some(TableSource { pulsar: Some(p), .. }) => format!("pulsar({})", p.config.topic_name),
            Some(TableSource { kafka: Some(k), .. }) => format!("kafka({})", k.config.topic),
            _ => String::from("kaskada"),
        };
        parts.push(format!("source={source}"));
        parts.join(" ")
    }
}
