//! View payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named expression over tables and other views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    /// Server-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_id: Option<String>,
    /// User-assigned name.
    pub view_name: String,
    /// Expression defining the view.
    #[serde(default)]
    pub expression: String,
    /// Server-computed analysis of the expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<serde_json::Value>,
    /// Server-assigned creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    /// Server-assigned update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl View {
    /// Short description: the expression on one line.
    #[must_use]
    pub fn describe(&self) -> String {
        super::single_line(&self.expression)
    }
}
