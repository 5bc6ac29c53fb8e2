//! Sync spec file structure.
//!
//! ```yaml
//! tables:
//!   - tableName: purchases
//!     timeColumnName: purchase_time
//!     entityKeyColumnName: customer_id
//! views:
//!   - viewName: min_max
//!     expression: "{ max: purchases.amount | max() }"
//! materializations:
//!   - materializationName: min_max_mat
//!     query: "{ m: min_max.max }"
//!     destination:
//!       objectStore: { format: FILE_FORMAT_CSV, outputPrefixUri: s3://bucket/prefix }
//! ```

use serde::{Deserialize, Serialize};

use crate::resource::{Materialization, Resource, Table, View};

/// Desired resources, grouped by kind as they appear in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSpec {
    /// Tables to sync.
    #[serde(default)]
    pub tables: Vec<Table>,
    /// Views to sync.
    #[serde(default)]
    pub views: Vec<View>,
    /// Materializations to sync.
    #[serde(default)]
    pub materializations: Vec<Materialization>,
}

impl SyncSpec {
    /// Total number of declared resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len() + self.views.len() + self.materializations.len()
    }

    /// True if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens the spec into resources, tables first, in file order.
    #[must_use]
    pub fn into_resources(self) -> Vec<Resource> {
        self.tables
            .into_iter()
            .map(Resource::from)
            .chain(self.views.into_iter().map(Resource::from))
            .chain(self.materializations.into_iter().map(Resource::from))
            .collect()
    }
}
