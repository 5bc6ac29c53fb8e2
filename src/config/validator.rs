//! Sync spec validation.
//!
//! Runs before any network call. Required fields come from the per-kind
//! schema table; the remaining checks cover what the schema cannot express.

use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::error::{Result, SpecError};
use crate::resource::{
    Destination, Materialization, Resource, ResourceKind, SliceRequest, Table, TableSource,
    missing_required_fields,
};

/// Validator for desired resources.
#[derive(Debug, Default)]
pub struct SpecValidator;

/// Validation result containing all issues found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation, e.g. `views[min_max].expression`.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl SpecValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a set of desired resources.
    ///
    /// # Errors
    ///
    /// Returns the first duplicate name, or the first validation error.
    pub fn validate(&self, resources: &[Resource]) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::check_duplicates(resources)?;

        for resource in resources {
            let prefix = format!("{}[{}]", resource.kind().collection(), resource.name());
            Self::validate_required(resource, &prefix, &mut result);
            Self::validate_name(resource, &prefix, &mut result);
            match resource {
                Resource::Table(table) => Self::validate_table(table, &prefix, &mut result),
                Resource::View(_) => {}
                Resource::Materialization(m) => {
                    Self::validate_materialization(m, &prefix, &mut result);
                }
            }
        }
        Self::warn_name_collisions(resources, &mut result);

        if result.errors.is_empty() {
            debug!(resources = resources.len(), "Sync spec validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(SpecError::validation(first_error.message.clone(), first_error.field.clone()).into())
        }
    }

    fn check_duplicates(resources: &[Resource]) -> Result<()> {
        let mut seen = HashSet::new();
        for resource in resources {
            if !seen.insert(resource.reference()) {
                return Err(SpecError::DuplicateName {
                    kind: resource.kind().label().to_owned(),
                    name: resource.name().to_owned(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn validate_required(resource: &Resource, prefix: &str, result: &mut ValidationResult) {
        let Ok(value) = resource.to_value() else {
            result.errors.push(ValidationError {
                field: prefix.to_owned(),
                message: String::from("Resource cannot be represented as JSON"),
            });
            return;
        };
        for path in missing_required_fields(resource.kind().schema(), &value) {
            result.errors.push(ValidationError {
                field: format!("{prefix}.{path}"),
                message: format!("{path} is required"),
            });
        }
    }

    /// Names are referenced from expressions, so they must be identifiers.
    fn validate_name(resource: &Resource, prefix: &str, result: &mut ValidationResult) {
        let name = resource.name();
        if !name.is_empty() && !is_valid_name(name) {
            result.errors.push(ValidationError {
                field: format!("{prefix}.{}", resource.kind().name_field()),
                message: format!(
                    "Name '{name}' is invalid. Must start with a letter or underscore and contain only letters, digits and underscores."
                ),
            });
        }
    }

    fn validate_table(table: &Table, prefix: &str, result: &mut ValidationResult) {
        if let Some(TableSource {
            kaskada,
            pulsar,
            kafka,
        }) = &table.source
        {
            let set = [kaskada.is_some(), pulsar.is_some(), kafka.is_some()];
            if set.iter().filter(|s| **s).count() > 1 {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.source"),
                    message: String::from("Only one of kaskada, pulsar or kafka may be set"),
                });
            }
        }

        if table.time_column_name == table.entity_key_column_name
            && !table.time_column_name.is_empty()
        {
            result.warnings.push(format!(
                "{prefix}: time and entity key use the same column '{}'",
                table.time_column_name
            ));
        }
    }

    fn validate_materialization(m: &Materialization, prefix: &str, result: &mut ValidationResult) {
        if let Some(Destination {
            object_store,
            redis,
            pulsar,
        }) = &m.destination
        {
            let set = [object_store.is_some(), redis.is_some(), pulsar.is_some()];
            if set.iter().filter(|s| **s).count() != 1 {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.destination"),
                    message: String::from("Exactly one of objectStore, redis or pulsar must be set"),
                });
            }
            if let Some(redis) = redis
                && !(0..=65535).contains(&redis.port)
            {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.destination.redis.port"),
                    message: format!("Port {} is out of range", redis.port),
                });
            }
        }

        if let Some(SliceRequest {
            percent,
            entity_keys,
        }) = &m.slice
        {
            if percent.is_some() && entity_keys.is_some() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.slice"),
                    message: String::from("Only one of percent or entityKeys may be set"),
                });
            }
            if let Some(percent) = percent
                && !(0.0..=100.0).contains(&percent.percent)
            {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.slice.percent.percent"),
                    message: format!("Percent {} must be between 0 and 100", percent.percent),
                });
            }
        }

        let mut local_names = HashSet::new();
        for with_view in &m.with_views {
            if !local_names.insert(with_view.name.as_str()) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.withViews[{}]", with_view.name),
                    message: format!("Duplicate withViews name: {}", with_view.name),
                });
            }
        }
    }

    /// A table and a view sharing a name make references ambiguous.
    fn warn_name_collisions(resources: &[Resource], result: &mut ValidationResult) {
        let mut kinds_by_name: BTreeMap<&str, Vec<ResourceKind>> = BTreeMap::new();
        for resource in resources {
            if resource.kind() != ResourceKind::Materialization {
                kinds_by_name.entry(resource.name()).or_default().push(resource.kind());
            }
        }
        for (name, kinds) in kinds_by_name {
            if kinds.len() > 1 {
                result.warnings.push(format!(
                    "'{name}' names both a table and a view; expressions referencing it depend on both, except the view itself, which reads the table"
                ));
            }
        }
    }
}

/// Checks that a name is a query-language identifier.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
