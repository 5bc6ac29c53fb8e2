//! Sync spec loading.
//!
//! This module handles loading the desired resources from YAML files and the
//! optional `.env` file, with proper error reporting.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::spec::SyncSpec;
use super::validator::SpecValidator;
use crate::error::{ConfigError, KaskadaError, Result, SpecError};
use crate::resource::Resource;

/// Parser for sync spec files.
#[derive(Debug, Default)]
pub struct SpecParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<PathBuf>,
}

impl SpecParser {
    /// Creates a new spec parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a sync spec from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<SyncSpec> {
        let path = path.as_ref();
        debug!("Loading sync spec from: {}", path.display());

        if !path.exists() {
            return Err(SpecError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            SpecError::parse(
                format!("Failed to read file: {e}"),
                Some(path.display().to_string()),
            )
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a sync spec from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or has unknown top-level keys.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<SyncSpec> {
        debug!("Parsing YAML sync spec");

        if content.trim().is_empty() {
            return Ok(SyncSpec::default());
        }

        let spec: SyncSpec = serde_yaml::from_str(content).map_err(|e| {
            let file = source.map(|p| p.display().to_string());
            let location = match (file, e.location()) {
                (Some(file), Some(loc)) => Some(format!("{file}:{}:{}", loc.line(), loc.column())),
                (None, Some(loc)) => Some(format!("line {}, column {}", loc.line(), loc.column())),
                (file, None) => file,
            };
            SpecError::parse(format!("YAML parse error: {e}"), location)
        })?;

        debug!(
            tables = spec.tables.len(),
            views = spec.views.len(),
            materializations = spec.materializations.len(),
            "Parsed sync spec"
        );
        Ok(spec)
    }

    /// Loads, validates and flattens a sync spec file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or fails validation.
    pub fn load_resources(&self, path: impl AsRef<Path>) -> Result<Vec<Resource>> {
        let resources = self.load_file(path)?.into_resources();
        let result = SpecValidator::new().validate(&resources)?;
        for warning in &result.warnings {
            warn!("{warning}");
        }
        Ok(resources)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            debug!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                KaskadaError::Config(ConfigError::DotEnv {
                    path: env_path.clone(),
                    message: e.to_string(),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default spec file names to search for.
pub const DEFAULT_SPEC_FILES: &[&str] = &[
    "kaskada.sync.yaml",
    "kaskada.sync.yml",
    "sync.yaml",
    "sync.yml",
];

/// Finds the spec file in `start_dir` or its parents.
///
/// # Errors
///
/// Returns an error if no spec file is found.
pub fn find_spec_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_SPEC_FILES {
            let spec_path = current.join(filename);
            if spec_path.exists() {
                debug!("Found sync spec: {}", spec_path.display());
                return Ok(spec_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(SpecError::FileNotFound {
        path: start.join(DEFAULT_SPEC_FILES[0]),
    }
    .into())
}
