//! Configuration module for the Kaskada sync tooling.
//!
//! This module handles everything that is read before talking to the API:
//! - Parsing and validating the declarative sync spec (`kaskada.sync.yaml`)
//! - Resolving client settings from flags, the environment and `.env`
//! - Fingerprinting desired state and rendered plans

mod hash;
mod parser;
mod settings;
mod spec;
mod validator;

pub use hash::SpecHasher;
pub use parser::{DEFAULT_SPEC_FILES, SpecParser, find_spec_file};
pub use settings::{ClientSettings, DEFAULT_CONCURRENCY, DEFAULT_ENDPOINT};
pub use spec::SyncSpec;
pub use validator::{SpecValidator, ValidationError, ValidationResult};
