//! Fingerprints for desired state and rendered plans.
//!
//! Hashes are computed over canonical forms, so reordering the spec file or
//! reformatting an expression's surrounding whitespace does not change them.

use sha2::{Digest, Sha256};

use crate::resource::{Resource, canonical_value};

/// Hasher for spec and plan fingerprints.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecHasher;

impl SpecHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Hash of a set of desired resources, independent of declaration order.
    #[must_use]
    pub fn hash_resources(&self, resources: &[Resource]) -> String {
        let mut entries: Vec<(String, String)> = resources
            .iter()
            .map(|r| (r.reference().to_string(), self.hash_resource(r)))
            .collect();
        entries.sort();

        let mut hasher = Sha256::new();
        for (reference, hash) in entries {
            hasher.update(reference.as_bytes());
            hasher.update(b"\n");
            hasher.update(hash.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }

    /// Hash of a single resource's canonical form.
    #[must_use]
    pub fn hash_resource(&self, resource: &Resource) -> String {
        let mut hasher = Sha256::new();
        hasher.update(resource.kind().type_name().as_bytes());
        hasher.update(canonical_value(resource).to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Hash of rendered plan lines, in order.
    #[must_use]
    pub fn hash_lines<S: AsRef<str>>(&self, lines: &[S]) -> String {
        let mut hasher = Sha256::new();
        for line in lines {
            hasher.update(line.as_ref().as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 12 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(12).collect()
    }

    /// Compares a full hash with a full or shortened expected value.
    #[must_use]
    pub fn hashes_match(hash: &str, expected: &str) -> bool {
        if expected.is_empty() || expected.len() > hash.len() {
            return false;
        }

        hash.bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}
