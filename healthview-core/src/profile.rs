//! Structure-definition lookup used to label sections.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::RenderError;

/// A more specific profile governing a path, and the path inside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileMatch {
    pub profile: String,
    pub base_path: String,
}

/// Finds the sub-profile that governs `path` under `profile`.
/// No match is a normal outcome.
pub trait ProfileSearch: Send + Sync {
    fn search(&self, profile: &str, path: &str) -> Option<ProfileMatch>;
}

/// Search that never finds a sub-profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProfiles;

impl ProfileSearch for NoProfiles {
    fn search(&self, _profile: &str, _path: &str) -> Option<ProfileMatch> {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileIndexEntry {
    profile: String,
    path: String,
    target: String,
    base_path: String,
}

/// In-memory `(profile, path) -> ProfileMatch` index.
#[derive(Debug, Clone, Default)]
pub struct ProfileIndex {
    entries: HashMap<(String, String), ProfileMatch>,
}

impl ProfileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of `{"profile", "path", "target", "base_path"}`.
    /// Profiles may be given as canonical URLs.
    pub fn from_json_str(json: &str) -> Result<Self, RenderError> {
        let entries: Vec<ProfileIndexEntry> =
            serde_json::from_str(json).map_err(|err| RenderError::Parse(err.to_string()))?;
        let mut index = ProfileIndex::new();
        for entry in entries {
            index.insert(&entry.profile, entry.path, &entry.target, entry.base_path);
        }
        Ok(index)
    }

    pub fn insert(
        &mut self,
        profile: &str,
        path: impl Into<String>,
        target: &str,
        base_path: impl Into<String>,
    ) {
        self.entries.insert(
            (profile_id(profile).to_string(), path.into()),
            ProfileMatch {
                profile: profile_id(target).to_string(),
                base_path: base_path.into(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProfileSearch for ProfileIndex {
    fn search(&self, profile: &str, path: &str) -> Option<ProfileMatch> {
        self.entries
            .get(&(profile_id(profile).to_string(), path.to_string()))
            .cloned()
    }
}

/// Reduce a canonical profile URL to its id.
///
/// `http://nictiz.nl/fhir/StructureDefinition/nl-core-Patient|1.0` gives
/// `nl-core-Patient`; a bare id is returned unchanged.
pub fn profile_id(canonical: &str) -> &str {
    let without_version = canonical.split('|').next().unwrap_or(canonical);
    let trimmed = without_version.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_id_strips_url_and_version() {
        assert_eq!(
            profile_id("http://nictiz.nl/fhir/StructureDefinition/nl-core-Patient|1.0"),
            "nl-core-Patient"
        );
        assert_eq!(profile_id("nl-core-Patient"), "nl-core-Patient");
        assert_eq!(profile_id(""), "");
    }

    #[test]
    fn index_resolves_canonical_and_bare_ids() {
        let mut index = ProfileIndex::new();
        index.insert(
            "http://nictiz.nl/fhir/StructureDefinition/nl-core-Patient",
            "Patient.contact",
            "http://nictiz.nl/fhir/StructureDefinition/nl-core-ContactPerson",
            "Patient.contact",
        );

        let found = index
            .search("nl-core-Patient", "Patient.contact")
            .expect("registered path");
        assert_eq!(found.profile, "nl-core-ContactPerson");
        assert_eq!(found.base_path, "Patient.contact");
        assert_eq!(index.search("nl-core-Patient", "Patient.telecom"), None);
        assert_eq!(NoProfiles.search("x", "y"), None);
    }
}
