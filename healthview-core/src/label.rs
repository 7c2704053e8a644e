//! Field labels keyed by profile and structural path.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::RenderError;

/// Maps `(profile, path)` to a human-readable label. Never fails.
pub trait LabelResolver: Send + Sync {
    fn label(&self, profile: &str, path: &str) -> String;
}

/// In-memory label table with a humanized fallback.
///
/// JSON layout:
///
/// ```json
/// {
///   "labels": { "nl-core-Patient": { "Patient.name.family": "Surname" } },
///   "generic": { "Patient.birthDate": "Date of birth" }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LabelTable {
    #[serde(default)]
    labels: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    generic: HashMap<String, String>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, RenderError> {
        serde_json::from_str(json).map_err(|err| RenderError::Parse(err.to_string()))
    }

    pub fn insert(
        &mut self,
        profile: impl Into<String>,
        path: impl Into<String>,
        label: impl Into<String>,
    ) {
        self.labels
            .entry(profile.into())
            .or_default()
            .insert(path.into(), label.into());
    }

    /// Register a label that applies under every profile.
    pub fn insert_generic(&mut self, path: impl Into<String>, label: impl Into<String>) {
        self.generic.insert(path.into(), label.into());
    }

    pub fn lookup(&self, profile: &str, path: &str) -> Option<&str> {
        self.labels
            .get(profile)
            .and_then(|paths| paths.get(path))
            .or_else(|| self.generic.get(path))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.generic.len() + self.labels.values().map(HashMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LabelResolver for LabelTable {
    fn label(&self, profile: &str, path: &str) -> String {
        match self.lookup(profile, path) {
            Some(label) => label.to_string(),
            None => {
                tracing::trace!(profile, path, "no label mapping, using fallback");
                humanize(path)
            }
        }
    }
}

/// Derive a label from the trailing segment of a path.
///
/// `Patient.birthDate` becomes `Birth date`, `Patient.extension:birth-place`
/// becomes `Birth place`.
pub fn humanize(path: &str) -> String {
    let segment = path.rsplit('.').next().unwrap_or(path);
    let segment = segment.rsplit(':').next().unwrap_or(segment);

    let chars: Vec<char> = segment.chars().collect();
    let mut spaced = String::with_capacity(segment.len() + 4);
    for (idx, ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && idx > 0 {
            let prev_upper = chars[idx - 1].is_uppercase();
            let next_lower = chars.get(idx + 1).is_some_and(|next| next.is_lowercase());
            if !prev_upper || next_lower {
                spaced.push(' ');
            }
        }
        match ch {
            '-' | '_' => spaced.push(' '),
            other => spaced.push(*other),
        }
    }

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let lower = joined.to_lowercase();
    let mut out = lower.chars();
    match out.next() {
        Some(first) => first.to_uppercase().collect::<String>() + out.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanize_splits_camel_case() {
        assert_eq!(humanize("Patient.birthDate"), "Birth date");
        assert_eq!(humanize("Observation.valueQuantity"), "Value quantity");
        assert_eq!(humanize("family"), "Family");
    }

    #[test]
    fn humanize_handles_slices_and_separators() {
        assert_eq!(humanize("Patient.extension:birth-place"), "Birth place");
        assert_eq!(humanize("Encounter.service_provider"), "Service provider");
        assert_eq!(humanize("Device.udiCarrier.HRFString"), "Hrf string");
        assert_eq!(humanize(""), "");
    }

    #[test]
    fn profile_label_wins_over_generic() {
        let mut table = LabelTable::new();
        table.insert_generic("Patient.gender", "Gender");
        table.insert("nl-core-Patient", "Patient.gender", "Geslacht");

        assert_eq!(table.label("nl-core-Patient", "Patient.gender"), "Geslacht");
        assert_eq!(table.label("other", "Patient.gender"), "Gender");
        assert_eq!(table.label("other", "Patient.deceasedBoolean"), "Deceased boolean");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn loads_from_json() {
        let table = LabelTable::from_json_str(
            r#"{"labels": {"p": {"Patient.name": "Naam"}}, "generic": {"Patient.id": "Id"}}"#,
        )
        .expect("valid label json");
        assert_eq!(table.lookup("p", "Patient.name"), Some("Naam"));
        assert_eq!(table.lookup("p", "Patient.id"), Some("Id"));
        assert!(LabelTable::from_json_str("[").is_err());
    }
}
