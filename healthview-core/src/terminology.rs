//! Display text for coded values (SNOMED CT, LOINC, ...).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::RenderError;

/// Resolves `(system, code)` to display text. A miss is `None`.
pub trait Terminology: Send + Sync {
    fn display(&self, system: &str, code: &str) -> Option<String>;
}

/// One code description as stored by the portal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerminologyRecord {
    pub system: String,
    pub code: String,
    pub description: String,
}

/// In-memory terminology keyed by canonical system URL and code.
#[derive(Debug, Clone, Default)]
pub struct TerminologyTable {
    codes: HashMap<(String, String), String>,
}

impl TerminologyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of `{"system", "code", "description"}` records.
    pub fn from_json_str(json: &str) -> Result<Self, RenderError> {
        let records: Vec<TerminologyRecord> =
            serde_json::from_str(json).map_err(|err| RenderError::Parse(err.to_string()))?;
        Ok(records.into_iter().collect())
    }

    pub fn insert(&mut self, system: &str, code: impl Into<String>, description: impl Into<String>) {
        self.codes.insert(
            (canonical_system(system).to_string(), code.into()),
            description.into(),
        );
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl FromIterator<TerminologyRecord> for TerminologyTable {
    fn from_iter<I: IntoIterator<Item = TerminologyRecord>>(iter: I) -> Self {
        let mut table = TerminologyTable::new();
        for record in iter {
            table.insert(&record.system, record.code, record.description);
        }
        table
    }
}

impl Terminology for TerminologyTable {
    fn display(&self, system: &str, code: &str) -> Option<String> {
        self.codes
            .get(&(canonical_system(system).to_string(), code.to_string()))
            .cloned()
    }
}

/// Expand the short system names used in the code table.
fn canonical_system(system: &str) -> &str {
    match system {
        "snomed" => "http://snomed.info/sct",
        "loinc" => "http://loinc.org",
        other => other,
    }
}
