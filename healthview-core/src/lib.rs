//! Core types shared by the flattening engine, the renderer and the bridges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod label;
pub mod profile;
pub mod terminology;

pub use label::{humanize, LabelResolver, LabelTable};
pub use profile::{profile_id, NoProfiles, ProfileIndex, ProfileMatch, ProfileSearch};
pub use terminology::{Terminology, TerminologyRecord, TerminologyTable};

/// List keys that open a section with header and footer.
pub const SECTION_KEYS: [&str; 11] = [
    "contact",
    "content",
    "telecom",
    "component",
    "participant",
    "performer",
    "section",
    "entry",
    "activity",
    "dosage",
    "dosageInstruction",
];

/// List keys whose elements are separated by a divider.
pub const DIVIDER_KEYS: [&str; 4] = ["performer", "participant", "activity", "section"];

/// Code systems whose concepts describe a personal relationship.
pub const RELATIONSHIP_SYSTEMS: [&str; 2] = [
    "http://terminology.hl7.org/CodeSystem/v2-0131",
    "http://terminology.hl7.org/CodeSystem/v3-RoleCode",
];

/// Rendering knobs. Defaults reproduce the standard portal layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Final path segments whose lists are wrapped in a section.
    pub section_keys: Vec<String>,
    /// Final path segments whose list elements are followed by a divider.
    pub divider_keys: Vec<String>,
    /// Field names never rendered, wherever they appear.
    pub hidden_fields: Vec<String>,
    /// Paths hidden per profile id. A path also hides everything below it.
    pub hidden_paths: std::collections::BTreeMap<String, Vec<String>>,
    /// Systems recognised by the relationship list handler.
    pub relationship_systems: Vec<String>,
    /// Reformat date-like scalars to `YYYY-MM-DD`.
    pub normalize_dates: bool,
    /// Prefix for links to relative references (`Type/id`).
    pub reference_base: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            section_keys: SECTION_KEYS.iter().map(|key| key.to_string()).collect(),
            divider_keys: DIVIDER_KEYS.iter().map(|key| key.to_string()).collect(),
            hidden_fields: vec!["resourceType".to_string()],
            hidden_paths: Default::default(),
            relationship_systems: RELATIONSHIP_SYSTEMS
                .iter()
                .map(|system| system.to_string())
                .collect(),
            normalize_dates: true,
            reference_base: "/health-data".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn is_section_key(&self, segment: &str) -> bool {
        self.section_keys.iter().any(|key| key == segment)
    }

    pub fn is_divider_key(&self, segment: &str) -> bool {
        self.divider_keys.iter().any(|key| key == segment)
    }

    /// Parse a config from JSON; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, RenderError> {
        serde_json::from_str(json).map_err(|err| RenderError::Config(err.to_string()))
    }
}

/// A label/value pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowData {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl RowData {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            link: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// One presentational unit emitted by a flattening pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Fragment {
    Row(RowData),
    SubHead(String),
    EndSubHead,
    Divider,
    /// Narrative markup copied verbatim.
    Raw(String),
}

impl Fragment {
    pub fn row(label: impl Into<String>, value: impl Into<String>) -> Self {
        Fragment::Row(RowData::new(label, value))
    }

    /// Wrap narrative content in the two-column value cell.
    pub fn narrative(content: &str) -> Self {
        Fragment::Raw(format!(
            "<tr><td colspan=\"2\" class=\"value\">{content}</td></tr>"
        ))
    }

    pub fn as_row(&self) -> Option<&RowData> {
        match self {
            Fragment::Row(row) => Some(row),
            _ => None,
        }
    }
}

/// Output of one flattening pass over a single resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlattenedResource {
    pub resource_type: String,
    pub id: Option<String>,
    pub profile: String,
    pub title: Option<String>,
    pub rows: Vec<Fragment>,
}

/// A resource that could not be flattened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderFailure {
    pub resource_type: Option<String>,
    pub id: Option<String>,
    pub message: String,
}

/// Rendered resources of a bundle, in entry order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderedBundle {
    pub generated_at: DateTime<Utc>,
    pub resources: Vec<FlattenedResource>,
    #[serde(default)]
    pub failures: Vec<RenderFailure>,
}

impl RenderedBundle {
    pub fn new(resources: Vec<FlattenedResource>, failures: Vec<RenderFailure>) -> Self {
        Self {
            generated_at: Utc::now(),
            resources,
            failures,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.failures.is_empty()
    }
}

/// Errors raised while flattening or loading lookup tables.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Input is missing resourceType")]
    MissingData,
    #[error("Could not read input: {0}")]
    Parse(String),
    #[error("Malformed node at {path}: {reason}")]
    MalformedNode { path: String, reason: String },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RenderError {
    pub fn malformed(path: &str, reason: impl Into<String>) -> Self {
        RenderError::MalformedNode {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
