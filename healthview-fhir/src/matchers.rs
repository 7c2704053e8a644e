//! Structural predicates recognising FHIR datatypes in untyped JSON.
//!
//! Datatypes overlap structurally, so the dispatcher tries them in the fixed
//! order of [`MATCH_ORDER`] and the first match wins.

use serde_json::{Map, Value};

/// Datatypes with a dedicated handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    Extension,
    HumanName,
    ContactPoint,
    Address,
    DateCriterion,
    CodeableConcept,
    Component,
    Dosage,
    Activity,
    Collection,
    TimingRepeat,
    Communication,
    Reference,
    Range,
    ReferenceRange,
    Identifier,
    Period,
    Quantity,
    Attachment,
}

/// Priority in which object nodes are classified.
pub const MATCH_ORDER: [Datatype; 19] = [
    Datatype::Extension,
    Datatype::HumanName,
    Datatype::ContactPoint,
    Datatype::Address,
    Datatype::DateCriterion,
    Datatype::CodeableConcept,
    Datatype::Component,
    Datatype::Dosage,
    Datatype::Activity,
    Datatype::Collection,
    Datatype::TimingRepeat,
    Datatype::Communication,
    Datatype::Reference,
    Datatype::Range,
    Datatype::ReferenceRange,
    Datatype::Identifier,
    Datatype::Period,
    Datatype::Quantity,
    Datatype::Attachment,
];

impl Datatype {
    pub fn name(self) -> &'static str {
        match self {
            Datatype::Extension => "Extension",
            Datatype::HumanName => "HumanName",
            Datatype::ContactPoint => "ContactPoint",
            Datatype::Address => "Address",
            Datatype::DateCriterion => "DateCriterion",
            Datatype::CodeableConcept => "CodeableConcept",
            Datatype::Component => "Component",
            Datatype::Dosage => "Dosage",
            Datatype::Activity => "Activity",
            Datatype::Collection => "Collection",
            Datatype::TimingRepeat => "TimingRepeat",
            Datatype::Communication => "Communication",
            Datatype::Reference => "Reference",
            Datatype::Range => "Range",
            Datatype::ReferenceRange => "ReferenceRange",
            Datatype::Identifier => "Identifier",
            Datatype::Period => "Period",
            Datatype::Quantity => "Quantity",
            Datatype::Attachment => "Attachment",
        }
    }

    /// Whether `node`, found at `path`, is an instance of this datatype.
    pub fn matches(self, node: &Map<String, Value>, path: &str) -> bool {
        let last = last_segment(path);
        match self {
            Datatype::Extension => is_extension(node),
            Datatype::HumanName => last == "name",
            Datatype::ContactPoint => last == "telecom",
            Datatype::Address => last == "address",
            Datatype::DateCriterion => last == "dateCriterion",
            Datatype::CodeableConcept => is_codeable_concept(node) || is_class_path(path),
            Datatype::Component => last == "component",
            Datatype::Dosage => matches!(last, "dosage" | "dosageInstruction"),
            Datatype::Activity => last == "activity",
            Datatype::Collection => last == "collection",
            Datatype::TimingRepeat => last == "repeat",
            Datatype::Communication => last == "communication",
            Datatype::Reference => node.contains_key("reference"),
            Datatype::Range => is_range(node),
            Datatype::ReferenceRange => last == "referenceRange",
            Datatype::Identifier => is_identifier(node),
            Datatype::Period => is_period(node),
            Datatype::Quantity => is_quantity(node),
            Datatype::Attachment => is_attachment(node),
        }
    }
}

/// First datatype in [`MATCH_ORDER`] matching the node, if any.
pub fn classify(node: &Map<String, Value>, path: &str) -> Option<Datatype> {
    MATCH_ORDER
        .iter()
        .copied()
        .find(|datatype| datatype.matches(node, path))
}

pub fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

pub fn is_extension(node: &Map<String, Value>) -> bool {
    node.get("url").is_some_and(Value::is_string)
        && node
            .keys()
            .any(|key| key.starts_with("value") || key == "extension")
}

pub fn is_codeable_concept(node: &Map<String, Value>) -> bool {
    node.get("coding").is_some_and(Value::is_array)
}

/// `Encounter.class` and friends carry a bare Coding where a concept is
/// expected. Deliberately a plain suffix test on the path string.
pub fn is_class_path(path: &str) -> bool {
    path.ends_with("class")
}

pub fn is_range(node: &Map<String, Value>) -> bool {
    (node.contains_key("low") || node.contains_key("high"))
        && only_keys(node, &["low", "high", "id", "extension"])
}

pub fn is_identifier(node: &Map<String, Value>) -> bool {
    node.contains_key("system") && node.get("value").is_some_and(Value::is_string)
}

pub fn is_period(node: &Map<String, Value>) -> bool {
    (node.contains_key("start") || node.contains_key("end"))
        && only_keys(node, &["start", "end", "id", "extension"])
}

pub fn is_quantity(node: &Map<String, Value>) -> bool {
    node.get("value").is_some_and(Value::is_number)
}

pub fn is_attachment(node: &Map<String, Value>) -> bool {
    node.contains_key("contentType")
        || node.contains_key("data")
        || (node.contains_key("url") && node.contains_key("title"))
}

/// A list of relationship concepts, e.g. `Patient.contact.relationship`.
pub fn is_relationship(items: &[Value], systems: &[String]) -> bool {
    !items.is_empty()
        && items.iter().all(|item| {
            item.get("coding")
                .and_then(Value::as_array)
                .is_some_and(|codings| {
                    !codings.is_empty()
                        && codings.iter().all(|coding| {
                            coding
                                .get("system")
                                .and_then(Value::as_str)
                                .is_some_and(|system| systems.iter().any(|known| known == system))
                        })
                })
        })
}

fn only_keys(node: &Map<String, Value>, allowed: &[&str]) -> bool {
    node.keys().all(|key| allowed.contains(&key.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn order_is_complete_and_distinct() {
        let mut seen = std::collections::HashSet::new();
        for datatype in MATCH_ORDER {
            assert!(seen.insert(datatype), "{} listed twice", datatype.name());
        }
        assert_eq!(MATCH_ORDER.first(), Some(&Datatype::Extension));
        assert_eq!(MATCH_ORDER.last(), Some(&Datatype::Attachment));
    }

    #[test]
    fn quantity_with_system_is_not_an_identifier() {
        let node = object(json!({
            "value": 72,
            "unit": "beats/min",
            "system": "http://unitsofmeasure.org",
            "code": "/min"
        }));
        assert_eq!(classify(&node, "Observation.valueQuantity"), Some(Datatype::Quantity));
    }

    #[test]
    fn extension_wins_over_path_based_types() {
        let node = object(json!({"url": "http://x/ext", "valueString": "a"}));
        assert_eq!(classify(&node, "Patient.name"), Some(Datatype::Extension));
    }

    #[test]
    fn class_suffix_routes_bare_coding_to_concept() {
        let node = object(json!({"system": "http://terminology.hl7.org/CodeSystem/v3-ActCode", "code": "AMB"}));
        assert_eq!(classify(&node, "Encounter.class"), Some(Datatype::CodeableConcept));
        assert_eq!(classify(&node, "Encounter.priority"), None);
    }

    #[test]
    fn period_and_range_require_exact_shape() {
        let period = object(json!({"start": "2020-01-01"}));
        assert_eq!(classify(&period, "Encounter.period"), Some(Datatype::Period));

        let not_period = object(json!({"start": "2020-01-01", "note": "x"}));
        assert_eq!(classify(&not_period, "Encounter.period"), None);

        let reference_range = object(json!({"low": {"value": 1}, "text": "normal"}));
        assert_eq!(
            classify(&reference_range, "Observation.referenceRange"),
            Some(Datatype::ReferenceRange)
        );
    }

    #[test]
    fn generic_objects_match_nothing() {
        let node = object(json!({"given": ["John"], "family": "Smith"}));
        assert_eq!(classify(&node, "Patient.contact"), None);
    }

    #[test]
    fn relationship_lists_need_known_systems() {
        let systems = vec!["http://terminology.hl7.org/CodeSystem/v2-0131".to_string()];
        let related = json!([{"coding": [{"system": "http://terminology.hl7.org/CodeSystem/v2-0131", "code": "C"}]}]);
        let other = json!([{"coding": [{"system": "http://snomed.info/sct", "code": "1"}]}]);

        assert!(is_relationship(related.as_array().expect("array"), &systems));
        assert!(!is_relationship(other.as_array().expect("array"), &systems));
        assert!(!is_relationship(&[], &systems));
    }
}
