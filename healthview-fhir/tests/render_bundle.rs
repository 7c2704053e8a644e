use std::fs;

use healthview_core::{Fragment, LabelTable, NoProfiles, RenderConfig, TerminologyTable};
use healthview_fhir::{render_bundle_str, render_bundle_value, Services};
use serde_json::json;

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"));
    fs::read_to_string(path).expect("fixture must be readable")
}

fn terminology() -> TerminologyTable {
    let mut table = TerminologyTable::new();
    table.insert("loinc", "85354-9", "Bloeddruk");
    table
}

#[test]
fn failing_entry_is_isolated() {
    let labels = LabelTable::new();
    let terminology = terminology();
    let config = RenderConfig::default();
    let services = Services::new(&labels, &terminology, &NoProfiles, &config);

    let bundle = render_bundle_str(&fixture("observation_bundle.json"), services)
        .expect("bundle must render");

    assert_eq!(bundle.resources.len(), 2);
    assert_eq!(bundle.failures.len(), 1);

    let failure = &bundle.failures[0];
    assert_eq!(failure.resource_type.as_deref(), Some("Observation"));
    assert_eq!(failure.id.as_deref(), Some("broken-1"));
    assert!(failure.message.contains("Observation.subject"));

    let ids: Vec<_> = bundle
        .resources
        .iter()
        .map(|resource| resource.id.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(ids, ["bp-1", "med-1"]);
}

#[test]
fn observation_rows_use_terminology_and_links() {
    let labels = LabelTable::new();
    let terminology = terminology();
    let config = RenderConfig::default();
    let services = Services::new(&labels, &terminology, &NoProfiles, &config);

    let bundle = render_bundle_str(&fixture("observation_bundle.json"), services)
        .expect("bundle must render");
    let observation = &bundle.resources[0];

    assert_eq!(observation.title.as_deref(), Some("Bloeddruk"));
    assert_eq!(
        observation.rows,
        vec![
            Fragment::row("Id", "bp-1"),
            Fragment::row("Status", "final"),
            Fragment::row("Category", "Vital Signs"),
            Fragment::row("Code", "Bloeddruk"),
            Fragment::Row(
                healthview_core::RowData::new("Subject", "Jan Jansen")
                    .with_link("/health-data/Patient/pat-1")
            ),
            Fragment::row("Effective date time", "2023-04-05"),
            Fragment::SubHead("Component".to_string()),
            Fragment::row("Systolic blood pressure", "120 mmHg"),
            Fragment::row("Diastolic blood pressure", "80 mmHg"),
            Fragment::EndSubHead,
        ]
    );
}

#[test]
fn dosage_instruction_is_summarised() {
    let labels = LabelTable::new();
    let terminology = TerminologyTable::new();
    let config = RenderConfig::default();
    let services = Services::new(&labels, &terminology, &NoProfiles, &config);

    let bundle = render_bundle_str(&fixture("observation_bundle.json"), services)
        .expect("bundle must render");
    let request = &bundle.resources[1];

    assert_eq!(request.resource_type, "MedicationRequest");
    assert_eq!(request.title, None);
    assert_eq!(
        request.rows,
        vec![
            Fragment::row("Id", "med-1"),
            Fragment::row("Status", "active"),
            Fragment::row("Text", "Paracetamol 500 mg tablet"),
            Fragment::SubHead("Dosage instruction".to_string()),
            Fragment::row("Text", "3 x per dag 1 tablet"),
            Fragment::row("Timing", "3 x per 1 day"),
            Fragment::row("Route", "Oral route"),
            Fragment::row("Dose", "1 tablet"),
            Fragment::EndSubHead,
        ]
    );
}

#[test]
fn single_resource_is_rendered_as_one_entry() {
    let labels = LabelTable::new();
    let terminology = TerminologyTable::new();
    let config = RenderConfig::default();
    let services = Services::new(&labels, &terminology, &NoProfiles, &config);

    let bundle = render_bundle_value(
        &json!({"resourceType": "Patient", "id": "p", "gender": "female"}),
        services,
    )
    .expect("resource must render");

    assert_eq!(bundle.resources.len(), 1);
    assert!(bundle.failures.is_empty());
    assert_eq!(
        bundle.resources[0].rows,
        vec![Fragment::row("Id", "p"), Fragment::row("Gender", "female")]
    );
}

#[test]
fn empty_bundle_and_untyped_input() {
    let labels = LabelTable::new();
    let terminology = TerminologyTable::new();
    let config = RenderConfig::default();
    let services = Services::new(&labels, &terminology, &NoProfiles, &config);

    let empty = render_bundle_value(&json!({"resourceType": "Bundle", "type": "searchset"}), services)
        .expect("empty bundle renders");
    assert!(empty.is_empty());

    assert!(render_bundle_value(&json!({"entry": []}), services).is_err());
    assert!(render_bundle_str("{not json", services).is_err());
}
