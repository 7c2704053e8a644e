use chrono::{TimeZone, Utc};
use healthview_core::{
    FlattenedResource, Fragment, LabelTable, NoProfiles, RenderConfig, RenderFailure,
    RenderedBundle, RowData, TerminologyTable,
};
use healthview_fhir::{render_bundle_value, Services};
use healthview_html::{render_document, render_resource, render_rows, DocumentOptions};
use serde_json::json;

fn resource(rows: Vec<Fragment>) -> FlattenedResource {
    FlattenedResource {
        resource_type: "Observation".to_string(),
        id: Some("obs-1".to_string()),
        profile: "Observation".to_string(),
        title: Some("Glucose <fasting>".to_string()),
        rows,
    }
}

#[test]
fn values_are_escaped_but_narrative_is_not() {
    let html = render_rows(&[
        Fragment::row("Comment", "<script>alert(1)</script> & more"),
        Fragment::narrative("<div><b>bold</b></div>"),
    ]);

    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; more"));
    assert!(!html.contains("<script>"));
    assert!(html.contains("<tr><td colspan=\"2\" class=\"value\"><div><b>bold</b></div></td></tr>"));
}

#[test]
fn links_are_attribute_escaped() {
    let html = render_rows(&[Fragment::Row(
        RowData::new("Subject", "Jan").with_link("/health-data/Patient/1?a=\"x\""),
    )]);

    assert_eq!(
        html,
        "<tr><td class=\"label\">Subject</td><td class=\"value\"><a href=\"/health-data/Patient/1?a=&quot;x&quot;\">Jan</a></td></tr>"
    );
}

#[test]
fn sections_and_dividers_become_table_rows() {
    let html = render_rows(&[
        Fragment::SubHead("Performer".to_string()),
        Fragment::row("Performer", "Dr. A"),
        Fragment::Divider,
        Fragment::EndSubHead,
    ]);

    assert_eq!(
        html,
        concat!(
            "<tr class=\"subhead\"><th colspan=\"2\">Performer</th></tr>",
            "<tr><td class=\"label\">Performer</td><td class=\"value\">Dr. A</td></tr>",
            "<tr class=\"divider\"><td colspan=\"2\"><hr></td></tr>",
            "<tr class=\"subfoot\"><td colspan=\"2\"></td></tr>",
        )
    );
}

#[test]
fn resource_heading_uses_title_and_type() {
    let html = render_resource(&resource(vec![Fragment::row("Value", "5.2 mmol/L")]));

    assert!(html.starts_with(
        "<section class=\"healthview-resource\" data-resource-type=\"Observation\" data-resource-id=\"obs-1\">"
    ));
    assert!(html.contains("<h2>Glucose &lt;fasting&gt;<small>Observation</small></h2>"));
    assert!(html.ends_with("</tbody></table></section>"));
}

#[test]
fn document_lists_failures_and_resources() {
    let mut bundle = RenderedBundle::new(
        vec![resource(Vec::new())],
        vec![RenderFailure {
            resource_type: Some("Observation".to_string()),
            id: Some("broken-1".to_string()),
            message: "Malformed node at Observation.subject: reference without target or identifier"
                .to_string(),
        }],
    );
    bundle.generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();

    let html = render_document(
        &bundle,
        &DocumentOptions {
            title: "Results & letters".to_string(),
            ..DocumentOptions::default()
        },
    );

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Results &amp; letters</title>"));
    assert!(html.contains("data-healthview-ui"));
    assert!(html.contains("<p>Generated 2024-05-01 09:30 UTC</p>"));
    assert!(html.contains("<li>Observation broken-1: Malformed node at Observation.subject"));
    assert!(html.contains("data-resource-id=\"obs-1\""));
}

#[test]
fn document_without_styles_or_timestamp() {
    let bundle = RenderedBundle::new(Vec::new(), Vec::new());
    let options = DocumentOptions {
        include_styles: false,
        show_generated_at: false,
        ..DocumentOptions::default()
    };

    let html = render_document(&bundle, &options);

    assert!(!html.contains("<style"));
    assert!(!html.contains("Generated"));
    assert!(!html.contains("healthview-failures"));
}

#[test]
fn flattened_patient_renders_end_to_end() {
    let labels = LabelTable::new();
    let terminology = TerminologyTable::new();
    let config = RenderConfig::default();
    let services = Services::new(&labels, &terminology, &NoProfiles, &config);

    let rendered = render_bundle_value(
        &json!({
            "resourceType": "Patient",
            "id": "p",
            "text": {"div": "<div>Narrative</div>"},
            "telecom": [{"system": "email", "value": "a@b.nl"}]
        }),
        services,
    )
    .expect("patient renders");

    let html = render_resource(&rendered.resources[0]);
    assert!(html.contains("<td colspan=\"2\" class=\"value\"><div>Narrative</div></td>"));
    assert!(html.contains("<a href=\"mailto:a@b.nl\">a@b.nl</a>"));
    assert!(html.contains("<th colspan=\"2\">Telecom</th>"));
}
