//! Framework-neutral WASM <-> JavaScript bridge.

use std::collections::BTreeMap;

use healthview_core::{
    LabelTable, ProfileIndex, RenderConfig, RenderError, TerminologyRecord, TerminologyTable,
};
use healthview_fhir::{flatten_resource_value, flatten_with_profile, Services};
use healthview_html::DocumentOptions;
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsProfileEntry {
    profile: String,
    path: String,
    target: String,
    base_path: String,
}

/// Options accepted from JavaScript. Every field is optional and falls back
/// to the engine defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct JsRenderOptions {
    profile: Option<String>,
    labels: Option<LabelTable>,
    terminology: Vec<TerminologyRecord>,
    profiles: Vec<JsProfileEntry>,
    normalize_dates: Option<bool>,
    hidden_fields: Option<Vec<String>>,
    hidden_paths: Option<BTreeMap<String, Vec<String>>>,
    reference_base: Option<String>,
    document: Option<DocumentOptions>,
}

/// Lookup tables and configuration owned for the duration of one call.
struct Lookups {
    profile: Option<String>,
    labels: LabelTable,
    terminology: TerminologyTable,
    profiles: ProfileIndex,
    config: RenderConfig,
    document: DocumentOptions,
}

impl From<JsRenderOptions> for Lookups {
    fn from(options: JsRenderOptions) -> Self {
        let mut config = RenderConfig::default();
        if let Some(normalize) = options.normalize_dates {
            config.normalize_dates = normalize;
        }
        if let Some(fields) = options.hidden_fields {
            config.hidden_fields = fields;
        }
        if let Some(paths) = options.hidden_paths {
            config.hidden_paths = paths;
        }
        if let Some(base) = options.reference_base {
            config.reference_base = base;
        }

        let mut profiles = ProfileIndex::new();
        for entry in options.profiles {
            profiles.insert(&entry.profile, entry.path, &entry.target, entry.base_path);
        }

        Self {
            profile: options.profile.filter(|profile| !profile.is_empty()),
            labels: options.labels.unwrap_or_default(),
            terminology: options.terminology.into_iter().collect(),
            profiles,
            config,
            document: options.document.unwrap_or_default(),
        }
    }
}

impl Lookups {
    fn services(&self) -> Services<'_> {
        Services::new(&self.labels, &self.terminology, &self.profiles, &self.config)
    }
}

fn read_options(options: Option<JsValue>) -> Result<Lookups, JsValue> {
    let options = match options {
        Some(js) if !js.is_undefined() && !js.is_null() => from_value::<JsRenderOptions>(js)
            .map_err(|err| JsValue::from_str(&format!("Could not read options: {err}")))?,
        _ => JsRenderOptions::default(),
    };
    Ok(Lookups::from(options))
}

fn read_json(input: JsValue, what: &str) -> Result<serde_json::Value, JsValue> {
    from_value::<serde_json::Value>(input)
        .map_err(|err| JsValue::from_str(&format!("Could not read {what} JSON: {err}")))
}

fn format_render_error(err: RenderError) -> JsValue {
    JsValue::from_str(&format!("Render error: {err}"))
}

/// Flatten one resource into its fragment list.
#[wasm_bindgen(js_name = flattenResource)]
pub fn flatten_resource(resource: JsValue, options: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let resource = read_json(resource, "resource")?;
    let lookups = read_options(options)?;

    let flattened = match (&lookups.profile, healthview_fhir::resource_type(&resource)) {
        (Some(profile), Some(resource_type)) => {
            flatten_with_profile(&resource, resource_type, profile, lookups.services())
        }
        _ => flatten_resource_value(&resource, lookups.services()),
    }
    .map_err(format_render_error)?;

    to_value(&flattened)
        .map_err(|err| JsValue::from_str(&format!("Could not serialize resource: {err}")))
}

/// Render a bundle (or one resource) into `{generated_at, resources, failures}`.
#[wasm_bindgen(js_name = renderBundle)]
pub fn render_bundle(bundle: JsValue, options: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let bundle = read_json(bundle, "bundle")?;
    let lookups = read_options(options)?;
    let rendered = healthview_fhir::render_bundle_value(&bundle, lookups.services())
        .map_err(format_render_error)?;

    to_value(&rendered)
        .map_err(|err| JsValue::from_str(&format!("Could not serialize bundle: {err}")))
}

/// Render a bundle (or one resource) into a standalone HTML document.
#[wasm_bindgen(js_name = renderBundleHtml)]
pub fn render_bundle_html(bundle: JsValue, options: Option<JsValue>) -> Result<String, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let bundle = read_json(bundle, "bundle")?;
    let lookups = read_options(options)?;
    let rendered = healthview_fhir::render_bundle_value(&bundle, lookups.services())
        .map_err(format_render_error)?;

    Ok(healthview_html::render_document(&rendered, &lookups.document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthview_core::LabelResolver;
    use serde_json::json;

    fn lookups(options: serde_json::Value) -> Lookups {
        let options: JsRenderOptions = serde_json::from_value(options).expect("valid options");
        Lookups::from(options)
    }

    #[test]
    fn empty_options_keep_defaults() {
        let lookups = lookups(json!({}));
        assert_eq!(lookups.config, RenderConfig::default());
        assert_eq!(lookups.profile, None);
        assert!(lookups.terminology.is_empty());
        assert_eq!(lookups.document, DocumentOptions::default());
    }

    #[test]
    fn options_override_only_what_they_name() {
        let lookups = lookups(json!({
            "profile": "nl-core-Patient",
            "normalizeDates": false,
            "referenceBase": "/records",
            "labels": {"labels": {"nl-core-Patient": {"Patient.gender": "Geslacht"}}},
            "terminology": [{"system": "snomed", "code": "1", "description": "One"}],
            "profiles": [{
                "profile": "nl-core-Patient",
                "path": "Patient.telecom",
                "target": "nl-core-ContactInformation",
                "basePath": "ContactInformation.telecom"
            }],
            "document": {"title": "Patient"}
        }));

        assert_eq!(lookups.profile.as_deref(), Some("nl-core-Patient"));
        assert!(!lookups.config.normalize_dates);
        assert_eq!(lookups.config.reference_base, "/records");
        assert_eq!(lookups.config.hidden_fields, RenderConfig::default().hidden_fields);
        assert_eq!(lookups.labels.label("nl-core-Patient", "Patient.gender"), "Geslacht");
        assert_eq!(lookups.terminology.len(), 1);
        assert_eq!(lookups.profiles.len(), 1);
        assert_eq!(lookups.document.title, "Patient");
        assert!(lookups.document.include_styles);
    }
}
