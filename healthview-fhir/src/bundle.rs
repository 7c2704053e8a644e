//! Rendering of whole bundles with per-resource isolation.

use healthview_core::{RenderError, RenderFailure, RenderedBundle};
use serde_json::Value;

use crate::flatten::Services;
use crate::{flatten_resource_value, resource_id, resource_type};

/// Render a bundle (or a single resource) from a JSON string.
pub fn render_bundle_str(
    bundle_json: &str,
    services: Services<'_>,
) -> Result<RenderedBundle, RenderError> {
    let value: Value =
        serde_json::from_str(bundle_json).map_err(|err| RenderError::Parse(err.to_string()))?;
    render_bundle_value(&value, services)
}

/// Render every `entry.resource` of a Bundle. Any other resource is rendered
/// on its own.
pub fn render_bundle_value(
    bundle: &Value,
    services: Services<'_>,
) -> Result<RenderedBundle, RenderError> {
    let kind = resource_type(bundle).ok_or(RenderError::MissingData)?;
    if kind != "Bundle" {
        return Ok(render_resources([bundle], services));
    }

    let entries = bundle
        .get("entry")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let resources = entries.iter().filter_map(|entry| entry.get("resource"));
    Ok(render_resources(resources, services))
}

/// Flatten each resource independently. A failing resource is recorded and
/// the others still render.
pub fn render_resources<'v>(
    resources: impl IntoIterator<Item = &'v Value>,
    services: Services<'_>,
) -> RenderedBundle {
    let mut rendered = Vec::new();
    let mut failures = Vec::new();

    for resource in resources {
        match flatten_resource_value(resource, services) {
            Ok(flattened) => rendered.push(flattened),
            Err(err) => {
                let kind = resource_type(resource);
                let id = resource_id(resource);
                tracing::warn!(resource_type = kind, id, error = %err, "resource could not be rendered");
                failures.push(RenderFailure {
                    resource_type: kind.map(str::to_string),
                    id: id.map(str::to_string),
                    message: err.to_string(),
                });
            }
        }
    }

    tracing::debug!(
        rendered = rendered.len(),
        failed = failures.len(),
        "bundle rendered"
    );
    RenderedBundle::new(rendered, failures)
}
