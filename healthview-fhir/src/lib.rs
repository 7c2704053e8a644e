//! FHIR JSON to flattened row lists: datatype matchers, per-datatype handlers
//! and the recursive dispatcher that ties them together.

use healthview_core::{profile_id, FlattenedResource, RenderError, Terminology};
use serde_json::Value;

pub mod bundle;
pub mod constraints;
pub mod dates;
pub mod flatten;
pub mod handlers;
pub mod matchers;

pub use bundle::{render_bundle_str, render_bundle_value, render_resources};
pub use constraints::Constraints;
pub use dates::normalize_date;
pub use flatten::{JsonFlattener, Services};
pub use matchers::{classify, Datatype, MATCH_ORDER};

/// Flatten a single resource from a JSON string.
pub fn flatten_resource_str(
    resource_json: &str,
    services: Services<'_>,
) -> Result<FlattenedResource, RenderError> {
    let value: Value =
        serde_json::from_str(resource_json).map_err(|err| RenderError::Parse(err.to_string()))?;
    flatten_resource_value(&value, services)
}

/// Flatten a single resource under its own type and first declared profile.
/// Resources without a profile are labelled under their type name.
pub fn flatten_resource_value(
    resource: &Value,
    services: Services<'_>,
) -> Result<FlattenedResource, RenderError> {
    let resource_type = resource_type(resource).ok_or(RenderError::MissingData)?;
    let profile = resource_profile(resource).unwrap_or(resource_type);
    flatten_with_profile(resource, resource_type, profile, services)
}

/// Flatten `resource` rooted at `resource_type` with labels from `profile`.
pub fn flatten_with_profile(
    resource: &Value,
    resource_type: &str,
    profile: &str,
    services: Services<'_>,
) -> Result<FlattenedResource, RenderError> {
    let mut flattener = JsonFlattener::new(services);
    flattener.start_flattening(resource, resource_type, profile)?;

    Ok(FlattenedResource {
        resource_type: resource_type.to_string(),
        id: resource_id(resource).map(str::to_string),
        profile: profile_id(profile).to_string(),
        title: describe_resource(resource, services.terminology),
        rows: flattener.into_rows(),
    })
}

pub fn resource_type(resource: &Value) -> Option<&str> {
    resource
        .get("resourceType")
        .and_then(Value::as_str)
        .filter(|kind| !kind.is_empty())
}

pub fn resource_id(resource: &Value) -> Option<&str> {
    resource.get("id").and_then(Value::as_str)
}

/// Id of the first profile in `meta.profile`.
pub fn resource_profile(resource: &Value) -> Option<&str> {
    resource
        .get("meta")?
        .get("profile")?
        .as_array()?
        .iter()
        .find_map(Value::as_str)
        .map(profile_id)
        .filter(|id| !id.is_empty())
}

/// Short human title: `title`, else the text of `code`, `type` or `category`.
pub fn describe_resource(resource: &Value, terminology: &dyn Terminology) -> Option<String> {
    if let Some(title) = handlers::non_empty_str(resource.get("title")) {
        return Some(title);
    }
    ["code", "type", "category"].iter().find_map(|field| {
        let concept = match resource.get(*field)? {
            Value::Array(items) => items.first()?,
            single => single,
        };
        handlers::concept_text(concept, terminology)
    })
}
