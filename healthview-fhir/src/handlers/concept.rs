use healthview_core::{Fragment, RenderError};
use serde_json::{json, Map, Value};

use super::{coding_text, non_empty_str, HandlerContext};
use crate::matchers::is_class_path;

/// CodeableConcept: a single row with the concept's display text.
///
/// A `*class` node without `coding` is a bare Coding and is wrapped into a
/// concept first.
pub fn handle(
    ctx: &HandlerContext<'_>,
    node: &Map<String, Value>,
) -> Result<Vec<Fragment>, RenderError> {
    let text = if is_class_path(ctx.path) && !node.contains_key("coding") {
        let concept = json!({ "coding": [node] });
        strict_concept_text(ctx, &concept)?
    } else {
        strict_concept_text(ctx, &Value::Object(node.clone()))?
    };
    Ok(vec![Fragment::row(ctx.label(), text)])
}

fn strict_concept_text(ctx: &HandlerContext<'_>, concept: &Value) -> Result<String, RenderError> {
    if let Some(text) = non_empty_str(concept.get("text")) {
        return Ok(text);
    }
    let codings = match concept.get("coding") {
        Some(Value::Array(codings)) => codings,
        Some(_) => return Err(RenderError::malformed(ctx.path, "coding is not a list")),
        None => return Err(RenderError::malformed(ctx.path, "concept without coding or text")),
    };

    let mut parts: Vec<String> = Vec::new();
    for coding in codings {
        if !coding.is_object() {
            return Err(RenderError::malformed(ctx.path, "coding entry is not an object"));
        }
        if let Some(text) = coding_text(coding, ctx.terminology()) {
            if !parts.contains(&text) {
                parts.push(text);
            }
        }
    }

    if parts.is_empty() {
        Err(RenderError::malformed(
            ctx.path,
            "concept has no code, display or text",
        ))
    } else {
        Ok(parts.join(", "))
    }
}
