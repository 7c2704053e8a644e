use healthview_core::{Fragment, RenderError};
use serde_json::{Map, Value};

use super::{render_terminating, scalar_text, Continuation, Emitted, HandlerContext};
use crate::matchers::{classify, is_extension};

/// Extension: resolves the concrete `value[x]` type and renders it under the
/// extension's label. Complex extensions nest their children in a section.
///
/// The extension lives at `<path>:<url tail>`; hidden paths below that are
/// honoured by descending through `cont`.
pub fn handle(
    ctx: &HandlerContext<'_>,
    node: &Map<String, Value>,
    cont: &mut dyn Continuation,
) -> Result<Emitted, RenderError> {
    let url = node.get("url").and_then(Value::as_str).unwrap_or_default();
    let path = format!("{}:{}", ctx.path, url_tail(url));
    if !ctx.allows(&path) {
        tracing::trace!(path = %path, "extension suppressed by constraints");
        return Ok(Emitted::Many(Vec::new()));
    }
    let ext_ctx = ctx.at(&path);

    let mut fragments = Vec::new();
    let value = node
        .iter()
        .find(|(key, _)| key.starts_with("value"))
        .filter(|(key, _)| ext_ctx.allows_child(key));
    if let Some((key, value)) = value {
        let value_path = ext_ctx.child_path(key);
        match value {
            Value::Object(inner) => {
                let rendered = match classify(inner, &value_path)
                    .and_then(|datatype| render_terminating(datatype, &ext_ctx, inner))
                {
                    Some(rows) => rows?,
                    None => cont.capture(value, &value_path, ctx.profile)?,
                };
                fragments.extend(rendered);
            }
            Value::Array(_) => {
                fragments.extend(cont.capture(value, &value_path, ctx.profile)?);
            }
            scalar => {
                let text = scalar_text(scalar).unwrap_or_default();
                let text = if key.starts_with("valueDate") || key == "valueInstant" {
                    ext_ctx.date(&text)
                } else {
                    text
                };
                let row = Fragment::row(ext_ctx.label(), text);
                if !node.contains_key("extension") {
                    return Ok(Emitted::One(row));
                }
                fragments.push(row);
            }
        }
    }

    if let Some(children) = node.get("extension").and_then(Value::as_array) {
        let mut nested = Vec::new();
        for child in children.iter().filter_map(Value::as_object) {
            if is_extension(child) {
                nested.extend(handle(&ext_ctx, child, cont)?);
            }
        }
        if !nested.is_empty() {
            fragments.push(Fragment::SubHead(ext_ctx.label()));
            fragments.extend(nested);
            fragments.push(Fragment::EndSubHead);
        }
    }

    if fragments.is_empty() {
        tracing::trace!(path = %path, "extension has nothing to render");
    }
    Ok(Emitted::Many(fragments))
}

/// `http://nictiz.nl/fhir/StructureDefinition/ext-Nationality` -> `ext-Nationality`.
/// Relative urls of complex extension parts are returned unchanged. Dots
/// become dashes so the tail stays one path segment.
fn url_tail(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .replace('.', "-")
}

#[cfg(test)]
mod tests {
    use super::url_tail;

    #[test]
    fn url_tail_takes_last_segment() {
        assert_eq!(
            url_tail("http://hl7.org/fhir/StructureDefinition/patient-birthPlace"),
            "patient-birthPlace"
        );
        assert_eq!(url_tail("code"), "code");
    }

    #[test]
    fn url_tail_keeps_dotted_names_in_one_segment() {
        assert_eq!(
            url_tail("http://nictiz.nl/fhir/StructureDefinition/zib-Patient.Nationality"),
            "zib-Patient-Nationality"
        );
    }
}
