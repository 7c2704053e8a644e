//! General-purpose datatypes that end the recursion for their subtree.

use healthview_core::{humanize, Fragment, RenderError, RowData};
use serde_json::{Map, Value};

use super::{non_empty_str, period_text, quantity_text, range_text, scalar_text, HandlerContext};

pub fn handle_reference(
    ctx: &HandlerContext<'_>,
    node: &Map<String, Value>,
) -> Result<Vec<Fragment>, RenderError> {
    let display = non_empty_str(node.get("display"));
    match node.get("reference") {
        Some(Value::String(reference)) => {
            let mut row = RowData::new(ctx.label(), display.unwrap_or_else(|| reference.clone()));
            if let Some(link) = reference_link(&ctx.services.config.reference_base, reference) {
                row = row.with_link(link);
            }
            Ok(vec![Fragment::Row(row)])
        }
        _ => {
            let identifier = node
                .get("identifier")
                .and_then(|identifier| non_empty_str(identifier.get("value")))
                .ok_or_else(|| {
                    RenderError::malformed(ctx.path, "reference without target or identifier")
                })?;
            Ok(vec![Fragment::row(ctx.label(), display.unwrap_or(identifier))])
        }
    }
}

/// Absolute URLs link as-is, `Type/id` links into the portal, local
/// `#contained` references do not link.
fn reference_link(base: &str, reference: &str) -> Option<String> {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Some(reference.to_string());
    }
    if reference.starts_with('#') || reference.starts_with("urn:") {
        return None;
    }
    let mut parts = reference.split('/');
    match (parts.next(), parts.next()) {
        (Some(kind), Some(id)) if !kind.is_empty() && !id.is_empty() => Some(format!(
            "{}/{kind}/{id}",
            base.trim_end_matches('/')
        )),
        _ => None,
    }
}

pub fn handle_range(ctx: &HandlerContext<'_>, node: &Map<String, Value>) -> Vec<Fragment> {
    range_text(&Value::Object(node.clone()))
        .map(|text| vec![Fragment::row(ctx.label(), text)])
        .unwrap_or_default()
}

pub fn handle_identifier(ctx: &HandlerContext<'_>, node: &Map<String, Value>) -> Vec<Fragment> {
    let Some(value) = non_empty_str(node.get("value")) else {
        tracing::trace!(path = ctx.path, "identifier without value skipped");
        return Vec::new();
    };
    let label = node
        .get("type")
        .and_then(|kind| ctx.concept(kind))
        .or_else(|| {
            node.get("system")
                .and_then(Value::as_str)
                .filter(|system| system.contains('/'))
                .map(|system| humanize(system.trim_end_matches('/').rsplit('/').next().unwrap_or(system)))
                .filter(|label| !label.is_empty())
        })
        .unwrap_or_else(|| ctx.label());
    vec![Fragment::row(label, value)]
}

pub fn handle_period(ctx: &HandlerContext<'_>, node: &Map<String, Value>) -> Vec<Fragment> {
    period_text(ctx, &Value::Object(node.clone()))
        .map(|text| vec![Fragment::row(ctx.label(), text)])
        .unwrap_or_default()
}

pub fn handle_quantity(ctx: &HandlerContext<'_>, node: &Map<String, Value>) -> Vec<Fragment> {
    quantity_text(&Value::Object(node.clone()))
        .map(|text| vec![Fragment::row(ctx.label(), text)])
        .unwrap_or_default()
}

pub fn handle_attachment(ctx: &HandlerContext<'_>, node: &Map<String, Value>) -> Vec<Fragment> {
    let field = |name: &str| node.get(name).filter(|_| ctx.allows_child(name));
    let title = non_empty_str(field("title"));
    let mut rows = Vec::new();

    if let Some(title) = &title {
        rows.push(Fragment::row(ctx.child_label("title"), title.clone()));
    }
    if let Some(url) = non_empty_str(field("url")) {
        let text = title.clone().unwrap_or_else(|| url.clone());
        rows.push(Fragment::Row(
            RowData::new(ctx.child_label("url"), text).with_link(url),
        ));
    }
    for name in ["contentType", "language", "size", "hash"] {
        if let Some(text) = field(name).and_then(scalar_text) {
            rows.push(Fragment::row(ctx.child_label(name), text));
        }
    }
    if let Some(data) = field("data").and_then(Value::as_str) {
        let approx_bytes = data.len() / 4 * 3;
        rows.push(Fragment::row(
            ctx.child_label("data"),
            format!("Embedded content ({approx_bytes} bytes)"),
        ));
    }
    if let Some(creation) = field("creation").and_then(Value::as_str) {
        rows.push(Fragment::row(ctx.child_label("creation"), ctx.date(creation)));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::reference_link;

    #[test]
    fn reference_links() {
        assert_eq!(
            reference_link("/health-data", "Patient/123").as_deref(),
            Some("/health-data/Patient/123")
        );
        assert_eq!(
            reference_link("/health-data/", "https://x.org/fhir/Patient/1").as_deref(),
            Some("https://x.org/fhir/Patient/1")
        );
        assert_eq!(reference_link("/health-data", "#med1"), None);
        assert_eq!(reference_link("/health-data", "urn:uuid:1234"), None);
        assert_eq!(reference_link("/health-data", "Patient"), None);
    }
}
