//! Demographic datatypes. These render the parts they understand and hand the
//! rest back to the dispatcher.

use healthview_core::{Fragment, RenderError, RowData};
use serde_json::{Map, Value};

use super::{non_empty_str, scalar_text, yes_no, Continuation, HandlerContext};

/// HumanName: name part lists collapse to one row each.
pub fn handle_name(
    ctx: &HandlerContext<'_>,
    node: &Map<String, Value>,
    cont: &mut dyn Continuation,
) -> Result<(), RenderError> {
    for (key, value) in node {
        let path = ctx.child_path(key);
        match (key.as_str(), value) {
            ("prefix" | "given" | "suffix", Value::Array(parts)) => {
                if !cont.allows(&path) {
                    continue;
                }
                let joined = parts
                    .iter()
                    .filter_map(scalar_text)
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                if !joined.is_empty() {
                    cont.emit(Fragment::row(ctx.at(&path).label(), joined));
                }
            }
            _ => cont.descend(value, &path, ctx.profile)?,
        }
    }
    Ok(())
}

/// ContactPoint: `system`, `value` and `use` become a single row.
pub fn handle_contact_point(
    ctx: &HandlerContext<'_>,
    node: &Map<String, Value>,
    cont: &mut dyn Continuation,
) -> Result<(), RenderError> {
    let Some(value) = node.get("value").and_then(scalar_text).filter(|v| !v.is_empty()) else {
        for (key, child) in node {
            cont.descend(child, &ctx.child_path(key), ctx.profile)?;
        }
        return Ok(());
    };

    let system = node.get("system").and_then(Value::as_str);
    let label = match system {
        Some(system) => ctx.child_label(system),
        None => ctx.label(),
    };
    let text = match non_empty_str(node.get("use")) {
        Some(usage) => format!("{value} ({usage})"),
        None => value.clone(),
    };
    let mut row = RowData::new(label, text);
    match system {
        Some("email") => row = row.with_link(format!("mailto:{value}")),
        Some("url") => row = row.with_link(value),
        _ => {}
    }
    cont.emit(Fragment::Row(row));

    for (key, child) in node {
        if !matches!(key.as_str(), "system" | "value" | "use") {
            cont.descend(child, &ctx.child_path(key), ctx.profile)?;
        }
    }
    Ok(())
}

const ADDRESS_PARTS: [&str; 7] = [
    "text",
    "line",
    "postalCode",
    "city",
    "district",
    "state",
    "country",
];

/// Address: `text`, or the postal parts composed into one line.
pub fn handle_address(
    ctx: &HandlerContext<'_>,
    node: &Map<String, Value>,
    cont: &mut dyn Continuation,
) -> Result<(), RenderError> {
    let composed = non_empty_str(node.get("text")).or_else(|| compose_address(node));
    let Some(composed) = composed else {
        for (key, child) in node {
            cont.descend(child, &ctx.child_path(key), ctx.profile)?;
        }
        return Ok(());
    };

    cont.emit(Fragment::row(ctx.label(), composed));
    for (key, child) in node {
        if !ADDRESS_PARTS.contains(&key.as_str()) {
            cont.descend(child, &ctx.child_path(key), ctx.profile)?;
        }
    }
    Ok(())
}

fn compose_address(node: &Map<String, Value>) -> Option<String> {
    let mut parts = Vec::new();

    let lines = node
        .get("line")
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty());
    parts.extend(lines);

    let locality = [non_empty_str(node.get("postalCode")), non_empty_str(node.get("city"))]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !locality.is_empty() {
        parts.push(locality);
    }

    for field in ["district", "state", "country"] {
        parts.extend(non_empty_str(node.get(field)));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// Patient.communication: `preferred` reads as Yes/No, the language concept
/// goes through the dispatcher.
pub fn handle_communication(
    ctx: &HandlerContext<'_>,
    node: &Map<String, Value>,
    cont: &mut dyn Continuation,
) -> Result<(), RenderError> {
    for (key, value) in node {
        let path = ctx.child_path(key);
        match (key.as_str(), value) {
            ("preferred", Value::Bool(flag)) => {
                if cont.allows(&path) {
                    cont.emit(Fragment::row(ctx.at(&path).label(), yes_no(*flag)));
                }
            }
            _ => cont.descend(value, &path, ctx.profile)?,
        }
    }
    Ok(())
}
