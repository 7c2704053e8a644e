//! Clinical structures: observation components, dosages, care plan
//! activities, specimen collection, timings.

use healthview_core::{Fragment, RenderError};
use serde_json::{Map, Value};

use super::{
    choice_text, concept_text, format_numeric, non_empty_str, period_text, quantity_text,
    range_text, ratio_text, reference_text, scalar_text, yes_no, Continuation, HandlerContext,
};

/// ImmunizationRecommendation date criterion: the concept names the date.
pub fn handle_date_criterion(ctx: &HandlerContext<'_>, node: &Map<String, Value>) -> Vec<Fragment> {
    let Some(value) = node.get("value").and_then(Value::as_str) else {
        return Vec::new();
    };
    let label = node
        .get("code")
        .and_then(|code| ctx.concept(code))
        .unwrap_or_else(|| ctx.label());
    vec![Fragment::row(label, ctx.date(value))]
}

/// Observation component: `code` labels the `value[x]`.
pub fn handle_component(ctx: &HandlerContext<'_>, node: &Map<String, Value>) -> Vec<Fragment> {
    let label = node
        .get("code")
        .and_then(|code| ctx.concept(code))
        .unwrap_or_else(|| ctx.label());
    let mut rows = Vec::new();

    let value_visible = node
        .keys()
        .find(|key| key.starts_with("value") || key.as_str() == "dataAbsentReason")
        .is_some_and(|key| ctx.allows_child(key));
    let value = choice_text(ctx, node, "value")
        .or_else(|| {
            node.get("dataAbsentReason")
                .and_then(|reason| ctx.concept(reason))
        })
        .filter(|_| value_visible);
    if let Some(value) = value {
        rows.push(Fragment::row(label.clone(), value));
    }

    let interpretation = node
        .get("interpretation")
        .filter(|_| ctx.allows_child("interpretation"));
    if let Some(interpretation) = concept_list_text(ctx, interpretation) {
        rows.push(Fragment::row(ctx.child_label("interpretation"), interpretation));
    }

    let ranges = node
        .get("referenceRange")
        .filter(|_| ctx.allows_child("referenceRange"));
    if let Some(ranges) = ranges.and_then(Value::as_array) {
        for range in ranges {
            let text = range_text(range).or_else(|| non_empty_str(range.get("text")));
            if let Some(text) = text {
                rows.push(Fragment::row(ctx.child_label("referenceRange"), text));
            }
        }
    }
    rows
}

/// Dosage / dosageInstruction element.
pub fn handle_dosage(ctx: &HandlerContext<'_>, node: &Map<String, Value>) -> Vec<Fragment> {
    let mut rows = Vec::new();
    for (key, value) in node {
        if !ctx.allows_child(key) {
            continue;
        }
        let text = match key.as_str() {
            "text" | "patientInstruction" => non_empty_str(Some(value)),
            "sequence" => scalar_text(value),
            "additionalInstruction" => concept_list_text(ctx, Some(value)),
            "timing" => timing_text(ctx, value),
            "asNeededBoolean" => value.as_bool().map(|flag| yes_no(flag).to_string()),
            "asNeededCodeableConcept" | "site" | "route" | "method" => ctx.concept(value),
            "doseAndRate" => {
                rows.extend(dose_and_rate_rows(ctx, value));
                continue;
            }
            "maxDosePerPeriod" => ratio_text(value),
            "maxDosePerAdministration" | "maxDosePerLifetime" => quantity_text(value),
            _ => {
                tracing::trace!(path = ctx.path, field = key.as_str(), "dosage field not rendered");
                None
            }
        };
        if let Some(text) = text {
            rows.push(Fragment::row(ctx.child_label(key), text));
        }
    }
    rows
}

fn dose_and_rate_rows(ctx: &HandlerContext<'_>, value: &Value) -> Vec<Fragment> {
    let entries: Vec<&Value> = match value {
        Value::Array(entries) => entries.iter().collect(),
        other => vec![other],
    };
    let path = ctx.child_path("doseAndRate");
    let dose_ctx = ctx.at(&path);

    let mut rows = Vec::new();
    for entry in entries.into_iter().filter_map(Value::as_object) {
        for field in ["dose", "rate"] {
            let visible = entry
                .keys()
                .find(|key| key.starts_with(field))
                .is_some_and(|key| dose_ctx.allows_child(key));
            if !visible {
                continue;
            }
            if let Some(text) = choice_text(&dose_ctx, entry, field) {
                rows.push(Fragment::row(dose_ctx.child_label(field), text));
            }
        }
    }
    rows
}

/// Specimen.collection.
pub fn handle_collection(ctx: &HandlerContext<'_>, node: &Map<String, Value>) -> Vec<Fragment> {
    let mut rows = Vec::new();
    for (key, value) in node {
        if !ctx.allows_child(key) {
            continue;
        }
        let text = match key.as_str() {
            "collector" => reference_text(value),
            "collectedDateTime" => value.as_str().map(|raw| ctx.date(raw)),
            "collectedPeriod" => period_text(ctx, value),
            "duration" | "quantity" => quantity_text(value),
            "method" | "bodySite" | "fastingStatusCodeableConcept" => ctx.concept(value),
            "fastingStatusDuration" => quantity_text(value),
            _ => scalar_text(value),
        };
        if let Some(text) = text.filter(|text| !text.is_empty()) {
            rows.push(Fragment::row(ctx.child_label(key), text));
        }
    }
    rows
}

/// Timing.repeat summarised on one row.
pub fn handle_timing_repeat(ctx: &HandlerContext<'_>, node: &Map<String, Value>) -> Vec<Fragment> {
    repeat_text(ctx, node)
        .map(|text| vec![Fragment::row(ctx.label(), text)])
        .unwrap_or_default()
}

fn timing_text(ctx: &HandlerContext<'_>, timing: &Value) -> Option<String> {
    let mut parts = Vec::new();
    parts.extend(timing.get("code").and_then(|code| ctx.concept(code)));
    if let Some(repeat) = timing.get("repeat").and_then(Value::as_object) {
        parts.extend(repeat_text(ctx, repeat));
    }
    if let Some(events) = timing.get("event").and_then(Value::as_array) {
        let dates = events
            .iter()
            .filter_map(Value::as_str)
            .map(|event| ctx.date(event))
            .collect::<Vec<_>>();
        if !dates.is_empty() {
            parts.push(dates.join(", "));
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

fn repeat_text(ctx: &HandlerContext<'_>, repeat: &Map<String, Value>) -> Option<String> {
    let number = |field: &str| repeat.get(field).and_then(Value::as_f64).map(format_numeric);
    let unit = |field: &str| {
        repeat
            .get(field)
            .and_then(Value::as_str)
            .map(unit_name)
            .unwrap_or_default()
    };
    let mut parts = Vec::new();

    if let Some(count) = number("count") {
        match number("countMax") {
            Some(max) => parts.push(format!("{count}-{max} times")),
            None => parts.push(format!("{count} times")),
        }
    }
    if let Some(frequency) = number("frequency") {
        let frequency = match number("frequencyMax") {
            Some(max) => format!("{frequency}-{max}"),
            None => frequency,
        };
        match number("period") {
            Some(period) => {
                let period = match number("periodMax") {
                    Some(max) => format!("{period}-{max}"),
                    None => period,
                };
                parts.push(format!("{frequency} x per {period} {}", unit("periodUnit")));
            }
            None => parts.push(format!("{frequency} x")),
        }
    } else if let Some(period) = number("period") {
        parts.push(format!("every {period} {}", unit("periodUnit")));
    }
    if let Some(duration) = number("duration") {
        parts.push(format!("duration {duration} {}", unit("durationUnit")));
    }
    if let Some(bounds) = repeat.get("boundsPeriod") {
        parts.extend(period_text(ctx, bounds));
    }
    if let Some(bounds) = repeat.get("boundsDuration") {
        parts.extend(quantity_text(bounds));
    }
    if let Some(bounds) = repeat.get("boundsRange") {
        parts.extend(range_text(bounds));
    }
    for field in ["dayOfWeek", "timeOfDay", "when"] {
        if let Some(values) = repeat.get(field).and_then(Value::as_array) {
            let joined = values
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if !joined.is_empty() {
                parts.push(joined);
            }
        }
    }
    if let Some(offset) = number("offset") {
        parts.push(format!("offset {offset} min"));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn unit_name(code: &str) -> String {
    match code {
        "s" => "sec",
        "min" => "min",
        "h" => "hour",
        "d" => "day",
        "wk" => "week",
        "mo" => "month",
        "a" => "year",
        other => other,
    }
    .to_string()
}

/// CarePlan.activity: a title row, then the activity's fields, with `detail`
/// opened one level.
pub fn handle_activity(
    ctx: &HandlerContext<'_>,
    node: &Map<String, Value>,
    cont: &mut dyn Continuation,
) -> Result<(), RenderError> {
    let detail = node.get("detail").and_then(Value::as_object);
    let title_field = detail.and_then(|detail| {
        if let Some(text) = detail.get("code").and_then(|code| ctx.concept(code)) {
            Some(("code", text))
        } else {
            non_empty_str(detail.get("description")).map(|text| ("description", text))
        }
    });
    if let Some((_, title)) = &title_field {
        cont.emit(Fragment::row(ctx.label(), title.clone()));
    }

    for (key, value) in node {
        let path = ctx.child_path(key);
        match (key.as_str(), value) {
            ("detail", Value::Object(detail)) => {
                for (field, child) in detail {
                    if title_field.as_ref().is_some_and(|(used, _)| used == field) {
                        continue;
                    }
                    cont.descend(child, &format!("{path}.{field}"), ctx.profile)?;
                }
            }
            _ => cont.descend(value, &path, ctx.profile)?,
        }
    }
    Ok(())
}

/// Observation.referenceRange: the low/high pair on one row, the rest through
/// the dispatcher.
pub fn handle_reference_range(
    ctx: &HandlerContext<'_>,
    node: &Map<String, Value>,
    cont: &mut dyn Continuation,
) -> Result<(), RenderError> {
    if let Some(text) = range_text(&Value::Object(node.clone())) {
        cont.emit(Fragment::row(ctx.label(), text));
    }
    for (key, value) in node {
        if !matches!(key.as_str(), "low" | "high") {
            cont.descend(value, &ctx.child_path(key), ctx.profile)?;
        }
    }
    Ok(())
}

/// A list of relationship concepts on one row.
pub fn handle_relationship(ctx: &HandlerContext<'_>, items: &[Value]) -> Vec<Fragment> {
    let text = items
        .iter()
        .filter_map(|item| concept_text(item, ctx.terminology()))
        .collect::<Vec<_>>()
        .join(", ");
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Fragment::row(ctx.label(), text)]
    }
}

fn concept_list_text(ctx: &HandlerContext<'_>, value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| ctx.concept(item))
            .collect::<Vec<_>>()
            .join(", "),
        single => ctx.concept(single)?,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
