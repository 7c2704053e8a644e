//! Per-datatype handlers.
//!
//! Terminating handlers return the fragments for their subtree. Continuation
//! handlers render what they own and hand sub-fields back to the dispatcher
//! through [`Continuation`].

use healthview_core::{Fragment, RenderError, Terminology};
use serde_json::{Map, Value};

use crate::constraints::Constraints;
use crate::dates::normalize_date;
use crate::flatten::Services;
use crate::matchers::Datatype;

pub mod clinical;
pub mod concept;
pub mod extension;
pub mod general;
pub mod person;

/// Where a handler was invoked and what it may consult.
#[derive(Clone, Copy)]
pub struct HandlerContext<'a> {
    pub path: &'a str,
    pub profile: &'a str,
    pub services: Services<'a>,
    constraints: &'a Constraints,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        path: &'a str,
        profile: &'a str,
        services: Services<'a>,
        constraints: &'a Constraints,
    ) -> Self {
        Self {
            path,
            profile,
            services,
            constraints,
        }
    }

    /// Same profile and services, different path.
    pub fn at<'b>(&self, path: &'b str) -> HandlerContext<'b>
    where
        'a: 'b,
    {
        HandlerContext {
            path,
            profile: self.profile,
            services: self.services,
            constraints: self.constraints,
        }
    }

    /// Whether the pass's constraints let `path` render.
    pub fn allows(&self, path: &str) -> bool {
        self.constraints.allows(path)
    }

    /// Whether the child field `field` may render.
    pub fn allows_child(&self, field: &str) -> bool {
        self.allows(&self.child_path(field))
    }

    pub fn label(&self) -> String {
        self.services.labels.label(self.profile, self.path)
    }

    pub fn child_path(&self, field: &str) -> String {
        format!("{}.{field}", self.path)
    }

    pub fn child_label(&self, field: &str) -> String {
        self.services
            .labels
            .label(self.profile, &self.child_path(field))
    }

    pub fn terminology(&self) -> &'a dyn Terminology {
        self.services.terminology
    }

    pub fn date(&self, raw: &str) -> String {
        if self.services.config.normalize_dates {
            normalize_date(raw)
        } else {
            raw.to_string()
        }
    }

    pub fn concept(&self, value: &Value) -> Option<String> {
        concept_text(value, self.services.terminology)
    }
}

/// Callback into the dispatcher for handlers that only own part of a node.
pub trait Continuation {
    fn emit(&mut self, fragment: Fragment);
    fn descend(&mut self, value: &Value, path: &str, profile: &str) -> Result<(), RenderError>;
    /// Like `descend`, but hands the produced fragments back instead of
    /// appending them.
    fn capture(
        &mut self,
        value: &Value,
        path: &str,
        profile: &str,
    ) -> Result<Vec<Fragment>, RenderError>;
    fn allows(&self, path: &str) -> bool;
}

/// Handler output that is either one fragment or several.
#[derive(Debug, Clone, PartialEq)]
pub enum Emitted {
    One(Fragment),
    Many(Vec<Fragment>),
}

impl IntoIterator for Emitted {
    type Item = Fragment;
    type IntoIter = std::vec::IntoIter<Fragment>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            Emitted::One(fragment) => vec![fragment].into_iter(),
            Emitted::Many(fragments) => fragments.into_iter(),
        }
    }
}

/// Run the handler of a terminating datatype. `None` for datatypes that need
/// the dispatcher (extensions and continuation handlers).
///
/// Child rows whose path is hidden are skipped by the handlers themselves;
/// the node's own path has already been checked by the caller.
pub fn render_terminating(
    datatype: Datatype,
    ctx: &HandlerContext<'_>,
    node: &Map<String, Value>,
) -> Option<Result<Vec<Fragment>, RenderError>> {
    let rendered = match datatype {
        Datatype::DateCriterion => Ok(clinical::handle_date_criterion(ctx, node)),
        Datatype::CodeableConcept => concept::handle(ctx, node),
        Datatype::Component => Ok(clinical::handle_component(ctx, node)),
        Datatype::Dosage => Ok(clinical::handle_dosage(ctx, node)),
        Datatype::Collection => Ok(clinical::handle_collection(ctx, node)),
        Datatype::TimingRepeat => Ok(clinical::handle_timing_repeat(ctx, node)),
        Datatype::Reference => general::handle_reference(ctx, node),
        Datatype::Range => Ok(general::handle_range(ctx, node)),
        Datatype::Identifier => Ok(general::handle_identifier(ctx, node)),
        Datatype::Period => Ok(general::handle_period(ctx, node)),
        Datatype::Quantity => Ok(general::handle_quantity(ctx, node)),
        Datatype::Attachment => Ok(general::handle_attachment(ctx, node)),
        Datatype::Extension
        | Datatype::HumanName
        | Datatype::ContactPoint
        | Datatype::Address
        | Datatype::Activity
        | Datatype::Communication
        | Datatype::ReferenceRange => return None,
    };
    Some(rendered)
}

pub(crate) fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Display text of a scalar. Objects and arrays have none.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Text for a coding: terminology display, else inline display, else code.
pub(crate) fn coding_text(coding: &Value, terminology: &dyn Terminology) -> Option<String> {
    let system = coding.get("system").and_then(Value::as_str);
    let code = coding.get("code").and_then(Value::as_str);
    if let (Some(system), Some(code)) = (system, code) {
        if let Some(display) = terminology.display(system, code) {
            return Some(display);
        }
    }
    non_empty_str(coding.get("display")).or_else(|| non_empty_str(coding.get("code")))
}

/// Text for a concept: `text`, else the distinct coding texts.
pub(crate) fn concept_text(concept: &Value, terminology: &dyn Terminology) -> Option<String> {
    if let Some(text) = non_empty_str(concept.get("text")) {
        return Some(text);
    }
    let codings = concept.get("coding")?.as_array()?;
    let mut parts: Vec<String> = Vec::new();
    for text in codings
        .iter()
        .filter_map(|coding| coding_text(coding, terminology))
    {
        if !parts.contains(&text) {
            parts.push(text);
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

pub(crate) fn format_numeric(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

/// `< 5 mg`, `72 /min`, `3`.
pub(crate) fn quantity_text(quantity: &Value) -> Option<String> {
    let magnitude = match quantity.get("value")? {
        Value::Number(number) => number
            .as_f64()
            .map(format_numeric)
            .unwrap_or_else(|| number.to_string()),
        Value::String(text) => text.clone(),
        _ => return None,
    };
    let unit = non_empty_str(quantity.get("unit")).or_else(|| non_empty_str(quantity.get("code")));
    let mut text = String::new();
    if let Some(comparator) = non_empty_str(quantity.get("comparator")) {
        text.push_str(&comparator);
        text.push(' ');
    }
    text.push_str(&magnitude);
    if let Some(unit) = unit {
        text.push(' ');
        text.push_str(&unit);
    }
    Some(text)
}

/// `1 - 5 mmol/L`, `>= 1 mmol/L`, `<= 5 mmol/L`.
pub(crate) fn range_text(range: &Value) -> Option<String> {
    let low = range.get("low").and_then(quantity_text);
    let high = range.get("high").and_then(quantity_text);
    match (low, high) {
        (Some(low), Some(high)) => {
            let low_unit = range.get("low").and_then(|q| non_empty_str(q.get("unit")));
            let high_unit = range.get("high").and_then(|q| non_empty_str(q.get("unit")));
            if low_unit.is_some() && low_unit == high_unit {
                let bare_low = range
                    .get("low")
                    .and_then(|q| q.get("value"))
                    .and_then(Value::as_f64)
                    .map(format_numeric);
                if let Some(bare_low) = bare_low {
                    return Some(format!("{bare_low} - {high}"));
                }
            }
            Some(format!("{low} - {high}"))
        }
        (Some(low), None) => Some(format!(">= {low}")),
        (None, Some(high)) => Some(format!("<= {high}")),
        (None, None) => None,
    }
}

/// `2020-01-01 - 2020-02-01`; an open end renders as `...`.
pub(crate) fn period_text(ctx: &HandlerContext<'_>, period: &Value) -> Option<String> {
    let start = period.get("start").and_then(Value::as_str).map(|d| ctx.date(d));
    let end = period.get("end").and_then(Value::as_str).map(|d| ctx.date(d));
    match (start, end) {
        (None, None) => None,
        (start, end) => Some(format!(
            "{} - {}",
            start.unwrap_or_else(|| "...".to_string()),
            end.unwrap_or_else(|| "...".to_string())
        )),
    }
}

pub(crate) fn ratio_text(ratio: &Value) -> Option<String> {
    let numerator = ratio.get("numerator").and_then(quantity_text)?;
    match ratio.get("denominator").and_then(quantity_text) {
        Some(denominator) => Some(format!("{numerator} / {denominator}")),
        None => Some(numerator),
    }
}

/// Reference display: `display`, else the reference string, else the
/// identifier value.
pub(crate) fn reference_text(reference: &Value) -> Option<String> {
    non_empty_str(reference.get("display"))
        .or_else(|| non_empty_str(reference.get("reference")))
        .or_else(|| {
            reference
                .get("identifier")
                .and_then(|identifier| non_empty_str(identifier.get("value")))
        })
}

/// Text for a polymorphic `value[x]` field found on `node`.
pub(crate) fn choice_text(
    ctx: &HandlerContext<'_>,
    node: &Map<String, Value>,
    prefix: &str,
) -> Option<String> {
    let (key, value) = node
        .iter()
        .find(|(key, _)| key.starts_with(prefix) && key.len() > prefix.len())?;
    let kind = &key[prefix.len()..];
    match kind {
        "Quantity" | "Age" | "Duration" | "Distance" | "Count" | "SimpleQuantity" => {
            quantity_text(value)
        }
        "CodeableConcept" => ctx.concept(value),
        "Coding" => coding_text(value, ctx.terminology()),
        "Range" => range_text(value),
        "Ratio" => ratio_text(value),
        "Period" => period_text(ctx, value),
        "Reference" => reference_text(value),
        "Boolean" => value.as_bool().map(|flag| yes_no(flag).to_string()),
        "Date" | "DateTime" | "Instant" => value.as_str().map(|raw| ctx.date(raw)),
        _ => scalar_text(value),
    }
}
