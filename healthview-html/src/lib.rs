//! HTML rendering of flattened resources.
//!
//! Labels and values are escaped here; `Raw` narrative fragments are trusted
//! and copied through.

use std::fmt::Write as _;

use healthview_core::{FlattenedResource, Fragment, RenderFailure, RenderedBundle, RowData};
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Serialize};

pub mod styles;

pub use styles::{style_tag, DEFAULT_STYLES};

/// Options for a full document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentOptions {
    pub title: String,
    pub include_styles: bool,
    pub show_generated_at: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            title: "Health data".to_string(),
            include_styles: true,
            show_generated_at: true,
        }
    }
}

/// Append the table row(s) for one fragment.
pub fn render_fragment(fragment: &Fragment, out: &mut String) {
    match fragment {
        Fragment::Row(row) => render_row(row, out),
        Fragment::SubHead(label) => {
            let _ = write!(
                out,
                "<tr class=\"subhead\"><th colspan=\"2\">{}</th></tr>",
                encode_text(label)
            );
        }
        Fragment::EndSubHead => out.push_str("<tr class=\"subfoot\"><td colspan=\"2\"></td></tr>"),
        Fragment::Divider => out.push_str("<tr class=\"divider\"><td colspan=\"2\"><hr></td></tr>"),
        Fragment::Raw(markup) => out.push_str(markup),
    }
}

fn render_row(row: &RowData, out: &mut String) {
    let _ = write!(out, "<tr><td class=\"label\">{}</td><td class=\"value\">", encode_text(&row.label));
    match &row.link {
        Some(link) => {
            let _ = write!(
                out,
                "<a href=\"{}\">{}</a>",
                encode_double_quoted_attribute(link),
                encode_text(&row.value)
            );
        }
        None => out.push_str(&encode_text(&row.value)),
    }
    out.push_str("</td></tr>");
}

/// Table body rows for a fragment list, in order.
pub fn render_rows(fragments: &[Fragment]) -> String {
    let mut out = String::new();
    for fragment in fragments {
        render_fragment(fragment, &mut out);
    }
    out
}

/// One resource as a titled table.
pub fn render_resource(resource: &FlattenedResource) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<section class=\"healthview-resource\" data-resource-type=\"{}\"",
        encode_double_quoted_attribute(&resource.resource_type)
    );
    if let Some(id) = &resource.id {
        let _ = write!(out, " data-resource-id=\"{}\"", encode_double_quoted_attribute(id));
    }
    out.push('>');

    let heading = resource.title.as_deref().unwrap_or(&resource.resource_type);
    let _ = write!(out, "<h2>{}", encode_text(heading));
    if resource.title.is_some() {
        let _ = write!(out, "<small>{}</small>", encode_text(&resource.resource_type));
    }
    out.push_str("</h2>");

    let _ = write!(
        out,
        "<table class=\"healthview-table\"><tbody>{}</tbody></table></section>",
        render_rows(&resource.rows)
    );
    out
}

fn render_failures(failures: &[RenderFailure], out: &mut String) {
    if failures.is_empty() {
        return;
    }
    out.push_str("<div class=\"healthview-failures\"><strong>Some records could not be displayed</strong><ul>");
    for failure in failures {
        let kind = failure.resource_type.as_deref().unwrap_or("Unknown resource");
        let _ = write!(out, "<li>{}", encode_text(kind));
        if let Some(id) = &failure.id {
            let _ = write!(out, " {}", encode_text(id));
        }
        let _ = write!(out, ": {}</li>", encode_text(&failure.message));
    }
    out.push_str("</ul></div>");
}

/// A standalone HTML document for a rendered bundle.
pub fn render_document(bundle: &RenderedBundle, options: &DocumentOptions) -> String {
    let title = encode_text(&options.title);
    let mut out = String::from("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    let _ = write!(out, "<title>{title}</title>");
    if options.include_styles {
        out.push_str(&style_tag());
    }
    out.push_str("</head><body><main class=\"healthview-root\">");

    let _ = write!(out, "<header class=\"healthview-header\"><h1>{title}</h1>");
    if options.show_generated_at {
        let _ = write!(
            out,
            "<p>Generated {}</p>",
            bundle.generated_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    out.push_str("</header>");

    render_failures(&bundle.failures, &mut out);
    for resource in &bundle.resources {
        out.push_str(&render_resource(resource));
    }
    out.push_str("</main></body></html>");
    out
}
