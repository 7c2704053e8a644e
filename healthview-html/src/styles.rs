/// Marker attribute carried by the injected `<style>` tag.
pub const STYLE_TAG_ATTRIBUTE: &str = "data-healthview-ui";

/// Default CSS for rendered resources along with easy-to-override design tokens.
pub const DEFAULT_STYLES: &str = r#"
:root {
  --healthview-font-family: 'Inter', system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
  --healthview-bg: #ffffff;
  --healthview-card-bg: #ffffff;
  --healthview-card-border: rgba(148, 163, 184, 0.28);
  --healthview-radius: 16px;
  --healthview-text: #1f2933;
  --healthview-muted: #52606d;
  --healthview-heading: #11181c;
  --healthview-surface: #f8fafc;
  --healthview-link: #2563eb;
  --healthview-section-accent: rgba(71, 84, 103, 0.18);
  --healthview-failure-text: #b42318;
  --healthview-failure-bg: rgba(180, 35, 24, 0.1);
}

.healthview-root {
  font-family: var(--healthview-font-family);
  background: var(--healthview-bg);
  color: var(--healthview-text);
  display: flex;
  flex-direction: column;
  gap: 24px;
  padding: 28px;
}

.healthview-header h1 {
  margin: 0;
  color: var(--healthview-heading);
  font-size: 1.6rem;
}

.healthview-header p {
  margin: 4px 0 0;
  color: var(--healthview-muted);
  font-size: 0.85rem;
}

.healthview-resource {
  background: var(--healthview-card-bg);
  border: 1px solid var(--healthview-card-border);
  border-radius: var(--healthview-radius);
  padding: 18px 22px;
  box-shadow: 0 12px 24px rgba(15, 23, 42, 0.06);
}

.healthview-resource h2 {
  margin: 0 0 12px;
  font-size: 1.15rem;
  color: var(--healthview-heading);
}

.healthview-resource h2 small {
  color: var(--healthview-muted);
  font-weight: 400;
  margin-left: 8px;
}

.healthview-table {
  width: 100%;
  border-collapse: collapse;
}

.healthview-table td {
  padding: 6px 8px;
  vertical-align: top;
}

.healthview-table td.label {
  width: 35%;
  color: var(--healthview-muted);
}

.healthview-table td.value a {
  color: var(--healthview-link);
  text-decoration: none;
}

.healthview-table tr.subhead th {
  text-align: left;
  padding: 14px 8px 6px;
  color: var(--healthview-heading);
  border-bottom: 1px solid var(--healthview-section-accent);
}

.healthview-table tr.subfoot td {
  padding: 0 0 10px;
}

.healthview-table tr.divider hr {
  border: none;
  border-top: 1px dashed var(--healthview-section-accent);
  margin: 4px 0;
}

.healthview-failures {
  background: var(--healthview-failure-bg);
  color: var(--healthview-failure-text);
  border-radius: calc(var(--healthview-radius) - 6px);
  padding: 12px 18px;
}

.healthview-failures ul {
  margin: 6px 0 0;
  padding-left: 18px;
}

@media (max-width: 640px) {
  .healthview-root {
    padding: 18px;
  }

  .healthview-table td.label {
    width: auto;
  }
}
"#;

/// The default stylesheet wrapped in a marked `<style>` tag.
pub fn style_tag() -> String {
    format!("<style {STYLE_TAG_ATTRIBUTE}=\"v1\">{DEFAULT_STYLES}</style>")
}
