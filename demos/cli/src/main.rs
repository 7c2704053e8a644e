use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use healthview_core::{LabelTable, ProfileIndex, RenderConfig, TerminologyTable};
use healthview_fhir::{render_bundle_str, Services};
use healthview_html::{render_document, DocumentOptions};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    /// Standalone HTML document.
    Html,
    /// Rendered resources as JSON.
    Json,
    /// One line per resource.
    Summary,
}

#[derive(Parser, Debug)]
#[command(
    name = "healthview-cli",
    about = "Render FHIR resources and bundles as readable label/value tables."
)]
struct Args {
    /// Path to a FHIR resource or Bundle JSON file.
    #[arg(short, long)]
    input: PathBuf,

    /// Label table JSON (`{"labels": {...}, "generic": {...}}`).
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Terminology JSON array of `{system, code, description}`.
    #[arg(long)]
    terminology: Option<PathBuf>,

    /// Profile index JSON array of `{profile, path, target, base_path}`.
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// Render configuration JSON; absent fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Summary)]
    format: Format,

    /// Document title for HTML output.
    #[arg(long, default_value = "Health data")]
    title: String,

    /// Write to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Could not read file {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging();

    let labels = match &args.labels {
        Some(path) => LabelTable::from_json_str(&read_file(path)?)
            .with_context(|| format!("Invalid label table {}", path.display()))?,
        None => LabelTable::new(),
    };
    let terminology = match &args.terminology {
        Some(path) => TerminologyTable::from_json_str(&read_file(path)?)
            .with_context(|| format!("Invalid terminology {}", path.display()))?,
        None => TerminologyTable::new(),
    };
    let profiles = match &args.profiles {
        Some(path) => ProfileIndex::from_json_str(&read_file(path)?)
            .with_context(|| format!("Invalid profile index {}", path.display()))?,
        None => ProfileIndex::new(),
    };
    let config = match &args.config {
        Some(path) => RenderConfig::from_json_str(&read_file(path)?)
            .with_context(|| format!("Invalid configuration {}", path.display()))?,
        None => RenderConfig::default(),
    };
    tracing::debug!(
        labels = labels.len(),
        codes = terminology.len(),
        profiles = profiles.len(),
        "lookups loaded"
    );

    let data = read_file(&args.input)?;
    let services = Services::new(&labels, &terminology, &profiles, &config);
    let rendered = render_bundle_str(&data, services)
        .with_context(|| format!("Could not render {}", args.input.display()))?;
    tracing::info!(
        resources = rendered.resources.len(),
        failures = rendered.failures.len(),
        "input rendered"
    );

    let output = match args.format {
        Format::Html => {
            let options = DocumentOptions {
                title: args.title.clone(),
                ..DocumentOptions::default()
            };
            render_document(&rendered, &options)
        }
        Format::Json => serde_json::to_string_pretty(&rendered)?,
        Format::Summary => {
            let mut lines = vec![
                format!("Generated at: {}", rendered.generated_at),
                format!("Resources: {}", rendered.resources.len()),
                format!("Failures: {}", rendered.failures.len()),
            ];
            for resource in &rendered.resources {
                lines.push(format!(
                    "{}/{}: {} rows{}",
                    resource.resource_type,
                    resource.id.as_deref().unwrap_or("-"),
                    resource.rows.len(),
                    resource
                        .title
                        .as_deref()
                        .map(|title| format!(" ({title})"))
                        .unwrap_or_default()
                ));
            }
            for failure in &rendered.failures {
                lines.push(format!(
                    "failed {}/{}: {}",
                    failure.resource_type.as_deref().unwrap_or("-"),
                    failure.id.as_deref().unwrap_or("-"),
                    failure.message
                ));
            }
            lines.join("\n")
        }
    };

    match &args.output {
        Some(path) => fs::write(path, output)
            .with_context(|| format!("Could not write file {}", path.display()))?,
        None => println!("{output}"),
    }
    Ok(())
}
