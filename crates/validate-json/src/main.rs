mod file_source;

use anyhow::{Context, Result};
use clap::Parser;
use jschema_validation::{
    Catalog, CatalogOptions, CompiledSchema, EvaluationOptions, JsonValue, OutputFormat, Url,
    format,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use file_source::directory_source;

/// Validate a JSON document against a JSON Schema
#[derive(Parser, Debug)]
#[command(name = "validate-json")]
#[command(about = "Validate JSON documents against JSON Schema", long_about = None)]
struct Args {
    /// Path to the schema document
    #[arg(long, value_name = "FILE")]
    schema: PathBuf,

    /// Path to the instance document to validate
    #[arg(long, value_name = "FILE")]
    instance: PathBuf,

    /// Output format: flag, basic, detailed or verbose
    #[arg(long, value_name = "MODE")]
    output: Option<String>,

    /// Directory serving referenced schemas under --base-uri
    #[arg(long, value_name = "DIR", requires = "base_uri")]
    schema_dir: Option<PathBuf>,

    /// URI prefix mapped to --schema-dir (must end with '/')
    #[arg(long, value_name = "URI", requires = "schema_dir")]
    base_uri: Option<String>,

    /// Assert `format` regardless of dialect
    #[arg(long)]
    assert_formats: bool,

    /// Stop evaluating once the verdict is known
    #[arg(long)]
    short_circuit: bool,

    /// JSON file with catalog and evaluation options
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,
}

/// Contents of an `--options` file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
struct OptionsFile {
    catalog: CatalogOptions,
    evaluation: EvaluationOptions,
    output: Option<String>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "validate_json=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}

/// Returns the verdict.
fn run() -> Result<bool> {
    let args = Args::parse();

    let options = match &args.options {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read options file: {}", path.display()))?;
            serde_json::from_str::<OptionsFile>(&text)
                .with_context(|| format!("Failed to parse options file: {}", path.display()))?
        }
        None => OptionsFile::default(),
    };

    let mode = args
        .output
        .as_deref()
        .or(options.output.as_deref())
        .unwrap_or("basic");
    let mode: OutputFormat = mode.parse()?;

    let mut evaluation = options.evaluation;
    evaluation.assert_formats |= args.assert_formats;
    evaluation.short_circuit |= args.short_circuit;

    let catalog = Catalog::with_options(options.catalog);
    let base_uri = match (&args.schema_dir, &args.base_uri) {
        (Some(dir), Some(base)) => {
            let url = Url::parse(base).with_context(|| format!("Invalid base URI: {}", base))?;
            catalog
                .add_source(url.as_str(), directory_source(dir.clone(), url.clone()))
                .with_context(|| format!("Invalid base URI: {}", base))?;
            Some(url)
        }
        _ => None,
    };

    let schema_doc = read_json(&args.schema, "schema")?;
    let schema = load_schema(&catalog, &args.schema, schema_doc, base_uri.as_ref())?;
    tracing::debug!(schema = schema.uri(), "compiled schema");

    let instance = read_json(&args.instance, "instance")?;
    let result = schema
        .evaluate_with(&instance, &evaluation)
        .context("Evaluation failed")?;
    tracing::info!(
        instance = %args.instance.display(),
        valid = result.valid,
        "evaluated instance"
    );

    let output = format(&result, mode);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(result.valid)
}

fn read_json(path: &Path, what: &str) -> Result<JsonValue> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} file: {}", what, path.display()))?;
    JsonValue::parse(&text)
        .with_context(|| format!("Failed to parse {} file: {}", what, path.display()))
}

/// A schema without `$id` is registered under the base URI when one is
/// given, so its relative references reach the schema directory.
fn load_schema(
    catalog: &Catalog,
    path: &Path,
    document: JsonValue,
    base_uri: Option<&Url>,
) -> Result<CompiledSchema> {
    let has_id = document.get("$id").is_some();
    let file_name = path.file_name().and_then(|name| name.to_str());
    match (base_uri, file_name) {
        (Some(base), Some(file_name)) if !has_id => {
            let uri = base
                .join(file_name)
                .with_context(|| format!("Invalid schema file name: {}", file_name))?;
            catalog
                .add_schema(uri.as_str(), document)
                .with_context(|| format!("Failed to compile schema: {}", path.display()))?;
            catalog
                .get_schema(uri.as_str())
                .with_context(|| format!("Failed to load schema: {}", path.display()))
        }
        _ => catalog
            .compile(document)
            .with_context(|| format!("Failed to compile schema: {}", path.display())),
    }
}
