//! Schema Model CLI
//!
//! Command-line interface for inlining, flattening and resolving resource schemas.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use schema_model::{
    base_uri_for, flatten, flattened_to_value, load_models, load_schema_auto, prepare,
    DocumentFetcher, GeneratorRegistry, PipelineOptions, SchemaError, DEFAULT_ROOT_CLASS_NAME,
};

#[derive(Parser)]
#[command(name = "schema-model")]
#[command(about = "Flatten resource schemas and resolve them into class models")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Schema source: file path or URL (http:// or https://)
    schema: String,

    /// Base URI for relative $refs (default: location of the schema)
    #[arg(long)]
    base_uri: Option<String>,

    /// Leave remote $refs alone instead of inlining them
    #[arg(long)]
    no_inline: bool,

    /// Output file (stdout if not specified)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the flattened schema map, keyed by pointer
    Flatten {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Print the schema with all remote references inlined
    Inline {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Print the resolved class models
    Models {
        #[command(flatten)]
        input: InputArgs,

        /// Output format: json (default) or text
        #[arg(long, default_value = "json")]
        format: String,

        /// Class name of the root schema
        #[arg(long, default_value = DEFAULT_ROOT_CLASS_NAME)]
        root_name: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Flatten { input } => run_flatten(&input),
        Commands::Inline { input } => run_inline(&input),
        Commands::Models {
            input,
            format,
            root_name,
        } => run_models(&input, &format, root_name),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn report(err: impl Into<SchemaError>) -> u8 {
    let err = err.into();
    eprintln!("Error: {}", err);
    err.exit_code() as u8
}

/// Load the schema and build pipeline options from the common arguments.
fn load_input(input: &InputArgs) -> Result<(Value, PipelineOptions), u8> {
    let document = load_schema_auto(&input.schema).map_err(report)?;

    let base_uri = match &input.base_uri {
        Some(base_uri) => base_uri.clone(),
        None => base_uri_for(&input.schema).map_err(report)?.to_string(),
    };
    debug!(%base_uri, schema = %input.schema, "loaded schema");

    let options = PipelineOptions::new(base_uri).inline_remote(!input.no_inline);
    Ok((document, options))
}

fn run_flatten(input: &InputArgs) -> Result<(), u8> {
    let (document, options) = load_input(input)?;
    let mut fetcher = DocumentFetcher::new();

    let document = prepare(document, &mut fetcher, &options).map_err(report)?;
    let flattened = flatten(&document).map_err(report)?;
    debug!(fetched = fetcher.fetched().len(), entries = flattened.len(), "flattened");

    write_json(&flattened_to_value(&flattened), input)
}

fn run_inline(input: &InputArgs) -> Result<(), u8> {
    let (document, options) = load_input(input)?;
    let mut fetcher = DocumentFetcher::new();

    let document = prepare(document, &mut fetcher, &options).map_err(report)?;
    debug!(fetched = fetcher.fetched().len(), "inlined");

    write_json(&document, input)
}

fn run_models(input: &InputArgs, format: &str, root_name: String) -> Result<(), u8> {
    let registry = GeneratorRegistry::with_builtins(input.pretty);
    let generator = registry.get(format).ok_or_else(|| {
        eprintln!(
            "Error: unknown format '{}' (expected one of: {})",
            format,
            registry.names().join(", ")
        );
        2u8
    })?;

    let (document, options) = load_input(input)?;
    let options = options.root_class_name(root_name);
    let mut fetcher = DocumentFetcher::new();

    let resolved = load_models(document, &mut fetcher, &options).map_err(report)?;
    debug!(
        fetched = fetcher.fetched().len(),
        classes = resolved.models.len(),
        "resolved models"
    );

    let mut rendered = Vec::new();
    generator
        .generate(&resolved.models, &mut rendered)
        .map_err(|e| {
            eprintln!("Error rendering models: {}", e);
            2u8
        })?;
    let rendered = String::from_utf8(rendered).map_err(|e| {
        eprintln!("Error rendering models: {}", e);
        2u8
    })?;

    write_output(&rendered, input.output.as_deref())
}

fn write_json(value: &Value, input: &InputArgs) -> Result<(), u8> {
    let json_output = if input.pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    write_output(&format!("{}\n", json_output), input.output.as_deref())
}

fn write_output(content: &str, output: Option<&Path>) -> Result<(), u8> {
    match output {
        Some(path) => {
            std::fs::write(path, content).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            print!("{}", content);
        }
    }

    Ok(())
}
