//! Schema Validator CLI
//!
//! Validates JSON documents against a JSON Schema, or runs the bundled
//! retailer demonstration.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use schema_conform::demo::{DemoDocument, Revision};
use schema_conform::{OutputFormat, Outcome, SchemaNode, Validator, ValidatorConfig};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "schema-validator")]
#[command(about = "Validate JSON documents against a JSON Schema")]
#[command(version)]
struct Cli {
    /// Config file (layered over schema-conform.toml and SCHEMA_CONFORM__* env)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Report format (overrides config)
    #[arg(long, global = true, value_enum)]
    format: Option<FormatArg>,

    /// Exit with status 1 when any document has violations
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files (or directories of *.json files) against a schema
    Check {
        /// Schema document
        #[arg(short, long)]
        schema: PathBuf,
        /// Validate against this definition instead of the schema root
        #[arg(short, long)]
        definition: Option<String>,
        /// Data files or directories
        #[arg(required = true)]
        data: Vec<PathBuf>,
    },

    /// Validate the bundled retailer sample against its schema
    Demo {
        /// Schema revision (v1 or v2)
        #[arg(short, long, default_value = "v2")]
        revision: Revision,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config_path = cli.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let mut config = ValidatorConfig::load_from(config_path.as_deref()).context("loading configuration")?;
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }
    if cli.strict {
        config.output.strict = true;
    }
    let options = config.validation.to_options();

    let outcomes = match cli.command {
        Commands::Check { schema, definition, data } => {
            let validator = SchemaNode::from_file(&schema)
                .and_then(|node| Validator::from_node(node, options))
                .with_context(|| format!("compiling schema {}", schema.display()))?;

            let mut outcomes = Vec::new();
            for path in collect_data_files(&data)? {
                let document = read_json(&path)?;
                let violations = match &definition {
                    Some(name) => validator.validate_definition(name, &document)?,
                    None => validator.validate(&document),
                };
                outcomes.push(Outcome::new(path.display().to_string(), violations));
            }
            outcomes
        }

        Commands::Demo { revision } => {
            let doc = DemoDocument::load(revision)?;
            let violations = doc.run(options)?;
            vec![Outcome::new(format!("demo {}", revision), violations)]
        }
    };

    match config.output.format {
        OutputFormat::Text => {
            for outcome in &outcomes {
                println!("{}", outcome.render_text(&config.output.valid_message));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
        }
    }

    let failed = outcomes.iter().filter(|o| !o.valid).count();
    tracing::info!(documents = outcomes.len(), failed, "validation finished");

    if failed > 0 && config.output.strict {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing JSON in {}", path.display()))
}

/// Expand directories into their `*.json` files, sorted for stable output
fn collect_data_files(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else if input.exists() {
            files.push(input.clone());
        } else {
            anyhow::bail!("no such file or directory: {}", input.display());
        }
    }
    Ok(files)
}
