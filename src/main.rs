//! Command-line front-end.
//!
//! Thin wrapper over the library: reads input from a file or stdin, runs one
//! operation and prints the result to stdout. JSON output is pretty-printed.
//!
//! # Commands
//!
//! - `encode [FILE]`: filter JSON → TraceQL
//! - `decode <QUERY>`: TraceQL → filter JSON
//! - `check <QUERY>`: whether the filter toolbar can represent a query
//! - `scope <QUERY> --field <FIELD>`: query for the candidate values of a field
//! - `split <INPUT>`: split custom matcher input on unquoted spaces
//! - `transform [FILE]`: OTLP/JSON trace → compact JSON
//! - `summarize [FILE]`: OTLP/JSON trace → AI assistant request
//! - `links --url <URL> [--trace FILE]`: detail-page and attribute link templates
//!
//! `FILE` defaults to `-` (stdin).

#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use tracelens::assist::{trace_name, SummaryRequest};
use tracelens::links::{link_to_span, link_to_trace, AttributeLink, SPAN_ATTRIBUTE_LINKS};
use tracelens::observability::init_tracing;
use tracelens::otlp::TracesData;
use tracelens::transform::{transform, Attributes};
use tracelens::{split_by_unquoted_whitespace, traceql, Config, Filter, FilterField, Result, TracelensError};

#[derive(Parser)]
#[command(name = "tracelens", version)]
#[command(about = "TraceQL filter codec and OTLP trace transformer", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "TRACELENS_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter directive (overridden by RUST_LOG)
    #[arg(long, env = "TRACELENS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Export the tool's own spans as OTLP/JSON lines to this file
    #[arg(long, env = "TRACELENS_TRACE_FILE")]
    trace_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a filter (JSON) as a TraceQL query
    Encode {
        /// Filter JSON file, `-` for stdin
        #[arg(default_value = "-")]
        file: String,
    },

    /// Decode a TraceQL query into a filter (JSON)
    Decode {
        /// TraceQL query, `-` for stdin
        query: String,
    },

    /// Check whether a query can be edited with the filter toolbar
    Check {
        /// TraceQL query, `-` for stdin
        query: String,
    },

    /// Print the query used to look up candidate values of one filter field
    Scope {
        /// TraceQL query, `-` for stdin
        query: String,

        /// Field whose own constraint is left out
        #[arg(long, value_enum)]
        field: Field,
    },

    /// Split custom matcher input on spaces outside double quotes
    Split {
        /// Matcher input, `-` for stdin
        input: String,
    },

    /// Convert an OTLP/JSON trace into its compact form
    Transform {
        /// OTLP/JSON trace file, `-` for stdin
        #[arg(default_value = "-")]
        file: String,
    },

    /// Build an AI assistant request summarizing a trace
    Summarize {
        /// OTLP/JSON trace file, `-` for stdin
        #[arg(default_value = "-")]
        file: String,
    },

    /// Print link templates for the trace detail page
    Links {
        /// URL of the current page; its query parameters are carried over
        #[arg(long, default_value = "/observe/traces")]
        url: String,

        /// Resolve attribute links for every span of this OTLP/JSON trace
        #[arg(long)]
        trace: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Field {
    ServiceName,
    SpanName,
    Namespace,
    Status,
    SpanDuration,
    TraceDuration,
}

impl From<Field> for FilterField {
    fn from(field: Field) -> Self {
        match field {
            Field::ServiceName => Self::ServiceName,
            Field::SpanName => Self::SpanName,
            Field::Namespace => Self::Namespace,
            Field::Status => Self::Status,
            Field::SpanDuration => Self::SpanDuration,
            Field::TraceDuration => Self::TraceDuration,
        }
    }
}

#[derive(Serialize)]
struct LinkTemplates {
    trace: String,
    span: String,
    attributes: &'static [AttributeLink],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    resolved: Vec<ResolvedLink>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedLink {
    span_id: String,
    attribute: &'static str,
    link: String,
}

/// Reads `source` from stdin when it is `-`, from the file otherwise.
fn read_file(source: &str) -> Result<String> {
    if source == "-" {
        let mut contents = String::new();
        std::io::stdin().read_to_string(&mut contents)?;
        return Ok(contents);
    }
    Ok(std::fs::read_to_string(source)?)
}

/// Reads an inline argument, or stdin when it is `-`.
fn read_inline(value: &str) -> Result<String> {
    if value == "-" {
        return Ok(read_file(value)?.trim_end_matches(['\r', '\n']).to_string());
    }
    Ok(value.to_string())
}

fn read_trace(source: &str) -> Result<TracesData> {
    Ok(serde_json::from_str(&read_file(source)?)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn resolve_attribute_links(trace: &TracesData) -> Vec<ResolvedLink> {
    let mut resolved = Vec::new();
    for resource_spans in &trace.resource_spans {
        let resource: Attributes = resource_spans
            .resource
            .iter()
            .filter_map(|r| r.attributes.as_ref())
            .flatten()
            .collect();

        for span in resource_spans.scope_spans.iter().flat_map(|s| &s.spans) {
            let attributes: Attributes = span.attributes.iter().flatten().collect();
            for link in &SPAN_ATTRIBUTE_LINKS {
                if let Some(url) = link.resolve(&[&attributes, &resource]) {
                    resolved.push(ResolvedLink {
                        span_id: span.span_id.clone(),
                        attribute: link.name,
                        link: url,
                    });
                }
            }
        }
    }
    resolved
}

fn run(command: Commands, config: &Config) -> Result<ExitCode> {
    match command {
        Commands::Encode { file } => {
            let filter: Filter = serde_json::from_str(&read_file(&file)?)?;
            println!("{}", traceql::encode(&filter));
        }
        Commands::Decode { query } => {
            let query = read_inline(&query)?;
            print_json(&traceql::decode(&query)?)?;
        }
        Commands::Check { query } => {
            let query = read_inline(&query)?;
            let simple = traceql::is_simple_query(&query);
            tracing::debug!(simple, "checked query");
            println!("{simple}");
            if !simple {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Scope { query, field } => {
            let filter = traceql::decode(&read_inline(&query)?)?;
            println!("{}", traceql::scope_query(&filter, field.into()));
        }
        Commands::Split { input } => {
            print_json(&split_by_unquoted_whitespace(&read_inline(&input)?))?;
        }
        Commands::Transform { file } => {
            let trace = read_trace(&file)?;
            let Some(transformed) = transform(&trace) else {
                eprintln!("tracelens: trace has no spans");
                return Ok(ExitCode::FAILURE);
            };
            tracing::debug!(
                name = %trace_name(&trace, &transformed.trace_id),
                resource_spans = transformed.resource_spans.len(),
                "transformed trace"
            );
            print_json(&transformed)?;
        }
        Commands::Summarize { file } => {
            let trace = read_trace(&file)?;
            let Some(request) = SummaryRequest::for_trace(&trace, &config.assist)? else {
                eprintln!("tracelens: trace has no spans");
                return Ok(ExitCode::FAILURE);
            };
            print_json(&request)?;
        }
        Commands::Links { url, trace } => {
            let resolved = match trace {
                Some(source) => resolve_attribute_links(&read_trace(&source)?),
                None => Vec::new(),
            };
            print_json(&LinkTemplates {
                trace: link_to_trace(&url, &config.links)?,
                span: link_to_span(&url, &config.links)?,
                attributes: &SPAN_ATTRIBUTE_LINKS,
                resolved,
            })?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if cli.log_level.is_some() {
        config.log_level.clone_from(&cli.log_level);
    }
    if cli.trace_file.is_some() {
        config.trace_file.clone_from(&cli.trace_file);
    }
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tracelens: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = match init_tracing(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("tracelens: failed to initialize tracing: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = {
        let _span = tracing::info_span!("tracelens").entered();
        run(cli.command, &config)
    };

    match result {
        Ok(code) => code,
        Err(e @ TracelensError::Query { .. }) => {
            eprintln!("tracelens: {e}");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("tracelens: {e}");
            ExitCode::FAILURE
        }
    }
}
