//! Tracelens: TraceQL filter codec and OTLP trace transformer.
//!
//! Tracelens holds the query and trace plumbing behind a distributed-tracing
//! console:
//! - Two-way conversion between a structured search filter and TraceQL
//! - Detection of queries the structured filter can represent without loss
//! - Compaction of OTLP/JSON traces into a form suited for AI summarization
//! - Trace naming, assistant attachments and detail-page link templates
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Command-line front-end (main.rs)                   │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!         │                    │                    │
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ traceql/      │   │ transform/    │   │ assist/       │
//! │ - Lexer       │   │ - Attributes  │   │ - Trace name  │
//! │ - Parser      │   │ - Durations   │   │ - Attachments │
//! │ - Encode      │   │ - Output tree │   │               │
//! │ - Decode      │   │               │   │ links         │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!         │                    │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain & wire model                                │
//! │  - Filter model (domain/filter)                     │
//! │  - Error types (domain/error)                       │
//! │  - OTLP/JSON trace model (otlp)                     │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Observability (observability/)                     │  ← Optional
//! │  - stderr logging                                   │
//! │  - File-based OTLP export of the tool's own spans   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`domain`]: Filter model and error types
//! - [`traceql`]: Filter ⇄ TraceQL conversion
//! - [`otlp`]: OTLP/JSON trace model
//! - [`transform`]: OTLP trace compaction
//! - [`assist`]: Trace names and AI assistant attachments
//! - [`links`]: Detail-page and attribute link templates
//! - [`observability`]: Logging and OpenTelemetry self-tracing
//!
//! # Configuration
//!
//! The command-line tool reads an optional TOML file:
//!
//! ```toml
//! log_level = "debug"
//! trace_file = "/tmp/tracelens-otlp.jsonl"
//!
//! [assist]
//! max_attachment_bytes = 1048576
//!
//! [links]
//! base_path = "/observe/traces"
//! ```
//!
//! # Examples
//!
//! ## Filter round trip
//!
//! ```rust
//! use tracelens::{traceql, DurationField, Filter};
//!
//! let filter = Filter {
//!     service_name: vec!["frontend".to_string()],
//!     status: vec!["error".to_string()],
//!     span_duration: DurationField::at_least("500ms"),
//!     ..Filter::default()
//! };
//!
//! let query = traceql::encode(&filter);
//! assert_eq!(
//!     query,
//!     r#"{ resource.service.name = "frontend" && status = error && duration >= 500ms }"#
//! );
//! assert_eq!(traceql::decode(&query)?, filter);
//! # Ok::<(), tracelens::TracelensError>(())
//! ```
//!
//! ## Trace compaction
//!
//! ```rust
//! use tracelens::otlp::TracesData;
//!
//! let trace: TracesData = serde_json::from_str(r#"{"resourceSpans": []}"#)?;
//! assert!(tracelens::transform::transform(&trace).is_none());
//! # Ok::<(), serde_json::Error>(())
//! ```

#![allow(clippy::multiple_crate_versions)]

pub mod assist;
pub mod domain;
pub mod links;
pub mod observability;
pub mod otlp;
pub mod traceql;
pub mod transform;

pub use assist::AssistConfig;
pub use domain::{
    split_by_unquoted_whitespace, DurationField, Filter, FilterField, Result, TracelensError,
    STATUS_VALUES,
};
pub use links::LinksConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tool configuration, usually loaded from a TOML file.
///
/// Every key is optional; missing keys take their default.
///
/// # Example
///
/// ```rust
/// use tracelens::Config;
///
/// let config: Config = toml::from_str(
///     r#"
///     log_level = "debug"
///
///     [links]
///     base_path = "/tracing"
///     "#,
/// )?;
/// assert_eq!(config.log_level.as_deref(), Some("debug"));
/// assert_eq!(config.links.base_path, "/tracing");
/// assert_eq!(config.assist.max_attachment_bytes, 1024 * 1024);
/// # Ok::<(), toml::de::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log filter directive when `RUST_LOG` is unset.
    ///
    /// Options: `trace`, `debug`, `info`, `warn`, `error`, or any
    /// `tracing-subscriber` filter directive. Default: `"info"`
    pub log_level: Option<String>,

    /// File receiving the tool's own spans as OTLP/JSON lines.
    ///
    /// Span export is disabled when unset.
    pub trace_file: Option<PathBuf>,

    /// AI assistant settings.
    pub assist: AssistConfig,

    /// Link template settings.
    pub links: LinksConfig,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`TracelensError::Io`] if the file cannot be read and
    /// [`TracelensError::Config`] if it is not valid configuration TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config: Self = toml::from_str(&contents).map_err(|e| {
            TracelensError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;

        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, None);
        assert_eq!(config.trace_file, None);
        assert_eq!(config.links.base_path, "/observe/traces");
        assert_eq!(config.assist.prompt, assist::DEFAULT_PROMPT);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
log_level = "warn"
trace_file = "/tmp/spans.jsonl"

[assist]
prompt = "Summarize"
max_attachment_bytes = 2048
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert_eq!(config.trace_file, Some(PathBuf::from("/tmp/spans.jsonl")));
        assert_eq!(config.assist.prompt, "Summarize");
        assert_eq!(config.assist.max_attachment_bytes, 2048);
        assert_eq!(config.links, LinksConfig::default());
    }

    #[test]
    fn test_from_file_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = [").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(TracelensError::Config(_))
        ));
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::from_file(dir.path().join("absent.toml")),
            Err(TracelensError::Io(_))
        ));
    }
}
