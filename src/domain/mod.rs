//! Domain layer for Tracelens.
//!
//! This module contains the core domain types shared by the query codec and the
//! command-line front-end, independent of the TraceQL grammar or any I/O.
//!
//! # Organization
//!
//! - [`error`]: Error types and result aliases
//! - [`filter`]: The structured toolbar filter model
//!
//! # Examples
//!
//! ```
//! use tracelens::domain::{DurationField, Filter};
//!
//! let filter = Filter {
//!     service_name: vec!["frontend".to_string()],
//!     span_duration: DurationField::at_least("100ms"),
//!     ..Filter::default()
//! };
//! assert!(!filter.is_empty());
//! ```

pub mod error;
pub mod filter;

pub use error::{Result, TracelensError};
pub use filter::{split_by_unquoted_whitespace, DurationField, Filter, FilterField, STATUS_VALUES};
