//! # ECH Common Library
//!
//! Shared code for the ECH Explorer workspace:
//! - Tabular cell/table model
//! - The `SurveyHandle` collaborator trait and the file-backed `CsvSurvey`
//! - Number formatting for rendered tables
//! - Session event types and SSE streaming
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod sse;
pub mod survey;
pub mod table;

pub use error::{Error, Result};
pub use survey::{AggFunc, SummaryRequest, SurveyHandle, Tristate, Weights};
pub use table::{Cell, Table};
