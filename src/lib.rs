//! Construction Output - sheet reconciliation, cleaning & chart pipeline
//!
//! Joins the two monthly construction-output sheets on their time period,
//! restricts them to an analysis window, scrubs IQR outliers, imputes column
//! means, coerces to numbers and derives the aggregate series charted
//! downstream.

pub mod charts;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod stats;

pub use config::{ConfigError, PipelineConfig};
pub use data::{DataLoader, ProcessorError, Table};
pub use pipeline::{Pipeline, PipelineOutput};
