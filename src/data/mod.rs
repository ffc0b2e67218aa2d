//! Data module - Sheet loading, reconciliation and cleaning

mod aggregates;
mod loader;
mod processor;
mod table;

pub use aggregates::{
    construction_aggregates, derive_aggregates, AggregateSpec, MissingPolicy, Op, Term,
};
pub use loader::{DataLoader, LoaderError};
pub use processor::{
    ColumnImputation, DataProcessor, ImputationReport, JoinSuffixes, ProcessorError,
    SuffixPolicy,
};
pub use table::{numeric_values, Table};
