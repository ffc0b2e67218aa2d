//! Data Processor Module
//! Reconciliation, windowing, outlier removal, imputation and numeric coercion.
//!
//! Every stage takes a `&Table` and returns a new `Table`; inputs are never
//! modified.

use crate::data::table::{numeric_values, Table};
use crate::stats::{ColumnBounds, StatsCalculator};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Time period '{0}' not found in table")]
    KeyNotFound(String),
    #[error("Required column '{0}' not found in table")]
    MissingColumn(String),
    #[error("Time period '{0}' appears more than once")]
    DuplicateKey(String),
    #[error("Row {row} has no time period")]
    MissingKey { row: usize },
    #[error("Column '{0}' is ambiguous after suffixing")]
    DuplicateColumn(String),
    #[error("Expected {expected} rows, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Row {row} is out of bounds for a table of {height} rows")]
    RowOutOfBounds { row: usize, height: usize },
}

/// Which columns receive their source suffix when two tables are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuffixPolicy {
    /// Only names present in both tables, on both sides.
    #[default]
    Overlapping,
    /// Every column of both tables.
    All,
}

/// Source suffixes used by [`DataProcessor::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSuffixes {
    pub left: String,
    pub right: String,
    pub policy: SuffixPolicy,
}

impl Default for JoinSuffixes {
    fn default() -> Self {
        Self {
            left: "_4a".to_string(),
            right: "_3c".to_string(),
            policy: SuffixPolicy::Overlapping,
        }
    }
}

impl JoinSuffixes {
    fn rename(&self, name: &str, overlapping: bool, suffix: &str) -> String {
        if overlapping || self.policy == SuffixPolicy::All {
            format!("{}{}", name, suffix)
        } else {
            name.to_string()
        }
    }
}

/// Missing-value counts and fill value of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnImputation {
    pub column: String,
    /// Cells without a number: nulls plus text that does not parse.
    pub missing: usize,
    /// Null cells only, a subset of `missing`.
    pub nulls: usize,
    /// `None` when the column had nothing to average.
    pub fill: Option<f64>,
}

/// Diagnostic produced by [`DataProcessor::handle_missing_values`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImputationReport {
    pub columns: Vec<ColumnImputation>,
}

impl ImputationReport {
    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(|c| c.missing).sum()
    }

    pub fn total_nulls(&self) -> usize {
        self.columns.iter().map(|c| c.nulls).sum()
    }

    pub fn get(&self, column: &str) -> Option<&ColumnImputation> {
        self.columns.iter().find(|c| c.column == column)
    }
}

/// Handles data cleaning and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Inner-join two tables on their time-period index.
    ///
    /// Rows follow the left table's order; columns are the left table's
    /// followed by the right table's, suffixed per `suffixes.policy`.
    pub fn reconcile(
        left: &Table,
        right: &Table,
        suffixes: &JoinSuffixes,
    ) -> Result<Table, ProcessorError> {
        let right_rows: HashMap<&str, usize> = right
            .index()
            .iter()
            .enumerate()
            .map(|(row, key)| (key.as_str(), row))
            .collect();

        let (left_take, right_take): (Vec<usize>, Vec<usize>) = left
            .index()
            .iter()
            .enumerate()
            .filter_map(|(row, key)| right_rows.get(key.as_str()).map(|&other| (row, other)))
            .unzip();

        let left_part = left.take_rows(&left_take)?;
        let right_part = right.take_rows(&right_take)?;

        let left_names: HashSet<String> = left.column_names().into_iter().collect();
        let right_names: HashSet<String> = right.column_names().into_iter().collect();

        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(left.width() + right.width());
        let sides = [
            (&left_part, &right_names, suffixes.left.as_str()),
            (&right_part, &left_names, suffixes.right.as_str()),
        ];
        for (part, other_names, suffix) in sides {
            for column in part.frame().get_columns() {
                let name = column.name().as_str();
                let renamed = suffixes.rename(name, other_names.contains(name), suffix);
                if !seen.insert(renamed.clone()) {
                    return Err(ProcessorError::DuplicateColumn(renamed));
                }
                columns.push(column.clone().with_name(renamed.into()));
            }
        }

        info!(
            left_rows = left.height(),
            right_rows = right.height(),
            joined_rows = left_take.len(),
            columns = columns.len(),
            "Reconciled tables"
        );

        Table::from_columns(left_part.index().to_vec(), columns)
    }

    /// Restrict a table to `keys`, in exactly that order.
    pub fn filter_window(table: &Table, keys: &[String]) -> Result<Table, ProcessorError> {
        let positions: HashMap<&str, usize> = table
            .index()
            .iter()
            .enumerate()
            .map(|(row, key)| (key.as_str(), row))
            .collect();

        let mut requested = HashSet::with_capacity(keys.len());
        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            if !requested.insert(key.as_str()) {
                return Err(ProcessorError::DuplicateKey(key.clone()));
            }
            let row = positions
                .get(key.as_str())
                .ok_or_else(|| ProcessorError::KeyNotFound(key.clone()))?;
            rows.push(*row);
        }

        debug!(rows = rows.len(), "Filtered time window");
        table.take_rows(&rows)
    }

    /// Drop every row with a value outside its column's IQR range, the
    /// range being computed over the rows of `table` itself.
    pub fn remove_outliers(table: &Table, multiplier: f64) -> Result<Table, ProcessorError> {
        let bounds = StatsCalculator::compute_bounds(table, multiplier)?;
        Self::remove_outliers_with(table, &bounds)
    }

    /// Drop every row with a value outside the supplied bounds.
    ///
    /// Missing and unparsable cells never flag a row.
    pub fn remove_outliers_with(
        table: &Table,
        bounds: &[ColumnBounds],
    ) -> Result<Table, ProcessorError> {
        let mut keep = vec![true; table.height()];

        for column_bounds in bounds {
            let values = table.numeric_column(&column_bounds.column)?;
            for (flag, value) in keep.iter_mut().zip(values) {
                if value.is_some_and(|v| column_bounds.is_outlier(v)) {
                    *flag = false;
                }
            }
        }

        let rows: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(row, kept)| kept.then_some(row))
            .collect();

        let removed: Vec<&str> = keep
            .iter()
            .zip(table.index())
            .filter_map(|(kept, key)| (!kept).then_some(key.as_str()))
            .collect();
        if removed.is_empty() {
            debug!("No outlier rows");
        } else {
            info!(removed = removed.len(), rows = ?removed, "Removed outlier rows");
        }

        table.take_rows(&rows)
    }

    /// Fill missing cells with their column mean.
    ///
    /// Unparsable text counts as missing. Text columns keep their dtype and
    /// receive the mean as text; columns with nothing to average are left as
    /// they are.
    pub fn handle_missing_values(
        table: &Table,
    ) -> Result<(Table, ImputationReport), ProcessorError> {
        let results = table
            .frame()
            .get_columns()
            .par_iter()
            .map(Self::impute_column)
            .collect::<Result<Vec<_>, ProcessorError>>()?;

        let (columns, report): (Vec<Column>, Vec<ColumnImputation>) = results.into_iter().unzip();
        let report = ImputationReport { columns: report };

        info!(total = report.total_missing(), "Missing values before imputation");
        for entry in &report.columns {
            info!(
                column = %entry.column,
                missing = entry.missing,
                nulls = entry.nulls,
                "Missing values"
            );
            if entry.missing > 0 && entry.fill.is_none() {
                warn!(column = %entry.column, "No values to average, leaving column unfilled");
            }
        }

        let imputed = Table::from_columns(table.index().to_vec(), columns)?;
        Ok((imputed, report))
    }

    fn impute_column(column: &Column) -> Result<(Column, ColumnImputation), ProcessorError> {
        let name = column.name().clone();
        let values = numeric_values(column)?;
        let missing = values.iter().filter(|v| v.is_none()).count();
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let fill = StatsCalculator::mean(&present);

        let filled = match column.dtype() {
            DataType::String => {
                let cells: Vec<Option<String>> = column
                    .str()?
                    .into_iter()
                    .zip(&values)
                    .map(|(cell, parsed)| match parsed {
                        Some(_) => cell.map(str::to_string),
                        None => fill
                            .map(|mean| mean.to_string())
                            .or_else(|| cell.map(str::to_string)),
                    })
                    .collect();
                Column::new(name.clone(), cells)
            }
            _ => {
                let cells: Vec<Option<f64>> =
                    values.into_iter().map(|cell| cell.or(fill)).collect();
                Column::new(name.clone(), cells)
            }
        };

        let entry = ColumnImputation {
            column: name.to_string(),
            missing,
            nulls: column.null_count(),
            fill,
        };
        Ok((filled, entry))
    }

    /// Coerce every column to Float64; unparsable cells become null.
    pub fn convert_to_numeric(table: &Table) -> Result<Table, ProcessorError> {
        let mut coerced = 0usize;
        let mut columns = Vec::with_capacity(table.width());

        for column in table.frame().get_columns() {
            let values = numeric_values(column)?;
            let nulls = values.iter().filter(|v| v.is_none()).count();
            coerced += nulls.saturating_sub(column.null_count());
            columns.push(Column::new(column.name().clone(), values));
        }

        if coerced > 0 {
            debug!(cells = coerced, "Unparsable cells coerced to missing");
        }
        Table::from_columns(table.index().to_vec(), columns)
    }
}
