//! Table Module
//! A Polars DataFrame of value columns indexed by time period.
//!
//! Polars frames carry no row index, so the time-period column is promoted
//! out of the frame into an ordered `Vec<String>` that every stage keeps in
//! step with the frame rows.

use crate::data::processor::ProcessorError;
use polars::prelude::*;
use std::collections::HashSet;

/// Ordered, uniquely keyed table of named columns.
#[derive(Debug, Clone)]
pub struct Table {
    index: Vec<String>,
    frame: DataFrame,
}

impl Table {
    /// Build a table from an index and a frame of matching height.
    pub fn new(index: Vec<String>, frame: DataFrame) -> Result<Self, ProcessorError> {
        if frame.width() > 0 && frame.height() != index.len() {
            return Err(ProcessorError::LengthMismatch {
                expected: index.len(),
                found: frame.height(),
            });
        }

        let mut seen = HashSet::with_capacity(index.len());
        for key in &index {
            if !seen.insert(key.as_str()) {
                return Err(ProcessorError::DuplicateKey(key.clone()));
            }
        }

        Ok(Self { index, frame })
    }

    /// Build a table from an index and a list of columns.
    pub fn from_columns(index: Vec<String>, columns: Vec<Column>) -> Result<Self, ProcessorError> {
        let frame = DataFrame::new(columns)?;
        Self::new(index, frame)
    }

    /// Promote `key_column` of a loaded frame to the row index.
    pub fn from_frame(frame: &DataFrame, key_column: &str) -> Result<Self, ProcessorError> {
        let key = frame
            .column(key_column)
            .map_err(|_| ProcessorError::MissingColumn(key_column.to_string()))?;

        let mut index = Vec::with_capacity(key.len());
        for row in 0..key.len() {
            let value = key.get(row)?;
            let label = cell_label(&value).ok_or(ProcessorError::MissingKey { row })?;
            index.push(label);
        }

        let values = frame.drop(key_column)?;
        Self::new(index, values)
    }

    /// Time periods in row order.
    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.index.len()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.iter().any(|k| k == key)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.iter().position(|k| k == key)
    }

    /// Get list of column names.
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    pub fn column(&self, name: &str) -> Result<&Column, ProcessorError> {
        self.frame
            .column(name)
            .map_err(|_| ProcessorError::MissingColumn(name.to_string()))
    }

    /// Numeric view of a named column, see [`numeric_values`].
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>, ProcessorError> {
        numeric_values(self.column(name)?)
    }

    /// Numeric value of one cell, `None` when missing or unparsable.
    pub fn value(&self, key: &str, column: &str) -> Result<Option<f64>, ProcessorError> {
        let row = self
            .position(key)
            .ok_or_else(|| ProcessorError::KeyNotFound(key.to_string()))?;
        Ok(self.numeric_column(column)?[row])
    }

    /// Select rows by position, in the order given.
    pub fn take_rows(&self, rows: &[usize]) -> Result<Self, ProcessorError> {
        if let Some(&row) = rows.iter().find(|&&row| row >= self.height()) {
            return Err(ProcessorError::RowOutOfBounds {
                row,
                height: self.height(),
            });
        }

        let positions: Vec<IdxSize> = rows.iter().map(|&row| row as IdxSize).collect();
        let frame = self
            .frame
            .take(&IdxCa::from_vec("idx".into(), positions))?;
        let index: Vec<String> = rows.iter().map(|&row| self.index[row].clone()).collect();

        Self::new(index, frame)
    }

    /// Keep only the named columns, in the order given.
    pub fn select(&self, names: &[String]) -> Result<Self, ProcessorError> {
        let columns = names
            .iter()
            .map(|name| self.column(name).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_columns(self.index.clone(), columns)
    }

    /// Sub-table of the columns carrying a source suffix such as `_4a`.
    pub fn columns_with_suffix(&self, suffix: &str) -> Result<Self, ProcessorError> {
        let names: Vec<String> = self
            .column_names()
            .into_iter()
            .filter(|name| name.ends_with(suffix))
            .collect();
        self.select(&names)
    }

    /// Return a copy with `columns` appended, replacing same-named ones.
    pub fn with_columns(&self, columns: Vec<Column>) -> Result<Self, ProcessorError> {
        let mut frame = self.frame.clone();
        for column in columns {
            if column.len() != self.height() {
                return Err(ProcessorError::LengthMismatch {
                    expected: self.height(),
                    found: column.len(),
                });
            }
            frame.with_column(column)?;
        }
        Self::new(self.index.clone(), frame)
    }
}

/// Read a column as numbers.
///
/// Text cells are trimmed and parsed; unparsable text, nulls and NaN are all
/// `None`. Other dtypes are cast non-strictly to Float64.
pub fn numeric_values(column: &Column) -> Result<Vec<Option<f64>>, ProcessorError> {
    let values = match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .map(|cell| cell.and_then(parse_number))
            .collect(),
        _ => {
            let cast = column.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|cell| cell.filter(|v| !v.is_nan()))
                .collect()
        }
    };
    Ok(values)
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn cell_label(value: &AnyValue) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => Some(s.trim().to_string()),
        AnyValue::StringOwned(s) => Some(s.trim().to_string()),
        other => Some(other.to_string().trim_matches('"').to_string()),
    }
}
