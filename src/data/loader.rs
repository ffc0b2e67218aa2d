//! Workbook Loader Module
//! Loads named sheets, exported as CSV files, into time-period tables.

use crate::data::processor::ProcessorError;
use crate::data::table::Table;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Sheet '{sheet}' not found at {}", .path.display())]
    SheetNotFound { sheet: String, path: PathBuf },
    #[error("Sheet '{sheet}' is malformed: {source}")]
    Malformed {
        sheet: String,
        #[source]
        source: ProcessorError,
    },
}

/// Reads the sheets of a workbook directory, one `<sheet>.csv` per sheet.
pub struct DataLoader {
    workbook: PathBuf,
}

impl DataLoader {
    pub fn new(workbook: impl Into<PathBuf>) -> Self {
        Self {
            workbook: workbook.into(),
        }
    }

    pub fn workbook(&self) -> &Path {
        &self.workbook
    }

    /// File backing a named sheet.
    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.workbook.join(format!("{}.csv", sheet))
    }

    /// Load a CSV file using Polars.
    pub fn load_csv(path: &Path) -> Result<DataFrame, LoaderError> {
        let df = LazyCsvReader::new(path)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;
        Ok(df)
    }

    /// Load one sheet and index it by `key_column`.
    pub fn load_sheet(&self, sheet: &str, key_column: &str) -> Result<Table, LoaderError> {
        let path = self.sheet_path(sheet);
        if !path.is_file() {
            return Err(LoaderError::SheetNotFound {
                sheet: sheet.to_string(),
                path,
            });
        }

        let df = Self::load_csv(&path)?;
        let table = Table::from_frame(&df, key_column).map_err(|source| LoaderError::Malformed {
            sheet: sheet.to_string(),
            source,
        })?;

        info!(
            sheet,
            rows = table.height(),
            columns = table.width(),
            "Loaded sheet"
        );
        Ok(table)
    }

    /// Load the two sheets the pipeline reconciles.
    pub fn load_pair(
        &self,
        left_sheet: &str,
        right_sheet: &str,
        key_column: &str,
    ) -> Result<(Table, Table), LoaderError> {
        let left = self.load_sheet(left_sheet, key_column)?;
        let right = self.load_sheet(right_sheet, key_column)?;
        Ok((left, right))
    }
}
