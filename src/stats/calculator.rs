//! Statistics Calculator Module
//! Quartiles, IQR outlier bounds, descriptive summaries and correlations.

use crate::data::{numeric_values, ProcessorError, Table};
use rayon::prelude::*;
use serde::Serialize;
use statrs::statistics::Statistics;

/// Default Tukey fence multiplier.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Acceptable range of one column, `[q1 - k*iqr, q3 + k*iqr]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnBounds {
    pub column: String,
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ColumnBounds {
    /// Bounds over the present values, `None` if there are none.
    pub fn from_values(column: &str, values: &[f64], multiplier: f64) -> Option<Self> {
        let (q1, q3) = StatsCalculator::quartiles(values)?;
        let iqr = q3 - q1;
        Some(Self {
            column: column.to_string(),
            q1,
            q3,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Descriptive statistics for a single column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl Default for ColumnSummary {
    fn default() -> Self {
        Self {
            column: String::new(),
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            q1: f64::NAN,
            median: f64::NAN,
            q3: f64::NAN,
            max: f64::NAN,
        }
    }
}

/// Pairwise Pearson correlations, `values[i][j]` for `columns[i]` x `columns[j]`.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// First and third quartile of unsorted values.
    pub fn quartiles(values: &[f64]) -> Option<(f64, f64)> {
        if values.is_empty() {
            return None;
        }
        let sorted = Self::sorted(values);
        Some((
            Self::percentile(&sorted, 25.0),
            Self::percentile(&sorted, 75.0),
        ))
    }

    /// Arithmetic mean, `None` for an empty slice.
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().mean())
        }
    }

    /// Outlier bounds for every column that holds at least one number.
    pub fn compute_bounds(table: &Table, multiplier: f64) -> Result<Vec<ColumnBounds>, ProcessorError> {
        let bounds = table
            .frame()
            .get_columns()
            .par_iter()
            .map(|column| {
                let present = Self::present(&numeric_values(column)?);
                Ok(ColumnBounds::from_values(
                    column.name().as_str(),
                    &present,
                    multiplier,
                ))
            })
            .collect::<Result<Vec<_>, ProcessorError>>()?;

        Ok(bounds.into_iter().flatten().collect())
    }

    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> ColumnSummary {
        let n = values.len();
        if n == 0 {
            return ColumnSummary::default();
        }

        let sorted = Self::sorted(values);

        ColumnSummary {
            column: String::new(),
            count: n,
            mean: values.iter().mean(),
            std: values.iter().std_dev(),
            min: sorted[0],
            q1: Self::percentile(&sorted, 25.0),
            median: Self::percentile(&sorted, 50.0),
            q3: Self::percentile(&sorted, 75.0),
            max: sorted[n - 1],
        }
    }

    /// Summaries for every column, computed in parallel.
    pub fn describe(table: &Table) -> Result<Vec<ColumnSummary>, ProcessorError> {
        table
            .frame()
            .get_columns()
            .par_iter()
            .map(|column| {
                let present = Self::present(&numeric_values(column)?);
                let mut summary = Self::compute_descriptive_stats(&present);
                summary.column = column.name().to_string();
                Ok(summary)
            })
            .collect()
    }

    /// Pearson correlation over the rows where both values are present.
    pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
        let (xs, ys): (Vec<f64>, Vec<f64>) = a
            .iter()
            .zip(b)
            .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
            .unzip();

        if xs.len() < 2 {
            return f64::NAN;
        }

        let mean_x = xs.iter().mean();
        let mean_y = ys.iter().mean();
        let mut cov = 0.0;
        let mut var_x = 0.0;
        let mut var_y = 0.0;
        for (x, y) in xs.iter().zip(&ys) {
            cov += (x - mean_x) * (y - mean_y);
            var_x += (x - mean_x).powi(2);
            var_y += (y - mean_y).powi(2);
        }

        if var_x == 0.0 || var_y == 0.0 {
            return f64::NAN;
        }
        cov / (var_x * var_y).sqrt()
    }

    /// Correlation matrix of every column pair.
    pub fn correlation_matrix(table: &Table) -> Result<CorrelationMatrix, ProcessorError> {
        let columns = table.column_names();
        let data = table
            .frame()
            .get_columns()
            .iter()
            .map(numeric_values)
            .collect::<Result<Vec<_>, _>>()?;

        let values: Vec<Vec<f64>> = data
            .par_iter()
            .map(|a| data.iter().map(|b| Self::pearson(a, b)).collect::<Vec<f64>>())
            .collect();

        Ok(CorrelationMatrix { columns, values })
    }

    fn present(values: &[Option<f64>]) -> Vec<f64> {
        values.iter().flatten().copied().collect()
    }

    fn sorted(values: &[f64]) -> Vec<f64> {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sorted
    }
}
