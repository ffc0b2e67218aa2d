//! Stats module - Quartiles, outlier bounds and summaries

mod calculator;

pub use calculator::{
    ColumnBounds, ColumnSummary, CorrelationMatrix, StatsCalculator, IQR_MULTIPLIER,
};
