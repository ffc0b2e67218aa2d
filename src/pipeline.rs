//! Cleaning Pipeline
//! Reconcile -> window -> scrub outliers -> impute -> coerce, in that order.

use crate::config::PipelineConfig;
use crate::data::{derive_aggregates, DataProcessor, ImputationReport, ProcessorError, Table};
use crate::stats::StatsCalculator;
use tracing::{debug, info};

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub combined_rows: usize,
    pub windowed_rows: usize,
    /// Numeric, imputed table indexed by time period.
    pub cleaned: Table,
    pub imputation: ImputationReport,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, left: &Table, right: &Table) -> Result<PipelineOutput, ProcessorError> {
        let combined = DataProcessor::reconcile(left, right, &self.config.join_suffixes())?;
        let windowed = DataProcessor::filter_window(&combined, &self.config.window)?;

        let bounds = match &self.config.outlier_reference {
            Some(reference) => {
                let reference = DataProcessor::filter_window(&combined, reference)?;
                debug!(rows = reference.height(), "Outlier bounds from reference window");
                StatsCalculator::compute_bounds(&reference, self.config.iqr_multiplier)?
            }
            None => StatsCalculator::compute_bounds(&windowed, self.config.iqr_multiplier)?,
        };
        let scrubbed = DataProcessor::remove_outliers_with(&windowed, &bounds)?;

        let (imputed, imputation) = DataProcessor::handle_missing_values(&scrubbed)?;
        let cleaned = DataProcessor::convert_to_numeric(&imputed)?;

        info!(
            combined = combined.height(),
            windowed = windowed.height(),
            cleaned = cleaned.height(),
            "Pipeline finished"
        );

        Ok(PipelineOutput {
            combined_rows: combined.height(),
            windowed_rows: windowed.height(),
            cleaned,
            imputation,
        })
    }

    /// Cleaned table plus the configured aggregate columns.
    pub fn derive_aggregates(&self, cleaned: &Table) -> Result<Table, ProcessorError> {
        derive_aggregates(cleaned, &self.config.aggregate_specs())
    }
}
