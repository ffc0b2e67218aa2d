//! Pipeline Configuration
//! JSON-backed settings; every field has a default matching the construction
//! output workbook.

use crate::data::{construction_aggregates, AggregateSpec, JoinSuffixes, SuffixPolicy};
use crate::stats::IQR_MULTIPLIER;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Column holding the time period in both sheets.
    pub key_column: String,
    pub left_sheet: String,
    pub right_sheet: String,
    pub left_suffix: String,
    pub right_suffix: String,
    pub suffix_policy: SuffixPolicy,
    /// Analysis window, in output order.
    pub window: Vec<String>,
    /// Wider window to compute outlier quartiles over; `None` uses `window`.
    pub outlier_reference: Option<Vec<String>>,
    pub iqr_multiplier: f64,
    /// Derived columns; `None` derives Housing, New Work and R&M over the
    /// columns carrying `left_suffix`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregates: Option<Vec<AggregateSpec>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            key_column: "Time period".to_string(),
            left_sheet: "Table 4a".to_string(),
            right_sheet: "Table 3c".to_string(),
            left_suffix: "_4a".to_string(),
            right_suffix: "_3c".to_string(),
            suffix_policy: SuffixPolicy::Overlapping,
            window: vec![
                "Sep 2023".to_string(),
                "Oct 2023".to_string(),
                "Nov 2023".to_string(),
            ],
            outlier_reference: None,
            iqr_multiplier: IQR_MULTIPLIER,
            aggregates: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "iqr_multiplier must be positive, got {}",
                self.iqr_multiplier
            )));
        }
        if self.left_suffix == self.right_suffix {
            return Err(ConfigError::Invalid(format!(
                "left and right suffix are both '{}'",
                self.left_suffix
            )));
        }
        if self.key_column.trim().is_empty() {
            return Err(ConfigError::Invalid("key_column is empty".to_string()));
        }
        Ok(())
    }

    /// Configured aggregates, or the construction aggregates for the left sheet.
    pub fn aggregate_specs(&self) -> Vec<AggregateSpec> {
        match &self.aggregates {
            Some(specs) => specs.clone(),
            None => construction_aggregates(&self.left_suffix),
        }
    }

    pub fn join_suffixes(&self) -> JoinSuffixes {
        JoinSuffixes {
            left: self.left_suffix.clone(),
            right: self.right_suffix.clone(),
            policy: self.suffix_policy,
        }
    }
}
