//! Chart Plotter Module
//! Maps a cleaned table to line, bar and stacked-area chart specifications.

use crate::data::{AggregateSpec, ProcessorError, Table};
use serde::Serialize;
use thiserror::Error;

/// Default palette for series without an explicit colour.
pub const PALETTE: [&str; 10] = [
    "#e74c3c", // Red
    "#2ecc71", // Green
    "#9b59b6", // Purple
    "#f39c12", // Orange
    "#1abc9c", // Teal
    "#e91e63", // Pink
    "#00bcd4", // Cyan
    "#ff5722", // Deep Orange
    "#795548", // Brown
    "#607d8b", // Blue Grey
];

/// Colours of the overall stacked area, one per aggregate.
const AGGREGATE_COLORS: [&str; 3] = ["#e6194b", "#3cb44b", "#ffe119"];

#[derive(Error, Debug)]
pub enum ChartError {
    #[error(transparent)]
    Data(#[from] ProcessorError),
    #[error("Palette has {given} colours for {needed} series")]
    PaletteTooShort { needed: usize, given: usize },
    #[error("Invalid colour '{0}'")]
    InvalidColor(String),
    #[error("Failed to render chart: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    StackedArea,
}

/// Colour specification accepted by the builders.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpec {
    /// Cycle through [`PALETTE`].
    Default,
    /// One colour for every series.
    Single(String),
    /// One colour per series, in order.
    Palette(Vec<String>),
}

impl ColorSpec {
    fn resolve(&self, series: usize) -> Result<Vec<String>, ChartError> {
        match self {
            ColorSpec::Default => Ok((0..series)
                .map(|i| PALETTE[i % PALETTE.len()].to_string())
                .collect()),
            ColorSpec::Single(color) => Ok(vec![color.clone(); series]),
            ColorSpec::Palette(colors) if colors.len() < series => {
                Err(ChartError::PaletteTooShort {
                    needed: series,
                    given: colors.len(),
                })
            }
            ColorSpec::Palette(colors) => Ok(colors[..series].to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSpec {
    pub name: String,
    pub values: Vec<Option<f64>>,
    pub color: String,
}

/// Renderer-independent description of one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Time periods along the x axis.
    pub categories: Vec<String>,
    pub series: Vec<SeriesSpec>,
}

impl ChartSpec {
    /// Smallest and largest plotted value, stacking when the chart stacks.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        if self.kind == ChartKind::StackedArea {
            for totals in self.stacked_totals() {
                for v in totals {
                    min = min.min(v);
                    max = max.max(v);
                }
            }
        } else {
            for v in self.series.iter().flat_map(|s| s.values.iter().flatten()) {
                min = min.min(*v);
                max = max.max(*v);
            }
        }

        if min.is_finite() && max.is_finite() {
            Some((min.min(0.0), max))
        } else {
            None
        }
    }

    /// Running totals per series for stacked charts; missing counts as zero.
    pub fn stacked_totals(&self) -> Vec<Vec<f64>> {
        let mut running = vec![0.0; self.categories.len()];
        self.series
            .iter()
            .map(|series| {
                for (total, value) in running.iter_mut().zip(&series.values) {
                    *total += value.unwrap_or(0.0);
                }
                running.clone()
            })
            .collect()
    }
}

/// Builds chart specifications from tables.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn line_chart(
        table: &Table,
        columns: &[&str],
        title: &str,
        x_label: &str,
        y_label: &str,
        colors: &ColorSpec,
    ) -> Result<ChartSpec, ChartError> {
        Self::build(ChartKind::Line, table, columns, title, x_label, y_label, colors)
    }

    pub fn bar_chart(
        table: &Table,
        columns: &[&str],
        title: &str,
        x_label: &str,
        y_label: &str,
        colors: &ColorSpec,
    ) -> Result<ChartSpec, ChartError> {
        Self::build(ChartKind::Bar, table, columns, title, x_label, y_label, colors)
    }

    pub fn stacked_area(
        table: &Table,
        columns: &[&str],
        title: &str,
        x_label: &str,
        y_label: &str,
        colors: &ColorSpec,
    ) -> Result<ChartSpec, ChartError> {
        Self::build(
            ChartKind::StackedArea,
            table,
            columns,
            title,
            x_label,
            y_label,
            colors,
        )
    }

    fn build(
        kind: ChartKind,
        table: &Table,
        columns: &[&str],
        title: &str,
        x_label: &str,
        y_label: &str,
        colors: &ColorSpec,
    ) -> Result<ChartSpec, ChartError> {
        let colors = colors.resolve(columns.len())?;
        let series = columns
            .iter()
            .zip(colors)
            .map(|(&name, color)| {
                Ok(SeriesSpec {
                    name: name.to_string(),
                    values: table.numeric_column(name)?,
                    color,
                })
            })
            .collect::<Result<Vec<_>, ChartError>>()?;

        Ok(ChartSpec {
            kind,
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            categories: table.index().to_vec(),
            series,
        })
    }

    /// The six charts of the construction output dashboard.
    ///
    /// `aggregated` is the cleaned table with the `aggregates` columns already
    /// derived; the last chart stacks those columns in the order given.
    pub fn dashboard(
        aggregated: &Table,
        aggregates: &[AggregateSpec],
        left_suffix: &str,
        right_suffix: &str,
    ) -> Result<Vec<ChartSpec>, ChartError> {
        let l = |name: &str| format!("{}{}", name, left_suffix);
        let r = |name: &str| format!("{}{}", name, right_suffix);
        let palette = |colors: &[&str]| ColorSpec::Palette(colors.iter().map(|c| c.to_string()).collect());

        let sectors = [
            l("Total new housing"),
            l("Infrastructure new work"),
            l("All new work"),
            l("Total housing R&M"),
        ];
        let sectors: Vec<&str> = sectors.iter().map(String::as_str).collect();
        let total_new_housing = l("Total new housing");
        let infra_vs_housing = [r("Infrastructure new work"), r("Total new housing")];
        let public_private = [l("Public new housing"), l("Private new housing")];
        let housing_rm = l("Total housing R&M");

        let overall: Vec<&str> = aggregates.iter().map(|spec| spec.name.as_str()).collect();
        let overall_colors = if overall.len() <= AGGREGATE_COLORS.len() {
            palette(&AGGREGATE_COLORS)
        } else {
            ColorSpec::Default
        };

        Ok(vec![
            Self::line_chart(
                aggregated,
                &sectors,
                "Trend of Each Sector Over Time",
                "Time Period",
                "Value",
                &ColorSpec::Default,
            )?,
            Self::bar_chart(
                aggregated,
                &[total_new_housing.as_str()],
                "Trend in Total New Housing Construction",
                "Time Period",
                "Value",
                &ColorSpec::Single("#0000cd".to_string()),
            )?,
            Self::stacked_area(
                aggregated,
                &[infra_vs_housing[0].as_str(), infra_vs_housing[1].as_str()],
                "Infrastructure vs Housing",
                "Time Period",
                "Value",
                &palette(&["#0000FF", "#FFA500"]),
            )?,
            Self::stacked_area(
                aggregated,
                &[public_private[0].as_str(), public_private[1].as_str()],
                "Public vs Private Housing",
                "Time Period",
                "Value",
                &palette(&["#008080", "#800000"]),
            )?,
            Self::bar_chart(
                aggregated,
                &[housing_rm.as_str()],
                "Trend in Total Housing Repair & Maintenance",
                "Time Period",
                "Value",
                &ColorSpec::Single("#ef9b20".to_string()),
            )?,
            Self::stacked_area(
                aggregated,
                &overall,
                "Overall Trend in the Construction Industry",
                "Time Period",
                "Value",
                &overall_colors,
            )?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn table() -> Table {
        let frame = df!(
            "Time period" => ["Sep 2023", "Oct 2023"],
            "a" => [1.0, 2.0],
            "b" => [Some(3.0), None]
        )
        .unwrap();
        Table::from_frame(&frame, "Time period").unwrap()
    }

    #[test]
    fn test_line_chart_uses_index_and_palette() {
        let spec = ChartPlotter::line_chart(&table(), &["a", "b"], "T", "X", "Y", &ColorSpec::Default)
            .unwrap();
        assert_eq!(spec.kind, ChartKind::Line);
        assert_eq!(spec.categories, vec!["Sep 2023", "Oct 2023"]);
        assert_eq!(spec.series[1].values, vec![Some(3.0), None]);
        assert_eq!(spec.series[0].color, PALETTE[0]);
        assert_eq!(spec.value_range(), Some((0.0, 3.0)));
    }

    #[test]
    fn test_unknown_column() {
        let err = ChartPlotter::bar_chart(
            &table(),
            &["missing"],
            "T",
            "X",
            "Y",
            &ColorSpec::Single("#000000".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, ChartError::Data(ProcessorError::MissingColumn(_))));
    }

    #[test]
    fn test_stacked_totals() {
        let spec = ChartPlotter::stacked_area(
            &table(),
            &["a", "b"],
            "T",
            "X",
            "Y",
            &ColorSpec::Palette(vec!["#111111".to_string(), "#222222".to_string()]),
        )
        .unwrap();
        assert_eq!(spec.stacked_totals(), vec![vec![1.0, 2.0], vec![4.0, 2.0]]);
        assert_eq!(spec.value_range(), Some((0.0, 4.0)));
    }

    #[test]
    fn test_short_palette() {
        let err = ChartPlotter::stacked_area(
            &table(),
            &["a", "b"],
            "T",
            "X",
            "Y",
            &ColorSpec::Palette(vec!["#111111".to_string()]),
        )
        .unwrap_err();
        assert!(matches!(err, ChartError::PaletteTooShort { needed: 2, given: 1 }));
    }
}
