//! Aggregate Module
//! Named composite series built from linear combinations of base columns.

use crate::data::processor::ProcessorError;
use crate::data::table::Table;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a base column enters an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Add,
    Subtract,
}

/// What a row with a missing base value produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Missing terms count as zero.
    #[default]
    Skip,
    /// Any missing term makes the result missing.
    Propagate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub column: String,
    pub op: Op,
}

/// Declarative definition of one derived column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub name: String,
    pub terms: Vec<Term>,
    #[serde(default)]
    pub missing: MissingPolicy,
}

impl AggregateSpec {
    /// Row-wise sum of `columns`, ignoring missing cells.
    pub fn sum(name: &str, columns: &[String]) -> Self {
        Self {
            name: name.to_string(),
            terms: columns
                .iter()
                .map(|column| Term {
                    column: column.clone(),
                    op: Op::Add,
                })
                .collect(),
            missing: MissingPolicy::Skip,
        }
    }

    /// `minuend - subtrahend`, missing if either side is.
    pub fn difference(name: &str, minuend: &str, subtrahend: &str) -> Self {
        Self {
            name: name.to_string(),
            terms: vec![
                Term {
                    column: minuend.to_string(),
                    op: Op::Add,
                },
                Term {
                    column: subtrahend.to_string(),
                    op: Op::Subtract,
                },
            ],
            missing: MissingPolicy::Propagate,
        }
    }

    pub fn required_columns(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|term| term.column.as_str())
    }

    /// Evaluate against `table`, one value per row.
    pub fn evaluate(&self, table: &Table) -> Result<Vec<Option<f64>>, ProcessorError> {
        let mut totals: Vec<Option<f64>> = vec![Some(0.0); table.height()];

        for term in &self.terms {
            let values = table.numeric_column(&term.column)?;
            for (total, value) in totals.iter_mut().zip(values) {
                let signed = value.map(|v| match term.op {
                    Op::Add => v,
                    Op::Subtract => -v,
                });
                *total = match (*total, signed, self.missing) {
                    (Some(t), Some(v), _) => Some(t + v),
                    (Some(t), None, MissingPolicy::Skip) => Some(t),
                    _ => None,
                };
            }
        }

        Ok(totals)
    }
}

/// Housing, New Work and R&M over the columns carrying `suffix`.
pub fn construction_aggregates(suffix: &str) -> Vec<AggregateSpec> {
    let named = |names: &[&str]| -> Vec<String> {
        names
            .iter()
            .map(|name| format!("{}{}", name, suffix))
            .collect()
    };

    vec![
        AggregateSpec::sum(
            "Housing",
            &named(&[
                "Public new housing",
                "Private new housing",
                "Total new housing",
                "Public housing R&M",
                "Private housing R&M",
            ]),
        ),
        AggregateSpec::sum(
            "New Work",
            &named(&[
                "Infrastructure new work",
                "Public other new work",
                "Private industrial new work",
                "Private commercial new work",
            ]),
        ),
        AggregateSpec::difference(
            "R&M",
            &format!("All R&M{}", suffix),
            &format!("Total housing R&M{}", suffix),
        ),
    ]
}

/// Return `table` with one extra column per spec.
///
/// All base columns are checked up front; existing columns are kept and a
/// same-named column is replaced.
pub fn derive_aggregates(table: &Table, specs: &[AggregateSpec]) -> Result<Table, ProcessorError> {
    if let Some(missing) = specs
        .iter()
        .flat_map(|spec| spec.required_columns())
        .find(|column| !table.has_column(column))
    {
        return Err(ProcessorError::MissingColumn(missing.to_string()));
    }

    let columns = specs
        .iter()
        .map(|spec| {
            let values = spec.evaluate(table)?;
            debug!(aggregate = %spec.name, terms = spec.terms.len(), "Derived aggregate");
            Ok(Column::new(spec.name.as_str().into(), values))
        })
        .collect::<Result<Vec<_>, ProcessorError>>()?;

    table.with_columns(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_table() -> Table {
        let frame = df!(
            "Time period" => ["Sep 2023", "Oct 2023"],
            "Public new housing_4a" => [1.0, 2.0],
            "Private new housing_4a" => [3.0, 4.0],
            "Total new housing_4a" => [4.0, 6.0],
            "Public housing R&M_4a" => [Some(5.0), None],
            "Private housing R&M_4a" => [6.0, 7.0],
            "Infrastructure new work_4a" => [10.0, 11.0],
            "Public other new work_4a" => [12.0, 13.0],
            "Private industrial new work_4a" => [14.0, 15.0],
            "Private commercial new work_4a" => [16.0, 17.0],
            "All R&M_4a" => [Some(50.0), None],
            "Total housing R&M_4a" => [11.0, 12.0]
        )
        .unwrap();
        Table::from_frame(&frame, "Time period").unwrap()
    }

    #[test]
    fn test_construction_aggregates() {
        let table = base_table();
        let derived = derive_aggregates(&table, &construction_aggregates("_4a")).unwrap();

        assert_eq!(derived.width(), table.width() + 3);
        assert_eq!(derived.value("Sep 2023", "Housing").unwrap(), Some(19.0));
        assert_eq!(derived.value("Oct 2023", "Housing").unwrap(), Some(19.0));
        assert_eq!(derived.value("Sep 2023", "New Work").unwrap(), Some(52.0));
        assert_eq!(derived.value("Sep 2023", "R&M").unwrap(), Some(39.0));
        assert_eq!(derived.value("Oct 2023", "R&M").unwrap(), None);
    }

    #[test]
    fn test_aggregates_sum_to_their_parts() {
        let table = base_table();
        let derived = derive_aggregates(&table, &construction_aggregates("_4a")).unwrap();

        let housing = derived.numeric_column("Housing").unwrap();
        let new_work = derived.numeric_column("New Work").unwrap();
        let rm = derived.numeric_column("R&M").unwrap();
        let row = 0;
        let total = housing[row].unwrap() + new_work[row].unwrap() + rm[row].unwrap();
        let expected = (1.0 + 3.0 + 4.0 + 5.0 + 6.0) + (10.0 + 12.0 + 14.0 + 16.0) + (50.0 - 11.0);
        assert!((total - expected).abs() < 1e-9);
    }

    #[test]
    fn test_missing_base_column() {
        let frame = df!(
            "Time period" => ["Sep 2023"],
            "All R&M_4a" => [1.0]
        )
        .unwrap();
        let table = Table::from_frame(&frame, "Time period").unwrap();
        let err = derive_aggregates(&table, &construction_aggregates("_4a")).unwrap_err();
        assert!(matches!(err, ProcessorError::MissingColumn(c) if c == "Public new housing_4a"));
    }

    #[test]
    fn test_spec_from_json() {
        let spec: AggregateSpec = serde_json::from_str(
            r#"{"name": "Net", "terms": [
                {"column": "a", "op": "add"},
                {"column": "b", "op": "subtract"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(spec.missing, MissingPolicy::Skip);
        assert_eq!(spec.required_columns().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
