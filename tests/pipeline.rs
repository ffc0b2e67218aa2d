//! End-to-end pipeline tests
//!
//! Drive the public API from loaded sheets through to chart specifications.

use construction_output::charts::{ChartKind, ChartPlotter};
use construction_output::data::{AggregateSpec, DataLoader, DataProcessor, JoinSuffixes};
use construction_output::{Pipeline, PipelineConfig, ProcessorError, Table};
use polars::prelude::*;
use std::fs;
use std::path::Path;

const HEADER: &str = "Time period,Public new housing,Private new housing,Total new housing,\
Infrastructure new work,Public other new work,Private industrial new work,\
Private commercial new work,All new work,Public housing R&M,Private housing R&M,\
Total housing R&M,All R&M";

fn write_workbook(dir: &Path) {
    let table_4a = [
        HEADER,
        "Aug 2023,90,190,280,390,45,55,65,950,9,19,28,85",
        "Sep 2023,100,200,300,400,50,60,70,1000,10,20,30,90",
        "Oct 2023,,210,310,410,52,62,72,1010,11,21,32,92",
        "Nov 2023,104,220,324,420,54,64,74,1020,12,22,34,94",
        "Dec 2023,105,225,330,425,55,65,75,1030,13,23,36,96",
    ];
    let table_3c = [
        HEADER,
        "Jul 2023,8,18,26,38,4,5,6,95,1,2,3,9",
        "Aug 2023,9,19,28,39,4,5,6,96,1,2,3,9",
        "Sep 2023,10,20,30,40,5,6,7,100,1,2,3,9",
        "Oct 2023,11,21,32,41,5,6,7,101,1,2,3,9",
        "Nov 2023,12,22,x,42,5,6,7,102,1,2,3,9",
    ];
    fs::write(dir.join("Table 4a.csv"), table_4a.join("\n")).unwrap();
    fs::write(dir.join("Table 3c.csv"), table_3c.join("\n")).unwrap();
}

fn keys(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn run_workbook() -> (Pipeline, construction_output::PipelineOutput) {
    run_workbook_with(PipelineConfig::default())
}

fn run_workbook_with(config: PipelineConfig) -> (Pipeline, construction_output::PipelineOutput) {
    let dir = tempfile::tempdir().unwrap();
    write_workbook(dir.path());

    let loader = DataLoader::new(dir.path());
    let (left, right) = loader
        .load_pair(&config.left_sheet, &config.right_sheet, &config.key_column)
        .unwrap();

    let pipeline = Pipeline::new(config);
    let output = pipeline.run(&left, &right).unwrap();
    (pipeline, output)
}

#[test]
fn test_synthetic_reconcile_window_scrub() {
    let table_4a = Table::from_frame(
        &df!(
            "Time period" => ["Jan 2023", "Feb 2023", "Mar 2023"],
            "Total new housing" => [10.0, 1000.0, 12.0]
        )
        .unwrap(),
        "Time period",
    )
    .unwrap();
    let table_3c = Table::from_frame(
        &df!(
            "Time period" => ["Jan 2023", "Feb 2023", "Mar 2023"],
            "Total new housing" => [5.0, 6.0, 7.0]
        )
        .unwrap(),
        "Time period",
    )
    .unwrap();

    let combined = DataProcessor::reconcile(&table_4a, &table_3c, &JoinSuffixes::default()).unwrap();
    assert_eq!(
        combined.column_names(),
        vec!["Total new housing_4a", "Total new housing_3c"]
    );

    let windowed = DataProcessor::filter_window(&combined, &keys(&["Jan 2023", "Mar 2023"])).unwrap();
    assert_eq!(windowed.index(), ["Jan 2023", "Mar 2023"]);

    let scrubbed = DataProcessor::remove_outliers(&windowed, 1.5).unwrap();
    assert_eq!(scrubbed.index(), ["Jan 2023", "Mar 2023"]);
    assert_eq!(
        scrubbed.numeric_column("Total new housing_4a").unwrap(),
        vec![Some(10.0), Some(12.0)]
    );
}

#[test]
fn test_workbook_pipeline_cleans_window() {
    let (_, output) = run_workbook();
    let cleaned = &output.cleaned;

    assert_eq!(output.combined_rows, 4);
    assert_eq!(output.windowed_rows, 3);
    assert_eq!(cleaned.index(), ["Sep 2023", "Oct 2023", "Nov 2023"]);

    for column in cleaned.frame().get_columns() {
        assert_eq!(column.dtype(), &DataType::Float64, "{}", column.name());
        assert_eq!(column.null_count(), 0, "{}", column.name());
    }

    assert_eq!(
        cleaned.value("Oct 2023", "Public new housing_4a").unwrap(),
        Some(102.0)
    );
    assert_eq!(
        cleaned.value("Nov 2023", "Total new housing_3c").unwrap(),
        Some(31.0)
    );
    assert_eq!(
        output.imputation.get("Public new housing_4a").unwrap().missing,
        1
    );
    assert_eq!(output.imputation.total_missing(), 2);
}

#[test]
fn test_workbook_aggregates_and_dashboard() {
    let (pipeline, output) = run_workbook();
    let aggregated = pipeline.derive_aggregates(&output.cleaned).unwrap();

    assert_eq!(aggregated.width(), output.cleaned.width() + 3);
    assert_eq!(aggregated.value("Oct 2023", "Housing").unwrap(), Some(654.0));
    assert_eq!(aggregated.value("Sep 2023", "New Work").unwrap(), Some(580.0));
    assert_eq!(aggregated.value("Sep 2023", "R&M").unwrap(), Some(60.0));

    let housing = [
        "Public new housing_4a",
        "Private new housing_4a",
        "Total new housing_4a",
        "Public housing R&M_4a",
        "Private housing R&M_4a",
    ];
    let new_work = [
        "Infrastructure new work_4a",
        "Public other new work_4a",
        "Private industrial new work_4a",
        "Private commercial new work_4a",
    ];
    for key in aggregated.index() {
        let get = |column: &str| aggregated.value(key, column).unwrap().unwrap();
        let derived = get("Housing") + get("New Work") + get("R&M");
        let expected = housing.iter().map(|&c| get(c)).sum::<f64>()
            + new_work.iter().map(|&c| get(c)).sum::<f64>()
            + (get("All R&M_4a") - get("Total housing R&M_4a"));
        assert!((derived - expected).abs() < 1e-9, "{}", key);
    }

    let specs = ChartPlotter::dashboard(
        &aggregated,
        &pipeline.config().aggregate_specs(),
        "_4a",
        "_3c",
    )
    .unwrap();
    assert_eq!(specs.len(), 6);
    assert_eq!(specs[0].kind, ChartKind::Line);
    assert_eq!(specs[0].series.len(), 4);
    assert_eq!(specs[1].series[0].color, "#0000cd");
    assert_eq!(specs[5].kind, ChartKind::StackedArea);
    assert_eq!(specs[5].title, "Overall Trend in the Construction Industry");
    let stacked: Vec<&str> = specs[5].series.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(stacked, ["Housing", "New Work", "R&M"]);
    assert_eq!(specs[5].series[0].values[1], Some(654.0));
    for spec in &specs {
        assert_eq!(spec.categories, vec!["Sep 2023", "Oct 2023", "Nov 2023"]);
    }
}

#[test]
fn test_custom_suffixes_carry_through_to_aggregates() {
    let config =
        PipelineConfig::from_json(r#"{"left_suffix": "_L", "right_suffix": "_R"}"#).unwrap();
    let (pipeline, output) = run_workbook_with(config);

    assert!(output.cleaned.has_column("Public new housing_L"));
    assert!(output.cleaned.has_column("Total new housing_R"));

    let aggregated = pipeline.derive_aggregates(&output.cleaned).unwrap();
    assert_eq!(aggregated.value("Oct 2023", "Housing").unwrap(), Some(654.0));
    assert_eq!(aggregated.value("Sep 2023", "R&M").unwrap(), Some(60.0));

    let specs = ChartPlotter::dashboard(
        &aggregated,
        &pipeline.config().aggregate_specs(),
        "_L",
        "_R",
    )
    .unwrap();
    assert_eq!(specs.len(), 6);
    assert_eq!(specs[0].series[0].name, "Total new housing_L");
}

#[test]
fn test_configured_aggregates_drive_overall_chart() {
    let config = PipelineConfig {
        aggregates: Some(vec![AggregateSpec::sum(
            "Public",
            &[
                "Public new housing_4a".to_string(),
                "Public housing R&M_4a".to_string(),
            ],
        )]),
        ..PipelineConfig::default()
    };
    let (pipeline, output) = run_workbook_with(config);

    let aggregated = pipeline.derive_aggregates(&output.cleaned).unwrap();
    assert_eq!(aggregated.width(), output.cleaned.width() + 1);
    assert!(!aggregated.has_column("Housing"));

    let specs = ChartPlotter::dashboard(
        &aggregated,
        &pipeline.config().aggregate_specs(),
        "_4a",
        "_3c",
    )
    .unwrap();
    let overall = &specs[5];
    assert_eq!(overall.series.len(), 1);
    assert_eq!(overall.series[0].name, "Public");
    assert_eq!(overall.series[0].color, "#e6194b");
    assert_eq!(
        overall.series[0].values,
        vec![Some(110.0), Some(113.0), Some(116.0)]
    );
}

#[test]
fn test_missing_window_key_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    write_workbook(dir.path());

    let config = PipelineConfig {
        window: keys(&["Sep 2023", "Dec 2023"]),
        ..PipelineConfig::default()
    };
    let (left, right) = DataLoader::new(dir.path())
        .load_pair(&config.left_sheet, &config.right_sheet, &config.key_column)
        .unwrap();

    let err = Pipeline::new(config).run(&left, &right).unwrap_err();
    assert!(matches!(err, ProcessorError::KeyNotFound(k) if k == "Dec 2023"));
}

#[test]
fn test_schema_mismatch_reports_column() {
    let left = Table::from_frame(
        &df!("Time period" => ["Sep 2023"], "Total new housing" => [1.0]).unwrap(),
        "Time period",
    )
    .unwrap();
    let right = Table::from_frame(
        &df!("Time period" => ["Sep 2023"], "Total new housing" => [2.0]).unwrap(),
        "Time period",
    )
    .unwrap();

    let pipeline = Pipeline::new(PipelineConfig {
        window: keys(&["Sep 2023"]),
        ..PipelineConfig::default()
    });
    let output = pipeline.run(&left, &right).unwrap();
    let err = pipeline.derive_aggregates(&output.cleaned).unwrap_err();
    assert!(matches!(err, ProcessorError::MissingColumn(c) if c == "Public new housing_4a"));
}
