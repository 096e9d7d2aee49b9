//! End-to-end tests: compose, override, resolve, validate, mutate

use std::fs;

use chrono::NaiveDate;
use serde_json::json;

use crate::{
    config::{from_yaml, to_yaml, ConfigLoader, LoadError},
    domain::{DataFormat, ProjectConfig, Schema},
    infrastructure::{run_dir::SNAPSHOT_DIR, RunDir},
    shared::error::AppError,
    tests::{fixtures::ConfigFixture, TestResult},
    LoadAndValidateUseCase,
};

fn load_project(fixture: &ConfigFixture, overrides: &[&str]) -> Result<ProjectConfig, AppError> {
    let loaded = ConfigLoader::new(fixture.options(overrides)).load()?;
    Ok(ProjectConfig::from_tree(&loaded.tree)?)
}

fn schema_error(result: Result<ProjectConfig, AppError>) -> crate::domain::SchemaError {
    match result {
        Err(AppError::Validation(err)) => err,
        Err(other) => panic!("Expected Validation error, got {other:?}"),
        Ok(config) => panic!("Expected Validation error, got {config}"),
    }
}

#[test]
fn test_default_composition_validates() -> TestResult<()> {
    let fixture = ConfigFixture::new();
    let config = load_project(&fixture, &[])?;

    assert_eq!(config.data().data_format(), DataFormat::Db);
    assert_eq!(config.data().input_path(), fixture.data_dir().join("db"));
    assert_eq!(config.data().start_date(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
    assert_eq!(config.data().window(), 30);
    assert_eq!(config.model().num_estimators(), 100);
    assert_eq!(config.model().max_depth(), 8);
    Ok(())
}

#[test]
fn test_group_switch_and_interpolated_value() -> TestResult<()> {
    let fixture = ConfigFixture::new();
    let config = load_project(&fixture, &["data=sap", "model=stump"])?;

    assert_eq!(config.data().data_format(), DataFormat::Sap);
    assert!(config.data().input_path().is_file());
    // sap.yaml takes its window from model.max_depth
    assert_eq!(config.data().window(), 1);
    Ok(())
}

#[test]
fn test_later_override_wins() -> TestResult<()> {
    let fixture = ConfigFixture::new();
    let config = load_project(&fixture, &["data.window=5", "data.window=6"])?;
    assert_eq!(config.data().window(), 6);
    Ok(())
}

#[test]
fn test_integer_string_is_coerced() -> TestResult<()> {
    let fixture = ConfigFixture::new();
    let config = load_project(&fixture, &["data.window='45'", "model.max_depth=3.0"])?;
    assert_eq!(config.data().window(), 45);
    assert_eq!(config.model().max_depth(), 3);
    Ok(())
}

#[test]
fn test_all_violations_are_reported_together() {
    let fixture = ConfigFixture::new();
    let err = schema_error(load_project(
        &fixture,
        &[
            "data.data_format=CSV",
            "data.start_date=2023-13-01",
            "data.input_path=/nonexistent/layered-config",
            "~data.window",
            "++data.extra=1",
            "model.max_depth=true",
            "model.num_estimators=0",
        ],
    ));

    assert_eq!(err.model, "ProjectConfig");
    assert!(err.has("data.data_format", "literal_error"));
    assert!(err.has("data.start_date", "date_parsing"));
    assert!(err.has("data.input_path", "path_not_found"));
    assert!(err.has("data.window", "missing"));
    assert!(err.has("data.extra", "extra_forbidden"));
    assert!(err.has("model.max_depth", "int_type"));
    assert!(err.has("model.num_estimators", "range"));
    assert_eq!(err.violations.len(), 7);
    assert!(err.to_string().starts_with("7 validation errors for ProjectConfig"));
}

#[test]
fn test_missing_marker_is_reported_as_missing() {
    let fixture = ConfigFixture::new();
    let err = schema_error(load_project(&fixture, &["model.max_depth=???"]));
    assert!(err.has("model.max_depth", "missing"));
}

#[test]
fn test_unknown_top_level_section_is_rejected() {
    let fixture = ConfigFixture::new();
    let err = schema_error(load_project(&fixture, &["+trainer={epochs: 3}"]));
    assert!(err.has("trainer", "extra_forbidden"));
}

#[test]
fn test_removed_group_is_missing() {
    let fixture = ConfigFixture::new();
    let err = schema_error(load_project(&fixture, &["~model"]));
    assert!(err.has("model", "missing"));
}

#[test]
fn test_load_errors_are_not_validation_errors() {
    let fixture = ConfigFixture::new();
    assert!(matches!(
        load_project(&fixture, &["data=oracle"]),
        Err(AppError::Config(LoadError::MissingFile { .. }))
    ));
    assert!(matches!(
        load_project(&fixture, &["data.window=${data.nowhere}"]),
        Err(AppError::Config(LoadError::Interpolation { .. }))
    ));
    assert!(matches!(
        load_project(&fixture, &["data.window"]),
        Err(AppError::Config(LoadError::Override { .. }))
    ));
}

#[test]
fn test_mutation_is_validated_and_rejected_atomically() -> TestResult<()> {
    let fixture = ConfigFixture::new();
    let mut config = load_project(&fixture, &[])?;

    let err = config.data_mut().set_window(0).unwrap_err();
    assert!(err.has("window", "range"));
    assert_eq!(config.data().window(), 30);

    let err = config
        .data_mut()
        .set_input_path(fixture.root().join("missing"))
        .unwrap_err();
    assert!(err.has("input_path", "path_not_found"));
    assert_eq!(config.data().input_path(), fixture.data_dir().join("db"));

    config.model_mut().set_max_depth(12)?;
    config.data_mut().set_input_path(fixture.data_dir().join("export.csv"))?;
    assert_eq!(config.model().max_depth(), 12);
    assert!(config.data().input_path().is_file());
    Ok(())
}

#[test]
fn test_resolved_text_round_trips() -> TestResult<()> {
    let fixture = ConfigFixture::new();
    let loaded = ConfigLoader::new(fixture.options(&["data=sap"])).load()?;

    let text = to_yaml(&loaded.tree)?;
    assert!(!text.contains("${"));
    let reparsed = from_yaml(&text)?;
    assert_eq!(reparsed, loaded.tree);
    assert_eq!(ProjectConfig::from_tree(&reparsed)?, ProjectConfig::from_tree(&loaded.tree)?);
    Ok(())
}

#[test]
fn test_use_case_snapshot_matches_loaded_tree() -> TestResult<()> {
    let fixture = ConfigFixture::new();
    let run_dir = RunDir::create(fixture.root().join("outputs/run"))?;
    let overrides = ["model=stump", "data.window=9"];
    let use_case = LoadAndValidateUseCase::new(ConfigLoader::new(fixture.options(&overrides)), Some(run_dir.clone()));

    let config = use_case.execute()?;
    assert_eq!(config.data().window(), 9);

    let snapshot = run_dir.path().join(SNAPSHOT_DIR);
    let tree = from_yaml(&fs::read_to_string(snapshot.join("config.yaml"))?)?;
    assert_eq!(tree["model"], json!({"num_estimators": 1, "max_depth": 1}));
    assert_eq!(ProjectConfig::from_tree(&tree)?, config);

    let written = from_yaml(&fs::read_to_string(snapshot.join("overrides.yaml"))?)?;
    assert_eq!(written, json!(["model=stump", "data.window=9"]));
    Ok(())
}
