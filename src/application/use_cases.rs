//! Use cases - Application operations

use tracing::{debug, info};

use crate::{
    config::{to_yaml, ConfigLoader, LoadedConfig},
    domain::{ProjectConfig, Schema},
    infrastructure::RunDir,
    shared::{error::AppResult, logging::LoggingUtils},
};

/// Use case for loading, logging and validating the project configuration
pub struct LoadAndValidateUseCase {
    loader: ConfigLoader,
    run_dir: Option<RunDir>,
}

impl LoadAndValidateUseCase {
    /// Create a new use case
    pub fn new(loader: ConfigLoader, run_dir: Option<RunDir>) -> Self {
        Self { loader, run_dir }
    }

    /// Load and resolve the configuration tree without validating it
    pub fn load(&self) -> AppResult<LoadedConfig> {
        let loaded = self.loader.load()?;
        for source in &loaded.sources {
            debug!(path = %source.display(), "Config source merged");
        }
        Ok(loaded)
    }

    /// Execute the full flow: load, log, snapshot, validate, log
    pub fn execute(&self) -> AppResult<ProjectConfig> {
        let loaded = self.load()?;
        LoggingUtils::log_config_tree(&to_yaml(&loaded.tree)?);

        if let Some(run_dir) = &self.run_dir {
            run_dir.write_snapshot(&loaded.tree, &loaded.overrides)?;
        }

        let config = ProjectConfig::from_tree(&loaded.tree)?;
        LoggingUtils::log_project_config(&config);
        info!(
            data_format = %config.data().data_format(),
            window = config.data().window(),
            "Configuration validated"
        );

        LoggingUtils::log_examples();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderOptions;
    use crate::shared::error::AppError;
    use crate::tests::fixtures::ConfigFixture;

    #[test]
    fn test_execute_returns_validated_config() {
        let fixture = ConfigFixture::new();
        let use_case = LoadAndValidateUseCase::new(ConfigLoader::new(fixture.options(&[])), None);

        let config = use_case.execute().unwrap();
        assert_eq!(config.data().window(), 30);
        assert_eq!(config.model().max_depth(), 8);
    }

    #[test]
    fn test_execute_writes_snapshot() {
        let fixture = ConfigFixture::new();
        let run_dir = RunDir::create(fixture.root().join("run")).unwrap();
        let use_case = LoadAndValidateUseCase::new(
            ConfigLoader::new(fixture.options(&["data.window=10"])),
            Some(run_dir.clone()),
        );

        use_case.execute().unwrap();
        let snapshot = run_dir.path().join(crate::infrastructure::run_dir::SNAPSHOT_DIR);
        assert!(snapshot.join("config.yaml").is_file());
        assert!(snapshot.join("overrides.yaml").is_file());
    }

    #[test]
    fn test_validation_failure_is_surfaced() {
        let fixture = ConfigFixture::new();
        let use_case = LoadAndValidateUseCase::new(
            ConfigLoader::new(fixture.options(&["data.data_format=CSV", "model.max_depth=0"])),
            None,
        );

        match use_case.execute().unwrap_err() {
            AppError::Validation(err) => {
                assert!(err.has("data.data_format", "literal_error"));
                assert!(err.has("model.max_depth", "range"));
            }
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_failure_is_surfaced() {
        let use_case = LoadAndValidateUseCase::new(
            ConfigLoader::new(LoaderOptions {
                config_dir: "/nonexistent/config".into(),
                ..LoaderOptions::default()
            }),
            None,
        );
        assert!(matches!(use_case.execute().unwrap_err(), AppError::Config(_)));
    }
}
