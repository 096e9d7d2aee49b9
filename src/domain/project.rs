//! Project configuration records
//!
//! Fields are private: records are built through [`Schema::from_tree`] or the
//! validating constructors, and changed only through setters that re-run the
//! constraints and roll back on failure.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation::{validate_input_path, FieldKind, FieldSpec, RecordSchema, Schema, SchemaError};

/// Kind of data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFormat {
    #[serde(rename = "DB")]
    Db,
    #[serde(rename = "SAP")]
    Sap,
}

impl DataFormat {
    /// Accepted literal tags
    pub const TAGS: &'static [&'static str] = &["DB", "SAP"];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Db => "DB",
            DataFormat::Sap => "SAP",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input data configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    data_format: DataFormat,

    /// Directory or single file to read from
    #[validate(custom(function = "validate_input_path"))]
    input_path: PathBuf,

    start_date: NaiveDate,

    /// Lookback size
    #[validate(range(min = 1))]
    window: i64,
}

impl Schema for DataConfig {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        name: "DataConfig",
        fields: &[
            FieldSpec {
                name: "data_format",
                kind: FieldKind::Literal(DataFormat::TAGS),
            },
            FieldSpec {
                name: "input_path",
                kind: FieldKind::Path(validate_input_path),
            },
            FieldSpec {
                name: "start_date",
                kind: FieldKind::Date,
            },
            FieldSpec {
                name: "window",
                kind: FieldKind::Integer { min: Some(1), max: None },
            },
        ],
    };
}

impl DataConfig {
    pub fn new(
        data_format: DataFormat,
        input_path: impl Into<PathBuf>,
        start_date: NaiveDate,
        window: i64,
    ) -> Result<Self, SchemaError> {
        let config = Self {
            data_format,
            input_path: input_path.into(),
            start_date,
            window,
        };
        config.check()?;
        Ok(config)
    }

    pub fn data_format(&self) -> DataFormat {
        self.data_format
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn window(&self) -> i64 {
        self.window
    }

    pub fn set_data_format(&mut self, data_format: DataFormat) -> Result<(), SchemaError> {
        self.modify(|c| c.data_format = data_format)
    }

    pub fn set_input_path(&mut self, input_path: impl Into<PathBuf>) -> Result<(), SchemaError> {
        let input_path = input_path.into();
        self.modify(|c| c.input_path = input_path)
    }

    pub fn set_start_date(&mut self, start_date: NaiveDate) -> Result<(), SchemaError> {
        self.modify(|c| c.start_date = start_date)
    }

    pub fn set_window(&mut self, window: i64) -> Result<(), SchemaError> {
        self.modify(|c| c.window = window)
    }
}

impl fmt::Display for DataConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DataConfig(data_format={}, input_path={}, start_date={}, window={})",
            self.data_format,
            self.input_path.display(),
            self.start_date,
            self.window
        )
    }
}

/// Model hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    #[validate(range(min = 1))]
    num_estimators: i64,

    #[validate(range(min = 1))]
    max_depth: i64,
}

impl Schema for ModelConfig {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        name: "ModelConfig",
        fields: &[
            FieldSpec {
                name: "num_estimators",
                kind: FieldKind::Integer { min: Some(1), max: None },
            },
            FieldSpec {
                name: "max_depth",
                kind: FieldKind::Integer { min: Some(1), max: None },
            },
        ],
    };
}

impl ModelConfig {
    pub fn new(num_estimators: i64, max_depth: i64) -> Result<Self, SchemaError> {
        let config = Self {
            num_estimators,
            max_depth,
        };
        config.check()?;
        Ok(config)
    }

    pub fn num_estimators(&self) -> i64 {
        self.num_estimators
    }

    pub fn max_depth(&self) -> i64 {
        self.max_depth
    }

    pub fn set_num_estimators(&mut self, num_estimators: i64) -> Result<(), SchemaError> {
        self.modify(|c| c.num_estimators = num_estimators)
    }

    pub fn set_max_depth(&mut self, max_depth: i64) -> Result<(), SchemaError> {
        self.modify(|c| c.max_depth = max_depth)
    }
}

impl fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ModelConfig(num_estimators={}, max_depth={})",
            self.num_estimators, self.max_depth
        )
    }
}

/// Complete project configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[validate(nested)]
    data: DataConfig,

    #[validate(nested)]
    model: ModelConfig,
}

impl Schema for ProjectConfig {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        name: "ProjectConfig",
        fields: &[
            FieldSpec {
                name: "data",
                kind: FieldKind::Record(DataConfig::SCHEMA),
            },
            FieldSpec {
                name: "model",
                kind: FieldKind::Record(ModelConfig::SCHEMA),
            },
        ],
    };
}

impl ProjectConfig {
    pub fn new(data: DataConfig, model: ModelConfig) -> Result<Self, SchemaError> {
        let config = Self { data, model };
        config.check()?;
        Ok(config)
    }

    pub fn data(&self) -> &DataConfig {
        &self.data
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    /// Mutable access; the sub-record only exposes validating setters
    pub fn data_mut(&mut self) -> &mut DataConfig {
        &mut self.data
    }

    /// Mutable access; the sub-record only exposes validating setters
    pub fn model_mut(&mut self) -> &mut ModelConfig {
        &mut self.model
    }
}

impl fmt::Display for ProjectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data={} model={}", self.data, self.model)
    }
}
