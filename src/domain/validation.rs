//! Schema validation of untyped configuration trees
//!
//! Every record declares a field table ([`RecordSchema`]). Checking a tree
//! against it collects all violations in one pass: missing fields, unknown
//! fields, type errors and value constraints. Only a clean tree is turned
//! into the typed record, whose `Validate` impl then runs as the
//! construction-time check.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::config::MISSING;

/// Path used for violations that concern the whole tree
pub const ROOT_PATH: &str = "<root>";

/// Date format accepted for date fields
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One violated constraint
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Dotted field path, e.g. `data.input_path`
    pub path: String,
    /// Constraint code, e.g. `missing`, `literal_error`, `range`
    pub code: String,
    pub message: String,
    /// Offending input, when there is one
    pub input: Option<Value>,
}

impl Violation {
    pub fn new(path: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
            message: message.into(),
            input: None,
        }
    }

    pub fn with_input(mut self, input: &Value) -> Self {
        self.input = Some(input.clone());
        self
    }

    /// Convert a `validator` error raised for the field at `path`
    pub fn from_validation_error(path: &str, error: &ValidationError) -> Self {
        let message = match &error.message {
            Some(message) => message.to_string(),
            None => describe(error),
        };
        Self {
            path: path.to_string(),
            code: error.code.to_string(),
            message,
            input: error.params.get("value").cloned(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [code={}", self.path, self.message, self.code)?;
        if let Some(input) = &self.input {
            write!(f, ", input={input}")?;
        }
        write!(f, "]")
    }
}

fn describe(error: &ValidationError) -> String {
    match error.code.as_ref() {
        "range" => match (error.params.get("min"), error.params.get("max")) {
            (Some(min), Some(max)) => format!("Input should be between {min} and {max}"),
            (Some(min), None) => format!("Input should be greater than or equal to {min}"),
            (None, Some(max)) => format!("Input should be less than or equal to {max}"),
            (None, None) => "Input is out of range".to_string(),
        },
        code => format!("Constraint '{code}' failed"),
    }
}

/// All violations found while validating one record
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    pub model: String,
    pub violations: Vec<Violation>,
}

impl SchemaError {
    pub fn new(model: impl Into<String>, mut violations: Vec<Violation>) -> Self {
        violations.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.code.cmp(&b.code)));
        Self {
            model: model.into(),
            violations,
        }
    }

    /// Flatten the nested errors of a `Validate` run
    pub fn from_validation(model: impl Into<String>, errors: &ValidationErrors) -> Self {
        let mut violations = Vec::new();
        flatten(errors, "", &mut violations);
        Self::new(model, violations)
    }

    /// First violation reported for a field path
    pub fn find(&self, path: &str) -> Option<&Violation> {
        self.violations.iter().find(|v| v.path == path)
    }

    /// Whether `path` was reported with `code`
    pub fn has(&self, path: &str, code: &str) -> bool {
        self.violations.iter().any(|v| v.path == path && v.code == code)
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.violations.len();
        let noun = if count == 1 { "error" } else { "errors" };
        write!(f, "{count} validation {noun} for {}", self.model)?;
        for violation in &self.violations {
            write!(f, "\n  {violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

fn flatten(errors: &ValidationErrors, prefix: &str, out: &mut Vec<Violation>) {
    for (field, kind) in errors.errors() {
        let path = join(prefix, &field.to_string());
        match kind {
            ValidationErrorsKind::Field(list) => {
                out.extend(list.iter().map(|e| Violation::from_validation_error(&path, e)));
            }
            ValidationErrorsKind::Struct(inner) => flatten(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(inner, &join(&path, &index.to_string()), out);
                }
            }
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Check run against an existing path
pub type PathCheck = fn(&Path) -> Result<(), ValidationError>;

/// Type and constraint of one field
#[derive(Clone, Copy)]
pub enum FieldKind {
    Integer { min: Option<i64>, max: Option<i64> },
    Date,
    Literal(&'static [&'static str]),
    Path(PathCheck),
    Record(&'static RecordSchema),
}

/// One declared field
#[derive(Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Declared fields of a record; anything else is rejected
pub struct RecordSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl RecordSchema {
    /// Check `value` and return it with coercions applied
    ///
    /// The returned tree only deserializes cleanly when `out` gained no
    /// violations.
    pub fn check(&self, value: &Value, prefix: &str, out: &mut Vec<Violation>) -> Value {
        let Some(map) = value.as_object() else {
            let path = if prefix.is_empty() { ROOT_PATH } else { prefix };
            out.push(
                Violation::new(
                    path,
                    "dict_type",
                    format!("Input should be a valid mapping for {}", self.name),
                )
                .with_input(value),
            );
            return value.clone();
        };

        let mut normalized = Map::new();
        for field in self.fields {
            let path = join(prefix, field.name);
            match map.get(field.name) {
                None => out.push(Violation::new(&path, "missing", "Field required")),
                Some(Value::String(s)) if s == MISSING => {
                    out.push(Violation::new(&path, "missing", "Field required (value is missing)"))
                }
                Some(raw) => {
                    normalized.insert(field.name.to_string(), field.kind.check(raw, &path, out));
                }
            }
        }

        for (key, raw) in map {
            if !self.fields.iter().any(|f| f.name == key) {
                out.push(
                    Violation::new(join(prefix, key), "extra_forbidden", "Extra inputs are not permitted")
                        .with_input(raw),
                );
            }
        }
        Value::Object(normalized)
    }
}

impl FieldKind {
    fn check(&self, raw: &Value, path: &str, out: &mut Vec<Violation>) -> Value {
        match self {
            FieldKind::Integer { min, max } => match coerce_int(raw) {
                Ok(n) => {
                    if let Err(e) = check_range(n, *min, *max) {
                        out.push(Violation::from_validation_error(path, &e));
                    }
                    Value::from(n)
                }
                Err(violation) => {
                    out.push(violation.at(path).with_input(raw));
                    raw.clone()
                }
            },
            FieldKind::Date => {
                match raw.as_str() {
                    Some(s) if NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).is_ok() => {
                        return Value::String(s.trim().to_string())
                    }
                    Some(_) => out.push(
                        Violation::new(path, "date_parsing", "Input should be a valid date in the format YYYY-MM-DD")
                            .with_input(raw),
                    ),
                    None => out.push(Violation::new(path, "date_type", "Input should be a valid date").with_input(raw)),
                }
                raw.clone()
            }
            FieldKind::Literal(options) => {
                if !raw.as_str().is_some_and(|s| options.contains(&s)) {
                    let expected = options
                        .iter()
                        .map(|o| format!("'{o}'"))
                        .collect::<Vec<_>>()
                        .join(" or ");
                    out.push(
                        Violation::new(path, "literal_error", format!("Input should be {expected}")).with_input(raw),
                    );
                }
                raw.clone()
            }
            FieldKind::Path(check) => {
                match raw.as_str() {
                    Some(s) if !s.is_empty() => {
                        if let Err(e) = check(Path::new(s)) {
                            out.push(Violation::from_validation_error(path, &e));
                        }
                    }
                    _ => out.push(Violation::new(path, "path_type", "Input is not a valid path").with_input(raw)),
                }
                raw.clone()
            }
            FieldKind::Record(schema) => schema.check(raw, path, out),
        }
    }
}

/// Pending violation whose path is filled in by the caller
struct Unplaced {
    code: &'static str,
    message: &'static str,
}

impl Unplaced {
    fn at(self, path: &str) -> Violation {
        Violation::new(path, self.code, self.message)
    }
}

fn coerce_int(raw: &Value) -> Result<i64, Unplaced> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => Ok(f as i64),
                Some(f) if f.is_finite() && f.fract() != 0.0 => Err(Unplaced {
                    code: "int_from_float",
                    message: "Input should be a valid integer, got a number with a fractional part",
                }),
                _ => Err(Unplaced {
                    code: "int_type",
                    message: "Input should be a valid integer",
                }),
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| Unplaced {
            code: "int_parsing",
            message: "Input should be a valid integer, unable to parse string as an integer",
        }),
        _ => Err(Unplaced {
            code: "int_type",
            message: "Input should be a valid integer",
        }),
    }
}

/// Range check producing the same error shape as `#[validate(range(...))]`
pub fn check_range(value: i64, min: Option<i64>, max: Option<i64>) -> Result<(), ValidationError> {
    let below = min.is_some_and(|m| value < m);
    let above = max.is_some_and(|m| value > m);
    if !below && !above {
        return Ok(());
    }
    let mut error = ValidationError::new("range");
    if let Some(min) = min {
        error.add_param(Cow::from("min"), &min);
    }
    if let Some(max) = max {
        error.add_param(Cow::from("max"), &max);
    }
    error.add_param(Cow::from("value"), &value);
    Err(error)
}

/// An input path must exist and be a directory or a regular file
pub fn validate_input_path(path: &Path) -> Result<(), ValidationError> {
    let shown = path.display().to_string();
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() || meta.is_file() => Ok(()),
        Ok(_) => {
            let mut error = ValidationError::new("path_kind");
            error.message = Some(Cow::from(format!(
                "Path '{shown}' is neither a directory nor a regular file"
            )));
            error.add_param(Cow::from("value"), &shown);
            Err(error)
        }
        Err(_) => {
            let mut error = ValidationError::new("path_not_found");
            error.message = Some(Cow::from(format!("Path '{shown}' does not exist")));
            error.add_param(Cow::from("value"), &shown);
            Err(error)
        }
    }
}

/// A typed record that can be built from, and is checked against, a field table
pub trait Schema: Sized + Clone + DeserializeOwned + Validate {
    const SCHEMA: &'static RecordSchema;

    /// Validate an untyped tree and build the record
    fn from_tree(tree: &Value) -> Result<Self, SchemaError> {
        let mut violations = Vec::new();
        let normalized = Self::SCHEMA.check(tree, "", &mut violations);
        if !violations.is_empty() {
            return Err(SchemaError::new(Self::SCHEMA.name, violations));
        }

        let record: Self = serde_json::from_value(normalized).map_err(|e| {
            SchemaError::new(
                Self::SCHEMA.name,
                vec![Violation::new(ROOT_PATH, "deserialize", e.to_string())],
            )
        })?;
        record.check()?;
        Ok(record)
    }

    /// Run the record's constraints
    fn check(&self) -> Result<(), SchemaError> {
        self.validate()
            .map_err(|errors| SchemaError::from_validation(Self::SCHEMA.name, &errors))
    }

    /// Mutate the record; the change is kept only if the result still validates
    fn modify<F>(&mut self, change: F) -> Result<(), SchemaError>
    where
        F: FnOnce(&mut Self),
    {
        let mut candidate = self.clone();
        change(&mut candidate);
        candidate.check()?;
        *self = candidate;
        Ok(())
    }
}
