//! Command-line override grammar
//!
//! `key=value` sets an existing key, `+key=value` adds a new one,
//! `++key=value` sets or adds, `~key[=value]` deletes.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::compose::type_name;
use super::error::LoadError;

static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*(?:[./][A-Za-z_][A-Za-z0-9_\-]*)*$")
        .expect("override key pattern is valid")
});

/// What an override does to its key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKind {
    Set,
    Add,
    ForceAdd,
    Delete,
}

/// One parsed command-line override
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub kind: OverrideKind,
    pub key: String,
    pub value: Option<Value>,
    pub input: String,
}

impl FromStr for Override {
    type Err = LoadError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = if let Some(rest) = input.strip_prefix("++") {
            (OverrideKind::ForceAdd, rest)
        } else if let Some(rest) = input.strip_prefix('+') {
            (OverrideKind::Add, rest)
        } else if let Some(rest) = input.strip_prefix('~') {
            (OverrideKind::Delete, rest)
        } else {
            (OverrideKind::Set, input)
        };

        let (key, raw_value) = match rest.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value)),
            None if kind == OverrideKind::Delete => (rest.trim(), None),
            None => return Err(LoadError::invalid_override(input, "expected 'key=value'")),
        };

        if !KEY_PATTERN.is_match(key) {
            return Err(LoadError::invalid_override(input, format!("'{key}' is not a valid dotted key")));
        }

        let value = raw_value
            .map(|raw| parse_value(raw).map_err(|reason| LoadError::invalid_override(input, reason)))
            .transpose()?;

        Ok(Override {
            kind,
            key: key.to_string(),
            value,
            input: input.to_string(),
        })
    }
}

impl Override {
    /// Parse every argument, stopping at the first malformed one
    pub fn parse_all<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Self>, LoadError> {
        inputs.iter().map(|s| s.as_ref().parse()).collect()
    }

    /// Key segments; `/` and `.` both separate segments
    pub fn segments(&self) -> Vec<&str> {
        self.key.split(['.', '/']).collect()
    }

    /// Apply this override to a composed tree
    pub fn apply(&self, tree: &mut Value) -> Result<(), LoadError> {
        let segments = self.segments();
        let (leaf, parents) = segments
            .split_last()
            .ok_or_else(|| LoadError::invalid_override(&self.input, "empty key"))?;
        let create = matches!(self.kind, OverrideKind::Add | OverrideKind::ForceAdd);
        let parent = self.parent_mut(tree, parents, create)?;

        match self.kind {
            OverrideKind::Set => match parent.get_mut(*leaf) {
                Some(slot) => *slot = self.value.clone().unwrap_or(Value::Null),
                None => {
                    return Err(self.fail(format!(
                        "key '{}' is not in the config; use '+{}' to add it",
                        self.key, self.input
                    )))
                }
            },
            OverrideKind::Add => {
                if parent.contains_key(*leaf) {
                    return Err(self.fail(format!(
                        "key '{}' already exists; use '+{}' to override it",
                        self.key, self.input
                    )));
                }
                parent.insert(leaf.to_string(), self.value.clone().unwrap_or(Value::Null));
            }
            OverrideKind::ForceAdd => {
                parent.insert(leaf.to_string(), self.value.clone().unwrap_or(Value::Null));
            }
            OverrideKind::Delete => {
                let Some(current) = parent.get(*leaf) else {
                    return Err(self.fail(format!("key '{}' is not in the config", self.key)));
                };
                if let Some(expected) = &self.value {
                    if current != expected {
                        return Err(self.fail(format!(
                            "current value of '{}' is {current}, not {expected}",
                            self.key
                        )));
                    }
                }
                parent.remove(*leaf);
            }
        }
        Ok(())
    }

    fn parent_mut<'t>(
        &self,
        tree: &'t mut Value,
        parents: &[&str],
        create: bool,
    ) -> Result<&'t mut Map<String, Value>, LoadError> {
        let mut node = tree;
        for (depth, segment) in parents.iter().enumerate() {
            let map = node
                .as_object_mut()
                .ok_or_else(|| self.not_a_mapping(&parents[..depth]))?;
            if !map.contains_key(*segment) {
                if !create {
                    return Err(self.fail(format!(
                        "key '{}' is not in the config",
                        parents[..=depth].join(".")
                    )));
                }
                map.insert(segment.to_string(), Value::Object(Map::new()));
            }
            node = map
                .get_mut(*segment)
                .ok_or_else(|| self.not_a_mapping(&parents[..=depth]))?;
        }
        let kind = type_name(node);
        node.as_object_mut()
            .ok_or_else(|| self.fail(format!("'{}' is a {kind}, not a mapping", parents.join("."))))
    }

    fn not_a_mapping(&self, path: &[&str]) -> LoadError {
        self.fail(format!("'{}' is not a mapping", path.join(".")))
    }

    fn fail(&self, reason: String) -> LoadError {
        LoadError::invalid_override(&self.input, reason)
    }
}

/// Parse an override value as a YAML flow value
///
/// Block-style mappings and sequences are not recognised: `a: b` stays the
/// string `"a: b"`. An empty value is the empty string.
pub fn parse_value(raw: &str) -> Result<Value, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::String(String::new()));
    }
    let flow = trimmed.starts_with('[') || trimmed.starts_with('{');
    match serde_yaml::from_str::<Value>(trimmed) {
        Ok(value @ (Value::Array(_) | Value::Object(_))) if flow => Ok(value),
        Ok(Value::Array(_) | Value::Object(_)) => Ok(Value::String(trimmed.to_string())),
        Ok(value) => Ok(value),
        Err(e) if flow => Err(format!("cannot parse value '{trimmed}': {e}")),
        Err(_) => Ok(Value::String(trimmed.to_string())),
    }
}
