//! Config composition
//!
//! Builds one tree out of the primary config file and the config-group files
//! named by its `defaults` list. Merging is delegated to the `config` crate:
//! every file becomes a source on a single builder, in defaults-list order,
//! so later sources override earlier ones key by key.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, File, FileFormat, Map, Source, Value as ConfigValue, ValueKind};
use serde_json::Value;
use tracing::debug;

use super::error::LoadError;

/// Key holding the defaults list in the primary config
pub const DEFAULTS_KEY: &str = "defaults";

/// Marker for the primary config's own position in the defaults list
pub const SELF_ENTRY: &str = "_self_";

const OPTIONAL_PREFIX: &str = "optional ";

const EXTENSIONS: [(&str, FileFormat); 4] = [
    ("yaml", FileFormat::Yaml),
    ("yml", FileFormat::Yaml),
    ("toml", FileFormat::Toml),
    ("json", FileFormat::Json),
];

/// A config file located on disk together with its format
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub format: FileFormat,
}

impl ConfigFile {
    /// Find `<dir>/<stem>.<ext>` for the first supported extension that exists
    pub fn locate(dir: &Path, stem: &str) -> Option<Self> {
        EXTENSIONS.iter().find_map(|(ext, format)| {
            let path = dir.join(format!("{stem}.{ext}"));
            path.is_file().then(|| ConfigFile {
                path,
                format: format.clone(),
            })
        })
    }

    fn source(&self) -> File<config::FileSourceFile, FileFormat> {
        File::from(self.path.as_path()).format(self.format.clone())
    }

    /// Parse this file on its own into an untyped tree
    pub fn read(&self) -> Result<Value, LoadError> {
        self.check_keys()?;
        Config::builder()
            .add_source(self.source())
            .build()
            .and_then(|config| config.try_deserialize::<Value>())
            .map_err(|e| LoadError::parse(&self.path, e))
    }

    /// Reject keys the `config` crate would split into nested paths
    pub fn check_keys(&self) -> Result<(), LoadError> {
        if !matches!(self.format, FileFormat::Yaml | FileFormat::Json) {
            return Ok(());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|e| LoadError::parse(&self.path, e))?;
        let tree: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|e| LoadError::parse(&self.path, e))?;
        match find_path_key(&tree) {
            Some(key) => Err(LoadError::parse(
                &self.path,
                format!("key '{key}' contains '.' or '['; nest it as a mapping instead"),
            )),
            None => Ok(()),
        }
    }
}

fn find_path_key(node: &serde_yaml::Value) -> Option<String> {
    match node {
        serde_yaml::Value::Mapping(map) => map.iter().find_map(|(key, value)| match key.as_str() {
            Some(k) if k.contains(['.', '[']) => Some(k.to_string()),
            _ => find_path_key(value),
        }),
        serde_yaml::Value::Sequence(items) => items.iter().find_map(find_path_key),
        serde_yaml::Value::Tagged(tagged) => find_path_key(&tagged.value),
        _ => None,
    }
}

/// One entry of a defaults list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultsEntry {
    /// The primary config's own content
    SelfRef,
    /// A config file merged at the root
    Config(String),
    /// One option of a config group, mounted under the group's key
    Group {
        group: String,
        option: Option<String>,
        optional: bool,
    },
}

/// Ordered composition plan read from the primary config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultsList {
    entries: Vec<DefaultsEntry>,
}

impl DefaultsList {
    /// Read the `defaults` key of a primary config tree
    pub fn from_tree(tree: &Value) -> Result<Self, LoadError> {
        let Some(raw) = tree.get(DEFAULTS_KEY) else {
            return Ok(Self::default());
        };
        let items = raw
            .as_array()
            .ok_or_else(|| LoadError::Defaults(format!("expected a list, found {}", type_name(raw))))?;

        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            entries.push(Self::parse_entry(item)?);
        }
        Ok(Self { entries })
    }

    fn parse_entry(item: &Value) -> Result<DefaultsEntry, LoadError> {
        match item {
            Value::String(name) if name == SELF_ENTRY => Ok(DefaultsEntry::SelfRef),
            Value::String(name) => Ok(DefaultsEntry::Config(name.clone())),
            Value::Object(map) => {
                let mut pairs = map.iter();
                let (Some((key, option)), None) = (pairs.next(), pairs.next()) else {
                    return Err(LoadError::Defaults(format!(
                        "entries must be a name or a single 'group: option' pair, found {item}"
                    )));
                };
                let (group, optional) = match key.strip_prefix(OPTIONAL_PREFIX) {
                    Some(rest) => (rest.trim(), true),
                    None => (key.as_str(), false),
                };
                let option = match option {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => {
                        return Err(LoadError::Defaults(format!(
                            "option for group '{group}' must be a string or null, found {}",
                            type_name(other)
                        )))
                    }
                };
                Ok(DefaultsEntry::Group {
                    group: normalize_group(group),
                    option,
                    optional,
                })
            }
            other => Err(LoadError::Defaults(format!(
                "entries must be a name or a single 'group: option' pair, found {other}"
            ))),
        }
    }

    pub fn entries(&self) -> &[DefaultsEntry] {
        &self.entries
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.group_option(group).is_some()
    }

    /// Selected option of a group; `Some(None)` for a declared but empty group
    pub fn group_option(&self, group: &str) -> Option<Option<&str>> {
        let group = normalize_group(group);
        self.entries.iter().find_map(|entry| match entry {
            DefaultsEntry::Group { group: g, option, .. } if *g == group => Some(option.as_deref()),
            _ => None,
        })
    }

    /// Replace the option of an existing group; returns false if the group is unknown
    pub fn select(&mut self, group: &str, choice: Option<String>) -> bool {
        let group = normalize_group(group);
        for entry in &mut self.entries {
            if let DefaultsEntry::Group { group: g, option, .. } = entry {
                if *g == group {
                    *option = choice;
                    return true;
                }
            }
        }
        false
    }

    /// Add a group entry at the end of the list
    pub fn append(&mut self, group: &str, option: Option<String>) {
        self.entries.push(DefaultsEntry::Group {
            group: normalize_group(group),
            option,
            optional: false,
        });
    }

    /// Drop a group entry; returns false if the group is unknown
    pub fn remove(&mut self, group: &str) -> bool {
        let group = normalize_group(group);
        let before = self.entries.len();
        self.entries
            .retain(|entry| !matches!(entry, DefaultsEntry::Group { group: g, .. } if *g == group));
        self.entries.len() != before
    }
}

/// Group names use `/` as separator; `.` is accepted on the command line
pub fn normalize_group(group: &str) -> String {
    group.trim().replace('.', "/")
}

/// Source that mounts a config file under a nested key
#[derive(Debug, Clone)]
pub struct MountedFile {
    mount: Vec<String>,
    file: ConfigFile,
}

impl MountedFile {
    pub fn new(group: &str, file: ConfigFile) -> Self {
        Self {
            mount: group.split('/').map(str::to_string).collect(),
            file,
        }
    }
}

impl Source for MountedFile {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, ConfigValue>, ConfigError> {
        let origin = self.file.path.display().to_string();
        let mut table = self.file.source().collect()?;
        for segment in self.mount.iter().rev() {
            let mut outer = Map::new();
            outer.insert(
                segment.clone(),
                ConfigValue::new(Some(&origin), ValueKind::Table(table)),
            );
            table = outer;
        }
        Ok(table)
    }
}

/// Merges the files named by a defaults list into one tree
pub struct Composer<'a> {
    config_dir: &'a Path,
    primary: &'a ConfigFile,
}

impl<'a> Composer<'a> {
    pub fn new(config_dir: &'a Path, primary: &'a ConfigFile) -> Self {
        Self {
            config_dir,
            primary,
        }
    }

    /// Compose the tree; returns it with the list of merged files in merge order
    pub fn compose(&self, defaults: &DefaultsList) -> Result<(Value, Vec<PathBuf>), LoadError> {
        let mut builder = Config::builder();
        let mut merged = Vec::new();
        let mut self_merged = false;

        for entry in defaults.entries() {
            match entry {
                DefaultsEntry::SelfRef => {
                    builder = builder.add_source(self.primary.source());
                    merged.push(self.primary.path.clone());
                    self_merged = true;
                }
                DefaultsEntry::Config(name) => {
                    let file = self.require(self.config_dir, name)?;
                    file.check_keys()?;
                    debug!(path = %file.path.display(), "Merging config file");
                    merged.push(file.path.clone());
                    builder = builder.add_source(file.source());
                }
                DefaultsEntry::Group { option: None, .. } => {}
                DefaultsEntry::Group {
                    group,
                    option: Some(option),
                    optional,
                } => {
                    let group_dir = self.config_dir.join(group);
                    let file = match ConfigFile::locate(&group_dir, option) {
                        Some(file) => file,
                        None if *optional => {
                            debug!(group = %group, option = %option, "Skipping missing optional group");
                            continue;
                        }
                        None => {
                            return Err(LoadError::MissingFile {
                                path: group_dir.join(format!("{option}.yaml")),
                            })
                        }
                    };
                    file.check_keys()?;
                    debug!(group = %group, path = %file.path.display(), "Merging config group");
                    merged.push(file.path.clone());
                    builder = builder.add_source(MountedFile::new(group, file));
                }
            }
        }

        if !self_merged {
            builder = builder.add_source(self.primary.source());
            merged.push(self.primary.path.clone());
        }

        let mut tree: Value = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| LoadError::Compose(e.to_string()))?;

        if let Value::Object(map) = &mut tree {
            map.remove(DEFAULTS_KEY);
        }
        Ok((tree, merged))
    }

    fn require(&self, dir: &Path, stem: &str) -> Result<ConfigFile, LoadError> {
        ConfigFile::locate(dir, stem).ok_or_else(|| LoadError::MissingFile {
            path: dir.join(format!("{stem}.yaml")),
        })
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
