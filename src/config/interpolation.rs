//! Interpolation of `${...}` expressions in a composed tree
//!
//! Supported forms:
//! - `${a.b.c}` absolute node reference
//! - `${.b}`, `${..c}` references relative to the node holding the value
//! - `${name:args}` resolver calls (`oc.env`, `oc.select`, `now`)
//!
//! A value made of a single expression takes the type of what it resolves
//! to; expressions embedded in text are stringified. `\${` is a literal `${`.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{DateTime, Local};
use serde_json::{Map, Value};

use super::error::LoadError;
use super::overrides::parse_value;

/// Marker for a mandatory value that has not been provided
pub const MISSING: &str = "???";

type EnvLookup = Box<dyn Fn(&str) -> Option<String>>;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Expr(String),
}

/// Resolves every interpolation of a tree against that same tree
pub struct Interpolator<'a> {
    root: &'a Value,
    env: EnvLookup,
    now: DateTime<Local>,
    resolving: Vec<String>,
    cache: HashMap<String, Value>,
}

impl<'a> Interpolator<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            env: Box::new(|name| std::env::var(name).ok()),
            now: Local::now(),
            resolving: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Replace the environment lookup used by `oc.env`
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Pin the clock used by `now`
    pub fn with_now(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    /// Produce a fully resolved copy of the tree
    pub fn resolve(mut self) -> Result<Value, LoadError> {
        let root = self.root;
        self.resolve_value(root, &mut Vec::new())
    }

    fn resolve_value(&mut self, node: &Value, path: &mut Vec<String>) -> Result<Value, LoadError> {
        match node {
            Value::String(text) => self.resolve_string_node(text, path),
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, child) in map {
                    path.push(key.clone());
                    let resolved = self.resolve_value(child, path);
                    path.pop();
                    out.insert(key.clone(), resolved?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, child) in items.iter().enumerate() {
                    path.push(index.to_string());
                    let resolved = self.resolve_value(child, path);
                    path.pop();
                    out.push(resolved?);
                }
                Ok(Value::Array(out))
            }
            other => Ok(other.clone()),
        }
    }

    fn resolve_string_node(&mut self, text: &str, path: &[String]) -> Result<Value, LoadError> {
        if !text.contains("${") {
            return Ok(Value::String(text.to_string()));
        }
        let key = path.join(".");
        if let Some(done) = self.cache.get(&key) {
            return Ok(done.clone());
        }
        if self.resolving.contains(&key) {
            let mut chain = self.resolving.clone();
            chain.push(key.clone());
            return Err(LoadError::interpolation(
                &key,
                format!("reference cycle: {}", chain.join(" -> ")),
            ));
        }

        self.resolving.push(key.clone());
        let resolved = self.resolve_text(text, path);
        self.resolving.pop();

        let resolved = resolved?;
        self.cache.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Resolve a string that may hold expressions; `path` is the node it lives at
    fn resolve_text(&mut self, text: &str, path: &[String]) -> Result<Value, LoadError> {
        let segments = split_segments(text).map_err(|reason| LoadError::interpolation(path.join("."), reason))?;

        if let [Segment::Expr(expr)] = segments.as_slice() {
            return self.evaluate(expr, path);
        }

        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Text(literal) => out.push_str(&literal),
                Segment::Expr(expr) => out.push_str(&stringify(&self.evaluate(&expr, path)?)),
            }
        }
        Ok(Value::String(out))
    }

    fn evaluate(&mut self, expr: &str, path: &[String]) -> Result<Value, LoadError> {
        let expr = if expr.contains("${") {
            match self.resolve_text(expr, path)? {
                Value::String(s) => s,
                other => stringify(&other),
            }
        } else {
            expr.to_string()
        };
        let expr = expr.trim();

        if let Some((name, args)) = split_resolver(expr) {
            return self.call_resolver(name, args, path);
        }
        self.select(expr, path)?
            .ok_or_else(|| LoadError::interpolation(path.join("."), format!("key '{expr}' not found")))
    }

    /// Look up and resolve the node a reference points at
    fn select(&mut self, reference: &str, path: &[String]) -> Result<Option<Value>, LoadError> {
        let target = target_path(reference, path)
            .ok_or_else(|| LoadError::interpolation(path.join("."), format!("'{reference}' goes above the root")))?;
        let root = self.root;
        let Some(node) = lookup(root, &target) else {
            return Ok(None);
        };
        if node.as_str() == Some(MISSING) {
            return Err(LoadError::interpolation(
                path.join("."),
                format!("'{reference}' is a missing mandatory value"),
            ));
        }
        let mut target = target;
        self.resolve_value(node, &mut target).map(Some)
    }

    fn call_resolver(&mut self, name: &str, args: &str, path: &[String]) -> Result<Value, LoadError> {
        let node = path.join(".");
        match name {
            "oc.env" => {
                let (var, default) = split_default(args);
                match (self.env)(var) {
                    Some(value) => Ok(Value::String(value)),
                    None => default
                        .map(|d| Value::String(d.to_string()))
                        .ok_or_else(|| {
                            LoadError::interpolation(&node, format!("environment variable '{var}' is not set"))
                        }),
                }
            }
            "oc.select" => {
                let (reference, default) = split_default(args);
                match self.select(reference, path)? {
                    Some(value) => Ok(value),
                    None => match default {
                        Some(d) => parse_value(d).map_err(|reason| LoadError::interpolation(&node, reason)),
                        None => Ok(Value::Null),
                    },
                }
            }
            "now" => {
                let mut out = String::new();
                write!(out, "{}", self.now.format(args))
                    .map_err(|_| LoadError::interpolation(&node, format!("invalid time format '{args}'")))?;
                Ok(Value::String(out))
            }
            other => Err(LoadError::interpolation(node, format!("unknown resolver '{other}'"))),
        }
    }
}

/// Resolve every interpolation in `tree` using the process environment
pub fn resolve(tree: &Value) -> Result<Value, LoadError> {
    Interpolator::new(tree).resolve()
}

fn split_segments(text: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("\\${") {
            literal.push_str("${");
            rest = after;
        } else if let Some(after) = rest.strip_prefix("${") {
            let end = matching_brace(after).ok_or_else(|| format!("unterminated interpolation in '{text}'"))?;
            if !literal.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Expr(after[..end].to_string()));
            rest = &after[end + 1..];
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                literal.push(c);
            }
            rest = chars.as_str();
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Text(literal));
    }
    Ok(segments)
}

/// Byte offset of the `}` closing an expression whose `${` was just consumed
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 1;
            }
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

fn split_resolver(expr: &str) -> Option<(&str, &str)> {
    let (name, args) = expr.split_once(':')?;
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    valid.then_some((name, args))
}

fn split_default(args: &str) -> (&str, Option<&str>) {
    match args.split_once(',') {
        Some((first, default)) => (first.trim(), Some(default.trim())),
        None => (args.trim(), None),
    }
}

/// Absolute path of a reference made from the node at `path`
fn target_path(reference: &str, path: &[String]) -> Option<Vec<String>> {
    let dots = reference.chars().take_while(|c| *c == '.').count();
    let rest = &reference[dots..];
    let mut target: Vec<String> = if dots == 0 {
        Vec::new()
    } else {
        // one dot is the container of the current node, each extra dot goes up one level
        let container_len = path.len().checked_sub(1)?;
        let keep = container_len.checked_sub(dots - 1)?;
        path[..keep].to_vec()
    };
    target.extend(rest.split('.').filter(|s| !s.is_empty()).map(str::to_string));
    Some(target)
}

fn lookup<'v>(root: &'v Value, path: &[String]) -> Option<&'v Value> {
    path.iter().try_fold(root, |node, key| match node {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
