//! YAML text form of a configuration tree

use serde_json::Value;

use super::error::LoadError;

/// Render a tree as YAML
pub fn to_yaml(tree: &Value) -> Result<String, LoadError> {
    Ok(serde_yaml::to_string(tree)?)
}

/// Parse YAML text back into a tree
pub fn from_yaml(text: &str) -> Result<Value, LoadError> {
    Ok(serde_yaml::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_keeps_tree() {
        let tree = json!({
            "data": {
                "data_format": "DB",
                "input_path": "/srv/data/db",
                "start_date": "2023-01-01",
                "window": 30
            },
            "model": {"num_estimators": 100, "max_depth": 8},
            "tricky": {
                "numeric_string": "42",
                "bool_string": "true",
                "null_string": "null",
                "missing": "???",
                "ratio": 0.25,
                "whole_float": 2.0,
                "empty": "",
                "nothing": null,
                "list": [1, "two", {"three": 3}],
                "empty_map": {}
            }
        });

        let text = to_yaml(&tree).unwrap();
        assert_eq!(from_yaml(&text).unwrap(), tree);
    }

    #[test]
    fn test_yaml_is_block_style() {
        let text = to_yaml(&json!({"model": {"max_depth": 8}})).unwrap();
        assert_eq!(text, "model:\n  max_depth: 8\n");
    }

    #[test]
    fn test_from_yaml_rejects_garbage() {
        assert!(from_yaml("a: [1, 2").is_err());
    }
}
