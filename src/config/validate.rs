//! Structural validation of raw configuration
//!
//! Runs on the untyped document before deserialization so every problem is
//! reported with the offending field path, and before any network action.

use crate::error::ConfigError;
use serde_json::{Map, Value};

fn section<'a>(root: &'a Map<String, Value>, name: &str) -> Result<&'a Map<String, Value>, ConfigError> {
    match root.get(name) {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(ConfigError::invalid(name, "must be an object")),
        None => Err(ConfigError::missing(name)),
    }
}

fn required_string(map: &Map<String, Value>, section: &str, key: &str) -> Result<(), ConfigError> {
    let field = format!("{}.{}", section, key);
    match map.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::String(_)) | None | Some(Value::Null) => Err(ConfigError::missing(field)),
        Some(_) => Err(ConfigError::invalid(field, "must be a string")),
    }
}

/// Repositories are `owner/name`
fn required_repository(map: &Map<String, Value>, section: &str) -> Result<(), ConfigError> {
    required_string(map, section, "repository")?;
    let repository = map.get("repository").and_then(Value::as_str).unwrap_or_default();
    match repository.trim().split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(())
        }
        _ => Err(ConfigError::invalid(
            format!("{}.repository", section),
            format!("'{}' must be in owner/name form", repository),
        )),
    }
}

fn optional_string(map: &Map<String, Value>, section: &str, key: &str) -> Result<(), ConfigError> {
    match map.get(key) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(ConfigError::invalid(
            format!("{}.{}", section, key),
            "must be a string",
        )),
    }
}

fn optional_bool(map: &Map<String, Value>, key: &str) -> Result<(), ConfigError> {
    match map.get(key) {
        None | Some(Value::Bool(_)) => Ok(()),
        Some(_) => Err(ConfigError::invalid(
            format!("policy.{}", key),
            "must be a boolean",
        )),
    }
}

fn string_array<'a>(map: &'a Map<String, Value>, key: &str) -> Result<Vec<&'a str>, ConfigError> {
    let field = format!("policy.{}", key);
    let items = match map.get(key) {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ConfigError::invalid(field, "must be an array of strings")),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) if s.trim().is_empty() => Err(ConfigError::invalid(
                format!("{}[{}]", field, i),
                "cannot be an empty string",
            )),
            Value::String(s) => Ok(s.as_str()),
            _ => Err(ConfigError::invalid(
                format!("{}[{}]", field, i),
                "must be a string",
            )),
        })
        .collect()
}

/// Check that `policy.allowMajor` is not `true`
///
/// Kept separate so the check runs before every other rule: a config
/// asserting major updates is rejected whatever else is wrong with it.
fn reject_major_updates(root: &Map<String, Value>) -> Result<(), ConfigError> {
    let allow_major = root
        .get("policy")
        .and_then(|p| p.get("allowMajor"))
        .and_then(Value::as_bool);
    if allow_major == Some(true) {
        return Err(ConfigError::MajorUpdatesForbidden);
    }
    Ok(())
}

/// Validate a raw configuration document
pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| ConfigError::invalid("config", "must be a valid object"))?;

    reject_major_updates(root)?;

    let target = section(root, "target")?;
    required_repository(target, "target")?;
    optional_string(target, "target", "branch")?;

    let governance = section(root, "governance")?;
    required_repository(governance, "governance")?;
    match governance.get("epicNumber") {
        Some(Value::Number(n)) if n.as_u64().is_some_and(|n| n > 0) => {}
        Some(Value::Number(_)) => {
            return Err(ConfigError::invalid(
                "governance.epicNumber",
                "must be a positive integer",
            ))
        }
        Some(_) => {
            return Err(ConfigError::invalid(
                "governance.epicNumber",
                "must be a number",
            ))
        }
        None => return Err(ConfigError::missing("governance.epicNumber")),
    }

    let policy = match root.get("policy") {
        None => return Ok(()),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ConfigError::invalid("policy", "must be an object")),
    };

    for key in ["allowPatch", "allowMinor", "allowMajor"] {
        optional_bool(policy, key)?;
    }

    string_array(policy, "denylist")?;
    for pattern in string_array(policy, "excludePatterns")? {
        glob::Pattern::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
    }

    Ok(())
}
