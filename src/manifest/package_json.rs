//! Format-preserving version rewrites for package.json
//!
//! Only the version string of the named package changes. Key order,
//! indentation and the range operator in front of the version survive.

use crate::error::ManifestError;
use regex::Regex;
use serde_json::Value;

/// File name of the Node.js manifest
pub const PACKAGE_JSON: &str = "package.json";

/// Sections a package can be declared in
pub const DEPENDENCY_SECTIONS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "optionalDependencies",
    "peerDependencies",
];

/// Split a version spec into its range operator and the version itself,
/// e.g. `^4.17.1` → (`^`, `4.17.1`). Returns None for specs that are not a
/// single semver range (tags, URLs, workspace refs, compound ranges,
/// wildcards such as `1.x` or `*`).
fn split_spec(spec: &str) -> Option<(&str, &str)> {
    let version_start = spec
        .find(|c: char| c.is_ascii_digit() || c == 'v')
        .unwrap_or(spec.len());
    let (prefix, version) = spec.split_at(version_start);

    let prefix_ok = matches!(
        prefix.trim_end(),
        "" | "^" | "~" | ">=" | "<=" | ">" | "<" | "="
    );
    let version_ok = version
        .trim_start_matches('v')
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
        && !version.contains(char::is_whitespace)
        && !version.contains("||")
        && !has_wildcard(version);

    (prefix_ok && version_ok).then_some((prefix, version))
}

/// `1.x`, `1.2.*` and friends; prerelease and build tags are not inspected
fn has_wildcard(version: &str) -> bool {
    version
        .split(['-', '+'])
        .next()
        .unwrap_or(version)
        .split('.')
        .any(|part| matches!(part, "x" | "X" | "*"))
}

/// Render the replacement spec, keeping the original range operator
pub fn format_updated_spec(old_spec: &str, new_version: &str) -> Option<String> {
    let (prefix, _) = split_spec(old_spec)?;
    Some(format!("{}{}", prefix, new_version))
}

/// Byte range of the object value of `"section": { ... }`, braces included
fn section_span(content: &str, section: &str) -> Option<(usize, usize)> {
    let re = Regex::new(&format!(r#""{}"\s*:\s*\{{"#, regex::escape(section))).ok()?;
    let m = re.find(content)?;
    let start = m.end() - 1;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in content[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + offset + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// Update the declared version of `package` to `new_version`
///
/// Every dependency section declaring the package is rewritten.
pub fn update_dependency_version(
    content: &str,
    package: &str,
    new_version: &str,
) -> Result<String, ManifestError> {
    let json: Value = serde_json::from_str(content).map_err(|e| ManifestError::JsonParseError {
        path: PACKAGE_JSON.to_string(),
        message: e.to_string(),
    })?;

    let declared: Vec<(&str, &str)> = DEPENDENCY_SECTIONS
        .iter()
        .filter_map(|section| {
            json.get(section)
                .and_then(|deps| deps.get(package))
                .and_then(Value::as_str)
                .map(|spec| (*section, spec))
        })
        .collect();

    if declared.is_empty() {
        return Err(ManifestError::DependencyNotFound {
            package: package.to_string(),
            path: PACKAGE_JSON.to_string(),
        });
    }

    let entry = Regex::new(&format!(r#"("{}"\s*:\s*)"([^"]*)""#, regex::escape(package)))
        .map_err(|e| ManifestError::JsonParseError {
            path: PACKAGE_JSON.to_string(),
            message: e.to_string(),
        })?;

    let mut result = content.to_string();
    for (section, spec) in declared {
        let new_spec =
            format_updated_spec(spec, new_version).ok_or_else(|| ManifestError::UnsupportedSpec {
                package: package.to_string(),
                spec: spec.to_string(),
            })?;

        let Some((start, end)) = section_span(&result, section) else {
            continue;
        };
        let replaced = entry
            .replace(&result[start..end], |caps: &regex::Captures| {
                format!(r#"{}"{}""#, &caps[1], new_spec)
            })
            .into_owned();
        result.replace_range(start..end, &replaced);
    }

    Ok(result)
}
