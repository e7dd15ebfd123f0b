//! `npm outdated --json` report parsing and change-type derivation

use crate::domain::{ChangeType, Dependency, DependencyLocation};
use crate::error::ScanError;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

/// One entry of the structured outdated report
#[derive(Debug, Default, Deserialize)]
struct OutdatedEntry {
    current: Option<String>,
    wanted: Option<String>,
    latest: Option<String>,
    #[serde(rename = "type")]
    location: Option<String>,
}

/// Split a version into three numeric components after stripping one
/// leading range/prefix marker. Components that are missing or not numeric
/// are `None`.
fn components(version: &str) -> [Option<u64>; 3] {
    let version = version
        .strip_prefix(['v', '^', '~'])
        .unwrap_or(version);
    let mut parts = version.split('.').map(|p| p.parse::<u64>().ok());
    [
        parts.next().flatten(),
        parts.next().flatten(),
        parts.next().flatten(),
    ]
}

fn greater(target: Option<u64>, current: Option<u64>) -> bool {
    matches!((target, current), (Some(t), Some(c)) if t > c)
}

/// Classify the jump from `current` to `target`
///
/// Major if the target major exceeds the current one, else minor if the
/// target minor does, else patch. Ties and unparseable input also yield
/// patch.
pub fn determine_change_type(current: &str, target: &str) -> ChangeType {
    let [cur_major, cur_minor, _] = components(current);
    let [tgt_major, tgt_minor, _] = components(target);

    if greater(tgt_major, cur_major) {
        ChangeType::Major
    } else if greater(tgt_minor, cur_minor) {
        ChangeType::Minor
    } else {
        ChangeType::Patch
    }
}

/// Parse the JSON emitted by `npm outdated --json`
///
/// Entries keep the order the tool emitted them in.
pub fn parse_npm_outdated(output: &str) -> Result<Vec<Dependency>, ScanError> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }

    let report: Map<String, Value> =
        serde_json::from_str(output).map_err(|e| ScanError::ParseFailed {
            message: e.to_string(),
        })?;

    let mut dependencies = Vec::with_capacity(report.len());

    for (package, value) in report {
        let entry: OutdatedEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping outdated entry for {}: {}", package, e);
                continue;
            }
        };

        let latest = entry.latest.unwrap_or_else(|| "unknown".to_string());
        let wanted = entry.wanted.unwrap_or_else(|| latest.clone());
        let current = entry.current.unwrap_or_else(|| "unknown".to_string());
        let change_type = determine_change_type(&current, &wanted);

        dependencies.push(
            Dependency::new(package, current, wanted, latest, change_type)
                .with_location(DependencyLocation::from_npm_type(entry.location.as_deref())),
        );
    }

    Ok(dependencies)
}
