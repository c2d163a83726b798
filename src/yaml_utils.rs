//! YAML utilities for session document preprocessing
//!
//! The simulator's session YAML has several non-standard issues that need
//! correction before a standard parser accepts it:
//! - Control characters that break YAML parsers
//! - Unquoted free-text values (driver and team names, livery strings) that
//!   may start with YAML indicator characters
//!
//! This module provides low-level YAML cleaning without parsing.

use crate::{Result, TelemetryError};

/// Keys whose values are free text typed by users or generated liveries
const FREE_TEXT_KEYS: &[&str] = &[
    "AbbrevName:",
    "TeamName:",
    "UserName:",
    "Initials:",
    "DriverSetupName:",
    "CarDesignStr:",
];

/// Preprocess session YAML to fix known issues
///
/// Removes control characters (except \n, \r, \t) and single-quotes the
/// values of free-text keys that are not already quoted.
/// Returns the cleaned YAML string ready for parsing.
pub fn preprocess_iracing_yaml(yaml: &str) -> Result<String> {
    let cleaned: String = yaml
        .chars()
        .filter(|ch| !ch.is_control() || matches!(ch, '\n' | '\r' | '\t'))
        .collect();

    if cleaned.trim().is_empty() {
        return Err(TelemetryError::Parse {
            context: "YAML preprocessing".to_string(),
            details: "YAML is empty after preprocessing".to_string(),
        });
    }

    let lines: Vec<String> = cleaned.lines().map(quote_free_text_value).collect();
    Ok(lines.join("\n"))
}

fn quote_free_text_value(line: &str) -> String {
    for &key in FREE_TEXT_KEYS {
        let Some(key_pos) = line.find(key) else {
            continue;
        };
        let after_colon = key_pos + key.len();
        let Some(value_offset) = line[after_colon..].find(|c: char| !c.is_whitespace()) else {
            return line.to_string();
        };
        let value_start = after_colon + value_offset;
        let value = line[value_start..].trim();

        if is_quoted_scalar(value) {
            return line.to_string();
        }

        return format!("{} '{}'", &line[..after_colon], value.replace('\'', "''"));
    }
    line.to_string()
}

/// Whether `value` is exactly one complete quoted scalar
fn is_quoted_scalar(value: &str) -> bool {
    (value.starts_with('\'') || value.starts_with('"'))
        && serde_yaml_ng::from_str::<String>(value).is_ok()
}
