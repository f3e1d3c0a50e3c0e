//! Parse environment files into a variable map.
//!
//! An environment file pins the values a workspace is resolved against, for
//! instance the configuration an editor session is currently using:
//!
//! ```text
//! # current editor selection
//! Configuration=Debug
//! Platform=x64
//! OutDir=$(SolutionDir)build\$(Platform)
//! ```
//!
//! `$(Var)` references inside values are expanded against the variables
//! defined on earlier lines.

use std::collections::HashMap;

use crate::resolve::resolve_with;

/// Parse the **contents** of an environment file into a variable map.
///
/// Each `KEY=VALUE` line is parsed (key trimmed, value kept verbatim apart
/// from the line terminator). Blank lines and lines starting with `#` or `;`
/// are skipped, as are lines without `=` or with an empty key.
///
/// # Example
/// ```
/// let content = "
/// Root=C:\\work
/// Out=$(Root)\\out
/// ";
/// let vars = sln_rs::envfile::parse_env_file(content);
/// assert_eq!(vars["Root"], r"C:\work");
/// assert_eq!(vars["Out"], r"C:\work\out");
/// ```
pub fn parse_env_file(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let Some((key, raw_value)) = trimmed.split_once('=') else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let raw_value = raw_value.trim_end_matches('\r');
        let value = if raw_value.contains("$(") {
            resolve_with(raw_value, |name| vars.get(name).map(String::as_str))
        } else {
            raw_value.to_string()
        };

        vars.insert(key.to_string(), value);
    }

    vars
}

/// Read an environment file from disk into a variable map.
pub fn parse_env_file_path(
    path: impl AsRef<std::path::Path>,
) -> Result<HashMap<String, String>, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_env_file(&content))
}
