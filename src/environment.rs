//! Build environments.
//!
//! An [`Environment`] is the set of `$(Var)` values a workspace is resolved
//! against: typically `Configuration` and `Platform`, plus whatever the caller
//! seeds from an environment file or the process environment.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Variable holding the configuration name (e.g. `Debug`).
pub const CONFIGURATION: &str = "Configuration";
/// Variable holding the platform name (e.g. `x64`).
pub const PLATFORM: &str = "Platform";

/// Immutable mapping of variable name → value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// An empty environment: every `$(Var)` resolves to the empty string.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortcut for the common `Configuration` + `Platform` pair.
    pub fn for_configuration(configuration: &str, platform: &str) -> Self {
        EnvironmentBuilder::new()
            .configuration(configuration)
            .platform(platform)
            .build()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Return a copy of this environment with `name` set to `value`.
    pub fn with_var(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut vars = self.vars.clone();
        vars.insert(name.into(), value.into());
        Self { vars }
    }

    /// The `Configuration|Platform` string used as a workspace configuration
    /// key, if both variables are set.
    pub fn configuration_platform(&self) -> Option<String> {
        let config = self.get(CONFIGURATION)?;
        let platform = self.get(PLATFORM)?;
        Some(format!("{config}|{platform}"))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl From<HashMap<String, String>> for Environment {
    fn from(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  EnvironmentBuilder
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for an [`Environment`].
///
/// Later calls override earlier values for the same key, so the order of
/// calls decides precedence.
///
/// # Example
/// ```
/// use sln_rs::EnvironmentBuilder;
///
/// let env = EnvironmentBuilder::new()
///     .env_file_contents("SolutionDir=C:\\src\\\n")
///     .configuration("Debug")
///     .platform("x64")
///     .build();
/// assert_eq!(env.get("Configuration"), Some("Debug"));
/// assert_eq!(env.get("SolutionDir"), Some("C:\\src\\"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EnvironmentBuilder {
    vars: HashMap<String, String>,
}

impl EnvironmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an entire variable map.
    pub fn vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars.extend(vars);
        self
    }

    /// Set a single variable.
    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn configuration(self, value: impl Into<String>) -> Self {
        self.var(CONFIGURATION, value)
    }

    pub fn platform(self, value: impl Into<String>) -> Self {
        self.var(PLATFORM, value)
    }

    /// Parse environment file contents (see [`crate::envfile`]) and merge the
    /// resulting variables.
    pub fn env_file_contents(self, content: &str) -> Self {
        let vars = crate::envfile::parse_env_file(content);
        self.vars(vars)
    }

    /// Read an environment file from disk and merge its variables.
    pub fn env_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let vars =
            crate::envfile::parse_env_file_path(path).map_err(|e| Error::io(path, e))?;
        Ok(self.vars(vars))
    }

    /// Pull all current process environment variables into the map.
    pub fn system_env(mut self) -> Self {
        self.vars.extend(std::env::vars());
        self
    }

    pub fn build(self) -> Environment {
        Environment { vars: self.vars }
    }
}
