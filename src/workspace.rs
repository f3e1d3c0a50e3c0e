//! Workspace document model.
//!
//! A [`Workspace`] is the parsed form of a `.sln` file: its projects in
//! declaration order plus the `GlobalSection` blocks that map workspace
//! configurations to project configurations and describe folder nesting.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::environment::{CONFIGURATION, Environment, PLATFORM};
use crate::error::{Error, Result};
use crate::parser;
use crate::paths;
use crate::project::Project;

pub const SOLUTION_CONFIGURATION_PLATFORMS: &str = "SolutionConfigurationPlatforms";
pub const PROJECT_CONFIGURATION_PLATFORMS: &str = "ProjectConfigurationPlatforms";
pub const NESTED_PROJECTS: &str = "NestedProjects";

// ═══════════════════════════════════════════════════════════════════════════════
//  Global sections
// ═══════════════════════════════════════════════════════════════════════════════

/// One `name = value` line of a global section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSectionEntry {
    pub name: String,
    pub value: String,
}

/// A `GlobalSection(name) = step` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSection {
    pub name: String,
    /// `preSolution` or `postSolution`; kept but not interpreted.
    pub step: String,
    pub entries: Vec<GlobalSectionEntry>,
}

impl GlobalSection {
    pub fn new(name: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            step: step.into(),
            entries: Vec::new(),
        }
    }

    /// Value of the first entry called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }
}

fn strip_braces(id: &str) -> &str {
    id.trim_start_matches('{').trim_end_matches('}')
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Workspace
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// Path of the workspace file.
    pub path: PathBuf,
    pub projects: Vec<Project>,
    pub sections: Vec<GlobalSection>,
}

impl Workspace {
    /// Parse workspace text. Project paths are anchored at the directory of
    /// `path`, which is not read.
    pub fn parse(text: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
        let parsed = parser::parse_workspace(text)?;

        let projects = parsed
            .projects
            .into_iter()
            .map(|d| Project::new(d.type_id, d.name, d.path, d.id, &dir))
            .collect();

        Ok(Self {
            path,
            projects,
            sections: parsed.sections,
        })
    }

    /// Read and parse a workspace file. The stored path is made absolute so
    /// project paths are too.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let abs_path =
            paths::normalize(&std::path::absolute(path).map_err(|e| Error::io(path, e))?);
        debug!(path = %abs_path.display(), "reading workspace");
        let text = std::fs::read_to_string(&abs_path).map_err(|e| Error::io(&abs_path, e))?;
        Self::parse(&text, abs_path)
    }

    /// Directory containing the workspace file.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    // ── Project lookups ─────────────────────────────────────────────────

    pub fn find_project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn find_project_by_name_mut(&mut self, name: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.name == name)
    }

    /// Find the project whose file is `path`. Relative paths are taken
    /// relative to the workspace directory; the comparison ignores case.
    pub fn find_project_by_path(&self, path: &Path) -> Option<&Project> {
        let wanted = paths::index_key(&paths::normalize(&self.dir().join(path)));
        self.projects
            .iter()
            .find(|p| paths::index_key(p.abs_path()) == wanted)
    }

    /// Find a project by id, with or without braces, ignoring case.
    pub fn find_project_by_id(&self, id: &str) -> Option<&Project> {
        let id = strip_braces(id);
        self.projects.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    /// Like [`find_project_by_name`](Self::find_project_by_name), but fails
    /// with [`Error::ProjectNotFound`].
    pub fn project(&self, name: &str) -> Result<&Project> {
        self.find_project_by_name(name)
            .ok_or_else(|| Error::ProjectNotFound(name.to_string()))
    }

    pub fn non_folder_projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter().filter(|p| !p.is_folder())
    }

    // ── Global sections ─────────────────────────────────────────────────

    /// The first section called `name`.
    pub fn global_section(&self, name: &str) -> Option<&GlobalSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Like [`global_section`](Self::global_section), but fails with
    /// [`Error::SectionNotFound`].
    pub fn require_global_section(&self, name: &str) -> Result<&GlobalSection> {
        self.global_section(name)
            .ok_or_else(|| Error::SectionNotFound(name.to_string()))
    }

    /// The project configuration (`Config|Platform`) built for
    /// `workspace_config` (also `Config|Platform`), taken from the
    /// `{ID}.<workspace_config>.Build.0` entry.
    pub fn find_project_configuration(
        &self,
        project_id: &str,
        workspace_config: &str,
    ) -> Option<&str> {
        let section = self.global_section(PROJECT_CONFIGURATION_PLATFORMS)?;
        let entry = format!("{{{}}}.{workspace_config}.Build.0", strip_braces(project_id));
        section.get(&entry)
    }

    /// Every `(workspace config, project config)` pair declared for a
    /// project, in declaration order and without duplicates.
    pub fn project_configurations(&self, project_id: &str) -> Vec<(&str, &str)> {
        let Some(section) = self.global_section(PROJECT_CONFIGURATION_PLATFORMS) else {
            return Vec::new();
        };
        let prefix = format!("{{{}}}.", strip_braces(project_id));

        let mut pairs: Vec<(&str, &str)> = Vec::new();
        for entry in &section.entries {
            let Some(rest) = entry.name.strip_prefix(&prefix) else {
                continue;
            };
            let workspace_config = rest
                .strip_suffix(".ActiveCfg")
                .or_else(|| rest.strip_suffix(".Build.0"))
                .unwrap_or(rest);
            let pair = (workspace_config, entry.value.as_str());
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
        pairs
    }

    /// Derive the environment to resolve a project with: the workspace
    /// `Configuration|Platform` in `env` is mapped to the project's own
    /// configuration and platform, everything else is kept.
    ///
    /// Returns `None` when `env` lacks either variable or the workspace has
    /// no mapping for the project.
    pub fn project_environment(&self, project_id: &str, env: &Environment) -> Option<Environment> {
        let workspace_config = env.configuration_platform()?;
        let project_config = self.find_project_configuration(project_id, &workspace_config)?;
        let (configuration, platform) = project_config.split_once('|')?;
        debug!(
            project = project_id,
            workspace_config = %workspace_config,
            project_config,
            "mapped project configuration"
        );
        Some(
            env.with_var(CONFIGURATION, configuration)
                .with_var(PLATFORM, platform),
        )
    }

    /// Names of the workspace configurations, skipping the `Invalid`
    /// placeholders some generators emit.
    pub fn solution_configurations(&self) -> Vec<&str> {
        let Some(section) = self.global_section(SOLUTION_CONFIGURATION_PLATFORMS) else {
            return Vec::new();
        };
        section
            .entries
            .iter()
            .map(|e| e.name.as_str())
            .filter(|name| !name.split('|').any(|part| part == "Invalid"))
            .collect()
    }

    /// `Parent\Child` name of a project, following the `NestedProjects`
    /// section up through its folders.
    pub fn full_name(&self, project: &Project) -> String {
        let parents: HashMap<String, &str> = self
            .global_section(NESTED_PROJECTS)
            .map(|s| {
                s.entries
                    .iter()
                    .map(|e| {
                        (
                            strip_braces(&e.name).to_ascii_uppercase(),
                            strip_braces(&e.value),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut full_name = project.name.clone();
        let mut current = project.id.to_ascii_uppercase();
        // Guard against cyclic nesting.
        for _ in 0..self.projects.len() {
            let Some(parent) = parents
                .get(&current)
                .and_then(|id| self.find_project_by_id(id))
            else {
                break;
            };
            full_name = format!("{}\\{full_name}", parent.name);
            current = parent.id.to_ascii_uppercase();
        }
        full_name
    }
}
