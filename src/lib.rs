//! Parse Visual Studio workspaces (`.sln`) and the MSBuild projects they
//! reference, resolve configuration-dependent properties and items, and keep
//! a persisted index of which project owns which source file.
//!
//! ```no_run
//! use sln_rs::{Environment, WorkspaceCache};
//! use std::path::Path;
//!
//! let (cache, _) = WorkspaceCache::load_or_rebuild(
//!     "All.sln",
//!     Some(Path::new(".sln-cache/All.sln.bin")),
//! )?;
//! let project = cache.find_item_project(Path::new("C:/src/app/main.cpp"))?;
//! let env = Environment::for_configuration("Debug", "x64");
//! let env = cache.workspace().project_environment(&project.id, &env).unwrap_or(env);
//! if let Some(group) = project.resolved_default_property_group(&env)? {
//!     println!("{:?}", group.get("NMakePreprocessorDefinitions"));
//! }
//! # Ok::<(), sln_rs::Error>(())
//! ```

pub mod cache;
pub mod envfile;
pub mod environment;
pub mod error;
pub mod logging;
pub mod parser;
pub mod paths;
pub mod project;
pub mod resolve;
pub mod workspace;

pub use cache::{CACHE_FORMAT_VERSION, CacheIndex, CacheSource, WorkspaceCache};
pub use environment::{Environment, EnvironmentBuilder};
pub use error::{Error, Result};
pub use project::{
    Group, ItemGroup, Project, ProjectContent, ProjectItem, ProjectKind, ProjectProperty,
    PropertyGroup,
};
pub use workspace::{GlobalSection, GlobalSectionEntry, Workspace};
