//! File-ownership index and its persisted, timestamp-validated cache.
//!
//! A cache file holds a format version, the parsed [`Workspace`] (including
//! every loaded project) and the [`CacheIndex`], written back to back with
//! `bincode`. A cache is only trusted when it is strictly newer than the
//! workspace file and than every non-folder project file.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bincode::Options;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::paths;
use crate::project::Project;
use crate::workspace::Workspace;

/// Bumped whenever the persisted layout changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Fixed-width little-endian layout shared by every section of the file.
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

/// Open a cache file for reading, with the number of bytes it holds. No
/// single section may claim more than that.
fn open_cache(path: &Path) -> Result<(BufReader<File>, u64)> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let len = file.metadata().map_err(|e| Error::io(path, e))?.len();
    Ok((BufReader::new(file), len))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  CacheIndex
// ═══════════════════════════════════════════════════════════════════════════════

/// Project file → lower-cased absolute paths of its source items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheIndex {
    projects: BTreeMap<PathBuf, BTreeSet<String>>,
}

impl CacheIndex {
    /// Index the source items of every non-folder project's default item
    /// group. Loads each project that is not loaded yet.
    pub fn build(workspace: &Workspace) -> Result<Self> {
        let mut projects = BTreeMap::new();
        for project in workspace.non_folder_projects() {
            let Some(group) = project.default_item_group()? else {
                continue;
            };
            if group.members.is_empty() {
                continue;
            }
            let items: BTreeSet<String> = group
                .source_items()
                .map(|item| paths::index_key(&project.item_abs_path(item)))
                .collect();
            debug!(project = %project.name, items = items.len(), "indexed project");
            projects.insert(project.abs_path().to_path_buf(), items);
        }
        Ok(Self { projects })
    }

    /// The project file owning `path`, compared case-insensitively.
    ///
    /// When several projects list the same file, the one with the smallest
    /// project path wins.
    pub fn owner_of(&self, path: &Path) -> Option<&Path> {
        let key = paths::index_key(&paths::normalize(path));
        self.projects
            .iter()
            .find(|(_, items)| items.contains(&key))
            .map(|(project, _)| project.as_path())
    }

    pub fn items(&self, project_path: &Path) -> Option<&BTreeSet<String>> {
        self.projects.get(project_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &BTreeSet<String>)> {
        self.projects.iter().map(|(p, items)| (p.as_path(), items))
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Freshness
// ═══════════════════════════════════════════════════════════════════════════════

/// `true` when a cache written at `cache` is still valid: strictly newer than
/// the workspace file and than every project file. A `None` project time
/// (missing file) makes the cache stale.
pub fn is_fresh(
    cache: SystemTime,
    workspace: SystemTime,
    projects: impl IntoIterator<Item = Option<SystemTime>>,
) -> bool {
    workspace < cache
        && projects
            .into_iter()
            .all(|modified| modified.is_some_and(|m| m < cache))
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  WorkspaceCache
// ═══════════════════════════════════════════════════════════════════════════════

/// Where a [`WorkspaceCache`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Loaded from a valid cache file.
    Persisted,
    /// Parsed from the workspace and project files.
    Rebuilt,
}

/// A workspace together with its file-ownership index.
#[derive(Debug, Clone)]
pub struct WorkspaceCache {
    workspace: Workspace,
    index: CacheIndex,
}

impl WorkspaceCache {
    /// Index `workspace`, loading its projects.
    pub fn new(workspace: Workspace) -> Result<Self> {
        let index = CacheIndex::build(&workspace)?;
        Ok(Self { workspace, index })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn index(&self) -> &CacheIndex {
        &self.index
    }

    /// Load the cache at `cache_path` if it is still valid, otherwise parse
    /// the workspace again and (when a cache path is given) persist the
    /// result.
    ///
    /// Stale, unreadable or mismatched caches are never an error; only
    /// failures to parse the workspace or its projects, or to write the new
    /// cache, are.
    pub fn load_or_rebuild(
        workspace_path: impl AsRef<Path>,
        cache_path: Option<&Path>,
    ) -> Result<(Self, CacheSource)> {
        let workspace_path = workspace_path.as_ref();

        if let Some(cache_path) = cache_path {
            if let Some(cache) = Self::try_load(workspace_path, cache_path) {
                return Ok((cache, CacheSource::Persisted));
            }
        }

        let cache = Self::new(Workspace::from_file(workspace_path)?)?;
        if let Some(cache_path) = cache_path {
            debug!(path = %cache_path.display(), "regenerating cache");
            cache.save(cache_path)?;
        }
        Ok((cache, CacheSource::Rebuilt))
    }

    /// The cache at `cache_path`, or `None` if it is missing, unreadable or
    /// stale.
    pub fn try_load(workspace_path: &Path, cache_path: &Path) -> Option<Self> {
        let (Some(workspace_mtime), Some(cache_mtime)) =
            (modified(workspace_path), modified(cache_path))
        else {
            debug!("can't read workspace or cache timestamps");
            return None;
        };

        if workspace_mtime >= cache_mtime {
            debug!("workspace is newer than cache");
            return None;
        }

        // No project can have been added or removed since the workspace file
        // is older than the cache, so the body is worth reading.
        let cache = match Self::load_unchecked(cache_path) {
            Ok(cache) => cache,
            Err(Error::VersionMismatch { found, expected }) => {
                debug!(found, expected, path = %cache_path.display(), "cache was saved with another format");
                return None;
            }
            Err(err) => {
                warn!(error = %err, path = %cache_path.display(), "discarding unreadable cache");
                return None;
            }
        };

        let project_mtimes = cache.workspace.non_folder_projects().map(|p| {
            let mtime = modified(p.abs_path());
            if mtime.is_none() {
                debug!(path = %p.abs_path().display(), "found missing project");
            }
            mtime
        });

        if is_fresh(cache_mtime, workspace_mtime, project_mtimes) {
            debug!(path = %cache_path.display(), "cache is up to date");
            Some(cache)
        } else {
            debug!("cache has outdated projects");
            None
        }
    }

    /// Write the cache, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut writer = BufWriter::new(file);
        codec().serialize_into(&mut writer, &CACHE_FORMAT_VERSION)?;
        codec().serialize_into(&mut writer, &self.workspace)?;
        codec().serialize_into(&mut writer, &self.index)?;
        writer.flush().map_err(|e| Error::io(path, e))?;
        Ok(())
    }

    /// Read only the format version of a cache file.
    pub fn read_version(path: &Path) -> Result<u32> {
        let (reader, len) = open_cache(path)?;
        Ok(codec().with_limit(len).deserialize_from(reader)?)
    }

    /// Read a cache file without checking timestamps.
    ///
    /// Fails with [`Error::VersionMismatch`] if it was written with another
    /// format version.
    pub fn load_unchecked(path: &Path) -> Result<Self> {
        let (mut reader, len) = open_cache(path)?;

        let found: u32 = codec().with_limit(len).deserialize_from(&mut reader)?;
        if found != CACHE_FORMAT_VERSION {
            return Err(Error::VersionMismatch {
                found,
                expected: CACHE_FORMAT_VERSION,
            });
        }

        let workspace: Workspace = codec().with_limit(len).deserialize_from(&mut reader)?;
        let index: CacheIndex = codec().with_limit(len).deserialize_from(&mut reader)?;
        Ok(Self { workspace, index })
    }

    /// The project owning the source file at `path`.
    pub fn find_item_project(&self, path: &Path) -> Result<&Project> {
        let owner = self
            .index
            .owner_of(path)
            .ok_or_else(|| Error::FileNotInWorkspace(path.to_path_buf()))?;
        self.workspace
            .find_project_by_path(owner)
            .ok_or_else(|| Error::ProjectNotFound(owner.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::project::{ITEM_TYPE_CL_COMPILE, ITEM_TYPE_COMPILE, ItemGroup, ProjectContent, ProjectItem};

    const SAMPLE: &str = include_str!("../testdata/Sample.sln");
    const APP_PROJECT: &str = include_str!("../testdata/App/App.vcxproj");
    const LIB_PROJECT: &str = include_str!("../testdata/Lib/Lib.csproj");

    /// The sample workspace rooted at `/work`, with contents attached so
    /// nothing is read from disk.
    fn sample_workspace() -> Workspace {
        let mut ws = Workspace::parse(SAMPLE, "/work/Sample.sln").unwrap();
        for project in &mut ws.projects {
            let source = match project.name.as_str() {
                "App" => APP_PROJECT,
                "Lib" => LIB_PROJECT,
                _ => continue,
            };
            let content = ProjectContent::parse(source, project.abs_path()).unwrap();
            *project = project.clone().with_content(content);
        }
        ws
    }

    const NO_PROJECTS: [Option<SystemTime>; 0] = [];

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    // ── Freshness ────────────────────────────────────────────────────────

    #[test]
    fn fresh_when_everything_is_older() {
        assert!(is_fresh(at(100), at(50), [Some(at(10)), Some(at(99))]));
        assert!(is_fresh(at(100), at(50), NO_PROJECTS));
    }

    #[test]
    fn stale_when_workspace_is_newer_or_equal() {
        assert!(!is_fresh(at(100), at(100), NO_PROJECTS));
        assert!(!is_fresh(at(100), at(101), NO_PROJECTS));
    }

    #[test]
    fn stale_when_a_project_is_newer_or_equal() {
        assert!(!is_fresh(at(100), at(50), [Some(at(10)), Some(at(100))]));
        assert!(!is_fresh(at(100), at(50), [Some(at(150))]));
    }

    #[test]
    fn stale_when_a_project_is_missing() {
        assert!(!is_fresh(at(100), at(50), [Some(at(10)), None]));
    }

    // ── Index ────────────────────────────────────────────────────────────

    #[test]
    fn index_lists_source_items_per_project() {
        let ws = sample_workspace();
        let index = CacheIndex::build(&ws).unwrap();
        assert_eq!(index.len(), 2);

        let app = Path::new("/work").join("App").join("App.vcxproj");
        let app_items = index.items(&app).unwrap();
        // Conditional items are not part of the unresolved default group.
        assert_eq!(app_items.len(), 3);
        let main = paths::index_key(&Path::new("/work").join("App").join("src").join("main.cpp"));
        assert!(app_items.contains(&main));

        let lib = Path::new("/work").join("Lib").join("Lib.csproj");
        assert_eq!(index.items(&lib).unwrap().len(), 2);
    }

    #[test]
    fn index_skips_projects_without_default_item_group() {
        let mut ws = Workspace::parse(SAMPLE, "/work/Sample.sln").unwrap();
        let lib = ws.find_project_by_name_mut("Lib").unwrap();
        *lib = lib.clone().with_content(ProjectContent::default());
        let app = ws.find_project_by_name_mut("App").unwrap();
        let mut group = ItemGroup::new(None);
        group.push(ProjectItem::new("a.cpp", ITEM_TYPE_CL_COMPILE));
        *app = app.clone().with_content(ProjectContent {
            item_groups: vec![group],
            property_groups: Vec::new(),
        });

        let index = CacheIndex::build(&ws).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn index_skips_default_group_with_only_conditional_items() {
        let mut ws = sample_workspace();
        let lib = ws.find_project_by_name_mut("Lib").unwrap();
        let mut group = ItemGroup::new(None);
        group
            .conditional_mut("'$(Configuration)'=='Debug'")
            .push(ProjectItem::new("Debug.cs", ITEM_TYPE_COMPILE));
        *lib = lib.clone().with_content(ProjectContent {
            item_groups: vec![group],
            property_groups: Vec::new(),
        });

        let index = CacheIndex::build(&ws).unwrap();
        assert_eq!(index.len(), 1);
        let lib = Path::new("/work").join("Lib").join("Lib.csproj");
        assert!(index.items(&lib).is_none());
    }

    #[test]
    fn owner_lookup_ignores_case() {
        let cache = WorkspaceCache::new(sample_workspace()).unwrap();
        let shouting = Path::new("/WORK").join("APP").join("SRC").join("MAIN.CPP");
        assert_eq!(cache.find_item_project(&shouting).unwrap().name, "App");

        let cs = Path::new("/work").join("Lib").join("Properties").join("AssemblyInfo.cs");
        assert_eq!(cache.find_item_project(&cs).unwrap().name, "Lib");
    }

    #[test]
    fn owner_lookup_normalizes_input() {
        let cache = WorkspaceCache::new(sample_workspace()).unwrap();
        let roundabout = Path::new("/work/Lib/../App/./include/app.h");
        assert_eq!(cache.find_item_project(roundabout).unwrap().name, "App");
    }

    #[test]
    fn unknown_file_is_not_in_workspace() {
        let cache = WorkspaceCache::new(sample_workspace()).unwrap();
        // README.md is a `None` item, not a source item.
        let readme = Path::new("/work").join("App").join("README.md");
        assert!(matches!(
            cache.find_item_project(&readme),
            Err(Error::FileNotInWorkspace(_))
        ));
    }

    // ── Persistence ──────────────────────────────────────────────────────

    #[test]
    fn save_and_load_keep_loaded_projects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.bin");

        let cache = WorkspaceCache::new(sample_workspace()).unwrap();
        cache.save(&path).unwrap();
        assert_eq!(WorkspaceCache::read_version(&path).unwrap(), CACHE_FORMAT_VERSION);

        let loaded = WorkspaceCache::load_unchecked(&path).unwrap();
        assert_eq!(loaded.index(), cache.index());
        let app = loaded.workspace().find_project_by_name("App").unwrap();
        assert!(app.is_loaded());
        assert_eq!(app.source_files().unwrap().len(), 3);
        let folder = loaded.workspace().find_project_by_name("Libraries").unwrap();
        assert!(folder.is_folder());
    }

    #[test]
    fn load_rejects_other_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let mut bytes = bincode::serialize(&(CACHE_FORMAT_VERSION + 1)).unwrap();
        bytes.extend_from_slice(b"whatever follows");
        std::fs::write(&path, bytes).unwrap();

        match WorkspaceCache::load_unchecked(&path) {
            Err(Error::VersionMismatch { found, expected }) => {
                assert_eq!(found, CACHE_FORMAT_VERSION + 1);
                assert_eq!(expected, CACHE_FORMAT_VERSION);
            }
            other => panic!("expected VersionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn load_rejects_oversized_length_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let mut bytes = bincode::serialize(&CACHE_FORMAT_VERSION).unwrap();
        bytes.extend_from_slice(&(1u64 << 46).to_le_bytes());
        bytes.extend_from_slice(b"garbage");
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            WorkspaceCache::load_unchecked(&path),
            Err(Error::CacheFormat(_))
        ));
    }

    #[test]
    fn load_rejects_truncated_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        std::fs::write(&path, bincode::serialize(&CACHE_FORMAT_VERSION).unwrap()).unwrap();
        assert!(matches!(
            WorkspaceCache::load_unchecked(&path),
            Err(Error::CacheFormat(_))
        ));
    }
}
