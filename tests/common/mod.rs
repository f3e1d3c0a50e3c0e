use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

pub const SAMPLE: &str = include_str!("../../testdata/Sample.sln");
pub const APP_PROJECT: &str = include_str!("../../testdata/App/App.vcxproj");
pub const LIB_PROJECT: &str = include_str!("../../testdata/Lib/Lib.csproj");

/// The sample workspace laid out in a temporary directory.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Sample.sln"), SAMPLE).unwrap();
        std::fs::create_dir(dir.path().join("App")).unwrap();
        std::fs::write(dir.path().join("App").join("App.vcxproj"), APP_PROJECT).unwrap();
        std::fs::create_dir(dir.path().join("Lib")).unwrap();
        std::fs::write(dir.path().join("Lib").join("Lib.csproj"), LIB_PROJECT).unwrap();
        Self { dir }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.dir.path().to_path_buf(), |acc, part| acc.join(part))
    }

    pub fn workspace(&self) -> PathBuf {
        self.path("Sample.sln")
    }

    pub fn projects(&self) -> [PathBuf; 2] {
        [self.path("App/App.vcxproj"), self.path("Lib/Lib.csproj")]
    }

    pub fn cache(&self) -> PathBuf {
        self.path(".sln-cache/Sample.sln.bin")
    }

    /// Give the workspace and project files `base` as their mtime and the
    /// cache `base + cache_offset` seconds.
    pub fn set_times(&self, base: SystemTime, cache_offset: u64) {
        set_mtime(&self.workspace(), base);
        for project in self.projects() {
            set_mtime(&project, base);
        }
        set_mtime(&self.cache(), base + Duration::from_secs(cache_offset));
    }
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

/// A fixed point comfortably in the past.
pub fn base_time() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000)
}
