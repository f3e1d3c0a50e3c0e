use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML error in {}: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("line {line}: {message}")]
    WorkspaceSyntax { line: usize, message: String },

    #[error("{}: expected root element 'Project', got '{found}'", path.display())]
    UnexpectedRoot { path: PathBuf, found: String },

    #[error("malformed condition '{condition}': expected exactly one '=='")]
    MalformedCondition { condition: String },

    #[error("no such project: {0}")]
    ProjectNotFound(String),

    #[error("no global section named '{0}'")]
    SectionNotFound(String),

    #[error("file doesn't belong to the workspace: {}", .0.display())]
    FileNotInWorkspace(PathBuf),

    #[error("cache format error: {0}")]
    CacheFormat(#[from] bincode::Error),

    #[error("cache was saved with format {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
