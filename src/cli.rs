//! Command-line arguments for `sln`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};

#[derive(Parser)]
#[command(
    name = "sln",
    version,
    about = "Query Visual Studio workspaces and their MSBuild projects",
    long_about = "Query Visual Studio workspaces (.sln) and the MSBuild projects they \
                  reference.\n\nParsed workspaces are kept in a cache file next to the \
                  workspace and reused until the workspace or one of its projects changes."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the projects of a workspace (folders excluded).
    Projects {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        /// Prefix each name with its enclosing folders.
        #[arg(short = 'f', long = "full-names")]
        full_names: bool,
    },

    /// List the source files of every project, or of one project.
    Files {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        /// Only list files of this project.
        #[arg(short = 'p', long = "project", value_name = "NAME")]
        project: Option<String>,
    },

    /// List the workspace configurations.
    Configs {
        #[command(flatten)]
        workspace: WorkspaceArgs,
    },

    /// Print the project configuration used for a workspace configuration.
    ProjectConfig {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        /// Project name.
        #[arg(value_name = "PROJECT")]
        project: String,

        /// Workspace configuration, e.g. `Debug|x64`.
        #[arg(value_name = "WS_CONFIG")]
        workspace_config: String,
    },

    /// Print the project a source file belongs to.
    Owner {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        /// Source file to look up.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print a project's properties resolved for a build environment.
    Properties {
        #[command(flatten)]
        workspace: WorkspaceArgs,

        #[command(flatten)]
        env: EnvArgs,

        /// Project name.
        #[arg(value_name = "PROJECT")]
        project: String,

        /// Property group label (default: the unlabeled group).
        #[arg(short = 'l', long = "label", value_name = "LABEL")]
        label: Option<String>,
    },

    /// Parse the workspace and write its cache if it is stale.
    BuildCache {
        #[command(flatten)]
        workspace: WorkspaceArgs,
    },

    /// Print a summary of a cache file.
    DumpCache {
        /// Cache file to inspect.
        #[arg(value_name = "CACHE")]
        cache: PathBuf,
    },
}

#[derive(Args)]
pub struct WorkspaceArgs {
    /// Workspace (.sln) file.
    #[arg(value_name = "WORKSPACE")]
    pub path: PathBuf,

    /// Cache file (default: .sln-cache/<workspace>.bin next to the workspace).
    #[arg(short = 'c', long = "cache", value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Always parse the workspace and don't write a cache.
    #[arg(long = "no-cache", conflicts_with = "cache")]
    pub no_cache: bool,
}

#[derive(Args)]
pub struct EnvArgs {
    /// Workspace configuration name, e.g. `Debug`.
    #[arg(long = "config", value_name = "NAME")]
    pub configuration: Option<String>,

    /// Workspace platform name, e.g. `x64`.
    #[arg(long = "platform", value_name = "NAME")]
    pub platform: Option<String>,

    /// Read `Name=Value` variables from a file (repeatable).
    #[arg(long = "env-file", value_name = "PATH")]
    pub env_files: Vec<PathBuf>,

    /// Define a variable (repeatable).
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// Start from the process environment.
    #[arg(long = "system-env")]
    pub system_env: bool,
}

fn parse_define(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
