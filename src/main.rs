//! `sln` command-line tool.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::Parser;
use sln_rs::logging::{LogConfig, LogFormat, init_logging};
use sln_rs::{
    CACHE_FORMAT_VERSION, CacheSource, Environment, EnvironmentBuilder, Error, Result,
    WorkspaceCache,
};
use tracing::{debug, info, warn};

mod cli;

use crate::cli::{Cli, Command, EnvArgs, LogFormatArg, WorkspaceArgs};

fn main() {
    let cli = Cli::parse();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    if let Err(error) = run(cli.command) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    LogConfig {
        use_env_filter: !cli.verbosity.is_present(),
        ..LogConfig::default()
    }
    .with_level(cli.verbosity.tracing_level_filter())
    .with_format(format)
    .with_log_file(cli.log_file.clone())
    .with_ansi(cli.log_file.is_none() && io::stderr().is_terminal())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Projects {
            workspace,
            full_names,
        } => {
            let cache = open(&workspace)?;
            let ws = cache.workspace();
            for project in ws.non_folder_projects() {
                if full_names {
                    println!("{}", ws.full_name(project));
                } else {
                    println!("{}", project.name);
                }
            }
        }

        Command::Files { workspace, project } => {
            let cache = open(&workspace)?;
            let ws = cache.workspace();
            let projects = match &project {
                Some(name) => vec![ws.project(name)?],
                None => ws.non_folder_projects().collect(),
            };
            for project in projects.into_iter().filter(|p| !p.is_folder()) {
                for file in project.source_files()? {
                    println!("{}", file.display());
                }
            }
        }

        Command::Configs { workspace } => {
            let cache = open(&workspace)?;
            for name in cache.workspace().solution_configurations() {
                println!("{name}");
            }
        }

        Command::ProjectConfig {
            workspace,
            project,
            workspace_config,
        } => {
            let cache = open(&workspace)?;
            let ws = cache.workspace();
            let project = ws.project(&project)?;
            let mapped = ws
                .find_project_configuration(&project.id, &workspace_config)
                .or_else(|| {
                    ws.project_configurations(&project.id)
                        .into_iter()
                        .find(|(ws_config, _)| *ws_config == workspace_config)
                        .map(|(_, project_config)| project_config)
                });
            match mapped {
                Some(project_config) => println!("{project_config}"),
                None => warn!(
                    project = %project.name,
                    workspace_config = %workspace_config,
                    "no project configuration for workspace configuration"
                ),
            }
        }

        Command::Owner { workspace, file } => {
            let cache = open(&workspace)?;
            let file = std::path::absolute(&file).map_err(|e| Error::io(&file, e))?;
            let project = cache.find_item_project(&file)?;
            println!("{}", project.name);
        }

        Command::Properties {
            workspace,
            env,
            project,
            label,
        } => {
            let cache = open(&workspace)?;
            let ws = cache.workspace();
            let project = ws.project(&project)?;
            let env = build_environment(&env, ws.dir())?;
            let project_env = ws.project_environment(&project.id, &env).unwrap_or_else(|| {
                debug!(project = %project.name, "no configuration mapping, using environment as is");
                env.clone()
            });
            let group = project
                .resolved_property_group(label.as_deref(), &project_env)?
                .ok_or_else(|| {
                    Error::SectionNotFound(label.clone().unwrap_or_else(|| "(default)".into()))
                })?;
            for property in group.properties() {
                println!("{}={}", property.name, property.value);
            }
        }

        Command::BuildCache { workspace } => {
            let (cache, source) = open_with_source(&workspace)?;
            let items: usize = cache.index().iter().map(|(_, items)| items.len()).sum();
            match source {
                CacheSource::Persisted => info!("cache is up to date"),
                CacheSource::Rebuilt => info!(
                    projects = cache.index().len(),
                    items,
                    "built cache"
                ),
            }
        }

        Command::DumpCache { cache } => dump_cache(&cache)?,
    }
    Ok(())
}

fn default_cache_path(workspace: &Path) -> Option<PathBuf> {
    let file_name = workspace.file_name()?;
    let mut name = file_name.to_os_string();
    name.push(".bin");
    Some(
        workspace
            .parent()
            .unwrap_or(Path::new(""))
            .join(".sln-cache")
            .join(name),
    )
}

fn open_with_source(args: &WorkspaceArgs) -> Result<(WorkspaceCache, CacheSource)> {
    let cache_path = if args.no_cache {
        None
    } else {
        args.cache.clone().or_else(|| default_cache_path(&args.path))
    };
    let (cache, source) = WorkspaceCache::load_or_rebuild(&args.path, cache_path.as_deref())?;
    debug!(?source, "workspace loaded");
    Ok((cache, source))
}

fn open(args: &WorkspaceArgs) -> Result<WorkspaceCache> {
    open_with_source(args).map(|(cache, _)| cache)
}

fn build_environment(args: &EnvArgs, workspace_dir: &Path) -> Result<Environment> {
    let mut builder = EnvironmentBuilder::new();
    if args.system_env {
        builder = builder.system_env();
    }
    let mut solution_dir = workspace_dir.display().to_string();
    if !solution_dir.ends_with(std::path::MAIN_SEPARATOR) {
        solution_dir.push(std::path::MAIN_SEPARATOR);
    }
    builder = builder.var("SolutionDir", solution_dir);
    for path in &args.env_files {
        builder = builder.env_file(path)?;
    }
    for (name, value) in &args.defines {
        builder = builder.var(name, value);
    }
    if let Some(configuration) = &args.configuration {
        builder = builder.configuration(configuration);
    }
    if let Some(platform) = &args.platform {
        builder = builder.platform(platform);
    }
    Ok(builder.build())
}

fn dump_cache(path: &Path) -> Result<()> {
    let version = WorkspaceCache::read_version(path)?;
    if version != CACHE_FORMAT_VERSION {
        warn!(
            path = %path.display(),
            found = version,
            expected = CACHE_FORMAT_VERSION,
            "cache was saved with another format"
        );
        return Err(Error::VersionMismatch {
            found: version,
            expected: CACHE_FORMAT_VERSION,
        });
    }

    let cache = WorkspaceCache::load_unchecked(path)?;
    let ws = cache.workspace();
    println!("version: {version}");
    println!("workspace: {}", ws.path.display());
    println!("projects: {}", ws.projects.len());
    for project in &ws.projects {
        let loaded = if project.is_loaded() { "" } else { " (not loaded)" };
        println!("  {}: {} [{}]{loaded}", project.name, project.path, project.kind().name());
    }
    println!("sections: {}", ws.sections.len());
    for section in &ws.sections {
        println!("  {} ({} entries)", section.name, section.entries.len());
    }
    println!("indexed projects: {}", cache.index().len());
    for (project, items) in cache.index().iter() {
        println!("  {}: {} items", project.display(), items.len());
    }
    Ok(())
}
