//! Command dispatch: maps parsed arguments onto services

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::AggregateRequest;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings, LOCAL_CONFIG_FILE};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Execute the parsed command line.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage("no command given, see --help".into()));
    };

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = Settings::load(cli.config.as_deref()).map_err(InfraError::from)?;
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Aggregate {
            tree,
            values,
            reduce,
            focus,
            depth,
            format,
            show_zero,
            column,
            default_value,
        } => {
            let request = AggregateRequest {
                tree: tree.clone(),
                values: values.clone(),
                reducer: *reduce,
                default_leaf_value: *default_value,
            };
            let service = &container.aggregation;
            let aggregated = service.aggregate(&request).map_err(InfraError::from)?;

            let mut options = service.render_options(*format);
            options.focus = focus.clone();
            options.max_depth = *depth;
            if *show_zero {
                options.hide_zero = false;
            }
            if let Some(column) = column {
                options.value_column = column.clone();
            }
            debug!("render options: {:?}", options);

            let report = service
                .report(&aggregated, &options)
                .map_err(InfraError::from)?;
            output::info(&report);
            Ok(())
        }
        Commands::Leaves { tree } => leaves(&container, tree),
        Commands::Tree { tree, focus, depth } => {
            let diagram = container
                .aggregation
                .structure(tree, focus.as_deref(), *depth)
                .map_err(InfraError::from)?;
            output::info(&diagram);
            Ok(())
        }
        Commands::Config { command } => config(&container, command),
        Commands::Completion { .. } => Ok(()),
    }
}

#[instrument(level = "debug", skip(container))]
fn leaves(container: &ServiceContainer, tree: &Path) -> CliResult<()> {
    let names = container
        .aggregation
        .leaves(tree)
        .map_err(InfraError::from)?;
    for name in names {
        output::info(&name);
    }
    Ok(())
}

fn config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let text = container.settings.to_toml().map_err(InfraError::from)?;
            output::info(text.trim_end());
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::warning("no global config directory on this platform"),
            }
            let local = std::env::current_dir()
                .map(|dir| local_config_path(&dir))
                .unwrap_or_else(|_| PathBuf::from(LOCAL_CONFIG_FILE));
            output::action("local", &local.display());
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::InvalidArgs("no global config directory on this platform".into())
                })?
            } else {
                PathBuf::from(LOCAL_CONFIG_FILE)
            };
            if container.fs.exists(&path) {
                return Err(CliError::InvalidArgs(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            container
                .fs
                .ensure_parent(&path)
                .map_err(|e| InfraError::io(format!("create {}", path.display()), e))?;
            container
                .fs
                .write(&path, &Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("created {}", path.display()));
            Ok(())
        }
    }
}
