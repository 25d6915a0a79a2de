mod cli;
mod commands;
mod config;
mod error;
mod records;

use clap::Parser;
use cli::{Cli, Commands};
use error::exit_with_error;
use gribx_core::CancelToken;

fn init_tracing(cli: &Cli) {
    // --quiet: off. --verbose: RUST_LOG if set, else info. Default: warnings
    // only, so stale-index and removed-file notices still reach stderr.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };

    let ansi = !(cli.no_color || std::env::var_os("NO_COLOR").is_some());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    init_tracing(&cli);

    if let Err(e) = run(cli) {
        exit_with_error(e);
    }
}

fn run(cli: Cli) -> error::CliResult<()> {
    let index_config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Build {
            records,
            output,
            top_dir,
            name,
            nested_time,
            update,
        } => {
            let index_config = config::with_update(index_config, update.as_deref())?;
            let cancel = CancelToken::new();
            let opts = commands::build::BuildOpts {
                name: name.as_deref(),
                top_dir: &top_dir,
                nested_time,
                cancel: &cancel,
            };
            commands::build::run(&records, &output, &opts, &index_config)
        }

        Commands::Merge {
            partitions,
            output,
            name,
            top_dir,
        } => commands::merge::run(
            &partitions,
            &output,
            name.as_deref(),
            top_dir.as_deref(),
            &index_config,
        ),

        Commands::Inspect { index, json } => commands::inspect::run(&index, json, &index_config),

        Commands::Find {
            index,
            group,
            values,
        } => commands::find::run(&index, &group, &values, &index_config),

        Commands::Search {
            index,
            group,
            axis,
            target,
            to,
            mode,
            unbounded,
        } => {
            let opts = commands::search::SearchOpts {
                axis,
                target,
                to,
                mode: mode.into(),
                bounded: !unbounded,
            };
            commands::search::run(&index, &group, &opts, &index_config)
        }

        Commands::Check {
            index,
            records,
            top_dir,
            update,
        } => {
            let index_config = config::with_update(index_config, update.as_deref())?;
            commands::check::run(&index, records.as_deref(), top_dir.as_deref(), &index_config)
        }
    }
}
