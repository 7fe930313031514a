//! Command-line front end for the hubsnap jobs.

pub mod cli_args;

use anyhow::{Context, Result};
use hubsnap_core::{LoggingDestination, Tunables, init_logging};
use tracing::info;

use cli_args::{Cli, Command};

pub async fn run(cli: Cli) -> Result<()> {
    let destination = if cli.stderr_only {
        LoggingDestination::StderrOnly
    } else {
        LoggingDestination::FileAndStderr
    };
    init_logging(destination).context("failed to initialize logging")?;

    let tunables = Tunables::from_env()?;
    dispatch(cli.command, &tunables).await
}

async fn dispatch(command: Command, tunables: &Tunables) -> Result<()> {
    match command {
        Command::Collect(args) => {
            let options = args.to_options(tunables);
            match hubsnap_core::run_collect(&options, tunables).await? {
                Some(outcome) => info!(
                    date = %outcome.date,
                    total = outcome.total,
                    dir = %options.layout.data_dir.display(),
                    "collection complete"
                ),
                None => info!("no datasets collected; nothing written"),
            }
        }
        Command::Changelog(args) => {
            let layout = args.layout();
            if hubsnap_core::generate_changelog(&layout, args.limit(tunables))?.is_none() {
                info!("not enough archives to compare; no changelog generated");
            }
        }
        Command::Trends(args) => {
            if hubsnap_core::generate_trends(&args.layout())?.is_none() {
                info!("no archived statistics; no trend data generated");
            }
        }
        Command::Cards(args) => {
            let options = args.to_options(tunables);
            let summary = hubsnap_core::run_cards(
                &options,
                args.source.into(),
                hubsnap_core::config::resolve_path(&args.workdir),
                tunables,
            )
            .await?;
            info!(
                total = summary.total,
                with_readme = summary.with_readme,
                failed = summary.failed,
                output = %options.output.display(),
                "card collection complete"
            );
        }
    }
    Ok(())
}
