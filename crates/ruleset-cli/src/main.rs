//! Ruleset sync CLI
//!
//! Keeps `rulesets/*.txt` limited to rule repositories that exist and carry
//! the required tag.

mod cli;
mod commands;
mod context;
mod error;
mod logging;

use std::future::Future;

use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use context::Context;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let ctx = Context::resolve(&cli.global)?;
    tracing::debug!(root = %ctx.root, org = %ctx.config.organization, "resolved settings");

    match cli.command.unwrap_or_default() {
        Commands::List { json } => commands::run_list(&ctx, json),
        Commands::Sync { dry_run, json } => run_cancellable(|cancel| async move {
            commands::run_sync(&ctx, dry_run, json, &cancel).await
        }),
        Commands::Check { json } => run_cancellable(|cancel| async move {
            commands::run_check(&ctx, json, &cancel).await
        }),
    }
}

/// Drive an async command, cancelling it on Ctrl-C.
fn run_cancellable<F, Fut>(command: F) -> Result<()>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, finishing without starting new lookups");
                on_interrupt.cancel();
            }
        });

        command(cancel).await
    })
}
