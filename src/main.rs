//! Platen - presses a template and a data file into a paginated PDF.

mod browser;
mod builder;
mod cli;
mod config;
mod data;
mod error;
mod logger;
mod shutdown;
mod template;
mod utils;
mod watch;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use std::path::Path;

use builder::{Builder, RenderRequest};
use cli::{Cli, Commands};
use config::RenderConfig;
use shutdown::ShutdownHook;
use utils::path::absolutize;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let root = match &cli.root {
        Some(root) => absolutize(root, &cwd)?,
        None => cwd,
    };
    let config = RenderConfig::load(&root.join(&cli.config))?;

    match &cli.command {
        Commands::Build { args } => {
            logger::set_verbose(args.verbose);
            run_build(args.to_request(), &root, &config)
        }
        Commands::Develop { args } => {
            logger::set_verbose(args.verbose);
            run_develop(args.to_request(), &root, &config)
        }
    }
}

/// One-shot build: open, build, close — the browser session is released on
/// every exit path, including a failed build.
fn run_build(request: RenderRequest, root: &Path, config: &RenderConfig) -> Result<()> {
    runtime()?.block_on(async {
        let mut builder = Builder::open(root, config).await?;
        let result = builder.build(&request).await;
        builder.close().await;
        Ok(result?)
    })
}

/// Watch mode: eager build plus rebuild-on-change until Ctrl+C.
fn run_develop(request: RenderRequest, root: &Path, config: &RenderConfig) -> Result<()> {
    // Install before anything blocks so an early Ctrl+C is not lost.
    let hook = ShutdownHook::install()?;

    runtime()?.block_on(async {
        let mut session = watch::develop(&request, root, config).await?;
        log!("develop"; "watching for changes, press Ctrl+C to stop");

        let end = tokio::select! {
            _ = hook.wait() => {
                log!("develop"; "shutting down...");
                watch::SessionEnd::Stopped
            }
            end = session.ended() => end,
        };

        session.close().await;
        if end == watch::SessionEnd::Failed {
            anyhow::bail!("watch session ended after an unrecoverable rebuild error");
        }
        Ok(())
    })
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")
}
