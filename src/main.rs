mod admission;
mod archive;
mod braces;
mod cli;
mod cluster;
mod config;
mod error;
mod items;
mod orchestrator;
mod reconciler;
mod state_machine;
mod template;
mod ui;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use clap::error::ErrorKind;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use archive::LogArchiver;
use cli::Cli;
use cluster::Kubectl;
use config::{QupodsConfig, Settings};
use error::QupodsError;
use orchestrator::{Orchestrator, RunOptions};
use reconciler::Reconciler;
use template::TemplateRenderer;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every item went through cleanly.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = QupodsConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let settings = Settings::resolve(cli, config)?;

    let source = tokio::fs::read_to_string(&settings.template)
        .await
        .map_err(|e| QupodsError::io(&settings.template, e))
        .context("reading job template")?;
    let renderer = TemplateRenderer::new(source)
        .with_context(|| format!("compiling template {}", settings.template.display()))?;

    let kubectl = Kubectl::from_command_line(&settings.kubectl)
        .ok_or_else(|| QupodsError::Config("cluster command is empty".into()))?;

    let archiver = match &settings.logdir {
        Some(dir) => Some(
            LogArchiver::open(dir, settings.delete_retry.clone())
                .await
                .context("opening log archive")?,
        ),
        None => None,
    };

    let items = settings.source.load().await.context("loading items")?;
    info!(
        items = items.len(),
        cluster = %settings.kubectl,
        archive = %settings.logdir.as_deref().map(|d| d.display().to_string()).unwrap_or_default(),
        "starting run"
    );

    let mut orchestrator = Orchestrator::new(
        kubectl,
        renderer,
        Reconciler::new(archiver),
        RunOptions::from(&settings),
    );
    let summary = orchestrator.run(&items).await?;
    ui::print_summary(&summary);
    Ok(summary.is_clean())
}
