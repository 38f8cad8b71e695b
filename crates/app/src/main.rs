//! Roster API Client - Main Entry Point
//!
//! Loads settings, restores the stored session, wires the authenticated
//! pipeline and runs one command.

mod cli;
mod commands;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use roster_application::{AuthenticatedClient, PipelineConfig, TokenStore};
use roster_infrastructure::{
    FileSessionRepository, ReqwestTransport, SystemClock, TokioFileSystem, UiEvent,
    load_settings, resolve_data_dir, ui_channel,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let settings = load_settings(cli.settings.as_deref()).context("loading settings")?;
    let data_dir = resolve_data_dir(&settings)?;
    tracing::info!(
        base_url = %settings.base_url,
        data_dir = %data_dir.display(),
        "Starting Roster v{}",
        env!("CARGO_PKG_VERSION")
    );

    let transport = Arc::new(ReqwestTransport::new(
        &settings.user_agent,
        settings.request_timeout(),
    )?);
    let repository = Arc::new(FileSessionRepository::new(
        TokioFileSystem::new(),
        SystemClock::new(),
        &data_dir,
    ));
    let store = TokenStore::restore(repository).await;
    let (sinks, mut events) = ui_channel();
    let client = Arc::new(AuthenticatedClient::new(
        transport,
        store,
        PipelineConfig::from_settings(&settings)?,
        sinks,
    ));

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                UiEvent::Notice(notice) => eprintln!("{notice}"),
                UiEvent::Navigate(route) => eprintln!("-> {route}"),
            }
        }
    });

    let outcome = commands::run(cli.command, &client).await;

    // A teardown may have left the server logout running.
    client.shutdown().await;
    // Dropping the client closes the channel once the last event is queued.
    drop(client);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "event printer stopped");
    }

    outcome
}
