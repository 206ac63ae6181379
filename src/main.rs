use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use rmcp::{ServiceExt, transport::stdio};

use clap::Parser;

use wayfinder::args::Cli;
use wayfinder::dispatcher::Dispatcher;
use wayfinder::lsp_provider::LspProvider;
use wayfinder::service::WayfinderService;
use wayfinder::store::FsDocumentStore;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let config = cli.load_config()?;

    let workspace_base = if let Some(ws) = cli.workspace {
        canonical_path(ws)?
    } else {
        env::current_dir().map_err(|err| anyhow!("failed to get current directory: {err}"))?
    };

    tracing::info!(
        workspace_base = %workspace_base.display(),
        extensions = ?config.server.extensions,
        command = ?config.server.command,
        "Starting wayfinder"
    );

    let provider = LspProvider::start(&config, &workspace_base).await?;
    let dispatcher = Dispatcher::new(Arc::new(provider), Arc::new(FsDocumentStore::new()));
    let server = WayfinderService::new(dispatcher).serve(stdio()).await?;
    server.waiting().await?;
    Ok(())
}

fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into())))?;

    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn canonical_path(path: PathBuf) -> Result<PathBuf> {
    let abs = if path.is_absolute() {
        path
    } else {
        env::current_dir()
            .map_err(|err| anyhow!("failed to read current directory: {err}"))?
            .join(path)
    };
    abs.canonicalize()
        .map_err(|err| anyhow!("failed to canonicalize path: {err}"))
}
