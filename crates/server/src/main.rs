use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use docfind_common::config::load_config;
use docfind_server::{build_router, sweeper, AppState};

const DEFAULT_LOG_DIRECTIVES: &str = "warn,docfind_server=info,docfind_common=info,\
    docfind_content_store=info,docfind_extract_dispatch=info,docfind_extract_office=info,tower_http=info";

#[derive(Parser)]
#[command(name = "docfind-server", version, about = "Upload documents and search them by phrase")]
struct Args {
    /// Path to the TOML config; built-in defaults are used when it does not exist.
    #[arg(env = "DOCFIND_CONFIG", default_value = "docfind.toml")]
    config: PathBuf,

    /// Override `server.bind`.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    docfind_common::logging::init(DEFAULT_LOG_DIRECTIVES);

    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    if let Err(e) = docfind_common::logging::set_ignore_patterns(&config.log.ignore) {
        tracing::warn!("invalid log ignore pattern: {e}");
    }

    let bind = config.server.bind.clone();
    let retention = config.store.retention();
    let sweep_every = config.store.sweep_interval();
    let state = Arc::new(AppState::new(config));

    sweeper::spawn(state.store.clone(), retention, sweep_every);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding to {bind}"))?;

    tracing::info!("listening on {bind}");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
