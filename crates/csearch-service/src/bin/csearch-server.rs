use anyhow::{Context, Result};
use clap::Parser;
use csearch_service::{load_service_config, router, AppState, GitCloner, MergeOpts, ServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Serve repository indexing and regex code search over HTTP")]
struct Opts {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Address to listen on (env: CSEARCH_HOST)
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on (env: CSEARCH_PORT)
    #[arg(long)]
    port: Option<u16>,
    /// Directory repositories are cloned into
    #[arg(long)]
    workspace_root: Option<PathBuf>,
    /// Master index path
    #[arg(long)]
    master_index: Option<PathBuf>,
    #[arg(long)]
    request_timeout_seconds: Option<u64>,
    /// Index members of zip archives
    #[arg(long)]
    index_zip: Option<bool>,
    /// Verify the master before merging into it
    #[arg(long)]
    check_index: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper_util=warn,hyper=warn,ignore=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let opts = Opts::parse();
    let cfg = load_service_config(
        ServiceConfig::default(),
        MergeOpts {
            config_path: opts.config,
            cli_host: opts.host,
            cli_port: opts.port,
            cli_workspace_root: opts.workspace_root,
            cli_master_index: opts.master_index,
            cli_request_timeout_seconds: opts.request_timeout_seconds,
            cli_index_zip: opts.index_zip,
            cli_check_index: opts.check_index,
        },
    )?;

    let addr = cfg.addr();
    tracing::info!(
        master = %cfg.master_index.display(),
        workspace = %cfg.workspace_root.display(),
        timeout_s = cfg.request_timeout.as_secs(),
        "starting csearch server on {}",
        addr
    );

    let app = router(AppState::new(cfg, Arc::new(GitCloner)));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("serve")?;
    Ok(())
}
