//! Serve command - run the WebDAV server until Ctrl-C.

use std::net::IpAddr;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use docdav_webdav::{DocumentFs, WebDavServer};
use tracing::{info, instrument};

use crate::config::AppConfig;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Address to bind (overrides the config file)
    #[arg(long, env = "DOCDAV_BIND")]
    pub bind: Option<IpAddr>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "DOCDAV_PORT")]
    pub port: Option<u16>,

    /// Enable the metadata cache
    #[arg(long)]
    pub cache: bool,
}

#[instrument(level = "info", name = "cmd::serve", skip_all)]
pub async fn execute(mut config: AppConfig, args: &Args) -> Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.cache {
        config.cache.enabled = true;
    }

    let records = config.record_store().await?;
    let blobs = config.blob_store().await?;
    info!(
        records = records.backend_name(),
        blobs = blobs.backend_name(),
        cache = config.cache.enabled,
        "Opened document store"
    );

    let fs = DocumentFs::new(records, blobs, config.adapter_config());
    let server = WebDavServer::start(fs, config.server_config())
        .await
        .with_context(|| {
            format!(
                "Failed to start WebDAV server on {}:{}",
                config.server.bind, config.server.port
            )
        })?;

    eprintln!("Serving documents at {}", server.webdav_url());
    eprintln!("Press Ctrl-C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for Ctrl-C")?;

    eprintln!("Shutting down...");
    server.stop().await;
    Ok(())
}
