//! Register command - create a document record and presign its first upload.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use docdav_webdav::DocumentFs;
use docdav_webdav::etag::mime_type;
use serde::Serialize;
use tracing::instrument;

use crate::config::AppConfig;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Filename of the document (e.g. "Quarterly Report.docx")
    pub filename: String,

    /// Content type the upload will be sent with (guessed from the extension by default)
    #[arg(long, value_name = "TYPE")]
    pub content_type: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterOutput<'a> {
    document_id: &'a str,
    key: &'a str,
    signed_url: &'a str,
}

#[instrument(level = "info", name = "cmd::register", skip_all)]
pub async fn execute(config: &AppConfig, args: &Args) -> Result<()> {
    let content_type = args.content_type.clone().unwrap_or_else(|| {
        let extension = args
            .filename
            .rsplit_once('.')
            .map_or("", |(_, extension)| extension);
        mime_type(extension)
    });

    let records = config.record_store().await?;
    let blobs = config.blob_store().await?;
    let fs = DocumentFs::new(records, blobs, config.adapter_config());

    let (record, signed_url) = fs
        .register(&args.filename, &content_type, config.server.upload_url_ttl)
        .await
        .with_context(|| format!("Failed to register document: {}", args.filename))?;

    if args.json {
        let output = RegisterOutput {
            document_id: &record.document_id,
            key: &record.key,
            signed_url: &signed_url,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        eprintln!("Registered {} as {}", record.title, record.document_id);
        println!("{signed_url}");
    }
    Ok(())
}
