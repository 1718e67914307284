//! List command - show registered documents.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use comfy_table::Cell;
use docdav_store::DocumentRecord;
use serde::Serialize;
use tracing::instrument;

use crate::config::AppConfig;
use crate::output::{create_table, format_timestamp};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Same shape as the `/getFiles` endpoint.
#[derive(Serialize)]
struct FilesOutput<'a> {
    files: &'a [DocumentRecord],
}

#[instrument(level = "info", name = "cmd::list", skip_all)]
pub async fn execute(config: &AppConfig, args: &Args) -> Result<()> {
    let records = config.record_store().await?;
    let files = records
        .find_all()
        .await
        .context("Failed to list documents")?;

    if args.json {
        let output = FilesOutput { files: &files };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if files.is_empty() {
        eprintln!("No documents registered.");
        eprintln!("Use 'docdav register <FILENAME>' to add one.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Document ID", "Title", "Key", "Created", "Updated"]);
    for record in &files {
        table.add_row(vec![
            Cell::new(&record.document_id),
            Cell::new(&record.title),
            Cell::new(&record.key),
            Cell::new(format_timestamp(&record.created_on)),
            Cell::new(format_timestamp(&record.updated_on)),
        ]);
    }
    println!("{table}");
    eprintln!("{} document(s)", files.len());
    Ok(())
}
