//! Courier command line client.

mod config;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use courier_client::{Client, FilePayload, TransferRegistry, UploadOptions, UploadRequest};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "courier", about = "File transfer client", version)]
struct Cli {
    /// Server base URL; overrides the config file.
    #[arg(long)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List files stored on the server.
    List,
    /// Upload a file. Large files are sent in chunks automatically.
    Upload { path: PathBuf },
    /// Upload a text snippet.
    SendText { text: String },
    /// Download a file by id.
    Download {
        file_id: String,
        /// Destination path; defaults to the server-provided filename.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Delete a stored file.
    Delete { file_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,courier=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load();
    let server_url = cli.server.unwrap_or(config.server_url);

    let client = Arc::new(Client::new(&server_url).context("invalid server URL")?);
    info!(server = %server_url, "connecting");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let progress = spawn_progress_printer(client.registry());
    let result = run(&client, cli.command, &cancel).await;
    progress.abort();
    result
}

async fn run(client: &Client, command: Command, cancel: &CancellationToken) -> anyhow::Result<()> {
    match command {
        Command::List => {
            let files = client.list_files().await?;
            if files.is_empty() {
                println!("no files stored");
                return Ok(());
            }
            for file in files {
                let kind = file.kind.as_deref().unwrap_or("file");
                println!("{}  {:>10} B  {}  [{}]", file.file_id, file.size, file.filename, kind);
            }
        }
        Command::Upload { path } => {
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .context("path has no usable filename")?
                .to_string();

            let request = UploadRequest {
                file: Some(FilePayload { filename, data }),
                ..Default::default()
            };
            let receipt = client
                .upload(request, UploadOptions::default(), cancel)
                .await?;
            println!("uploaded as {} ({} request(s))", receipt.file_id, receipt.chunks_sent);
        }
        Command::SendText { text } => {
            let request = UploadRequest {
                text: Some(text),
                ..Default::default()
            };
            let receipt = client
                .upload(request, UploadOptions::default(), cancel)
                .await?;
            println!("uploaded as {}", receipt.file_id);
        }
        Command::Download { file_id, output } => {
            let suggested = output
                .as_deref()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str());
            let download = client.download(&file_id, suggested, cancel).await?;

            let dest = output.unwrap_or_else(|| PathBuf::from(&download.filename));
            tokio::fs::write(&dest, &download.data)
                .await
                .with_context(|| format!("writing {}", dest.display()))?;
            println!("saved {} ({} bytes)", dest.display(), download.data.len());
        }
        Command::Delete { file_id } => {
            client.delete(&file_id).await?;
            println!("deleted {file_id}");
        }
    }
    Ok(())
}

/// Prints transfer progress whenever it changes, until aborted.
fn spawn_progress_printer(registry: Arc<TransferRegistry>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut last: HashMap<String, u8> = HashMap::new();
        loop {
            for (id, snapshot) in registry.snapshot_all() {
                if last.get(&id) != Some(&snapshot.progress) {
                    info!(id = %id, progress = snapshot.progress, status = ?snapshot.status, "transfer");
                    last.insert(id, snapshot.progress);
                }
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    })
}
