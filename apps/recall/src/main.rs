use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    HttpMemoryApi, ImageUpload, Item, Mode, RecallApp, Session, SyncController, SyncError,
    ViewEvent,
};
use shared::domain::MemoryId;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, validate_server_url, Settings, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(name = "recall", about = "Track where your things are")]
struct Args {
    /// Settings file; missing files fall back to defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    user: Option<String>,
    /// Print memories as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List every stored memory.
    List,
    /// Search memories by description.
    Search { query: String },
    /// Photograph an item and record where it is.
    Add {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        location: String,
        /// Comma separated.
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Change the location or tags of a memory.
    Edit {
        id: String,
        #[arg(long)]
        location: String,
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Delete a memory after confirming.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Embed images the search index has not seen yet.
    Reindex,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let settings = match resolve(&args) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(args, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<SyncError>() {
                Some(sync_err) => eprintln!("{}", sync_err.notice().message),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn resolve(args: &Args) -> Result<Settings> {
    let mut settings = load_settings(&args.config)?;
    if let Some(server_url) = &args.server_url {
        settings.server_url = validate_server_url(server_url)?;
    }
    if let Some(user) = &args.user {
        settings.user_id = Some(user.clone());
    }
    Ok(settings)
}

async fn run(args: Args, settings: Settings) -> Result<()> {
    let Some(user_id) = settings.user_id.clone() else {
        bail!("no user configured; pass --user or set RECALL_USER_ID");
    };
    let api = HttpMemoryApi::with_timeout(settings.server_url.clone(), settings.request_timeout())?;
    info!(server_url = %api.server_url(), "connecting");
    let app = RecallApp::new(SyncController::new(Arc::new(api)));

    if let Cmd::Reindex = args.command {
        let updated = app.sync().reindex().await?;
        println!("Re-indexed {updated} memories.");
        return Ok(());
    }

    app.set_session(Some(Session::new(user_id))).await?;

    match args.command {
        Cmd::List | Cmd::Reindex => {}
        Cmd::Search { query } => app.handle(ViewEvent::SearchInput(query)).await?,
        Cmd::Add {
            file,
            location,
            tags,
        } => {
            let upload = ImageUpload::from_path(&file)
                .await
                .with_context(|| format!("failed to read '{}'", file.display()))?;
            debug!(filename = %upload.filename, mime = ?upload.mime_type, "selected image");
            for event in [
                ViewEvent::TabSelected(Mode::AddNew),
                ViewEvent::ImageSelected(upload),
                ViewEvent::UploadLocationChanged(location),
                ViewEvent::UploadTagsChanged(tags),
                ViewEvent::UploadSubmitted,
            ] {
                app.handle(event).await?;
            }
        }
        Cmd::Edit { id, location, tags } => {
            let id = MemoryId::from(id);
            app.handle(ViewEvent::EditRequested(id.clone())).await?;
            if app.view().await.editing() != Some(&id) {
                bail!("memory {id} not found");
            }
            app.handle(ViewEvent::EditSubmitted { location, tags }).await?;
        }
        Cmd::Delete { id, yes } => {
            let id = MemoryId::from(id);
            let Some(item) = app.sync().item(&id).await else {
                bail!("memory {id} not found");
            };
            if !yes && !confirm(&format!("Delete memory {id} at {}?", item.location)).await? {
                println!("Kept memory {id}.");
                return Ok(());
            }
            app.handle(ViewEvent::DeleteConfirmed(id)).await?;
        }
    }

    print_items(&app.sync().items().await, args.json)
}

async fn confirm(prompt: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{prompt} [y/N] ").as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("failed to read confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_items(items: &[Item], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("No memories yet.");
        return Ok(());
    }
    for item in items {
        let tags = if item.tags.is_empty() {
            "-".to_string()
        } else {
            item.tags.join(", ")
        };
        if item.score > 0.0 {
            println!(
                "{}\t{}\t{}\t{:.2}\t{}",
                item.id, item.location, tags, item.score, item.image
            );
        } else {
            println!("{}\t{}\t{}\t{}", item.id, item.location, tags, item.image);
        }
    }
    Ok(())
}
