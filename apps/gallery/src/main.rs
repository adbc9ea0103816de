use std::{path::PathBuf, process::ExitCode};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{CandidateFile, GalleryController, GalleryError, GalleryEvent, NoticeLevel};
use shared::domain::{ImageId, ImageRecord};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error};

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(name = "gallery", about = "Upload images for AI analysis and manage the results")]
struct Cli {
    /// Backend base URL; overrides gallery.toml and the environment.
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show every analyzed image, newest first.
    List,
    /// Validate and upload an image file.
    Upload { path: PathBuf },
    /// Delete an image by id.
    Delete { id: String },
    /// Download a stored image by its storage file name.
    Thumbnail {
        file_name: String,
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut settings = load_settings()?;
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let gallery = GalleryController::connect(&settings.server_url)
        .with_context(|| format!("cannot use server url '{}'", settings.server_url))?;
    let mut events = gallery.subscribe();

    // Startup load. A failure is already a notice; the command still runs.
    let _ = gallery.list_images().await;
    let outcome = run(&gallery, cli.command).await;

    render_notices(&mut events);
    print_images(&gallery, &gallery.images().await);

    if let Err(err) = outcome {
        if shown_as_notice(&err) {
            debug!("{err:#}");
        } else {
            error!("{err:#}");
        }
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run(gallery: &GalleryController, command: Command) -> Result<()> {
    match command {
        Command::List => {}
        Command::Upload { path } => {
            let file = CandidateFile::from_path(&path)
                .await
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            gallery.select_file(file).await?;
            gallery.upload_staged().await?;
        }
        Command::Delete { id } => {
            gallery.delete_image(&ImageId::new(id)).await?;
        }
        Command::Thumbnail { file_name, out } => {
            let Some(bytes) = gallery.fetch_stored_image(&file_name).await else {
                bail!("stored image '{file_name}' is unavailable");
            };
            tokio::fs::write(&out, &bytes)
                .await
                .with_context(|| format!("failed to write '{}'", out.display()))?;
            println!("saved {} bytes to {}", bytes.len(), out.display());
        }
    }
    Ok(())
}

/// Controller failures already reached the user through a notice.
fn shown_as_notice(err: &anyhow::Error) -> bool {
    err.downcast_ref::<GalleryError>().is_some()
}

fn render_notices(events: &mut broadcast::Receiver<GalleryEvent>) {
    loop {
        match events.try_recv() {
            Ok(GalleryEvent::Notice(notice)) => match notice.level {
                NoticeLevel::Success => println!("{}", notice.message),
                NoticeLevel::Error => eprintln!("error: {}", notice.message),
            },
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

fn print_images(gallery: &GalleryController, images: &[ImageRecord]) {
    if images.is_empty() {
        println!("no images uploaded yet");
        return;
    }
    for record in images {
        println!(
            "{}  {}  {}",
            record.id,
            record.display_name(),
            record.uploaded_at
        );
        println!("    {}", gallery.image_url(record));
        println!("    {}", record.description);
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
