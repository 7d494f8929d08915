//! Backdrop CLI - command-line client for the Backdrop daemon

use anyhow::{Context, Result};
use backdrop_sdk::{BackdropClient, JobSnapshot, JobState};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabled::{Table, Tabled};

const DEFAULT_URL: &str = "http://127.0.0.1:9876";
const DEFAULT_METHOD: &str = "u2net";

#[derive(Parser)]
#[command(name = "backdrop")]
#[command(about = "Backdrop background-removal CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Daemon base URL
    #[arg(long, env = "BACKDROP_URL", default_value = DEFAULT_URL)]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a video and start a job
    Submit {
        /// Video file
        path: PathBuf,

        /// Segmentation method (bria, inspyrenet, u2net, u2net_human_seg, isnet-general-use, isnet-anime)
        #[arg(short, long, default_value = DEFAULT_METHOD)]
        method: String,

        /// Wait for the job and save its output here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the state of a job
    Status {
        /// Job ID
        job_id: String,
    },

    /// Wait for a job and download its output
    Wait {
        /// Job ID
        job_id: String,

        /// Destination file (default: processed_video_<id>.webm)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds between polls
        #[arg(long, default_value = "2")]
        interval: u64,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Remove the background of a single image
    Image {
        /// Image file
        path: PathBuf,

        #[arg(short, long, default_value = DEFAULT_METHOD)]
        method: String,

        /// Destination PNG (default: <name>_nobg.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that the daemon is up
    Health,
}

#[derive(Tabled)]
struct StatusRow {
    job_id: String,
    status: String,
    stage: String,
    progress: String,
    message: String,
}

impl StatusRow {
    fn new(job_id: &str, snapshot: &JobSnapshot) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: snapshot.status.to_string(),
            stage: snapshot.stage.clone(),
            progress: format!("{:.0}%", snapshot.progress),
            message: snapshot.message.clone().unwrap_or_default(),
        }
    }
}

fn default_video_output(job_id: &str) -> PathBuf {
    PathBuf::from(format!("processed_video_{}.webm", job_id))
}

fn default_image_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{}_nobg.png", stem))
}

async fn wait_and_save(
    client: &BackdropClient,
    job_id: &str,
    output: &Path,
    interval: Duration,
    timeout: Option<Duration>,
) -> Result<()> {
    println!("{}", format!("Waiting for job {}...", job_id).cyan());
    let bytes = client
        .wait_for_output(job_id, output, interval, timeout)
        .await?;
    println!(
        "{} {} ({} bytes)",
        "✓ Saved".green().bold(),
        output.display(),
        bytes
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = BackdropClient::connect(&cli.url).context("Invalid daemon URL")?;

    match cli.command {
        Commands::Submit {
            path,
            method,
            output,
        } => {
            let job_id = client
                .submit_video(&path, &method)
                .await
                .with_context(|| format!("Failed to submit {}", path.display()))?;

            println!("{}", "✓ Job submitted".green().bold());
            println!("  {} {}", "Job ID:".bold(), job_id);

            if let Some(output) = output {
                wait_and_save(&client, &job_id, &output, Duration::from_secs(2), None).await?;
            }
        }

        Commands::Status { job_id } => match client.status(&job_id).await? {
            JobState::Completed => {
                println!(
                    "{} {}",
                    format!("✓ Job {} completed.", job_id).green().bold(),
                    "Download with `backdrop wait`."
                );
            }
            JobState::Processing(snapshot) => {
                println!("{}", Table::new(vec![StatusRow::new(&job_id, &snapshot)]));
            }
            JobState::Failed(snapshot) => {
                println!("{}", format!("✗ Job {} failed", job_id).red().bold());
                println!("{}", Table::new(vec![StatusRow::new(&job_id, &snapshot)]));
            }
        },

        Commands::Wait {
            job_id,
            output,
            interval,
            timeout,
        } => {
            let output = output.unwrap_or_else(|| default_video_output(&job_id));
            wait_and_save(
                &client,
                &job_id,
                &output,
                Duration::from_secs(interval.max(1)),
                timeout.map(Duration::from_secs),
            )
            .await?;
        }

        Commands::Image {
            path,
            method,
            output,
        } => {
            let output = output.unwrap_or_else(|| default_image_output(&path));
            let png = client
                .remove_background_image(&path, &method)
                .await
                .with_context(|| format!("Failed to process {}", path.display()))?;
            tokio::fs::write(&output, &png)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;

            println!("{} {}", "✓ Saved".green().bold(), output.display());
        }

        Commands::Health => match client.health().await {
            Ok(health) => {
                println!("  {} {}", "URL:".bold(), client.base_url());
                println!("  {} {}", "Status:".bold(), health.status.to_uppercase().green());
                println!("  {} {}", "Version:".bold(), health.version);
                println!("  {} {}", "Processing:".bold(), health.processing_jobs);
            }
            Err(e) => {
                println!("  {} {}", "Status:".bold(), "ERROR".red());
                println!("  {} {}", "Error:".bold(), e);
            }
        },
    }

    Ok(())
}
