//! GCS Uploadr - upload a local file to a Cloud Storage bucket
//!
//! Prints the stored object's name and media link as JSON.

use anyhow::Context;
use clap::Parser;
use gcs_uploadr::{config::Config, metrics, UploadRequest, UploadService};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// GCS Uploadr - validated uploads to Google Cloud Storage
#[derive(Parser, Debug)]
#[command(name = "gcs-uploadr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// File name to store the upload under. Default: the file's own name
    #[arg(short, long)]
    name: Option<String>,

    /// Content type recorded on the object
    #[arg(short = 't', long, default_value = DEFAULT_CONTENT_TYPE)]
    content_type: String,

    /// Print the upload metrics to stderr in Prometheus text format
    #[arg(long)]
    print_metrics: bool,

    /// File to upload
    file: PathBuf,
}

fn init_logging(level: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load configuration from {:?}", args.config))?;

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level.to_lowercase(), config.logging.json)?;

    info!("Starting GCS Uploadr v{}", gcs_uploadr::VERSION);
    info!("Loaded configuration from {:?}", args.config);

    let file_name = match args.name {
        Some(name) => Some(name),
        None => args
            .file
            .file_name()
            .and_then(|name| name.to_str())
            .map(String::from),
    };
    let payload = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read {:?}", args.file))?;

    let service = UploadService::from_config(&config)?;
    info!(
        endpoint = %config.storage.endpoint(),
        project = %config.storage.project_id,
        bucket = %service.bucket_id(),
        allowed_extensions = ?service.policy().allowed(),
        "Upload service ready"
    );

    let request = UploadRequest {
        payload: payload.into(),
        declared_file_name: file_name,
        content_type: args.content_type,
    };
    let outcome = service.upload_file(request).await;

    if args.print_metrics {
        eprint!("{}", metrics::render()?);
    }
    let result = outcome?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
