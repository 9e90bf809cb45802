mod annotate;
mod camera;
mod color;
mod config;
mod errlog;
mod scheduler;
mod telemetry;
mod upload;

use annotate::{Annotator, OutputMode};
use camera::{Capturer, UsbCamera};
use config::Config;
use errlog::ErrorLog;
use scheduler::Scheduler;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use upload::HttpUploader;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        camera = config.camera.index,
        telemetry = config.telemetry.path,
        url = config.upload.url,
        capture_secs = config.schedule.capture_interval_secs,
        upload_secs = config.schedule.upload_interval_secs,
        "starting roomcam"
    );

    let output = match config.overlay.output.as_str() {
        "latest" => OutputMode::Latest(PathBuf::from(&config.overlay.image_path)),
        "archive" => OutputMode::Archive(PathBuf::from(&config.overlay.archive_dir)),
        other => {
            error!(mode = other, "unknown output mode, expected 'latest' or 'archive'");
            std::process::exit(1);
        }
    };

    // Startup failures are fatal; only per-tick errors are survivable.
    let annotator = match Annotator::new(&config.overlay, output) {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "failed to set up annotator");
            std::process::exit(1);
        }
    };

    let camera = match UsbCamera::open(&config.camera) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to open camera");
            std::process::exit(1);
        }
    };
    let capturer = Capturer::new(camera, config.camera.drain_count);

    let uploader = match HttpUploader::new(&config.upload) {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "failed to build uploader");
            std::process::exit(1);
        }
    };

    let errors = ErrorLog::new(PathBuf::from(&config.logging.error_log));

    let mut scheduler = Scheduler::new(
        capturer,
        PathBuf::from(&config.telemetry.path),
        annotator,
        uploader,
        errors,
        Duration::from_secs(config.schedule.capture_interval_secs),
        Duration::from_secs(config.schedule.upload_interval_secs),
    );
    scheduler.run().await;
}
