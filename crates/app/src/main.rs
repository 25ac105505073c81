use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hanconv_core::{
    load_settings, plan_directory, save_settings, BatchEvent, BatchOrchestrator, BatchReport,
    EngineBackend, EngineConfig, PlanOptions, Settings, TargetFormat,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let folder = match args.next() {
        Some(folder) => PathBuf::from(folder),
        None => bail!("Usage: hanconv <folder> [pdf|hwpx]"),
    };
    let format_arg = args.next();

    // Determine settings path
    let settings_path = std::env::var("HANCONV_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_settings_path());

    info!(version = VERSION, settings = %settings_path.display(), "Starting hanconv");
    #[cfg(windows)]
    info!(elevated = hanconv_core::is_elevated(), "Privilege check");
    let mut settings = load_settings(&settings_path);

    let format = match format_arg {
        Some(arg) => TargetFormat::from_str(&arg).context("Unsupported target format")?,
        None => settings.format,
    };

    let opts = PlanOptions {
        format,
        include_subdirs: settings.include_sub,
        same_location: settings.same_location,
        output_root: settings.last_output.clone(),
        overwrite: settings.overwrite,
    };

    let tasks = plan_directory(&folder, &opts)
        .with_context(|| format!("Nothing to convert under {}", folder.display()))?;
    info!(tasks = tasks.len(), %format, "Planned conversion batch");

    settings.format = format;
    settings.last_folder = Some(folder.clone());
    remember_settings(&settings_path, &settings);

    let report = convert(tasks, format).await?;

    info!(
        succeeded = report.succeeded,
        failed = report.failed_count(),
        total = report.total,
        "Batch finished"
    );
    if report.failed_count() > 0 {
        for task in &report.failed {
            warn!(
                file = %task.input_path.display(),
                error = task.error.as_deref().unwrap_or("unknown"),
                "Conversion failed"
            );
        }
        bail!(
            "{} of {} conversions failed",
            report.failed_count(),
            report.total
        );
    }
    Ok(())
}

#[cfg(windows)]
async fn convert(
    tasks: Vec<hanconv_core::ConversionTask>,
    format: TargetFormat,
) -> Result<BatchReport> {
    run_batch(
        hanconv_core::ComEngineBackend::new(),
        tasks,
        format,
    )
    .await
}

#[cfg(not(windows))]
async fn convert(
    _tasks: Vec<hanconv_core::ConversionTask>,
    _format: TargetFormat,
) -> Result<BatchReport> {
    bail!("The Hangul automation engine is only available on Windows")
}

#[cfg_attr(not(windows), allow(dead_code))]
async fn run_batch<B>(
    backend: B,
    tasks: Vec<hanconv_core::ConversionTask>,
    format: TargetFormat,
) -> Result<BatchReport>
where
    B: EngineBackend + Send + 'static,
{
    let orchestrator = BatchOrchestrator::new(EngineConfig::default());
    let mut handle = orchestrator
        .start(backend, tasks, format)
        .context("Failed to start batch")?;

    let mut report = None;
    while let Some(event) = handle.next_event().await {
        match event {
            BatchEvent::Connecting => info!("Connecting to the automation engine"),
            BatchEvent::Connected { identity } => info!(%identity, "Engine connected"),
            BatchEvent::Progress {
                index,
                total,
                file_name,
            } => info!("Converting {}/{}: {}", index + 1, total, file_name),
            BatchEvent::TaskFinished { task, .. } => {
                if let Some(e) = &task.error {
                    warn!(file = %task.file_name(), error = %e, "Task failed");
                }
            }
            BatchEvent::Completed { report: r } => report = Some(r),
            BatchEvent::Cancelled { report: r } => {
                warn!("Batch cancelled");
                report = Some(r);
            }
            BatchEvent::Fatal { error } => {
                handle.wait().await;
                bail!("Could not connect to the automation engine: {error}");
            }
        }
    }
    handle.wait().await;

    report.context("Batch ended without a final report")
}

fn remember_settings(path: &Path, settings: &Settings) {
    if let Err(e) = save_settings(path, settings) {
        warn!(path = %path.display(), error = %e, "Could not persist settings");
    }
}

/// Per-user settings location: `%APPDATA%\hanconv\settings.json` on Windows,
/// `~/.config/hanconv/settings.json` elsewhere, with the working directory
/// as a last resort.
fn default_settings_path() -> PathBuf {
    if let Ok(appdata) = std::env::var("APPDATA") {
        return PathBuf::from(appdata).join("hanconv").join("settings.json");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("hanconv")
            .join("settings.json");
    }
    PathBuf::from("settings.json")
}
