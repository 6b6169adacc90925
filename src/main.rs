use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use camoverlay::config::{self, ConfigError};
use camoverlay::logging::{self, LogOptions};
use camoverlay::scenes::{AirQualityScene, FlowMeterScene, ScaleScene};
use camoverlay::source::{self, DemoReading};
use camoverlay_overlay::error::ClientError;
use camoverlay_overlay::{RasterClient, ResourceCache, Scene, Widget, WidgetOptions};
use camoverlay_types::{AppSettings, SceneKind};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::mpsc;

/// Readings buffered between a source and the widget
const READING_BUFFER: usize = 16;

/// How long shutdown waits for blocking work, such as a pending stdin read
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(version, about = "Render sensor readings as a camera video overlay")]
struct Cli {
    /// Settings file (TOML). Defaults to the platform config location.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug output for camoverlay. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw readings read as newline-delimited JSON from stdin
    Run {
        /// Write the composited stream to this PNG after every draw
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },
    /// Draw synthetic readings for the configured scene
    Demo {
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },
    /// Load and check the settings, then print a summary
    CheckConfig,
}

#[derive(Clone, Copy)]
enum Input {
    Stdin,
    Demo,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to set up the drawing backend")]
    Client(#[from] ClientError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_to_file = !matches!(cli.command, Commands::CheckConfig);
    let _log_guard = logging::init(LogOptions::new(cli.verbose, log_to_file));

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start the async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(execute(cli));
    // A stdin read blocked on a terminal never returns by itself
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "camoverlay failed");
            eprintln!("error: {err}");
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<(), AppError> {
    let settings = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { snapshot } => drive_scene(&settings, Input::Stdin, snapshot).await,
        Commands::Demo { snapshot } => drive_scene(&settings, Input::Demo, snapshot).await,
        Commands::CheckConfig => {
            print_summary(cli.config.as_deref(), &settings)?;
            Ok(())
        }
    }
}

async fn drive_scene(
    settings: &AppSettings,
    input: Input,
    snapshot: Option<PathBuf>,
) -> Result<(), AppError> {
    let overlay = settings.overlay.clone();
    match settings.scene {
        SceneKind::FlowMeter => drive(settings, FlowMeterScene::new(overlay), input, snapshot).await,
        SceneKind::Scale => drive(settings, ScaleScene::new(overlay), input, snapshot).await,
        SceneKind::AirQuality => {
            drive(settings, AirQualityScene::new(overlay), input, snapshot).await
        }
    }
}

/// Wire a source to a widget for `scene` and run until the source ends or
/// the process is interrupted
async fn drive<S>(
    settings: &AppSettings,
    scene: S,
    input: Input,
    snapshot: Option<PathBuf>,
) -> Result<(), AppError>
where
    S: Scene,
    S::Data: DeserializeOwned + DemoReading + Send + 'static,
{
    let overlay = &settings.overlay;
    let (mut client, events) = RasterClient::new(overlay.stream_width, overlay.stream_height)?;
    if let Some(path) = snapshot {
        tracing::info!(path = %path.display(), "Writing overlay snapshots");
        client = client.with_snapshot_path(path);
    }

    let resources = ResourceCache::from_entries(&settings.resources);
    let mut widget = Widget::new(
        client,
        events,
        scene,
        resources,
        WidgetOptions::from_settings(settings),
    );

    let (tx, rx) = mpsc::channel(READING_BUFFER);
    let source = match input {
        Input::Stdin => tokio::spawn(async move {
            if let Err(e) = source::read_ndjson(tokio::io::stdin(), tx).await {
                tracing::error!(error = %e, "Failed to read readings from stdin");
            }
        }),
        Input::Demo => tokio::spawn(source::run_demo(
            Duration::from_millis(overlay.refresh_ms),
            tx,
        )),
    };

    // Stopping the source closes the channel; the widget then clears the
    // overlay and disconnects.
    let stop = source.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping reading source");
            stop.abort();
        }
    });

    tracing::info!(scene = %settings.scene, "Overlay started");
    widget.run(rx).await;
    tracing::info!("Overlay stopped");
    Ok(())
}

fn print_summary(path: Option<&Path>, settings: &AppSettings) -> Result<(), ConfigError> {
    let location = match path {
        Some(path) => path.to_path_buf(),
        None => config::default_path()?,
    };
    let overlay = &settings.overlay;

    println!("settings: {}", location.display());
    println!("scene: {}", settings.scene);
    println!(
        "overlay: {}x{} at ({}, {}) {} scale {} on {}x{} ({})",
        overlay.width,
        overlay.height,
        overlay.pos_x,
        overlay.pos_y,
        overlay.alignment,
        overlay.scale,
        overlay.stream_width,
        overlay.stream_height,
        overlay.coordinates,
    );
    println!(
        "camera: {}:{}{}",
        settings.camera.ip,
        settings.camera.port,
        if settings.camera.tls { " (tls)" } else { "" }
    );
    println!("reconnect delay: {} ms", settings.reconnect_delay_ms);

    for entry in &settings.resources {
        let status = if Path::new(&entry.path).is_file() {
            "ok"
        } else {
            "missing"
        };
        println!(
            "resource {} ({}): {} [{}]",
            entry.moniker, entry.kind, entry.path, status
        );
    }
    Ok(())
}
