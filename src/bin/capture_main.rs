//! emg-capture - record a labeled gesture session from an armband
//!
//! Runs against the simulated armband link. Ctrl-C stops the session; the
//! device connection is still closed before exit.

use clap::Parser;
use emg_capture::config::{CaptureConfig, ConfigLoader};
use emg_capture::export::CsvExporter;
use emg_capture::hal::simulator::SimulatedArmband;
use emg_capture::presenter::ConsolePresenter;
use emg_capture::session::SessionManager;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "emg-capture")]
#[command(about = "Capture labeled EMG gesture data")]
#[command(version)]
struct Cli {
    /// Configuration file, later files override earlier ones
    #[arg(short, long = "config")]
    configs: Vec<PathBuf>,

    /// Armband address, overrides the configuration
    #[arg(short, long)]
    address: Option<String>,

    /// Directory for exported sessions
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Repetitions per gesture class
    #[arg(short, long)]
    repetitions: Option<u32>,
}

impl Cli {
    fn load_config(&self) -> Result<CaptureConfig, Box<dyn std::error::Error>> {
        let loader = if self.configs.is_empty() {
            ConfigLoader::new()
        } else {
            ConfigLoader::with_paths(self.configs.clone())
        };
        let mut config = loader.load()?;

        if let Some(address) = &self.address {
            config.device.address = address.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.export.output_dir = output_dir.clone();
        }
        if let Some(repetitions) = self.repetitions {
            config.session.repetitions_per_class = repetitions;
        }

        config.validate_consistency().map_err(|errors| errors.join("; "))?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    info!(name = emg_capture::NAME, version = emg_capture::VERSION, "Starting");
    let config = cli.load_config()?;
    info!(
        address = %config.device.address,
        classes = config.classes.len(),
        repetitions = config.session.repetitions_per_class,
        "Configuration loaded"
    );

    let armband = SimulatedArmband::new(config.simulator_config())?;
    let manager = SessionManager::new(armband, config.device.clone());

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping session");
            watcher.cancel();
        }
    });

    let started_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    let destination = config.export_destination(started_ms);

    match manager
        .run(
            config.session_config(),
            &CsvExporter::new(),
            &destination,
            &ConsolePresenter,
            &cancel,
        )
        .await
    {
        Ok(outcome) => {
            println!(
                "Saved {} frames ({} labeled) to {}",
                outcome.export.rows,
                outcome.export.labeled_rows,
                outcome.export.path.display()
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Capture session failed");
            Err(e.into())
        }
    }
}
