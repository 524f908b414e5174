//! emg-capture: labeled EMG capture sessions for gesture training datasets
//!
//! An operator performs a fixed catalog of gestures on cue while an armband
//! streams sensor frames. Each frame is stamped with the gesture label active
//! when it arrived, and the whole session is exported once at the end.
//!
//! - Device link traits with a simulated armband
//! - Timed prepare/record/pause sequencer driving a shared label cell
//! - Non-blocking ingest into a sealed-on-drain frame buffer
//! - Layered TOML configuration and CSV export
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use emg_capture::config::CaptureConfig;
//! use emg_capture::export::CsvExporter;
//! use emg_capture::hal::simulator::SimulatedArmband;
//! use emg_capture::presenter::ConsolePresenter;
//! use emg_capture::session::SessionManager;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CaptureConfig::default();
//!     let armband = SimulatedArmband::new(config.simulator_config())?;
//!     let manager = SessionManager::new(armband, config.device.clone());
//!
//!     let outcome = manager
//!         .run(
//!             config.session_config(),
//!             &CsvExporter::new(),
//!             &config.export_destination(0),
//!             &ConsolePresenter,
//!             &CancellationToken::new(),
//!         )
//!         .await?;
//!
//!     println!("Exported {} frames", outcome.export.rows);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod export;
pub mod hal;
pub mod presenter;
pub mod session;

// Re-export commonly used types for convenience
pub use acquisition::{GestureClass, GestureId, SensorFrame, SessionConfig};
pub use config::CaptureConfig;
pub use error::{CaptureError, CaptureResult, ErrorContext};
pub use hal::{DeviceLink, LinkError, LinkSession, StreamingMode};
pub use session::{SessionManager, SessionOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
