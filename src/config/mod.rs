// src/config/mod.rs
//! Capture configuration: device, session timing, gesture catalog, export

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use crate::acquisition::{GestureClass, SessionConfig};
use crate::export::ExportDestination;
use crate::hal::simulator::SimulatorConfig;
use crate::hal::StreamingMode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Complete capture configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureConfig {
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default = "defaults::classes")]
    pub classes: Vec<GestureClass>,
    #[serde(default)]
    pub export: ExportSettings,
    pub simulator: Option<SimulatorConfig>,
}

/// Device link settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeviceSettings {
    #[serde(default = "defaults::address")]
    pub address: String,

    #[serde(default = "defaults::discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,

    #[serde(default = "defaults::settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default)]
    pub streaming_mode: StreamingMode,
}

/// Sequencer timing
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionSettings {
    #[serde(default = "defaults::repetitions_per_class")]
    pub repetitions_per_class: u32,

    #[serde(default = "defaults::prepare_ms")]
    pub prepare_ms: u64,

    #[serde(default = "defaults::record_ms")]
    pub record_ms: u64,

    #[serde(default = "defaults::pause_ms")]
    pub pause_ms: u64,
}

/// Export destination settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExportSettings {
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "defaults::file_prefix")]
    pub file_prefix: String,
}

/// Default value providers using constants
mod defaults {
    use crate::acquisition::GestureClass;
    use crate::config::constants::*;
    use std::path::PathBuf;

    pub fn address() -> String { device::DEFAULT_ADDRESS.to_string() }
    pub fn discovery_timeout_ms() -> u64 { device::DEFAULT_DISCOVERY_TIMEOUT_MS }
    pub fn settle_delay_ms() -> u64 { device::DEFAULT_SETTLE_DELAY_MS }

    pub fn repetitions_per_class() -> u32 { timing::DEFAULT_REPETITIONS_PER_CLASS }
    pub fn prepare_ms() -> u64 { timing::DEFAULT_PREPARE_MS }
    pub fn record_ms() -> u64 { timing::DEFAULT_RECORD_MS }
    pub fn pause_ms() -> u64 { timing::DEFAULT_PAUSE_MS }

    pub fn output_dir() -> PathBuf { PathBuf::from(export::DEFAULT_OUTPUT_DIR) }
    pub fn file_prefix() -> String { export::DEFAULT_FILE_PREFIX.to_string() }

    pub fn classes() -> Vec<GestureClass> {
        vec![
            GestureClass::new(0, "rest"),
            GestureClass::new(1, "fist"),
            GestureClass::new(2, "open hand"),
        ]
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            address: defaults::address(),
            discovery_timeout_ms: defaults::discovery_timeout_ms(),
            settle_delay_ms: defaults::settle_delay_ms(),
            streaming_mode: StreamingMode::default(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            repetitions_per_class: defaults::repetitions_per_class(),
            prepare_ms: defaults::prepare_ms(),
            record_ms: defaults::record_ms(),
            pause_ms: defaults::pause_ms(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: defaults::output_dir(),
            file_prefix: defaults::file_prefix(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: DeviceSettings::default(),
            session: SessionSettings::default(),
            classes: defaults::classes(),
            export: ExportSettings::default(),
            simulator: None,
        }
    }
}

impl DeviceSettings {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl CaptureConfig {
    /// Validate configuration consistency, collecting every problem
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.device.address.trim().is_empty() {
            errors.push("Device address cannot be empty".to_string());
        }
        if !self.device.streaming_mode.is_streaming() {
            errors.push("Streaming mode must enable EMG streaming".to_string());
        }
        if self.device.settle_delay_ms > device::MAX_SETTLE_DELAY_MS {
            errors.push(format!(
                "Settle delay ({} ms) exceeds maximum of {} ms",
                self.device.settle_delay_ms,
                device::MAX_SETTLE_DELAY_MS
            ));
        }

        if self.session.repetitions_per_class == 0 {
            errors.push("Repetitions per class must be greater than 0".to_string());
        }
        if self.session.repetitions_per_class > timing::MAX_REPETITIONS_PER_CLASS {
            errors.push(format!(
                "Repetitions per class ({}) exceeds maximum of {}",
                self.session.repetitions_per_class,
                timing::MAX_REPETITIONS_PER_CLASS
            ));
        }
        if self.session.record_ms == 0 {
            errors.push("Record duration must be greater than 0".to_string());
        }
        for (phase, ms) in [
            ("Prepare", self.session.prepare_ms),
            ("Record", self.session.record_ms),
            ("Pause", self.session.pause_ms),
        ] {
            if ms > timing::MAX_PHASE_MS {
                errors.push(format!(
                    "{} duration ({} ms) exceeds maximum of {} ms",
                    phase,
                    ms,
                    timing::MAX_PHASE_MS
                ));
            }
        }

        if self.classes.is_empty() {
            errors.push("Gesture catalog cannot be empty".to_string());
        }
        let mut ids = HashSet::new();
        for class in &self.classes {
            if class.name.trim().is_empty() {
                errors.push(format!("Gesture class {} has an empty name", class.id));
            }
            if !ids.insert(class.id) {
                errors.push(format!("Duplicate gesture class id {}", class.id));
            }
        }

        if self.export.file_prefix.trim().is_empty() {
            errors.push("Export file prefix cannot be empty".to_string());
        }

        if let Some(simulator) = &self.simulator {
            if let Err(reason) = simulator.validate() {
                errors.push(reason);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Immutable session settings for the sequencer
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            classes: self.classes.clone(),
            repetitions_per_class: self.session.repetitions_per_class,
            prepare_duration: Duration::from_millis(self.session.prepare_ms),
            record_duration: Duration::from_millis(self.session.record_ms),
            pause_duration: Duration::from_millis(self.session.pause_ms),
        }
    }

    /// Export destination for a session finishing at `unix_millis`
    pub fn export_destination(&self, unix_millis: u64) -> ExportDestination {
        ExportDestination::new(
            self.export.output_dir.clone(),
            format!("{}_{}", self.export.file_prefix, unix_millis),
        )
    }

    /// Simulator settings bound to the configured device address
    pub fn simulator_config(&self) -> SimulatorConfig {
        let mut simulator = self.simulator.clone().unwrap_or_default();
        if self.simulator.is_none() {
            simulator.address = self.device.address.clone();
        }
        simulator
    }
}
