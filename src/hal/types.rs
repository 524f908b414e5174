// src/hal/types.rs
//! Core types shared by every device link

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Channels in one armband EMG vector
pub const CHANNELS_PER_VECTOR: usize = 8;

/// Channels in one captured frame (two vectors per notification)
pub const FRAME_CHANNELS: usize = CHANNELS_PER_VECTOR * 2;

/// A resolved device, ready to be opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHandle {
    pub address: String,
    pub name: Option<String>,
}

/// One EMG notification: two co-arriving 8-channel vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmgReading {
    pub first: [i8; CHANNELS_PER_VECTOR],
    pub second: [i8; CHANNELS_PER_VECTOR],
}

impl EmgReading {
    pub fn new(first: [i8; CHANNELS_PER_VECTOR], second: [i8; CHANNELS_PER_VECTOR]) -> Self {
        Self { first, second }
    }

    /// Concatenate both vectors in arrival order
    pub fn concat(&self) -> [i8; FRAME_CHANNELS] {
        let mut channels = [0i8; FRAME_CHANNELS];
        channels[..CHANNELS_PER_VECTOR].copy_from_slice(&self.first);
        channels[CHANNELS_PER_VECTOR..].copy_from_slice(&self.second);
        channels
    }
}

/// Firmware version as reported by the armband
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub hardware_rev: u16,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{} (hw rev {})",
            self.major, self.minor, self.patch, self.hardware_rev
        )
    }
}

/// Descriptive metadata gathered after opening a device.
///
/// Every field is best-effort: a failed query leaves it `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    pub name: Option<String>,
    pub battery_percent: Option<u8>,
    pub firmware: Option<FirmwareVersion>,
    /// Free-form device information string, when the link exposes one
    pub info: Option<String>,
}

/// Sensor streaming modes understood by the armband
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamingMode {
    Off,
    /// Filtered EMG
    Emg,
    /// Unfiltered EMG
    EmgRaw,
}

impl StreamingMode {
    pub fn is_streaming(&self) -> bool {
        !matches!(self, StreamingMode::Off)
    }
}

impl Default for StreamingMode {
    fn default() -> Self {
        StreamingMode::Emg
    }
}

/// Device link errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("feature not supported: {0}")]
    Unsupported(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("device disconnected")]
    Disconnected,

    #[error("invalid link state: {0}")]
    InvalidState(String),
}

impl LinkError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, LinkError::Unsupported(_))
    }
}

/// Callback invoked by a link for every EMG notification
pub type FrameCallback = Arc<dyn Fn(EmgReading) + Send + Sync>;

/// Cancellable handle for a registered frame callback.
///
/// Cancelling (or dropping) the handle stops delivery to the callback. Links
/// check [`Subscription::is_active`] before every delivery.
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
}

impl Subscription {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Shared flag the link polls before delivering a frame
    pub fn active_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.active)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop delivery. Idempotent.
    pub fn cancel(&self) {
        self.active.store(false, Ordering::Release);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
