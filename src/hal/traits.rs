// src/hal/traits.rs
//! Device link traits consumed by the session manager

use crate::hal::types::{
    DeviceHandle, FirmwareVersion, FrameCallback, LinkError, StreamingMode, Subscription,
};
use async_trait::async_trait;
use std::time::Duration;

/// Entry point of a device transport: discovery and connection
#[async_trait]
pub trait DeviceLink: Send + Sync {
    type Session: LinkSession + 'static;

    /// Resolve a device by address, giving up after `timeout`
    async fn find_by_address(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<Option<DeviceHandle>, LinkError>;

    /// Open a connection to a resolved device
    async fn open(&self, handle: &DeviceHandle) -> Result<Self::Session, LinkError>;
}

/// An open connection to an armband
#[async_trait]
pub trait LinkSession: Send + Sync {
    async fn name(&self) -> Result<String, LinkError>;

    /// Battery level in percent
    async fn battery_level(&self) -> Result<u8, LinkError>;

    async fn firmware_version(&self) -> Result<FirmwareVersion, LinkError>;

    /// Device information block. Links without one report it unsupported.
    async fn device_info(&self) -> Result<String, LinkError> {
        Err(LinkError::Unsupported("device info".to_string()))
    }

    /// Enable auxiliary notifications (battery). Fails with
    /// [`LinkError::Unsupported`] on devices without the feature.
    async fn enable_auxiliary_notifications(&mut self) -> Result<(), LinkError>;

    async fn set_streaming_mode(&mut self, mode: StreamingMode) -> Result<(), LinkError>;

    /// Register a callback for EMG notifications.
    ///
    /// The callback runs on the link's delivery context and must not block.
    fn on_frame(&mut self, callback: FrameCallback) -> Result<Subscription, LinkError>;

    /// Stop streaming and release the connection
    async fn close(&mut self) -> Result<(), LinkError>;
}
