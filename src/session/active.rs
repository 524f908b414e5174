// src/session/active.rs
//! Connection-scoped device session with guaranteed teardown

use crate::error::{CaptureError, CaptureResult, IntoCaptureError};
use crate::hal::{
    DeviceHandle, DeviceMetadata, FrameCallback, LinkError, LinkSession, StreamingMode,
    Subscription,
};
use tracing::{debug, info, warn};

/// An open device connection.
///
/// [`ActiveSession::close`] stops streaming, unsubscribes ingest and closes
/// the link exactly once. Dropping a session that was never closed schedules
/// the same teardown on the current tokio runtime.
pub struct ActiveSession<S: LinkSession + 'static> {
    handle: DeviceHandle,
    metadata: DeviceMetadata,
    session: Option<S>,
    subscription: Option<Subscription>,
    streaming: bool,
}

impl<S: LinkSession + 'static> ActiveSession<S> {
    pub fn new(handle: DeviceHandle, session: S) -> Self {
        Self {
            handle,
            metadata: DeviceMetadata::default(),
            session: Some(session),
            subscription: None,
            streaming: false,
        }
    }

    pub fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    /// Metadata read when the session was opened
    pub fn metadata(&self) -> &DeviceMetadata {
        &self.metadata
    }

    pub(crate) fn set_metadata(&mut self, metadata: DeviceMetadata) {
        self.metadata = metadata;
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .as_ref()
            .map(Subscription::is_active)
            .unwrap_or(false)
    }

    /// The underlying link session, if still open
    pub fn link(&self) -> Option<&S> {
        self.session.as_ref()
    }

    pub(crate) fn link_mut(&mut self, operation: &str) -> CaptureResult<&mut S> {
        self.session.as_mut().ok_or_else(|| CaptureError::Link {
            source: LinkError::InvalidState("session is closed".to_string()),
            context: crate::error_context!("session", operation),
        })
    }

    pub(crate) async fn set_streaming_mode(&mut self, mode: StreamingMode) -> CaptureResult<()> {
        self.link_mut("set_streaming_mode")?
            .set_streaming_mode(mode)
            .await
            .capture_err("session", "set_streaming_mode")?;
        self.streaming = mode.is_streaming();
        Ok(())
    }

    /// Register the frame callback. Only one ingest subscription is held.
    pub fn subscribe(&mut self, callback: FrameCallback) -> CaptureResult<()> {
        let subscription = self
            .link_mut("subscribe")?
            .on_frame(callback)
            .capture_err("session", "subscribe")?;
        debug!(id = subscription.id(), "Ingest subscribed");

        if let Some(previous) = self.subscription.replace(subscription) {
            previous.cancel();
        }
        Ok(())
    }

    /// Stop streaming, unsubscribe and release the connection.
    ///
    /// Idempotent: only the first call reaches the link.
    pub async fn close(&mut self) -> CaptureResult<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }

        if self.streaming {
            if let Err(e) = session.set_streaming_mode(StreamingMode::Off).await {
                warn!(error = %e, "Failed to stop streaming before close");
            }
            self.streaming = false;
        }

        session.close().await.capture_err("session", "close")?;
        info!(address = %self.handle.address, "Device connection closed");
        Ok(())
    }
}

impl<S: LinkSession + 'static> Drop for ActiveSession<S> {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }

        let streaming = self.streaming;
        let address = self.handle.address.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(%address, "Session dropped while open, scheduling close");
                runtime.spawn(async move {
                    if streaming {
                        if let Err(e) = session.set_streaming_mode(StreamingMode::Off).await {
                            warn!(%address, error = %e, "Deferred stream stop failed");
                        }
                    }
                    if let Err(e) = session.close().await {
                        warn!(%address, error = %e, "Deferred close failed");
                    }
                });
            }
            Err(_) => {
                warn!(%address, "Session dropped outside a runtime, connection not closed");
            }
        }
    }
}
