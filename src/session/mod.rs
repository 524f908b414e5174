// src/session/mod.rs
//! Session manager: device lifecycle around one acquisition sequence
//!
//! Flow: connect, open, best-effort metadata, optional notifications, settle,
//! activate streaming, subscribe ingest, run the sequencer, then close the
//! connection before the buffer is drained and exported once.

mod active;

pub use active::ActiveSession;

use crate::acquisition::{
    AcquisitionSequencer, FrameBuffer, LabelState, PhaseRecord, SequenceReport, SessionConfig,
    StreamingIngest,
};
use crate::config::DeviceSettings;
use crate::error::{CaptureError, CaptureResult, IntoCaptureError};
use crate::error_context;
use crate::export::{ExportDestination, ExportSummary, Exporter};
use crate::hal::{
    DeviceHandle, DeviceLink, DeviceMetadata, LinkError, LinkSession, StreamingMode,
};
use crate::presenter::Presenter;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Notification rate assumed when sizing the frame buffer
const EXPECTED_FRAMES_PER_SECOND: u64 = 64;
/// Upper bound on frames reserved before streaming starts
const MAX_PREALLOCATED_FRAMES: usize = 1 << 16;

/// What a completed session produced
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub device: DeviceHandle,
    pub metadata: DeviceMetadata,
    pub auxiliary_notifications: bool,
    pub report: SequenceReport,
    pub phases: Vec<PhaseRecord>,
    pub export: ExportSummary,
    pub frames_captured: usize,
    pub ingest_invocations: u64,
    pub late_frames: u64,
}

/// Owns the device link and runs capture sessions against it
pub struct SessionManager<L: DeviceLink> {
    link: L,
    settings: DeviceSettings,
}

impl<L: DeviceLink> SessionManager<L> {
    pub fn new(link: L, settings: DeviceSettings) -> Self {
        Self { link, settings }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    /// Resolve a device by address within the discovery timeout
    pub async fn connect(&self, address: &str) -> CaptureResult<DeviceHandle> {
        let timeout = self.settings.discovery_timeout();
        info!(address, ?timeout, "Searching for device");

        let found = match tokio::time::timeout(timeout, self.link.find_by_address(address, timeout))
            .await
        {
            Ok(result) => result.capture_err("session", "connect")?,
            Err(_) => None,
        };

        found.ok_or_else(|| CaptureError::DeviceNotFound {
            address: address.to_string(),
            timeout,
            context: error_context!("session", "connect"),
        })
    }

    /// Open a connection to a resolved device and read its metadata
    pub async fn open(&self, handle: &DeviceHandle) -> CaptureResult<ActiveSession<L::Session>> {
        let session = self
            .link
            .open(handle)
            .await
            .capture_err("session", "open")?;
        info!(address = %handle.address, "Device connected");

        let mut active = ActiveSession::new(handle.clone(), session);
        let metadata = self.read_metadata(&active).await;
        active.set_metadata(metadata);
        Ok(active)
    }

    /// Query name, battery, firmware and device info. Each failure is logged
    /// and skipped.
    pub async fn read_metadata(&self, active: &ActiveSession<L::Session>) -> DeviceMetadata {
        let Some(link) = active.link() else {
            warn!("Metadata requested on a closed session");
            return DeviceMetadata::default();
        };

        let metadata = DeviceMetadata {
            name: recover("name", link.name().await),
            battery_percent: recover("battery", link.battery_level().await),
            firmware: recover("firmware", link.firmware_version().await),
            info: recover("info", link.device_info().await),
        };

        info!(
            name = metadata.name.as_deref().unwrap_or("unknown"),
            battery = ?metadata.battery_percent,
            firmware = %metadata
                .firmware
                .map(|f| f.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            info = metadata.info.as_deref().unwrap_or("unknown"),
            "Device metadata"
        );
        metadata
    }

    /// Try to enable auxiliary notifications. Returns whether they are on.
    pub async fn enable_optional_notifications(
        &self,
        active: &mut ActiveSession<L::Session>,
    ) -> bool {
        let result = match active.link_mut("enable_optional_notifications") {
            Ok(link) => link.enable_auxiliary_notifications().await,
            Err(e) => {
                warn!(error = %e, "Auxiliary notifications not enabled");
                return false;
            }
        };

        match result {
            Ok(()) => {
                info!("Auxiliary notifications enabled");
                true
            }
            Err(source) if source.is_unsupported() => {
                let err = CaptureError::UnsupportedCapability {
                    capability: source.to_string(),
                    context: error_context!("session", "enable_optional_notifications"),
                };
                warn!(error = %err, "Continuing without auxiliary notifications");
                false
            }
            Err(source) => {
                warn!(error = %source, "Auxiliary notifications failed, continuing");
                false
            }
        }
    }

    /// Wait the settling delay, then switch the device into `mode`
    pub async fn activate_streaming(
        &self,
        active: &mut ActiveSession<L::Session>,
        mode: StreamingMode,
    ) -> CaptureResult<()> {
        if !mode.is_streaming() {
            return Err(CaptureError::configuration(
                "session",
                format!("{:?} is not a streaming mode", mode),
            ));
        }

        tokio::time::sleep(self.settings.settle_delay()).await;
        active.set_streaming_mode(mode).await?;
        info!(?mode, "Streaming activated");
        Ok(())
    }

    /// Run one complete capture session.
    ///
    /// The connection is closed on every exit path once it was opened. The
    /// exporter is called once, after the sequence finished and the link is
    /// closed. On export failure the frames are returned inside the error.
    pub async fn run(
        &self,
        session_config: SessionConfig,
        exporter: &dyn Exporter,
        destination: &ExportDestination,
        presenter: &dyn Presenter,
        cancel: &CancellationToken,
    ) -> CaptureResult<SessionOutcome> {
        let label = Arc::new(LabelState::new());
        let mut sequencer = AcquisitionSequencer::new(session_config, Arc::clone(&label))?;

        let device = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(CaptureError::Cancelled { during: "Discovery".to_string() });
            }
            found = self.connect(&self.settings.address) => found?,
        };

        let mut active = self.open(&device).await?;
        let metadata = active.metadata().clone();
        let auxiliary_notifications = self.enable_optional_notifications(&mut active).await;

        let buffer = Arc::new(FrameBuffer::with_capacity(initial_capacity(sequencer.config())));

        let streamed = self
            .stream(&mut active, &mut sequencer, &label, &buffer, presenter, cancel)
            .await;

        if let Err(e) = active.close().await {
            warn!(error = %e, "Device close failed");
        }
        let (report, ingest) = streamed?;

        let frames = buffer.drain();
        let late_frames = buffer.metrics().late_frames;
        let ingest_invocations = ingest.invocations();
        presenter.finished(frames.len());

        let export = match exporter.write(&frames, destination) {
            Ok(summary) => summary,
            Err(source) => {
                return Err(CaptureError::Export {
                    source,
                    frames,
                    context: error_context!("session", "export"),
                });
            }
        };

        info!(
            frames = frames.len(),
            labeled = export.labeled_rows,
            path = %export.path.display(),
            "Session complete"
        );

        Ok(SessionOutcome {
            device,
            metadata,
            auxiliary_notifications,
            report,
            phases: sequencer.phase_log().to_vec(),
            export,
            frames_captured: frames.len(),
            ingest_invocations,
            late_frames,
        })
    }

    async fn stream(
        &self,
        active: &mut ActiveSession<L::Session>,
        sequencer: &mut AcquisitionSequencer,
        label: &Arc<LabelState>,
        buffer: &Arc<FrameBuffer>,
        presenter: &dyn Presenter,
        cancel: &CancellationToken,
    ) -> CaptureResult<(SequenceReport, Arc<StreamingIngest>)> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(CaptureError::Cancelled { during: "StreamingActivation".to_string() });
            }
            activated = self.activate_streaming(active, self.settings.streaming_mode) => activated?,
        }

        let ingest = Arc::new(StreamingIngest::new(Arc::clone(label), Arc::clone(buffer)));
        active.subscribe(ingest.callback())?;

        let report = sequencer.run(presenter, cancel).await?;
        Ok((report, ingest))
    }
}

fn recover<T>(field: &'static str, result: Result<T, LinkError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(source) => {
            let err = CaptureError::MetadataRead {
                field,
                source,
                context: error_context!("session", "read_metadata"),
            };
            warn!(error = %err, "Metadata unavailable");
            None
        }
    }
}

/// Frames to reserve up front; the buffer grows past this on demand
fn initial_capacity(config: &SessionConfig) -> usize {
    let expected = config
        .total_duration()
        .as_secs()
        .saturating_mul(EXPECTED_FRAMES_PER_SECOND);
    usize::try_from(expected)
        .unwrap_or(usize::MAX)
        .min(MAX_PREALLOCATED_FRAMES)
}
