// src/acquisition/ingest.rs
//! Bridge from device notifications into the frame buffer

use crate::acquisition::{FrameBuffer, LabelState, SensorFrame};
use crate::hal::{EmgReading, FrameCallback};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::trace;

/// Stamps each notification with the active label and stores it.
///
/// Never suspends and never blocks beyond the buffer's append lock. One
/// notification always becomes exactly one frame.
#[derive(Debug)]
pub struct StreamingIngest {
    label: Arc<LabelState>,
    buffer: Arc<FrameBuffer>,
    started: Instant,
    invocations: AtomicU64,
}

impl StreamingIngest {
    pub fn new(label: Arc<LabelState>, buffer: Arc<FrameBuffer>) -> Self {
        Self {
            label,
            buffer,
            started: Instant::now(),
            invocations: AtomicU64::new(0),
        }
    }

    pub fn on_reading(&self, reading: EmgReading) {
        let frame = SensorFrame {
            channels: reading.concat(),
            label: self.label.current(),
            received_at: self.started.elapsed(),
        };

        self.invocations.fetch_add(1, Ordering::Relaxed);
        if !self.buffer.append(frame) {
            trace!("Frame arrived after the buffer was drained");
        }
    }

    /// Number of notifications handled so far
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Callback suitable for [`crate::hal::LinkSession::on_frame`]
    pub fn callback(self: &Arc<Self>) -> FrameCallback {
        let ingest = Arc::clone(self);
        Arc::new(move |reading| ingest.on_reading(reading))
    }
}
