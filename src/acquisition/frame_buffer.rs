// src/acquisition/frame_buffer.rs
//! Append-only store of labeled frames

use crate::acquisition::SensorFrame;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Buffer counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferMetrics {
    pub frames: usize,
    pub labeled_frames: usize,
    pub late_frames: u64,
    pub sealed: bool,
}

#[derive(Debug, Default)]
struct Inner {
    frames: Vec<SensorFrame>,
    labeled: usize,
    sealed: bool,
}

/// Ordered frame store: appended by ingest, drained once at session end.
///
/// Insertion order is arrival order. After [`FrameBuffer::drain`] the buffer
/// is sealed and further appends are counted as late and discarded.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    inner: Mutex<Inner>,
    late_frames: AtomicU64,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                frames: Vec::with_capacity(capacity),
                ..Default::default()
            }),
            late_frames: AtomicU64::new(0),
        }
    }

    /// Append a frame. Returns `false` if the buffer was already drained.
    pub fn append(&self, frame: SensorFrame) -> bool {
        let mut inner = self.inner.lock();
        if inner.sealed {
            self.late_frames.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if frame.label.is_some() {
            inner.labeled += 1;
        }
        inner.frames.push(frame);
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every frame in arrival order and seal the buffer
    pub fn drain(&self) -> Vec<SensorFrame> {
        let mut inner = self.inner.lock();
        inner.sealed = true;
        inner.labeled = 0;
        std::mem::take(&mut inner.frames)
    }

    pub fn metrics(&self) -> BufferMetrics {
        let inner = self.inner.lock();
        BufferMetrics {
            frames: inner.frames.len(),
            labeled_frames: inner.labeled,
            late_frames: self.late_frames.load(Ordering::Relaxed),
            sealed: inner.sealed,
        }
    }
}
