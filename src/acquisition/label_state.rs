// src/acquisition/label_state.rs
//! Shared "currently active gesture" cell
//!
//! Written by the sequencer at phase boundaries, read by ingest on every
//! notification. Stored in a single atomic word so a read is never torn and
//! the ingest path takes no lock.

use crate::acquisition::GestureId;
use std::sync::atomic::{AtomicU64, Ordering};

const NO_LABEL: u64 = u64::MAX;

/// Active gesture label, or none outside record phases
#[derive(Debug)]
pub struct LabelState {
    active: AtomicU64,
}

impl LabelState {
    pub fn new() -> Self {
        Self {
            active: AtomicU64::new(NO_LABEL),
        }
    }

    /// Publish a new label. Visible to the next [`LabelState::current`] call.
    pub fn set(&self, label: Option<GestureId>) {
        let raw = label.map(u64::from).unwrap_or(NO_LABEL);
        self.active.store(raw, Ordering::Release);
    }

    pub fn clear(&self) {
        self.set(None);
    }

    pub fn current(&self) -> Option<GestureId> {
        match self.active.load(Ordering::Acquire) {
            NO_LABEL => None,
            raw => Some(raw as GestureId),
        }
    }
}

impl Default for LabelState {
    fn default() -> Self {
        Self::new()
    }
}
