// src/acquisition/types.rs
//! Data model of a capture session

use crate::hal::FRAME_CHANNELS;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Identifier of a gesture class
pub type GestureId = u32;

/// One gesture of the catalog the operator performs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GestureClass {
    pub id: GestureId,
    pub name: String,
}

impl GestureClass {
    pub fn new(id: GestureId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Labeled sensor frame, immutable once captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorFrame {
    pub channels: [i8; FRAME_CHANNELS],
    pub label: Option<GestureId>,
    /// Arrival offset from the start of ingest
    pub received_at: Duration,
}

/// Immutable timing and catalog settings for one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub classes: Vec<GestureClass>,
    pub repetitions_per_class: u32,
    pub prepare_duration: Duration,
    pub record_duration: Duration,
    pub pause_duration: Duration,
}

impl SessionConfig {
    /// Check catalog and timing invariants
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("gesture catalog is empty".to_string());
        }
        if self.repetitions_per_class == 0 {
            return Err("repetitions per class must be greater than 0".to_string());
        }
        if self.record_duration.is_zero() {
            return Err("record duration must be greater than 0".to_string());
        }

        let mut seen = HashSet::new();
        for class in &self.classes {
            if class.name.trim().is_empty() {
                return Err(format!("gesture class {} has an empty name", class.id));
            }
            if !seen.insert(class.id) {
                return Err(format!("duplicate gesture class id {}", class.id));
            }
        }
        Ok(())
    }

    /// Number of record windows in the session
    pub fn window_count(&self) -> usize {
        self.classes
            .len()
            .saturating_mul(self.repetitions_per_class as usize)
    }

    /// Wall-clock length of one prepare/record/pause repetition
    pub fn repetition_duration(&self) -> Duration {
        self.prepare_duration
            .saturating_add(self.record_duration)
            .saturating_add(self.pause_duration)
    }

    /// Wall-clock length of the full sequence, saturating at `Duration::MAX`
    pub fn total_duration(&self) -> Duration {
        let windows = u32::try_from(self.window_count()).unwrap_or(u32::MAX);
        self.repetition_duration().saturating_mul(windows)
    }

    pub fn contains_class(&self, id: GestureId) -> bool {
        self.classes.iter().any(|class| class.id == id)
    }
}
