// src/acquisition/sequencer.rs
//! Timed prepare/record/pause state machine

use crate::acquisition::{GestureClass, GestureId, LabelState, SessionConfig};
use crate::error::{CaptureError, CaptureResult};
use crate::presenter::{GesturePrompt, Presenter};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const MAX_PREALLOCATED_PHASES: usize = 4_096;

/// Phase of a single repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Prepare,
    Record,
    Pause,
}

/// Sequencer states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Preparing { class_index: usize, repetition: u32 },
    Recording { class_index: usize, repetition: u32 },
    Pausing { class_index: usize, repetition: u32 },
    Done,
    Cancelled,
}

/// One entry of the phase log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseRecord {
    pub class_id: GestureId,
    pub class_index: usize,
    pub repetition: u32,
    pub phase: Phase,
    /// Offset from the start of the sequence
    pub started_at: Duration,
    pub duration: Duration,
}

impl PhaseRecord {
    /// Whether `offset` falls strictly inside this phase
    pub fn contains(&self, offset: Duration) -> bool {
        offset > self.started_at && offset < self.started_at + self.duration
    }
}

/// Outcome of a completed sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    pub windows: usize,
    pub phases: usize,
    pub elapsed: Duration,
}

/// Drives one session through every (gesture, repetition) pair in catalog
/// order, repetition-ascending, updating the label at each boundary.
pub struct AcquisitionSequencer {
    config: SessionConfig,
    label: Arc<LabelState>,
    state: SequencerState,
    log: Vec<PhaseRecord>,
}

impl AcquisitionSequencer {
    pub fn new(config: SessionConfig, label: Arc<LabelState>) -> CaptureResult<Self> {
        config
            .validate()
            .map_err(|reason| CaptureError::configuration("sequencer", reason))?;

        let capacity = config.window_count().saturating_mul(3).min(MAX_PREALLOCATED_PHASES);
        Ok(Self {
            config,
            label,
            state: SequencerState::Idle,
            log: Vec::with_capacity(capacity),
        })
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn phase_log(&self) -> &[PhaseRecord] {
        &self.log
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the full grid. Suspends only on phase waits.
    ///
    /// On cancellation the label is cleared and [`CaptureError::Cancelled`]
    /// is returned; the state machine does not resume.
    pub async fn run(
        &mut self,
        presenter: &dyn Presenter,
        cancel: &CancellationToken,
    ) -> CaptureResult<SequenceReport> {
        if self.state != SequencerState::Idle {
            return Err(CaptureError::configuration(
                "sequencer",
                format!("sequencer cannot restart from {:?}", self.state),
            ));
        }

        let started = Instant::now();
        let classes = self.config.classes.clone();
        let repetitions = self.config.repetitions_per_class;

        info!(
            classes = classes.len(),
            repetitions,
            total = ?self.config.total_duration(),
            "Starting acquisition sequence"
        );

        for (class_index, class) in classes.iter().enumerate() {
            for repetition in 0..repetitions {
                presenter.announce(&GesturePrompt {
                    class: class.clone(),
                    repetition,
                    repetitions,
                });

                for phase in [Phase::Prepare, Phase::Record, Phase::Pause] {
                    let duration = self.enter(phase, class, class_index, repetition, started);
                    if let Some(record) = self.log.last() {
                        presenter.phase_started(record);
                    }
                    self.wait(duration, cancel).await?;
                }
            }
        }

        self.label.clear();
        self.state = SequencerState::Done;

        let report = SequenceReport {
            windows: self.config.window_count(),
            phases: self.log.len(),
            elapsed: started.elapsed(),
        };
        info!(windows = report.windows, elapsed = ?report.elapsed, "Acquisition sequence done");
        Ok(report)
    }

    fn enter(
        &mut self,
        phase: Phase,
        class: &GestureClass,
        class_index: usize,
        repetition: u32,
        started: Instant,
    ) -> Duration {
        let duration = match phase {
            Phase::Prepare => {
                self.label.clear();
                self.state = SequencerState::Preparing { class_index, repetition };
                self.config.prepare_duration
            }
            Phase::Record => {
                self.label.set(Some(class.id));
                self.state = SequencerState::Recording { class_index, repetition };
                self.config.record_duration
            }
            Phase::Pause => {
                self.label.clear();
                self.state = SequencerState::Pausing { class_index, repetition };
                self.config.pause_duration
            }
        };

        debug!(class = %class.name, repetition, ?phase, "Phase boundary");
        self.log.push(PhaseRecord {
            class_id: class.id,
            class_index,
            repetition,
            phase,
            started_at: started.elapsed(),
            duration,
        });
        duration
    }

    async fn wait(&mut self, duration: Duration, cancel: &CancellationToken) -> CaptureResult<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let during = format!("{:?}", self.state);
                self.label.clear();
                self.state = SequencerState::Cancelled;
                Err(CaptureError::Cancelled { during })
            }
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
