// src/presenter.rs
//! Operator-facing prompts
//!
//! The sequencer only ever notifies a presenter; it never waits for one.

use crate::acquisition::{GestureClass, Phase, PhaseRecord};
use tracing::info;

/// "Now perform gesture X, repetition R"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GesturePrompt {
    pub class: GestureClass,
    /// Zero-based repetition index
    pub repetition: u32,
    pub repetitions: u32,
}

/// One-way notifications to the operator
pub trait Presenter: Send + Sync {
    fn announce(&self, prompt: &GesturePrompt);

    fn phase_started(&self, _phase: &PhaseRecord) {}

    fn finished(&self, _frames: usize) {}
}

/// Prints prompts to stdout
#[derive(Debug, Default)]
pub struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn announce(&self, prompt: &GesturePrompt) {
        println!(
            "\nPerform '{}' gesture (repetition {}/{})",
            prompt.class.name,
            prompt.repetition + 1,
            prompt.repetitions
        );
    }

    fn phase_started(&self, phase: &PhaseRecord) {
        match phase.phase {
            Phase::Prepare => println!("Preparing..."),
            Phase::Record => println!("Recording..."),
            Phase::Pause => println!("Pause"),
        }
    }

    fn finished(&self, frames: usize) {
        println!("\nFinished collecting data ({} frames).", frames);
    }
}

/// Routes prompts into the log instead of stdout
#[derive(Debug, Default)]
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn announce(&self, prompt: &GesturePrompt) {
        info!(
            class = %prompt.class.name,
            repetition = prompt.repetition + 1,
            of = prompt.repetitions,
            "Perform gesture"
        );
    }
}
