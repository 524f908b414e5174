// src/acquisition/mod.rs
//! Labeled frame acquisition: label cell, frame buffer, ingest and sequencer

pub mod types;
pub mod label_state;
pub mod frame_buffer;
pub mod ingest;
pub mod sequencer;

pub use types::*;
pub use label_state::*;
pub use frame_buffer::*;
pub use ingest::*;
pub use sequencer::*;
