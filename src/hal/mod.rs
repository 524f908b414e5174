// src/hal/mod.rs
//! Hardware abstraction layer for EMG armbands

pub mod traits;
pub mod types;
pub mod simulator;


pub use traits::*;
pub use types::*;
