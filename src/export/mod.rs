// src/export/mod.rs
//! Exporter boundary
//!
//! The session hands the complete, drained frame buffer to an [`Exporter`]
//! exactly once, after the sequence reaches its terminal state.

pub mod csv_exporter;

pub use csv_exporter::CsvExporter;

use crate::acquisition::SensorFrame;
use std::path::PathBuf;
use thiserror::Error;

/// Where an export should land
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDestination {
    pub directory: PathBuf,
    pub file_stem: String,
}

impl ExportDestination {
    pub fn new(directory: impl Into<PathBuf>, file_stem: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_stem: file_stem.into(),
        }
    }

    /// Full path for a given file extension
    pub fn path_with_extension(&self, extension: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", self.file_stem, extension))
    }
}

/// Result of a successful export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub labeled_rows: usize,
}

/// Export failures
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV encoding error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),
}

/// Persists a session's frames
pub trait Exporter: Send + Sync {
    fn write(
        &self,
        frames: &[SensorFrame],
        destination: &ExportDestination,
    ) -> Result<ExportSummary, ExportError>;
}
