// src/export/csv_exporter.rs
//! CSV training-data exporter
//!
//! Layout: a header row `Sensor1..Sensor16,Label`, then one row per frame
//! with the sixteen channel values and the label id. Unlabeled frames leave
//! the label cell empty.

use crate::acquisition::SensorFrame;
use crate::export::{ExportDestination, ExportError, ExportSummary, Exporter};
use crate::hal::FRAME_CHANNELS;
use csv::WriterBuilder;
use tracing::info;

const LABEL_COLUMN: &str = "Label";

/// Writes frames as CSV rows
#[derive(Debug, Clone, Default)]
pub struct CsvExporter;

impl CsvExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn header() -> Vec<String> {
        (1..=FRAME_CHANNELS)
            .map(|i| format!("Sensor{}", i))
            .chain(std::iter::once(LABEL_COLUMN.to_string()))
            .collect()
    }

    fn row(frame: &SensorFrame) -> Vec<String> {
        frame
            .channels
            .iter()
            .map(|value| value.to_string())
            .chain(std::iter::once(
                frame.label.map(|id| id.to_string()).unwrap_or_default(),
            ))
            .collect()
    }
}

impl Exporter for CsvExporter {
    fn write(
        &self,
        frames: &[SensorFrame],
        destination: &ExportDestination,
    ) -> Result<ExportSummary, ExportError> {
        if destination.file_stem.trim().is_empty() {
            return Err(ExportError::InvalidDestination(
                "file stem cannot be empty".to_string(),
            ));
        }

        std::fs::create_dir_all(&destination.directory).map_err(|source| ExportError::Io {
            path: destination.directory.clone(),
            source,
        })?;

        let path = destination.path_with_extension("csv");
        let mut writer = WriterBuilder::new().has_headers(false).from_path(&path)?;

        writer.write_record(Self::header())?;
        let mut labeled_rows = 0;
        for frame in frames {
            if frame.label.is_some() {
                labeled_rows += 1;
            }
            writer.write_record(Self::row(frame))?;
        }
        writer.flush().map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), rows = frames.len(), labeled_rows, "Frames exported");
        Ok(ExportSummary {
            path,
            rows: frames.len(),
            labeled_rows,
        })
    }
}
