// Row-oriented event output and the append-only run log.
//
// Every event becomes one fixed-width CSV row:
//   [event_id, nscatters, weight, edep, x0, y0, z0, (xi, yi, zi, dei) * writeout]
// with unused interaction slots zero-padded. The run log takes one
// JSON line per run with a timestamp and the full configuration
// snapshot.

use crate::model::{EventResult, RunSummary};
use crate::settings::Settings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("run-log serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Append-capable row writer consuming finished events
pub trait EventSink {
    fn write_event(&mut self, event: &EventResult, writeout: usize) -> Result<(), OutputError>;
    fn flush(&mut self) -> Result<(), OutputError>;
}

/// CSV event sink over any writer
pub struct CsvEventSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvEventSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(inner),
        }
    }

    /// Consume the sink and hand back the inner writer
    pub fn into_inner(self) -> Result<W, OutputError> {
        self.writer.into_inner().map_err(|e| {
            OutputError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })
    }
}

impl CsvEventSink<std::fs::File> {
    /// Open a sink appending to the given path, creating it if needed
    pub fn append_to_path<P: AsRef<Path>>(path: P) -> Result<Self, OutputError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> EventSink for CsvEventSink<W> {
    fn write_event(&mut self, event: &EventResult, writeout: usize) -> Result<(), OutputError> {
        let mut fields = Vec::with_capacity(7 + 4 * writeout);
        fields.push(event.event_id.to_string());
        fields.push(event.n_scatters.to_string());
        fields.push(event.weight.to_string());
        fields.push(event.edep_kev.to_string());
        for coord in event.start {
            fields.push(coord.to_string());
        }
        // Fixed row width: one slot per recorded interaction up to the
        // writeout cap, zero-padded beyond the history
        for i in 0..writeout {
            match event.interactions.get(i) {
                Some(rec) => {
                    for coord in rec.position {
                        fields.push(coord.to_string());
                    }
                    fields.push(rec.deposit_kev.to_string());
                }
                None => {
                    for _ in 0..4 {
                        fields.push("0".to_string());
                    }
                }
            }
        }
        self.writer.write_record(&fields)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One structured record per run in the simulation log book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub timestamp: DateTime<Utc>,
    pub settings: Settings,
    pub events_emitted: u64,
    pub events_failed: u64,
    pub events_cut_exceeded: u64,
}

impl RunLogEntry {
    pub fn new(settings: &Settings, summary: &RunSummary) -> Self {
        Self {
            timestamp: Utc::now(),
            settings: settings.clone(),
            events_emitted: summary.emitted,
            events_failed: summary.failed,
            events_cut_exceeded: summary.cut_exceeded,
        }
    }
}

/// Append-only run log writing one JSON line per run
pub struct RunLog<W: Write> {
    inner: W,
}

impl<W: Write> RunLog<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn append(&mut self, entry: &RunLogEntry) -> Result<(), OutputError> {
        let line = serde_json::to_string(entry)?;
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(b"\n")?;
        self.inner.flush()?;
        Ok(())
    }
}

impl RunLog<std::fs::File> {
    /// Open the log book for appending, creating it if needed
    pub fn append_to_path<P: AsRef<Path>>(path: P) -> Result<Self, OutputError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}
