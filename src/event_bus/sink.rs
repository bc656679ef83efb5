//! Output targets for workflow events.

use std::any::type_name;
use std::fs::File;
use std::io::{self, Result as IoResult, Stdout, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex as ParkingMutex;

use super::event::Event;
use crate::telemetry::{PlainFormatter, TelemetryFormatter, file_header};

/// Abstraction over an output target that consumes full [`Event`] objects.
pub trait EventSink: Send {
    /// Handle a structured event. The sink decides how to format it.
    fn handle(&mut self, event: &Event) -> IoResult<()>;

    /// A stable, human-friendly identifier for this sink instance.
    fn name(&self) -> String {
        type_name::<Self>().to_string()
    }
}

/// Per-worker log file sink.
///
/// Writes a header block on creation, then one formatted line per log event
/// with streaming fragments written raw.
pub struct FileSink<F: TelemetryFormatter = PlainFormatter> {
    file: File,
    formatter: F,
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> IoResult<Self> {
        Self::with_formatter(path, PlainFormatter)
    }
}

impl<F: TelemetryFormatter> FileSink<F> {
    pub fn with_formatter(path: impl AsRef<Path>, formatter: F) -> IoResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        file.write_all(file_header(&name).as_bytes())?;
        Ok(Self { file, formatter })
    }
}

impl<F: TelemetryFormatter> EventSink for FileSink<F> {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        self.file
            .write_all(self.formatter.render_event(event).as_bytes())?;
        self.file.flush()
    }
}

/// Stdout sink; one randomly chosen worker per round echoes to the console.
pub struct StdOutSink<F: TelemetryFormatter = PlainFormatter> {
    handle: Stdout,
    formatter: F,
}

impl Default for StdOutSink {
    fn default() -> Self {
        Self {
            handle: io::stdout(),
            formatter: PlainFormatter,
        }
    }
}

impl<F: TelemetryFormatter> EventSink for StdOutSink<F> {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        self.handle
            .write_all(self.formatter.render_event(event).as_bytes())?;
        self.handle.flush()
    }
}

/// JSON Lines sink for machine-readable structured logging.
///
/// One JSON object per event, suitable for log aggregation and automated
/// analysis of a run. Fragments are recorded as events too, preserving the
/// stream exactly.
pub struct JsonLinesSink {
    file: File,
}

impl JsonLinesSink {
    pub fn create(path: impl AsRef<Path>) -> IoResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            file: File::create(path)?,
        })
    }
}

impl EventSink for JsonLinesSink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        let line = serde_json::to_string(event)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.flush()
    }
}

/// In-memory sink for tests and snapshots.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<ParkingMutex<Vec<Event>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of all captured events so callers can inspect without holding
    /// the mutex.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Event> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        self.entries.lock().push(event.clone());
        Ok(())
    }
}
