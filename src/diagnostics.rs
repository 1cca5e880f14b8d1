use crate::util::now_rfc3339;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Append-only record of intermediate decoding decisions.
///
/// Implementations must never fail the caller: a sink that cannot write
/// drops the entry.
pub trait DiagnosticSink {
    fn record(&self, stage: &str, message: &str);
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn record(&self, stage: &str, message: &str) {
        (**self).record(stage, message)
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for Box<T> {
    fn record(&self, stage: &str, message: &str) {
        (**self).record(stage, message)
    }
}

/// Emit a decision to tracing and to the injected sink.
pub(crate) fn note(sink: &dyn DiagnosticSink, stage: &str, message: &str) {
    debug!(stage, "{message}");
    sink.record(stage, message);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _stage: &str, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEntry {
    pub stage: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<DiagnosticEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, stage: &str, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|e| e.stage == stage && e.message.contains(needle))
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, stage: &str, message: &str) {
        let entry = DiagnosticEntry {
            stage: stage.to_string(),
            message: message.to_string(),
        };
        match self.entries.lock() {
            Ok(mut guard) => guard.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

/// Appends `[timestamp] stage: message` lines to a file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiagnosticSink for FileSink {
    fn record(&self, stage: &str, message: &str) {
        let line = format!("[{}] {}: {}\n", now_rfc3339(), stage, message);
        let res = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(line.as_bytes()));
        if let Err(err) = res {
            warn!("diagnostic log write failed {}: {err}", self.path.display());
        }
    }
}
