//! In-process diagnostic log retrievable by a failing request.
//!
//! Orchestrators append an entry on every tolerated and propagated failure
//! path. The buffer is an explicit sink passed into the pipelines rather than
//! a module-level global, so the HTTP boundary can serialize it into a 500
//! envelope and tests can inspect it directly.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Severity of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagLevel {
    /// Informational progress marker.
    Info,
    /// A tolerated failure (e.g. one file skipped during ingestion).
    Warn,
    /// A propagated failure.
    Error,
}

/// One timestamped entry in the diagnostic log.
#[derive(Debug, Clone, Serialize)]
pub struct DiagEntry {
    /// Entry severity.
    pub level: DiagLevel,
    /// Human-readable description.
    pub message: String,
    /// When the entry was appended.
    pub time: DateTime<Utc>,
}

/// A cloneable, append-only diagnostic log buffer.
///
/// Clones share the same underlying buffer. Appends after construction are
/// the only mutation, guarded by a plain mutex.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    entries: Arc<Mutex<Vec<DiagEntry>>>,
}

impl DiagnosticLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry at the given level.
    pub fn push(&self, level: DiagLevel, message: impl Into<String>) {
        let entry = DiagEntry { level, message: message.into(), time: Utc::now() };
        // Lock poisoning only happens if a panic occurred mid-append; the
        // buffer is still usable for diagnostics either way.
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(entry);
    }

    /// Append an informational entry.
    pub fn info(&self, message: impl Into<String>) {
        self.push(DiagLevel::Info, message);
    }

    /// Append a tolerated-failure entry.
    pub fn warn(&self, message: impl Into<String>) {
        self.push(DiagLevel::Warn, message);
    }

    /// Append a propagated-failure entry.
    pub fn error(&self, message: impl Into<String>) {
        self.push(DiagLevel::Error, message);
    }

    /// Snapshot the accumulated entries.
    pub fn entries(&self) -> Vec<DiagEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_buffer() {
        let log = DiagnosticLog::new();
        let other = log.clone();
        other.error("boom");
        log.warn("skipped");

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, DiagLevel::Error);
        assert_eq!(entries[0].message, "boom");
        assert_eq!(entries[1].level, DiagLevel::Warn);
    }

    #[test]
    fn entries_serialize_with_timestamp() {
        let log = DiagnosticLog::new();
        log.info("ingestion complete");
        let json = serde_json::to_value(log.entries()).unwrap();
        assert_eq!(json[0]["level"], "info");
        assert!(json[0]["time"].is_string());
    }
}
