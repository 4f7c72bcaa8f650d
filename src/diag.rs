//! Injected diagnostics sink.
//!
//! Core components report failures and telemetry through a [`DiagnosticsSink`]
//! passed in as a dependency instead of mutating process-wide logging state.
//! The default sink, [`LogSink`], forwards to the `log` facade; [`MemorySink`]
//! collects records for inspection in tests.

use std::sync::Mutex;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational telemetry (timings, progress).
    Info,
    /// Something degraded but the run continues.
    Warning,
    /// A page or field failed.
    Error,
}

/// Where a diagnostic originated: a page, a field, both, or neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    /// 1-based page number, if the diagnostic concerns one page.
    pub page: Option<usize>,
    /// Field name, if the diagnostic concerns one field.
    pub field: Option<String>,
}

impl Context {
    /// A diagnostic with no page or field attribution.
    pub fn none() -> Self {
        Self::default()
    }

    /// A diagnostic about one page (1-based).
    pub fn page(number: usize) -> Self {
        Self {
            page: Some(number),
            field: None,
        }
    }

    /// A diagnostic about one field.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            page: None,
            field: Some(name.into()),
        }
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.page, &self.field) {
            (Some(page), Some(field)) => write!(f, "page {page}, field {field}"),
            (Some(page), None) => write!(f, "page {page}"),
            (None, Some(field)) => write!(f, "field {field}"),
            (None, None) => Ok(()),
        }
    }
}

/// Sink for diagnostics produced by the pipeline.
///
/// Implementations must be thread safe since page transforms run on pool
/// workers.
pub trait DiagnosticsSink: Send + Sync {
    /// Record one diagnostic.
    fn record(&self, severity: Severity, context: &Context, message: &str);
}

/// Sink that forwards every record to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn record(&self, severity: Severity, context: &Context, message: &str) {
        let line = if context.page.is_some() || context.field.is_some() {
            format!("{context}: {message}")
        } else {
            message.to_string()
        };
        match severity {
            Severity::Info => log::info!("{line}"),
            Severity::Warning => log::warn!("{line}"),
            Severity::Error => log::error!("{line}"),
        }
    }
}

/// One record captured by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Severity of the record.
    pub severity: Severity,
    /// Originating context.
    pub context: Context,
    /// Message text.
    pub message: String,
}

/// Sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far, in arrival order.
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Messages of all records with the given severity.
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.severity == severity)
            .map(|r| r.message)
            .collect()
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&self, severity: Severity, context: &Context, message: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push(DiagnosticRecord {
                severity,
                context: context.clone(),
                message: message.to_string(),
            });
        }
    }
}
