//! Document processing orchestration.
//!
//! [`DocumentProcessor`] drives the batch scheduler over all pages of a
//! document with a per-page transform (text extraction or barcode decode)
//! and assembles the page-indexed result. Internal indexing is zero-based;
//! output labels are 1-based `Page_<n>`, translated exactly once here at the
//! label boundary.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::barcode::{payload_to_string, pixmap_to_image, BarcodeDecoder};
use crate::diag::{Context, DiagnosticsSink, LogSink, Severity};
use crate::error::Result;
use crate::fields::{parse_fields, FieldMapping};
use crate::options::{ProcessOptions, WorkerIsolation, MAX_BARCODE_DPI, MIN_BARCODE_DPI};
use crate::reader::PdfDocument;
use crate::scheduler::{BatchScheduler, Executor, SequentialExecutor, ThreadPoolExecutor};
use crate::source::{DocumentSource, Rasterizer, TextSource};

/// Output label for a zero-based page index: `Page_1`, `Page_2`, ...
pub fn page_label(index: usize) -> String {
    format!("Page_{}", index + 1)
}

/// Per-page field mappings of one document, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFields {
    pages: Vec<FieldMapping>,
}

impl DocumentFields {
    /// Build from per-page mappings in page order.
    pub fn from_pages(pages: Vec<FieldMapping>) -> Self {
        Self { pages }
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Fields of one page (1-based page number).
    pub fn page(&self, number: usize) -> Option<&FieldMapping> {
        number.checked_sub(1).and_then(|i| self.pages.get(i))
    }

    /// Iterate `(label, fields)` pairs in page order.
    pub fn iter(&self) -> impl Iterator<Item = (String, &FieldMapping)> {
        self.pages
            .iter()
            .enumerate()
            .map(|(index, fields)| (page_label(index), fields))
    }
}

impl Serialize for DocumentFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pages.len()))?;
        for (label, fields) in self.iter() {
            map.serialize_entry(&label, fields)?;
        }
        map.end()
    }
}

/// Per-page decoded barcode payloads of one document, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentBarcodes {
    pages: Vec<Vec<String>>,
}

impl DocumentBarcodes {
    /// Build from per-page payload lists in page order.
    pub fn from_pages(pages: Vec<Vec<String>>) -> Self {
        Self { pages }
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Payloads of one page (1-based page number).
    pub fn page(&self, number: usize) -> Option<&[String]> {
        number
            .checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .map(|p| p.as_slice())
    }

    /// Iterate `(label, payloads)` pairs in page order.
    pub fn iter(&self) -> impl Iterator<Item = (String, &[String])> {
        self.pages
            .iter()
            .enumerate()
            .map(|(index, payloads)| (page_label(index), payloads.as_slice()))
    }
}

impl Serialize for DocumentBarcodes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pages.len()))?;
        for (label, payloads) in self.iter() {
            map.serialize_entry(&label, payloads)?;
        }
        map.end()
    }
}

/// Page-parallel document processor.
pub struct DocumentProcessor<E: Executor = ThreadPoolExecutor> {
    scheduler: BatchScheduler<E>,
    options: ProcessOptions,
    diag: Arc<dyn DiagnosticsSink>,
}

impl DocumentProcessor<ThreadPoolExecutor> {
    /// Create a processor with a bounded thread pool and the default
    /// log-backed diagnostics sink.
    pub fn new(options: ProcessOptions) -> Result<Self> {
        Self::with_diagnostics(options, Arc::new(LogSink))
    }

    /// Create a processor with an injected diagnostics sink.
    pub fn with_diagnostics(
        options: ProcessOptions,
        diag: Arc<dyn DiagnosticsSink>,
    ) -> Result<Self> {
        let executor = ThreadPoolExecutor::new(options.threads)?;
        Ok(Self::with_executor(executor, options, diag))
    }
}

impl DocumentProcessor<SequentialExecutor> {
    /// Create a processor that runs every page transform on the calling
    /// thread.
    pub fn sequential(options: ProcessOptions) -> Self {
        Self::with_executor(SequentialExecutor, options, Arc::new(LogSink))
    }
}

impl<E: Executor> DocumentProcessor<E> {
    /// Create a processor over an explicit executor strategy.
    pub fn with_executor(
        executor: E,
        options: ProcessOptions,
        diag: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        let scheduler = BatchScheduler::new(executor, options.batch_size)
            .with_failure_policy(options.on_page_failure)
            .with_diagnostics(diag.clone());
        Self {
            scheduler,
            options,
            diag,
        }
    }

    /// Options the processor was built with.
    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Extract per-page field mappings from an open document.
    ///
    /// A page whose text extraction fails contributes an empty mapping and a
    /// recorded diagnostic; the run continues.
    pub fn extract_fields<S>(&self, source: &S) -> Result<DocumentFields>
    where
        S: TextSource + Sync,
    {
        let started = Instant::now();
        let diag = self.diag.clone();
        let page_count = source.page_count();

        let texts = self.scheduler.run((0..page_count).collect(), |index| {
            Ok(read_page_text(source, index, diag.as_ref()))
        })?;

        self.note_elapsed("extract_fields", page_count, started);
        Ok(DocumentFields {
            pages: texts.iter().map(|text| parse_fields(text)).collect(),
        })
    }

    /// Extract per-page field mappings from a document at a path, honoring
    /// the configured worker isolation.
    pub fn extract_fields_at<P: AsRef<Path>>(&self, path: P) -> Result<DocumentFields> {
        let path = path.as_ref();
        match self.options.isolation {
            WorkerIsolation::SharedHandle => {
                let doc = PdfDocument::open(path)?;
                self.extract_fields(&doc)
            }
            WorkerIsolation::PerPageHandle => {
                // Count pages, release the handle, and let every page task
                // acquire its own.
                let page_count = PdfDocument::open(path)?.page_count();
                let started = Instant::now();
                let diag = self.diag.clone();

                let texts = self.scheduler.run((0..page_count).collect(), |index| {
                    let text = match PdfDocument::open(path) {
                        Ok(doc) => read_page_text(&doc, index, diag.as_ref()),
                        Err(e) => {
                            diag.record(
                                Severity::Error,
                                &Context::page(index + 1),
                                &format!("failed to reopen document: {e}"),
                            );
                            String::new()
                        }
                    };
                    Ok(text)
                })?;

                self.note_elapsed("extract_fields", page_count, started);
                Ok(DocumentFields {
                    pages: texts.iter().map(|text| parse_fields(text)).collect(),
                })
            }
        }
    }

    /// Extract per-page barcode payloads from an open document.
    ///
    /// A DPI outside [`MIN_BARCODE_DPI`]..=[`MAX_BARCODE_DPI`] yields an
    /// empty list for every page with a recorded diagnostic. Rasterization
    /// or decode failures degrade that page to an empty list; the run
    /// continues.
    pub fn extract_barcodes<S, D>(&self, source: &S, decoder: &D) -> Result<DocumentBarcodes>
    where
        S: Rasterizer + Sync,
        D: BarcodeDecoder + Sync,
    {
        let started = Instant::now();
        let diag = self.diag.clone();
        let dpi = self.options.dpi;
        let page_count = source.page_count();

        let pages = self.scheduler.run((0..page_count).collect(), |index| {
            Ok(decode_page_barcodes(source, decoder, index, dpi, diag.as_ref()))
        })?;

        self.note_elapsed("extract_barcodes", page_count, started);
        Ok(DocumentBarcodes { pages })
    }

    /// Extract per-page barcode payloads from a document at a path,
    /// honoring the configured worker isolation.
    pub fn extract_barcodes_at<P, D>(&self, path: P, decoder: &D) -> Result<DocumentBarcodes>
    where
        P: AsRef<Path>,
        D: BarcodeDecoder + Sync,
    {
        let path = path.as_ref();
        match self.options.isolation {
            WorkerIsolation::SharedHandle => {
                let doc = PdfDocument::open(path)?;
                self.extract_barcodes(&doc, decoder)
            }
            WorkerIsolation::PerPageHandle => {
                let page_count = PdfDocument::open(path)?.page_count();
                let started = Instant::now();
                let diag = self.diag.clone();
                let dpi = self.options.dpi;

                let pages = self.scheduler.run((0..page_count).collect(), |index| {
                    let payloads = match PdfDocument::open(path) {
                        Ok(doc) => decode_page_barcodes(&doc, decoder, index, dpi, diag.as_ref()),
                        Err(e) => {
                            diag.record(
                                Severity::Error,
                                &Context::page(index + 1),
                                &format!("failed to reopen document: {e}"),
                            );
                            Vec::new()
                        }
                    };
                    Ok(payloads)
                })?;

                self.note_elapsed("extract_barcodes", page_count, started);
                Ok(DocumentBarcodes { pages })
            }
        }
    }

    /// Advisory timing telemetry; the soft timeout never aborts anything.
    fn note_elapsed(&self, operation: &str, page_count: usize, started: Instant) {
        let elapsed = started.elapsed();
        self.diag.record(
            Severity::Info,
            &Context::none(),
            &format!(
                "{operation}: {page_count} pages in {:.2}s",
                elapsed.as_secs_f64()
            ),
        );
        if let Some(budget) = self.options.soft_timeout {
            if elapsed > budget {
                self.diag.record(
                    Severity::Warning,
                    &Context::none(),
                    &format!(
                        "{operation} took {:.2}s, over the {:.2}s soft budget",
                        elapsed.as_secs_f64(),
                        budget.as_secs_f64()
                    ),
                );
            }
        }
    }
}

/// Read one page's text, containing any failure to an empty string.
fn read_page_text<S: TextSource>(source: &S, index: usize, diag: &dyn DiagnosticsSink) -> String {
    match source.page_text(index) {
        Ok(text) => text,
        Err(e) => {
            diag.record(
                Severity::Error,
                &Context::page(index + 1),
                &format!("failed to extract text: {e}"),
            );
            String::new()
        }
    }
}

/// Rasterize and decode one page, containing any failure to an empty list.
fn decode_page_barcodes<S, D>(
    source: &S,
    decoder: &D,
    index: usize,
    dpi: u32,
    diag: &dyn DiagnosticsSink,
) -> Vec<String>
where
    S: Rasterizer,
    D: BarcodeDecoder,
{
    if !(MIN_BARCODE_DPI..=MAX_BARCODE_DPI).contains(&dpi) {
        diag.record(
            Severity::Error,
            &Context::page(index + 1),
            &format!(
                "dpi {dpi} outside the supported range {MIN_BARCODE_DPI}-{MAX_BARCODE_DPI}"
            ),
        );
        return Vec::new();
    }

    let decoded = source
        .rasterize(index, dpi)
        .and_then(|pixmap| pixmap_to_image(&pixmap))
        .and_then(|image| decoder.decode(&image));
    match decoded {
        Ok(payloads) => payloads
            .iter()
            .map(|bytes| payload_to_string(bytes))
            .collect(),
        Err(e) => {
            diag.record(
                Severity::Error,
                &Context::page(index + 1),
                &format!("failed to decode barcodes: {e}"),
            );
            Vec::new()
        }
    }
}
