//! # pdfcheck
//!
//! Page-parallel PDF template validation library for Rust.
//!
//! This library extracts labeled fields and barcode payloads from the pages
//! of a PDF document and validates a filled-in document against a template
//! of the same form, page by page.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfcheck::{validate_files, ProcessOptions};
//!
//! fn main() -> pdfcheck::Result<()> {
//!     let options = ProcessOptions::default();
//!     let verdicts = validate_files("template.pdf", "test_task.pdf", &options)?;
//!
//!     for page in &verdicts {
//!         println!("{}: {}", page.label, page.verdict.passed);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Field extraction**: `key: value` text layers parsed into ordered mappings
//! - **Template validation**: key-set equality plus per-field content rules
//! - **Barcode extraction**: embedded page scans decoded through a pluggable decoder
//! - **Parallel processing**: bounded thread pool with ordered, batched dispatch
//! - **Pluggable execution**: thread-pool, sequential, or custom executors

pub mod barcode;
pub mod diag;
pub mod error;
pub mod fields;
pub mod options;
pub mod processor;
pub mod reader;
pub mod report;
pub mod scheduler;
pub mod source;
pub mod validate;

// Re-export commonly used types
pub use barcode::{payload_to_string, pixmap_to_image, BarcodeDecoder, Pixmap};
pub use diag::{Context, DiagnosticsSink, LogSink, MemorySink, Severity};
pub use error::{Error, Result};
pub use fields::{parse_fields, FieldMapping};
pub use options::{
    default_threads, ProcessOptions, WorkerIsolation, MAX_BARCODE_DPI, MIN_BARCODE_DPI,
};
pub use processor::{page_label, DocumentBarcodes, DocumentFields, DocumentProcessor};
pub use reader::PdfDocument;
pub use report::{to_json_string, write_json};
pub use scheduler::{
    BatchScheduler, Executor, OnPageFailure, SequentialExecutor, ThreadPoolExecutor,
};
pub use source::{DocumentSource, Rasterizer, TextSource};
pub use validate::{
    validate, validate_pages, validate_pages_with_today, validate_with_today, PageVerdict, Verdict,
};

use std::path::Path;

/// Extract per-page field mappings from a PDF file.
///
/// # Example
///
/// ```no_run
/// use pdfcheck::{extract_fields, ProcessOptions};
///
/// let fields = extract_fields("test_task.pdf", &ProcessOptions::default()).unwrap();
/// println!("Pages: {}", fields.page_count());
/// ```
pub fn extract_fields<P: AsRef<Path>>(
    path: P,
    options: &ProcessOptions,
) -> Result<DocumentFields> {
    DocumentProcessor::new(options.clone())?.extract_fields_at(path)
}

/// Extract per-page barcode payloads from a PDF file.
pub fn extract_barcodes<P, D>(
    path: P,
    decoder: &D,
    options: &ProcessOptions,
) -> Result<DocumentBarcodes>
where
    P: AsRef<Path>,
    D: BarcodeDecoder + Sync,
{
    DocumentProcessor::new(options.clone())?.extract_barcodes_at(path, decoder)
}

/// Validate a filled-in PDF against a template PDF, page by page.
///
/// Both documents have their fields extracted with the same options; the
/// template's page set drives the comparison.
pub fn validate_files<P, Q>(
    template_path: P,
    candidate_path: Q,
    options: &ProcessOptions,
) -> Result<Vec<PageVerdict>>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let processor = DocumentProcessor::new(options.clone())?;
    let template = processor.extract_fields_at(template_path)?;
    let candidate = processor.extract_fields_at(candidate_path)?;
    Ok(validate_pages(&template, &candidate))
}
