//! Collaborator contracts for page data.
//!
//! The pipeline core never touches PDF internals; it drives these traits.
//! [`crate::reader::PdfDocument`] implements all of them, and tests inject
//! in-memory fakes.

use crate::barcode::Pixmap;
use crate::error::Result;

/// An ordered, finite sequence of pages addressable by zero-based index.
pub trait DocumentSource {
    /// Number of pages.
    fn page_count(&self) -> usize;
}

/// Per-page text layer access.
pub trait TextSource: DocumentSource {
    /// Raw text of one page. The orchestrator degrades a failure to an
    /// empty string and a recorded diagnostic.
    fn page_text(&self, index: usize) -> Result<String>;
}

/// Per-page pixel buffer access.
pub trait Rasterizer: DocumentSource {
    /// Pixel buffer for one page at the requested DPI. Backends that source
    /// pre-rendered imagery may ignore the DPI hint.
    fn rasterize(&self, index: usize, dpi: u32) -> Result<Pixmap>;
}
