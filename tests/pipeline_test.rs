//! Integration tests for the extraction and validation pipeline.

use std::sync::Arc;

use image::DynamicImage;
use pdfcheck::{
    validate_pages_with_today, BarcodeDecoder, Context, DocumentProcessor, DocumentSource,
    Error, MemorySink, Pixmap, ProcessOptions, Rasterizer, Result, Severity, TextSource,
};

/// In-memory document with one text string per page.
struct FakeDocument {
    pages: Vec<std::result::Result<String, String>>,
}

impl FakeDocument {
    fn new(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| Ok(p.to_string())).collect(),
        }
    }

    fn with_failing_page(pages: &[&str], failing: usize, message: &str) -> Self {
        let mut doc = Self::new(pages);
        doc.pages[failing] = Err(message.to_string());
        doc
    }
}

impl DocumentSource for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }
}

impl TextSource for FakeDocument {
    fn page_text(&self, index: usize) -> Result<String> {
        match &self.pages[index] {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(Error::page_transform(index + 1, message.clone())),
        }
    }
}

/// In-memory rasterizer producing a tiny grayscale page scan.
struct FakeScans {
    page_count: usize,
}

impl DocumentSource for FakeScans {
    fn page_count(&self) -> usize {
        self.page_count
    }
}

impl Rasterizer for FakeScans {
    fn rasterize(&self, index: usize, _dpi: u32) -> Result<Pixmap> {
        if index >= self.page_count {
            return Err(Error::page_transform(index + 1, "page out of range"));
        }
        Ok(Pixmap::new(2, 2, 1, false, vec![index as u8; 4]))
    }
}

/// Decoder that reports one payload derived from the top-left pixel.
struct FakeDecoder;

impl BarcodeDecoder for FakeDecoder {
    fn decode(&self, image: &DynamicImage) -> Result<Vec<Vec<u8>>> {
        let luma = image.to_luma8();
        let marker = luma.get_pixel(0, 0)[0];
        Ok(vec![format!("CODE-{marker}").into_bytes()])
    }
}

fn today() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2026, 8, 29).unwrap()
}

#[test]
fn test_extract_then_validate_passes_matching_documents() {
    let text = "PN: ABC-1\nSN: 123456\nQty: 10";
    let template_doc = FakeDocument::new(&[text, text]);
    let candidate_doc = FakeDocument::new(&[text, text]);

    let processor = DocumentProcessor::new(ProcessOptions::default()).unwrap();
    let template = processor.extract_fields(&template_doc).unwrap();
    let candidate = processor.extract_fields(&candidate_doc).unwrap();

    let verdicts = validate_pages_with_today(&template, &candidate, today());
    assert_eq!(verdicts.len(), 2);
    assert!(verdicts.iter().all(|p| p.verdict.passed));
    assert_eq!(verdicts[0].label, "Page_1");
    assert_eq!(verdicts[1].label, "Page_2");
}

#[test]
fn test_failed_page_degrades_to_empty_mapping() {
    let sink = Arc::new(MemorySink::new());
    let doc = FakeDocument::with_failing_page(&["PN: A", "PN: B", "PN: C"], 1, "garbled stream");

    let processor =
        DocumentProcessor::with_diagnostics(ProcessOptions::default(), sink.clone()).unwrap();
    let fields = processor.extract_fields(&doc).unwrap();

    assert_eq!(fields.page_count(), 3);
    assert!(fields.page(1).is_some_and(|p| !p.is_empty()));
    assert!(fields.page(2).is_some_and(|p| p.is_empty()));
    assert!(fields.page(3).is_some_and(|p| !p.is_empty()));

    let errors = sink.records();
    let page_errors: Vec<_> = errors
        .iter()
        .filter(|r| r.severity == Severity::Error)
        .collect();
    assert_eq!(page_errors.len(), 1);
    assert_eq!(page_errors[0].context, Context::page(2));
    assert!(page_errors[0].message.contains("garbled stream"));
}

#[test]
fn test_one_failed_page_does_not_disturb_sibling_verdicts() {
    let good = "PN: ABC\nSN: 123456";
    let template = FakeDocument::new(&[good, good]);
    let candidate = FakeDocument::with_failing_page(&[good, good], 1, "bad page");

    let processor = DocumentProcessor::new(ProcessOptions::default()).unwrap();
    let template = processor.extract_fields(&template).unwrap();
    let candidate = processor.extract_fields(&candidate).unwrap();

    let verdicts = validate_pages_with_today(&template, &candidate, today());
    assert!(verdicts[0].verdict.passed);
    assert!(!verdicts[1].verdict.passed);
    assert_eq!(
        verdicts[1].verdict.diagnostics,
        vec!["missing keys: PN, SN"]
    );
}

#[test]
fn test_extraction_is_deterministic_across_runs() {
    let pages: Vec<String> = (0..37).map(|i| format!("PN: part-{i}\nQty: {i}")).collect();
    let refs: Vec<&str> = pages.iter().map(|s| s.as_str()).collect();
    let doc = FakeDocument::new(&refs);

    let processor = DocumentProcessor::new(
        ProcessOptions::default().with_threads(8).with_batch_size(5),
    )
    .unwrap();
    let first = processor.extract_fields(&doc).unwrap();
    let second = processor.extract_fields(&doc).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.page(37).and_then(|p| p.get("PN")), Some("part-36"));
}

#[test]
fn test_barcodes_extracted_per_page_in_order() {
    let scans = FakeScans { page_count: 3 };
    let processor = DocumentProcessor::new(ProcessOptions::default()).unwrap();

    let barcodes = processor.extract_barcodes(&scans, &FakeDecoder).unwrap();
    assert_eq!(barcodes.page_count(), 3);
    assert_eq!(barcodes.page(1), Some(&["CODE-0".to_string()][..]));
    assert_eq!(barcodes.page(3), Some(&["CODE-2".to_string()][..]));
}

#[test]
fn test_dpi_bounds_are_inclusive() {
    let scans = FakeScans { page_count: 2 };

    for dpi in [150, 200, 600] {
        let processor =
            DocumentProcessor::new(ProcessOptions::default().with_dpi(dpi)).unwrap();
        let barcodes = processor.extract_barcodes(&scans, &FakeDecoder).unwrap();
        assert!(barcodes.page(1).is_some_and(|p| !p.is_empty()), "dpi {dpi}");
    }
}

#[test]
fn test_out_of_range_dpi_yields_empty_lists_with_diagnostics() {
    let scans = FakeScans { page_count: 2 };

    for dpi in [149, 601] {
        let sink = Arc::new(MemorySink::new());
        let processor = DocumentProcessor::with_diagnostics(
            ProcessOptions::default().with_dpi(dpi),
            sink.clone(),
        )
        .unwrap();

        let barcodes = processor.extract_barcodes(&scans, &FakeDecoder).unwrap();
        assert_eq!(barcodes.page_count(), 2);
        assert!(barcodes.page(1).is_some_and(|p| p.is_empty()), "dpi {dpi}");
        assert!(barcodes.page(2).is_some_and(|p| p.is_empty()), "dpi {dpi}");

        let errors = sink.messages(Severity::Error);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains(&dpi.to_string()));
    }
}

#[test]
fn test_rasterize_failure_degrades_single_page() {
    struct FlakyScans;

    impl DocumentSource for FlakyScans {
        fn page_count(&self) -> usize {
            2
        }
    }

    impl Rasterizer for FlakyScans {
        fn rasterize(&self, index: usize, _dpi: u32) -> Result<Pixmap> {
            if index == 0 {
                Err(Error::page_transform(1, "no embedded page image"))
            } else {
                Ok(Pixmap::new(2, 2, 1, false, vec![7u8; 4]))
            }
        }
    }

    let sink = Arc::new(MemorySink::new());
    let processor =
        DocumentProcessor::with_diagnostics(ProcessOptions::default(), sink.clone()).unwrap();

    let barcodes = processor.extract_barcodes(&FlakyScans, &FakeDecoder).unwrap();
    assert!(barcodes.page(1).is_some_and(|p| p.is_empty()));
    assert_eq!(barcodes.page(2), Some(&["CODE-7".to_string()][..]));

    let errors = sink.records();
    let page_errors: Vec<_> = errors
        .iter()
        .filter(|r| r.severity == Severity::Error)
        .collect();
    assert_eq!(page_errors.len(), 1);
    assert_eq!(page_errors[0].context, Context::page(1));
}

#[test]
fn test_timing_telemetry_recorded() {
    let sink = Arc::new(MemorySink::new());
    let processor =
        DocumentProcessor::with_diagnostics(ProcessOptions::default(), sink.clone()).unwrap();

    processor
        .extract_fields(&FakeDocument::new(&["PN: A"]))
        .unwrap();

    let info = sink.messages(Severity::Info);
    assert_eq!(info.len(), 1);
    assert!(info[0].starts_with("extract_fields: 1 pages"));
}

#[test]
fn test_soft_timeout_warns_but_completes() {
    let sink = Arc::new(MemorySink::new());
    let options = ProcessOptions::default()
        .with_threads(1)
        .with_soft_timeout(std::time::Duration::from_nanos(1));
    let processor = DocumentProcessor::with_diagnostics(options, sink.clone()).unwrap();

    let fields = processor
        .extract_fields(&FakeDocument::new(&["PN: A", "PN: B"]))
        .unwrap();
    assert_eq!(fields.page_count(), 2);

    let warnings = sink.messages(Severity::Warning);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("soft budget"));
}

#[test]
fn test_empty_document() {
    let processor = DocumentProcessor::new(ProcessOptions::default()).unwrap();
    let fields = processor.extract_fields(&FakeDocument::new(&[])).unwrap();
    assert_eq!(fields.page_count(), 0);

    let barcodes = processor
        .extract_barcodes(&FakeScans { page_count: 0 }, &FakeDecoder)
        .unwrap();
    assert_eq!(barcodes.page_count(), 0);
}

#[test]
fn test_sequential_processor_matches_pooled() {
    let pages: Vec<String> = (0..12).map(|i| format!("PN: p{i}")).collect();
    let refs: Vec<&str> = pages.iter().map(|s| s.as_str()).collect();
    let doc = FakeDocument::new(&refs);

    let pooled = DocumentProcessor::new(ProcessOptions::default())
        .unwrap()
        .extract_fields(&doc)
        .unwrap();
    let sequential = DocumentProcessor::sequential(ProcessOptions::default())
        .extract_fields(&doc)
        .unwrap();
    assert_eq!(pooled, sequential);
}

#[test]
fn test_report_persists_verdicts_with_four_space_indent() {
    let text = "PN: ABC\nSN: 123456";
    let processor = DocumentProcessor::new(ProcessOptions::default()).unwrap();
    let template = processor.extract_fields(&FakeDocument::new(&[text])).unwrap();
    let candidate = processor.extract_fields(&FakeDocument::new(&[text])).unwrap();
    let verdicts = validate_pages_with_today(&template, &candidate, today());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reports/run.json");
    pdfcheck::write_json(&verdicts, &path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("    \"label\": \"Page_1\""));
    assert!(written.contains("\"passed\": true"));
}
