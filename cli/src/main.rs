//! pdfcheck CLI - validate a filled-in PDF against a template

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use serde::Serialize;

use pdfcheck::{
    default_threads, validate_pages, BarcodeDecoder, DocumentBarcodes, DocumentProcessor,
    Executor, PageVerdict, ProcessOptions, Result, WorkerIsolation,
};

#[derive(Parser)]
#[command(name = "pdfcheck")]
#[command(version)]
#[command(about = "Validate a filled-in PDF against a template, page by page", long_about = None)]
struct Cli {
    /// Template PDF file
    #[arg(value_name = "TEMPLATE", default_value = "test_task.pdf")]
    template_pdf: PathBuf,

    /// Filled-in PDF file to check
    #[arg(value_name = "FILE", default_value = "test_task.pdf")]
    test_pdf: PathBuf,

    /// Worker thread count
    #[arg(long, default_value_t = default_threads())]
    threads: usize,

    /// Pages dispatched to the pool per batch
    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    /// DPI for barcode rasterization
    #[arg(long, default_value_t = 200)]
    dpi: u32,

    /// Write the full report as JSON to this path
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Run page transforms on the calling thread
    #[arg(long)]
    sequential: bool,

    /// Reopen the document per page task instead of sharing one handle
    #[arg(long)]
    isolated: bool,

    /// Skip barcode extraction
    #[arg(long)]
    skip_barcodes: bool,
}

/// Full run output, persisted with `--output`.
#[derive(Serialize)]
struct Report {
    template: PathBuf,
    candidate: PathBuf,
    verdicts: Vec<PageVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    barcodes: Option<DocumentBarcodes>,
}

/// Barcode decoding through the rxing symbol scanner.
struct RxingDecoder;

impl BarcodeDecoder for RxingDecoder {
    fn decode(&self, image: &image::DynamicImage) -> Result<Vec<Vec<u8>>> {
        let luma = image.to_luma8();
        let (width, height) = (luma.width(), luma.height());
        // A page with no recognizable symbols is an empty list, not an error.
        match rxing::helpers::detect_multiple_in_luma(luma.into_raw(), width, height) {
            Ok(results) => Ok(results
                .iter()
                .map(|r| r.getText().as_bytes().to_vec())
                .collect()),
            Err(_) => Ok(Vec::new()),
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut options = ProcessOptions::new()
        .with_threads(cli.threads)
        .with_batch_size(cli.batch_size)
        .with_dpi(cli.dpi);
    if cli.isolated {
        options = options.with_isolation(WorkerIsolation::PerPageHandle);
    }

    let outcome = if cli.sequential {
        run(
            DocumentProcessor::sequential(options),
            &cli,
        )
    } else {
        match DocumentProcessor::new(options) {
            Ok(processor) => run(processor, &cli),
            Err(e) => Err(e),
        }
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

/// Drive the full run; returns whether every page passed.
fn run<E: Executor>(processor: DocumentProcessor<E>, cli: &Cli) -> Result<bool> {
    let template = processor.extract_fields_at(&cli.template_pdf)?;
    let candidate = processor.extract_fields_at(&cli.test_pdf)?;
    let verdicts = validate_pages(&template, &candidate);
    log::info!(
        "validated {} against {}: {} page(s)",
        cli.test_pdf.display(),
        cli.template_pdf.display(),
        verdicts.len()
    );

    let barcodes = if cli.skip_barcodes {
        None
    } else {
        Some(processor.extract_barcodes_at(&cli.test_pdf, &RxingDecoder)?)
    };

    print_verdicts(&verdicts);
    if let Some(barcodes) = &barcodes {
        print_barcodes(barcodes);
    }

    let all_passed = verdicts.iter().all(|p| p.verdict.passed);
    if all_passed {
        println!("{}", "All pages passed".green().bold());
    } else {
        let failed = verdicts.iter().filter(|p| !p.verdict.passed).count();
        println!(
            "{}",
            format!("{failed} of {} pages failed", verdicts.len())
                .red()
                .bold()
        );
    }

    if let Some(path) = &cli.output {
        let report = Report {
            template: cli.template_pdf.clone(),
            candidate: cli.test_pdf.clone(),
            verdicts,
            barcodes,
        };
        pdfcheck::write_json(&report, path)?;
        println!("Report written to {}", path.display());
    }

    Ok(all_passed)
}

fn print_verdicts(verdicts: &[PageVerdict]) {
    for page in verdicts {
        if page.verdict.passed {
            println!("{} {}", page.label.bold(), "ok".green());
        } else {
            println!("{} {}", page.label.bold(), "failed".red());
            for diagnostic in &page.verdict.diagnostics {
                println!("    {diagnostic}");
            }
        }
    }
}

fn print_barcodes(barcodes: &DocumentBarcodes) {
    for (label, payloads) in barcodes.iter() {
        if payloads.is_empty() {
            println!("{} {}", label.bold(), "no barcodes".yellow());
        } else {
            println!("{} {} barcode(s)", label.bold(), payloads.len());
            for payload in payloads {
                println!("    {payload}");
            }
        }
    }
}
