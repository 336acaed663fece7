//! pdfocr CLI - PDF to text conversion with OCR fallback

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfocr::{Converter, Decision, DocumentText, ExtractOptions, OcrMode, PageSeparator};

#[derive(Parser)]
#[command(name = "pdfocr")]
#[command(version)]
#[command(
    about = "Read a PDF file and convert its text content into a text document",
    long_about = "Read a PDF file and convert its text content into a text document.\n\n\
                  Pages without usable embedded text (scans) are rendered with PDFium and \
                  recognized with Tesseract."
)]
struct Cli {
    /// Path to the source PDF file
    #[arg(value_name = "INPUT_PDF")]
    input: PathBuf,

    /// Output text file path (default: same name as input with .txt extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// OCR mode: off, auto (OCR only pages with little/no text), or force (OCR all pages)
    #[arg(long, value_enum, default_value = "auto")]
    ocr: Mode,

    /// OCR language for Tesseract
    #[arg(long, default_value = pdfocr::DEFAULT_OCR_LANG, env = "PDFOCR_OCR_LANG")]
    ocr_lang: String,

    /// In auto mode, OCR a page when its trimmed text has fewer than this many characters
    #[arg(long, default_value_t = pdfocr::DEFAULT_MIN_CHARS)]
    min_chars: usize,

    /// Rendering resolution for OCR
    #[arg(long, default_value_t = pdfocr::DEFAULT_DPI)]
    dpi: u32,

    /// Delimiter between pages
    #[arg(long, value_enum, default_value = "header")]
    separator: Separator,

    /// In auto mode, also OCR pages that contain images and keep both texts
    #[arg(long)]
    ocr_image_pages: bool,

    /// Tesseract executable
    #[arg(long, value_name = "PATH", default_value = "tesseract", env = "PDFOCR_TESSERACT")]
    tesseract: PathBuf,

    /// Directory or file of the PDFium shared library
    #[arg(long, value_name = "PATH", env = "PDFOCR_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Also write per-page results as JSON next to the output
    #[arg(long)]
    json: bool,

    /// Print the per-page decisions without rendering, OCR, or writing output
    #[arg(long)]
    dry_run: bool,

    /// No progress bar or summary
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Embedded text only
    Off,
    /// OCR pages with little or no embedded text
    Auto,
    /// OCR every page
    Force,
}

impl From<Mode> for OcrMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Off => OcrMode::Off,
            Mode::Auto => OcrMode::Auto,
            Mode::Force => OcrMode::Force,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Separator {
    /// "--- Page N ---" banner before each page
    Header,
    /// Form feed between pages
    FormFeed,
    /// Blank line between pages
    BlankLine,
}

impl From<Separator> for PageSeparator {
    fn from(separator: Separator) -> Self {
        match separator {
            Separator::Header => PageSeparator::Header,
            Separator::FormFeed => PageSeparator::FormFeed,
            Separator::BlankLine => PageSeparator::BlankLine,
        }
    }
}

/// Exit code when output was written but some pages failed recoverably.
const EXIT_WITH_WARNINGS: i32 = 4;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            e.exit_code()
        }
    };
    process::exit(code);
}

fn build_options(cli: &Cli) -> ExtractOptions {
    let mut options = ExtractOptions::new()
        .with_ocr_mode(cli.ocr.into())
        .with_ocr_lang(cli.ocr_lang.clone())
        .with_min_chars(cli.min_chars)
        .with_dpi(cli.dpi)
        .with_separator(cli.separator.into())
        .with_ocr_image_pages(cli.ocr_image_pages)
        .with_tesseract_path(cli.tesseract.clone());
    if let Some(ref lib) = cli.pdfium_lib {
        options = options.with_pdfium_library(lib.clone());
    }
    options
}

/// Default output: the input path with a `.txt` extension.
fn default_output(input: &Path) -> PathBuf {
    input.with_extension("txt")
}

/// JSON sidecar: the output path with `.json` appended, so it never
/// replaces the text output.
fn json_output(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

fn run(cli: &Cli) -> pdfocr::Result<i32> {
    if !cli.input.is_file() {
        return Err(pdfocr::Error::DocumentRead(format!(
            "input PDF does not exist or is not a file: {}",
            cli.input.display()
        )));
    }

    let options = build_options(cli);
    log::debug!(
        "Input {} (ocr={}, lang={}, dpi={})",
        cli.input.display(),
        options.ocr_mode,
        options.ocr_lang,
        options.dpi
    );

    if cli.dry_run {
        let decisions = Converter::new(options).plan_file(&cli.input)?;
        print_plan(&decisions);
        return Ok(0);
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.input));

    let pb = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pages")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    };
    let on_page = |done: u32, total: u32| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    };

    let document = Converter::new(options)
        .with_progress(&on_page)
        .convert_file(&cli.input);
    pb.finish_and_clear();
    let document = document?;

    fs::write(&output, document.text())?;
    if cli.json {
        let json_path = json_output(&output);
        fs::write(&json_path, document.to_json(true)?)?;
    }

    for warning in document.warnings() {
        eprintln!("{}: {}", "Warning".yellow().bold(), warning);
    }

    if !cli.quiet {
        println!("{} {}", "Saved extracted text to:".green(), output.display());
        print_summary(&document);
    }

    Ok(if document.has_warnings() {
        EXIT_WITH_WARNINGS
    } else {
        0
    })
}

fn print_summary(document: &DocumentText) {
    let stats = document.stats();
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Pages".bold(), stats.page_count);
    println!("{}: {}", "Embedded text".bold(), stats.embedded_pages);
    println!("{}: {}", "OCR".bold(), stats.ocr_pages);
    if stats.combined_pages > 0 {
        println!("{}: {}", "Embedded + OCR".bold(), stats.combined_pages);
    }
    println!("{}: {}", "Empty".bold(), stats.empty_pages);
    println!("{}: {}", "Words".bold(), stats.word_count);
    if stats.warning_count > 0 {
        println!(
            "{}: {}",
            "Warnings".bold(),
            stats.warning_count.to_string().yellow()
        );
    }
}

fn print_plan(decisions: &[Decision]) {
    for (index, decision) in decisions.iter().enumerate() {
        let label = match decision {
            Decision::UseEmbedded => "embedded".green(),
            Decision::UseOcr => "ocr".cyan(),
            Decision::UseBoth => "embedded+ocr".magenta(),
        };
        println!("{} {:>4}: {}", "Page".bold(), index + 1, label);
    }
}
