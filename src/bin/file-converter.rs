//! CLI binary for file-converter.
//!
//! A thin shim over the library crate: maps flags to `ConverterConfig`,
//! runs one command, and prints the outcome. `serve` starts the HTTP API.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use file_converter::report::{CompressResponse, ConvertResponse, MergeResponse};
use file_converter::server::{self, ServerConfig};
use file_converter::{
    CompositeSpec, CompositionMode, ConversionProgressCallback, Converter, ConverterConfig, ProgressCallback,
    SourceFile, TargetFormat,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per file. Files finish out of order
/// when the batch runs concurrently.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed(&self, index: usize) -> String {
        let ms = self
            .start_times
            .lock()
            .ok()
            .and_then(|mut t| t.remove(&index))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        dim(&format!("{:.1}s", ms as f64 / 1000.0))
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.reset_eta();
    }

    fn on_file_start(&self, index: usize, _total: usize, name: &str) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(index, Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, name: &str, size: u64) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{size:>9} bytes")),
            self.elapsed(index),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, name: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(&msg),
            self.elapsed(index),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total.saturating_sub(success_count);
        if failed == 0 {
            eprintln!("{} {} files converted successfully", green("✔"), bold(&success_count.to_string()));
        } else {
            eprintln!(
                "{} {}/{} files converted  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert documents to HTML
  file-converter convert --to html notes.docx readme.txt

  # Spreadsheet to JSON, artifacts into ./out
  file-converter -o out convert --to json budget.xlsx

  # Merge PDFs in the given order
  file-converter merge --mode pdf part1.pdf part2.pdf

  # One A4 page per image
  file-converter merge --mode images scan-*.png

  # Recompress photos at quality 70
  file-converter compress --quality 70 *.png

  # Run the HTTP API
  file-converter serve --port 5000 --upload-dir uploads

ENVIRONMENT VARIABLES:
  FILE_CONVERTER_OUTPUT_DIR     Artifact directory (default: converted)
  FILE_CONVERTER_CONCURRENCY    Files converted at once
  FILE_CONVERTER_TIMEOUT        Per codec call timeout, seconds
  FILE_CONVERTER_HOST / _PORT   Listener for `serve`
  FILE_CONVERTER_UPLOAD_DIR     Upload directory for `serve`
  RUST_LOG                      Overrides the log filter
"#;

/// Convert, merge and compress documents, spreadsheets and images.
#[derive(Parser, Debug)]
#[command(
    name = "file-converter",
    version,
    about = "Convert, merge and compress documents, spreadsheets and images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    converter: ConverterArgs,

    /// Print the result as JSON (same shape as the HTTP API).
    #[arg(long, global = true, env = "FILE_CONVERTER_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "FILE_CONVERTER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "FILE_CONVERTER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "FILE_CONVERTER_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ConverterArgs {
    /// Directory artifacts are written to.
    #[arg(short, long, global = true, env = "FILE_CONVERTER_OUTPUT_DIR", default_value = "converted")]
    output_dir: PathBuf,

    /// Files converted at the same time.
    #[arg(short, long, global = true, env = "FILE_CONVERTER_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Per codec call timeout in seconds.
    #[arg(long, global = true, env = "FILE_CONVERTER_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// JPEG quality for re-encoded images and image-stack PDFs (1–100).
    #[arg(long, global = true, env = "FILE_CONVERTER_JPEG_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert every file to one target format.
    Convert {
        /// Target format: jpg, jpeg, png, webp, pdf, html, txt, csv, json, xlsx.
        #[arg(short, long)]
        to: TargetFormat,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Combine files into a single artifact, in the order given.
    Merge {
        #[arg(short, long, value_enum)]
        mode: MergeArg,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Re-encode images as JPEG at a lower quality.
    Compress {
        #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Serve the HTTP API.
    Serve {
        #[arg(long, env = "FILE_CONVERTER_HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(short, long, env = "FILE_CONVERTER_PORT", default_value_t = 5000)]
        port: u16,
        #[arg(long, env = "FILE_CONVERTER_UPLOAD_DIR", default_value = "uploads")]
        upload_dir: PathBuf,
        /// Conversion requests processed at once.
        #[arg(long, env = "FILE_CONVERTER_MAX_REQUESTS", default_value_t = 8)]
        max_concurrent_requests: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MergeArg {
    Pdf,
    Images,
    Docs,
}

impl From<MergeArg> for CompositionMode {
    fn from(v: MergeArg) -> Self {
        match v {
            MergeArg::Pdf => CompositionMode::PdfMerge,
            MergeArg::Images => CompositionMode::ImageStackToPdf,
            MergeArg::Docs => CompositionMode::TextConcat,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let serving = matches!(cli.command, Command::Serve { .. });

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs for batch commands; the server
    // always logs at INFO so requests are visible.
    let show_progress = !serving && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let converter = Converter::new(build_config(&cli.converter, progress)?);

    match cli.command {
        Command::Convert { to, ref files } => {
            let files = describe(files).await?;
            let result = converter
                .convert_batch(&files, to)
                .await
                .context("Conversion failed")?;
            let response = ConvertResponse::from(&result);
            if cli.json {
                print_json(&response)?;
            } else if !cli.quiet {
                for file in &response.converted_files {
                    println!("{}  →  {}", file.source.original_name, dest(&converter, &file.converted_filename));
                }
                if !show_progress {
                    for failed in &response.failed_files {
                        eprintln!("{} {}", red("✗"), failed.error);
                    }
                }
                if !show_progress {
                    eprintln!("{}  {}ms", response.message, result.stats.duration_ms);
                }
            }
        }
        Command::Merge { mode, ref files } => {
            let files = describe(files).await?;
            let merged = converter
                .assemble(&CompositeSpec::new(files, mode.into()))
                .await
                .context("Merge failed")?;
            let response = MergeResponse::from(&merged);
            if cli.json {
                print_json(&response)?;
            } else if !cli.quiet {
                for skipped in &merged.skipped {
                    eprintln!("{} skipped {}: {}", cyan("⚠"), skipped.file, skipped.reason);
                }
                println!("{}", dest(&converter, &merged.filename));
                eprintln!(
                    "{} {} bytes in  /  {} bytes out{}",
                    green("✔"),
                    merged.original_total_size,
                    merged.merged_size,
                    merged.page_count.map(|n| format!("  ({n} pages)")).unwrap_or_default(),
                );
            }
        }
        Command::Compress { quality, ref files } => {
            let files = describe(files).await?;
            let result = converter
                .compress_batch(&files, quality)
                .await
                .context("Compression failed")?;
            let response = CompressResponse::from(&result);
            if cli.json {
                print_json(&response)?;
            } else if !cli.quiet {
                for file in &response.compressed_files {
                    println!(
                        "{}  →  {}  {}",
                        file.source.original_name,
                        dest(&converter, &file.compressed_filename),
                        dim(&format!("-{}%", file.compression_ratio)),
                    );
                }
                if !show_progress {
                    for failed in &response.failed_files {
                        eprintln!("{} {}", red("✗"), failed.error);
                    }
                }
            }
        }
        Command::Serve {
            host,
            port,
            upload_dir,
            max_concurrent_requests,
        } => {
            let config = ServerConfig {
                host,
                port,
                upload_dir,
                max_concurrent_requests,
            };
            server::serve(config, converter).await.context("Server error")?;
        }
    }

    Ok(())
}

/// Map CLI args to `ConverterConfig`.
fn build_config(args: &ConverterArgs, progress: Option<ProgressCallback>) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder()
        .output_dir(&args.output_dir)
        .concurrency(args.concurrency)
        .codec_timeout_secs(args.timeout)
        .jpeg_quality(args.jpeg_quality);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

async fn describe(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = SourceFile::from_path(path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;
        files.push(file);
    }
    Ok(files)
}

fn dest(converter: &Converter, filename: &str) -> String {
    bold(&converter.output_dir().join(filename).display().to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}
