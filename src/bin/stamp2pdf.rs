//! CLI binary for stamp2pdf.
//!
//! A thin shim over the library crate: maps flags to `PipelineConfig` /
//! `ServerConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use stamp2pdf::server::start_server;
use stamp2pdf::{
    BatchProgressCallback, FileResult, OverlayFont, PdfiumExporter, Pipeline, PipelineConfig,
    PipelineOutput, ProgressCallback, ServerConfig, StampError,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one line per finished file. Files may finish out
/// of order.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Stamping");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
    }

    fn on_file_start(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, name: &str, output: &PipelineOutput) {
        self.bar.println(format!(
            "  {} {:<32} → {}  {}",
            green("✓"),
            name,
            output.pdf_name(),
            dim(&format!("{}ms", output.stats.total_ms)),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, name: &str, error: &StampError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = error.to_string();
        let msg = match msg.char_indices().nth(80) {
            Some((cut, _)) => format!("{}\u{2026}", &msg[..cut]),
            None => msg,
        };
        self.bar
            .println(format!("  {} {:<32} {}", red("✗"), name, red(&msg)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        self.bar.finish_and_clear();
        eprintln!("{}", self.summary(total_files, success_count));
    }
}

impl CliProgressCallback {
    /// Final summary line. The failure count is the number of
    /// `on_file_error` calls seen during the batch.
    fn summary(&self, total_files: usize, success_count: usize) -> String {
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            format!(
                "{} {} files processed",
                green("✔"),
                bold(&success_count.to_string())
            )
        } else {
            format!(
                "{} {}/{} files processed  ({} failed)",
                red("✘"),
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            )
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the upload service on :5000
  stamp2pdf serve

  # Stamp local files, four at a time
  stamp2pdf process holiday.jpg scan.png

  # Machine-readable results
  stamp2pdf process --json *.png > results.json

  # Which overlay font will be used?
  stamp2pdf fonts --font /usr/share/fonts/TTF/DejaVuSans.ttf

  # Verify exported PDFs
  stamp2pdf inspect pdfs/processed_holiday.pdf

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH          Directory holding libpdfium
  STAMP2PDF_UPLOAD_DIR     Staging directory           (default: uploads)
  STAMP2PDF_PROCESSED_DIR  Annotated image directory   (default: processed)
  STAMP2PDF_PDF_DIR        PDF directory               (default: pdfs)
  STAMP2PDF_FONT           TrueType/OpenType font for the overlay
  STAMP2PDF_FONT_SIZE      Overlay font size in pixels (default: 30)
  STAMP2PDF_HOST / STAMP2PDF_PORT / STAMP2PDF_MAX_UPLOAD_BYTES
  RUST_LOG                 Log filter (overrides --verbose / --quiet)
"#;

#[derive(Parser, Debug)]
#[command(
    name = "stamp2pdf",
    version,
    about = "Stamp images with their filename and export them as one-page PDFs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, global = true, env = "STAMP2PDF_VERBOSE")]
    verbose: bool,

    #[arg(short, long, global = true, env = "STAMP2PDF_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP upload service.
    Serve {
        #[command(flatten)]
        pipeline: PipelineArgs,

        #[arg(long, env = "STAMP2PDF_HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(long, env = "STAMP2PDF_PORT", default_value_t = 5000)]
        port: u16,

        #[arg(long, env = "STAMP2PDF_MAX_UPLOAD_BYTES", default_value_t = 16 * 1024 * 1024)]
        max_upload_bytes: usize,
    },

    /// Run local image files through the pipeline.
    Process {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,

        #[arg(short, long, env = "STAMP2PDF_CONCURRENCY", default_value_t = 4,
              value_parser = clap::value_parser!(u16).range(1..=64))]
        concurrency: u16,

        /// Print results as JSON on stdout.
        #[arg(long, env = "STAMP2PDF_JSON")]
        json: bool,

        #[arg(long, env = "STAMP2PDF_NO_PROGRESS")]
        no_progress: bool,
    },

    /// Show which overlay font would be used.
    Fonts {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Print page and image counts of existing PDFs.
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long, env = "PDFIUM_LIB_PATH")]
        pdfium_lib: Option<PathBuf>,

        #[arg(long, env = "STAMP2PDF_JSON")]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct PipelineArgs {
    #[arg(long, env = "STAMP2PDF_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    #[arg(long, env = "STAMP2PDF_PROCESSED_DIR", default_value = "processed")]
    processed_dir: PathBuf,

    #[arg(long, env = "STAMP2PDF_PDF_DIR", default_value = "pdfs")]
    pdf_dir: PathBuf,

    #[arg(long, env = "STAMP2PDF_FONT")]
    font: Option<PathBuf>,

    #[arg(long, env = "STAMP2PDF_FONT_SIZE", default_value_t = 30.0)]
    font_size: f32,

    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,
}

impl PipelineArgs {
    fn to_config(&self) -> Result<PipelineConfig> {
        let mut builder = PipelineConfig::builder()
            .upload_dir(&self.upload_dir)
            .processed_dir(&self.processed_dir)
            .pdf_dir(&self.pdf_dir)
            .font_size(self.font_size);
        if let Some(ref font) = self.font {
            builder = builder.font_path(font);
        }
        if let Some(ref lib) = self.pdfium_lib {
            builder = builder.pdfium_lib_path(lib);
        }
        builder.build().context("Invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The batch progress bar replaces INFO-level library logs.
    let batch_bar = matches!(
        cli.command,
        Command::Process { json: false, no_progress: false, .. }
    ) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || batch_bar {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            pipeline,
            host,
            port,
            max_upload_bytes,
        } => {
            let config = pipeline.to_config()?;
            let pipeline = Pipeline::new(config).context("Failed to initialise pipeline")?;
            let server = ServerConfig {
                host,
                port,
                max_upload_bytes,
            };
            start_server(Arc::new(pipeline), &server)
                .await
                .context("HTTP server failed")?;
        }

        Command::Process {
            files,
            pipeline,
            concurrency,
            json,
            no_progress: _,
        } => {
            let config = pipeline.to_config()?;
            let pipeline =
                Arc::new(Pipeline::new(config).context("Failed to initialise pipeline")?);

            let progress: Option<ProgressCallback> = if batch_bar {
                Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
            } else {
                None
            };

            let results = pipeline
                .process_files(&files, concurrency as usize, progress)
                .await;
            report_batch(&results, json, cli.quiet || batch_bar)?;

            let failed = results.iter().filter(|r| r.result.is_err()).count();
            if failed > 0 {
                anyhow::bail!("{failed} of {} files failed", results.len());
            }
        }

        Command::Fonts { pipeline } => {
            let config = pipeline.to_config()?;
            let font = OverlayFont::resolve(&config);
            println!("{}", font.describe());
        }

        Command::Inspect {
            files,
            pdfium_lib,
            json,
        } => {
            let exporter =
                PdfiumExporter::new(pdfium_lib.as_deref()).context("Failed to load PDFium")?;
            let mut rows = Vec::with_capacity(files.len());
            for path in &files {
                let summary = exporter
                    .inspect(path)
                    .with_context(|| format!("Failed to inspect {}", path.display()))?;
                if json {
                    rows.push(json!({
                        "file": path,
                        "pages": summary.page_count,
                        "images": summary.image_count,
                    }));
                } else {
                    println!(
                        "{}  pages: {}  images: {}",
                        path.display(),
                        summary.page_count,
                        summary.image_count
                    );
                }
            }
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&rows).context("Failed to serialise summary")?
                );
            }
        }
    }

    Ok(())
}

/// Print per-file results. With `json`, one array on stdout; otherwise one
/// line per file on stderr unless the progress bar already printed them.
fn report_batch(results: &[FileResult], json: bool, silent: bool) -> Result<()> {
    if json {
        let rows: Vec<_> = results
            .iter()
            .map(|r| match &r.result {
                Ok(output) => json!({ "source": r.source, "output": output }),
                Err(e) => json!({
                    "source": r.source,
                    "error": e.to_string(),
                    "stage": e.stage().to_string(),
                }),
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("Failed to serialise results")?
        );
        return Ok(());
    }

    if silent {
        return Ok(());
    }
    for r in results {
        match &r.result {
            Ok(output) => eprintln!(
                "{} → {} + {}",
                r.source.display(),
                output.annotated.path.display(),
                output.document.path.display()
            ),
            Err(e) => eprintln!("{}: {e}", r.source.display()),
        }
    }
    Ok(())
}
