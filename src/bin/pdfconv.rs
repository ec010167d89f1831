//! CLI binary for pdf-convert-client.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig`, runs one conversion round and saves the results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_convert_client::{
    format_file_size, render_results_html, save_to_dir, ClientConfig, ClientError,
    ConversionProgressCallback, ConversionResult, ConversionService, ConversionSession,
    FileCandidate, HttpConversionService, ProgressCallback, ProgressSnapshot, Quality,
    ResultStatus,
};
use std::io;
use std::path::PathBuf;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while uploading, then a bar tracking converted files.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {percent:>3}%  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_files: usize) {
        self.bar.set_prefix("Uploading");
        self.bar.set_message(format!("{total_files} file(s)…"));
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_upload_complete(&self, results: &[ConversionResult]) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Service accepted {} file(s)", results.len()))
        ));
        self.activate_bar(results.len());
    }

    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_position(snapshot.completed as u64);
        if snapshot.is_finished() {
            self.bar.set_message(green("all files converted"));
        } else {
            self.bar.set_message(snapshot.label());
        }
    }

    fn on_poll_error(&self, file_id: &str, error: &str) {
        self.bar
            .println(format!("  {} status {}: {}", yellow("⚠"), file_id, dim(error)));
    }

    fn on_conversion_complete(&self, _results: &[ConversionResult]) {
        self.bar.finish_and_clear();
    }

    fn on_conversion_failed(&self, message: &str) {
        self.bar.abandon_with_message(red(message));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert two files and save the outputs next to each other
  pdfconv deck.pdf notes.pdf -o converted/

  # Point at a different service
  pdfconv --server https://convert.example.com/api report.pdf -o out/

  # Include speaker notes, medium quality
  pdfconv --include-notes --quality medium talk.pdf -o out/

  # Print results as JSON (no download)
  pdfconv --json report.pdf

  # Write an HTML results table with download links
  pdfconv --html-report results.html *.pdf

BEHAVIOUR:
  Non-PDF inputs are ignored; files already selected (same name and size)
  are skipped. The batch is submitted in one request, then each file's
  status is polled until it succeeds or fails. Ctrl-C cancels the round.

ENVIRONMENT VARIABLES:
  PDFCONV_SERVER          Conversion service base URL
  PDFCONV_OUTPUT          Output directory for downloads
  RUST_LOG                Override the log filter (e.g. pdf_convert_client=debug)
"#;

/// Convert PDF files with a remote conversion service.
#[derive(Parser, Debug)]
#[command(
    name = "pdfconv",
    version,
    about = "Convert PDF files with a remote conversion service",
    long_about = "Submit PDF files to a conversion service, follow each file's status until \
it finishes, and download the converted outputs.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Conversion service base URL.
    #[arg(long, env = "PDFCONV_SERVER", default_value = pdf_convert_client::config::DEFAULT_BASE_URL)]
    server: String,

    /// Download converted files into this directory.
    #[arg(short, long, env = "PDFCONV_OUTPUT")]
    output: Option<PathBuf>,

    /// Requested output quality.
    #[arg(long, env = "PDFCONV_QUALITY", value_enum, default_value = "high")]
    quality: QualityArg,

    /// Ask the service to include notes.
    #[arg(long, env = "PDFCONV_INCLUDE_NOTES")]
    include_notes: bool,

    /// Milliseconds between status polls.
    #[arg(long, env = "PDFCONV_POLL_INTERVAL_MS", default_value_t = 2000,
          value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_ms: u64,

    /// Maximum concurrent status queries per poll.
    #[arg(long, env = "PDFCONV_STATUS_CONCURRENCY", default_value_t = 8)]
    status_concurrency: usize,

    /// Per-request timeout in seconds (default: none).
    #[arg(long, env = "PDFCONV_TIMEOUT")]
    timeout: Option<u64>,

    /// Print results as JSON instead of a table.
    #[arg(long, env = "PDFCONV_JSON")]
    json: bool,

    /// Write an HTML results fragment to this path.
    #[arg(long, env = "PDFCONV_HTML_REPORT")]
    html_report: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "PDFCONV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFCONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFCONV_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum QualityArg {
    Low,
    Medium,
    High,
}

impl From<QualityArg> for Quality {
    fn from(v: QualityArg) -> Self {
        match v {
            QualityArg::Low => Quality::Low,
            QualityArg::Medium => Quality::Medium,
            QualityArg::High => Quality::High,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs are noise while the progress bar is drawing.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Build session ────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let service = Arc::new(HttpConversionService::new(&config).context("Invalid configuration")?);
    let mut session = ConversionSession::new(service.clone(), config);
    if !cli.quiet && !cli.json {
        eprintln!("{} service {}", cyan("◆"), dim(service.base_url().as_str()));
    }

    // ── Select inputs ────────────────────────────────────────────────────
    let mut candidates = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let candidate = FileCandidate::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if !candidate.is_pdf() && !cli.quiet {
            eprintln!("{} skipping non-PDF {}", yellow("⚠"), path.display());
        }
        candidates.push(candidate);
    }
    let offered = candidates.len();
    let added = session.select(candidates).context("Nothing to convert")?;
    if added < offered && !cli.quiet {
        eprintln!(
            "{} {} duplicate or non-PDF input(s) ignored",
            yellow("⚠"),
            offered - added
        );
    }

    // ── Convert ──────────────────────────────────────────────────────────
    let cancel = session.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let results = match session.convert().await {
        Ok(results) => results.to_vec(),
        Err(ClientError::Cancelled) => anyhow::bail!("Conversion cancelled"),
        Err(e) => return Err(e).context("Conversion failed"),
    };

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&results).context("Failed to serialise results")?;
        println!("{json}");
    } else if !cli.quiet {
        print_results(&results);
    }

    if let Some(ref path) = cli.html_report {
        let html = render_results_html(&results, |id| service.download_url(id));
        tokio::fs::write(path, html)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            eprintln!("{} report → {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    // ── Download ─────────────────────────────────────────────────────────
    if let Some(ref dir) = cli.output {
        let mut saved = 0usize;
        for (index, result) in results.iter().enumerate() {
            if !result.status.is_success() {
                continue;
            }
            let target = match session.download_target(index) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("{} {}: {}", yellow("⚠"), result.original_name, e);
                    continue;
                }
            };
            let path = save_to_dir(service.http(), &target, dir)
                .await
                .with_context(|| format!("Failed to download {}", target.filename))?;
            saved += 1;
            if !cli.quiet {
                eprintln!("  {} {}", green("↓"), path.display());
            }
        }
        if !cli.quiet {
            eprintln!(
                "{} {} file(s) saved to {}",
                green("✔"),
                bold(&saved.to_string()),
                bold(&dir.display().to_string())
            );
        }
    }

    let failed = results
        .iter()
        .filter(|r| r.status == ResultStatus::Failed)
        .count();
    if failed > 0 {
        anyhow::bail!("{failed}/{} file(s) failed to convert", results.len());
    }

    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(cli.server.clone())
        .quality(cli.quality.clone().into())
        .include_notes(cli.include_notes)
        .poll_interval_ms(cli.poll_interval_ms)
        .status_concurrency(cli.status_concurrency);

    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_results(results: &[ConversionResult]) {
    for r in results {
        let mark = match r.status {
            ResultStatus::Success => green("✓"),
            ResultStatus::Failed => red("✗"),
            ResultStatus::Pending => yellow("…"),
        };
        let size = r.size.map(format_file_size).unwrap_or_else(|| "-".to_string());
        eprintln!(
            "  {} {}  →  {}  {}",
            mark,
            r.original_name,
            bold(&r.converted_name),
            dim(&size)
        );
    }
}
