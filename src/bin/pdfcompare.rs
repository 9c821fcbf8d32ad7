//! CLI binary for edgequake-pdfcompare.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `CompareConfig`, collects the input PDFs and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfcompare::document::discover_pdfs;
use edgequake_pdfcompare::{
    compare_to_report, default_report_path, CompareConfig,
    ComparisonProgressCallback, ComparisonRun, Credential, DocumentSource, FontSettings,
    ParsedPayload, ProgressCallback, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over every unit of work in the run
/// (one extraction and one summary per document, then compare and insights).
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner-only until `on_run_start` tells us how many documents there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Checking inputs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, steps: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} steps  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(steps as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Summarize => "Summarizing",
        Stage::Compare => "Comparing",
        Stage::Insights => "Insights",
    }
}

impl ComparisonProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_documents: usize) {
        self.activate_bar(total_documents * 2 + 2);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Comparing {total_documents} documents…"))
        ));
    }

    fn on_document_extracted(&self, index: usize, total: usize, name: &str, chars: usize) {
        self.bar.println(format!(
            "  {} Extracted {:>2}/{:<2}  {:<40}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{chars:>7} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage_label(stage));
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_summary_complete(&self, index: usize, total: usize, name: &str, payload_len: usize) {
        self.bar.println(format!(
            "  {} Summary   {:>2}/{:<2}  {:<40}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{payload_len:>7} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        if stage != Stage::Summarize {
            self.bar.inc(1);
        }
        self.bar.println(format!(
            "  {} {:<11} {}",
            green("✓"),
            stage_label(stage),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<11} {}",
            red("✗"),
            stage_label(stage),
            red(&msg)
        ));
        self.bar.finish_and_clear();
    }

    fn on_run_complete(&self, total_documents: usize) {
        self.bar.finish_and_clear();
        if self.errors.load(Ordering::SeqCst) == 0 {
            eprintln!(
                "{} {} documents compared",
                green("✔"),
                bold(&total_documents.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Batch mode: compare every PDF in ./input_pdfs
  pdfcompare

  # Compare specific files
  pdfcompare offer_a.pdf offer_b.pdf

  # Mix local files and URLs, explicit report path
  pdfcompare spec_v1.pdf https://example.com/spec_v2.pdf -o diff.pdf

  # Print summaries, comparison and insights as well
  pdfcompare --show a.pdf b.pdf

  # Machine-readable run output
  pdfcompare --json a.pdf b.pdf > run.json

  # Another provider / model
  pdfcompare --provider anthropic --model claude-sonnet-4-20250514 a.pdf b.pdf

REPORT NAME:
  <base1>_VS_<base2>[_VS_...]_<YYYYmmdd_HHMMSS>.pdf in --output-dir
  (base names without extension, joined part capped at 120 characters)

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (default provider)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  MISTRAL_API_KEY         Mistral API key
  PDFIUM_LIB_PATH         Directory containing libpdfium
  RUST_LOG                Override log filter (e.g. edgequake_pdfcompare=debug)
  PDFCOMPARE_*            Fallback for every flag (e.g. PDFCOMPARE_MODEL)

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Drop PDFs into input_pdfs/ (or pass them as arguments)
  3. Compare:         pdfcompare
"#;

/// Compare PDF documents with an LLM and write a PDF report.
#[derive(Parser, Debug)]
#[command(
    name = "pdfcompare",
    version,
    about = "Compare PDF documents with an LLM and write a PDF report",
    long_about = "Extract the text of two or more PDF documents, ask an LLM for a structured \
summary of each, a structured comparison and actionable insights, and render the result as a \
PDF report. Supports OpenAI, Anthropic, Google Gemini, Mistral, Ollama and other providers \
available through edgequake-llm.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF paths or HTTP/HTTPS URLs. Empty: every *.pdf in --input-dir.
    inputs: Vec<String>,

    /// Directory scanned in batch mode.
    #[arg(long, env = "PDFCOMPARE_INPUT_DIR", default_value = "input_pdfs")]
    input_dir: PathBuf,

    /// Directory the report is written to.
    #[arg(long, env = "PDFCOMPARE_OUTPUT_DIR", default_value = "output_reports")]
    output_dir: PathBuf,

    /// Write the report to this exact path instead of a generated name.
    #[arg(short, long, env = "PDFCOMPARE_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID.
    #[arg(long, env = "PDFCOMPARE_MODEL", default_value = edgequake_pdfcompare::config::DEFAULT_MODEL)]
    model: String,

    /// LLM provider: openai, anthropic, gemini, mistral, ollama, ...
    #[arg(long, env = "PDFCOMPARE_PROVIDER", default_value = edgequake_pdfcompare::config::DEFAULT_PROVIDER)]
    provider: String,

    /// Sampling temperature (0.0–1.0).
    #[arg(long, env = "PDFCOMPARE_TEMPERATURE", default_value_t = 0.2,
          value_parser = parse_temperature)]
    temperature: f32,

    /// Max output tokens per model call (512–8192).
    #[arg(long, env = "PDFCOMPARE_MAX_TOKENS", default_value_t = 2048,
          value_parser = clap::value_parser!(u32).range(512..=8192))]
    max_tokens: u32,

    /// Characters of each document sent to the summary call.
    #[arg(long, env = "PDFCOMPARE_CHAR_BUDGET",
          default_value_t = edgequake_pdfcompare::config::DEFAULT_CHAR_BUDGET)]
    char_budget: usize,

    /// Summary calls in flight at once (results keep input order).
    #[arg(short, long, env = "PDFCOMPARE_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Directory containing the report font files.
    #[arg(long, env = "PDFCOMPARE_FONT_DIR")]
    font_dir: Option<PathBuf>,

    /// Font family base name (<family>-Regular.ttf, -Bold.ttf, ...).
    #[arg(long, env = "PDFCOMPARE_FONT_FAMILY", default_value = "LiberationSans")]
    font_family: String,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFCOMPARE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the run (summaries, comparison, insights, stats) as JSON.
    #[arg(long, env = "PDFCOMPARE_JSON")]
    json: bool,

    /// Print summaries, the detailed comparison and insights.
    #[arg(long, env = "PDFCOMPARE_SHOW")]
    show: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFCOMPARE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFCOMPARE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFCOMPARE_QUIET")]
    quiet: bool,
}

fn parse_temperature(s: &str) -> std::result::Result<f32, String> {
    let t: f32 = s.parse().map_err(|e| format!("not a number: {e}"))?;
    if (0.0..=1.0).contains(&t) {
        Ok(t)
    } else {
        Err(format!("temperature must be between 0.0 and 1.0, got {t}"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file(None);

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries the user-facing feedback; library INFO logs
    // would only interleave with it.
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

    ensure_directories(&[&cli.input_dir, &cli.output_dir])?;

    // ── Collect inputs ───────────────────────────────────────────────────
    let sources = collect_sources(&cli)?;
    if !cli.quiet && cli.inputs.is_empty() {
        eprintln!(
            "Found {} PDF(s) in {}",
            sources.len(),
            cli.input_dir.display()
        );
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ComparisonProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let report_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_report_path(&cli.output_dir, &names, &timestamp));

    let output = match compare_to_report(&sources, &report_path, &config).await {
        Ok(output) => output,
        Err(e) if e.is_precondition() => {
            eprintln!("{} {}", red("✘"), e);
            std::process::exit(2);
        }
        Err(e) => return Err(e).context("Comparison failed"),
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }
    if cli.show {
        print_digest(&output.run)?;
    }

    if !cli.quiet {
        eprintln!(
            "{}  Report generated: {}",
            green("✔"),
            bold(&report_path.display().to_string())
        );
        eprintln!(
            "   {} model calls  ·  {} tokens in  /  {} tokens out  ·  {}ms total",
            output.stats.model_calls,
            dim(&output.stats.total_input_tokens.to_string()),
            dim(&output.stats.total_output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Create the working directories if they don't exist yet.
fn ensure_directories(dirs: &[&Path]) -> Result<()> {
    for dir in dirs {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}

/// Positional inputs in order, or every PDF of the input directory by name.
fn collect_sources(cli: &Cli) -> Result<Vec<DocumentSource>> {
    if !cli.inputs.is_empty() {
        return Ok(cli.inputs.iter().map(|i| DocumentSource::parse(i)).collect());
    }
    let pdfs = discover_pdfs(&cli.input_dir)
        .with_context(|| format!("Failed to scan {}", cli.input_dir.display()))?;
    Ok(pdfs.into_iter().map(DocumentSource::from_path).collect())
}

/// Map CLI args to `CompareConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<CompareConfig> {
    let mut builder = CompareConfig::builder()
        .model(cli.model.clone())
        .provider_name(cli.provider.clone())
        .maybe_credential(Credential::from_env(&cli.provider))
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens as usize)
        .char_budget(cli.char_budget)
        .summary_concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout)
        .fonts(FontSettings {
            dir: cli.font_dir.clone(),
            family: cli.font_family.clone(),
        });

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Summaries (pretty JSON when parsable), detailed comparison, insights.
/// Load `KEY=value` pairs from `path`, or from `./.env` when `None`.
///
/// A missing file is not an error. Variables already set in the process
/// environment take precedence.
fn load_env_file(path: Option<&Path>) {
    let _ = match path {
        Some(p) => dotenvy::from_path(p),
        None => dotenvy::dotenv().map(|_| ()),
    };
}

fn print_digest(run: &ComparisonRun) -> Result<()> {
    print!("{}", format_digest(run)?);
    Ok(())
}

/// Summaries in document order, then the comparison and the insights.
fn format_digest(run: &ComparisonRun) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!("{}\n", bold("Summaries")));
    for name in &run.pdf_names {
        out.push_str(&format!("{}\n", cyan(&format!("── {} ──", name))));
        let text = match run.summary(name) {
            Some(summary) => pretty_or_raw(summary.parsed())?,
            None => dim("(no summary)"),
        };
        out.push_str(&format!("{}\n", text));
    }

    out.push_str(&format!("\n{}\n", bold("Detailed comparison")));
    let comparison = edgequake_pdfcompare::pipeline::parse::parse_json_object(
        &run.comparison.raw_comparison,
    );
    out.push_str(&format!("{}\n", pretty_or_raw(comparison)?));

    out.push_str(&format!("\n{}\n", bold("Insights")));
    out.push_str(&format!("{}\n", run.insights.insights));
    Ok(out)
}

fn pretty_or_raw(
    payload: ParsedPayload<edgequake_pdfcompare::pipeline::parse::JsonObject>,
) -> Result<String> {
    match payload {
        ParsedPayload::Parsed(obj) => serde_json::to_string_pretty(&serde_json::Value::Object(obj))
            .context("Failed to format JSON"),
        ParsedPayload::Unparsed(raw) => Ok(raw),
    }
}
