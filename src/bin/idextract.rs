//! CLI binary for idextract.
//!
//! A thin shim over the library crate: `serve` runs the HTTP service,
//! `extract` runs one document through the same pipeline and prints the
//! result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use idextract::{server, AppConfig, ExtractionConfig, ExtractionResult, Extractor};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on port 3000
  GEMINI_API_KEY=AIza... idextract serve

  # Upload a document to the running service
  curl -F "document=@passport.jpg" http://localhost:3000/api/upload

  # One-shot extraction, human-readable summary
  idextract extract passport.jpg

  # One-shot extraction, full JSON result
  idextract extract --json licence.pdf > licence.json

  # Use another vision provider through edgequake-llm
  idextract extract --provider openai --model gpt-4.1-mini id-card.png

SUPPORTED FILES:
  jpg, jpeg, png, gif, bmp, webp, pdf (max 20 MB; the HTTP service accepts
  JPEG, PNG and PDF up to 5 MB)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (required for serve)
  PORT / HOST             Listen address for serve (default 0.0.0.0:3000)
  IDEXTRACT_MODEL         Model ID (default gemini-1.5-flash)
  IDEXTRACT_PROVIDER      edgequake-llm provider instead of built-in Gemini
  IDEXTRACT_API_BASE      Gemini API base URL
  IDEXTRACT_API_TIMEOUT   Per-call timeout in seconds (default 60)
  IDEXTRACT_UPLOAD_DIR    Directory for in-flight uploads
  ALLOWED_ORIGINS         Comma-separated CORS origins (default any)
  RUST_LOG                Log filter, overrides -v / -q
"#;

/// Extract structured data from identity documents with a multimodal LLM.
#[derive(Parser, Debug)]
#[command(
    name = "idextract",
    version,
    about = "Extract structured data from identity documents with a multimodal LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "IDEXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "IDEXTRACT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP upload service.
    Serve {
        /// Listen port (overrides PORT).
        #[arg(long)]
        port: Option<u16>,

        /// Listen address (overrides HOST).
        #[arg(long)]
        host: Option<String>,
    },

    /// Extract one local file and print the result.
    Extract(ExtractArgs),
}

#[derive(clap::Args, Debug)]
struct ExtractArgs {
    /// Image or PDF of an identity document.
    file: PathBuf,

    /// Print the full JSON result instead of a summary.
    #[arg(long)]
    json: bool,

    /// API key for the built-in Gemini backend.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model ID (e.g. gemini-1.5-flash, gemini-1.5-pro).
    #[arg(long, env = "IDEXTRACT_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "IDEXTRACT_PROVIDER")]
    provider: Option<String>,

    /// Gemini API base URL.
    #[arg(long, env = "IDEXTRACT_API_BASE")]
    api_base: Option<String>,

    /// Per-call timeout in seconds.
    #[arg(long, env = "IDEXTRACT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Path to a text file replacing the built-in prompt.
    #[arg(long)]
    prompt: Option<PathBuf>,

    /// Disable the spinner.
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the variables may come from the shell.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner is the feedback for one-shot extraction, so INFO logs
    // are hidden while it runs.
    let show_progress = match &cli.command {
        Command::Extract(args) => !cli.quiet && !args.no_progress && !args.json,
        Command::Serve { .. } => false,
    };
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

    match cli.command {
        Command::Serve { port, host } => run_serve(port, host).await,
        Command::Extract(args) => run_extract(args, show_progress, cli.quiet).await,
    }
}

async fn run_serve(port: Option<u16>, host: Option<String>) -> Result<()> {
    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(host) = host {
        config.server.host = host;
    }

    let extractor = Extractor::new(config.extraction).context("Failed to set up the model")?;
    server::serve(extractor, config.server)
        .await
        .context("HTTP server failed")
}

async fn run_extract(args: ExtractArgs, show_progress: bool, quiet: bool) -> Result<()> {
    let config = build_config(&args).await?;
    let extractor = Extractor::new(config).context("Failed to set up the model")?;

    let file_name = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("Not a file path: {}", args.file.display()))?;

    let spinner = show_progress.then(|| spinner(&file_name, extractor.model_name()));
    let start = Instant::now();
    let outcome = extractor.extract_file(&args.file, &file_name).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let result = outcome.with_context(|| format!("Extraction failed for {}", args.file.display()))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise result")?
        );
    } else {
        print_summary(&result, &args.file);
    }

    if !quiet && !args.json {
        eprintln!(
            "{} {}  {}",
            if result.is_success() { green("✔") } else { yellow("⚠") },
            bold(&file_name),
            dim(&format!("{:.1}s", start.elapsed().as_secs_f64())),
        );
    }
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(args: &ExtractArgs) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder().api_timeout_secs(args.api_timeout);

    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref base) = args.api_base {
        builder = builder.api_base(base.clone());
    }
    if let Some(ref path) = args.prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt_override(prompt);
    }

    builder.build().context("Invalid configuration")
}

fn spinner(file_name: &str, model: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Extracting");
    bar.set_message(format!("{file_name} via {model}"));
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Human-readable view of a result.
fn print_summary(result: &ExtractionResult, path: &Path) {
    let Some(data) = result.extracted_data() else {
        eprintln!("{} The model did not return JSON; raw reply follows.", yellow("⚠"));
        println!("{}", result.raw_response().unwrap_or_default());
        return;
    };

    let Some(record) = result.document_record() else {
        // Valid JSON, but not the object shape the prompt asks for.
        println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
        return;
    };

    println!("{}", bold(&path.display().to_string()));
    let document_type = record.document_type.unwrap_or_default();
    row("Document type", Some(document_type.label()));
    if let Some(ref person) = record.personal_info {
        row("Name", person.name.as_deref());
        row("Date of birth", person.date_of_birth.as_deref());
        row("Gender", person.gender.as_deref());
        row("Nationality", person.nationality.as_deref());
        row("Address", person.address.as_deref());
    }
    row("Document number", record.document_number.as_deref());
    row("Issue date", record.issue_date.as_deref());
    row("Expiry date", record.expiry_date.as_deref());
    row("Issuing authority", record.issuing_authority.as_deref());
    row("Country", record.country.as_deref());

    let extra = record.canonical_additional_info();
    if !extra.is_empty() {
        println!("  {}", dim("Additional information"));
        for (key, value) in &extra {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            println!("    {:<22} {}", key, text);
        }
    }
}

fn row(label: &str, value: Option<&str>) {
    match value {
        Some(v) => println!("  {:<20} {}", label, v),
        None => println!("  {:<20} {}", label, dim("-")),
    }
}
