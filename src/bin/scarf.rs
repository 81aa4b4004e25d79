//! CLI binary for scarf-client.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ClientConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use scarf_client::chat::ANSWER_ERROR;
use scarf_client::{
    analyze, analyze_to_file, fetch_status, flow, health, render, render_saved, watch_stream, ChatSession,
    ClientConfig, HttpBackend, JobProgressCallback, JobStatus, PollEvent, ProgressCallback, ReportFormat,
    ReportSummary, UploadJob,
};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress callback: a spinner while uploading, then a 0–100 bar
/// driven by the job's reported progress.
struct CliProgressCallback {
    bar: ProgressBar,
    poll_errors: AtomicU32,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading file…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            poll_errors: AtomicU32::new(0),
        })
    }

    fn activate_bar(&self) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}%  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_style(progress_style);
        self.bar.set_prefix("Analyzing");
    }
}

impl JobProgressCallback for CliProgressCallback {
    fn on_upload_start(&self, file_name: &str, bytes: usize) {
        self.bar.set_prefix("Uploading");
        self.bar
            .set_message(format!("{file_name} {}", dim(&format!("({bytes} bytes)"))));
    }

    fn on_job_created(&self, job_id: &str) {
        self.bar
            .println(format!("{} Job {} created", cyan("◆"), bold(job_id)));
        self.activate_bar();
        self.bar.set_message("Waiting for status…");
    }

    fn on_status(&self, job: &UploadJob) {
        if self.bar.prefix() != "Analyzing" {
            self.activate_bar();
        }
        self.bar.set_position(u64::from(job.progress));
        self.bar.set_message(format!("{} {}", job.status, job.message));
    }

    fn on_poll_error(&self, attempt: u32, error: String) {
        self.poll_errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error
        };
        self.bar
            .println(format!("  {} poll {:>3}  {}", red("✗"), attempt, red(&msg)));
    }

    fn on_job_complete(&self, job_id: &str, summary: &ReportSummary) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Job {} complete: {} claims, {} evidence, {} gaps, {} questions",
            green("✔"),
            bold(job_id),
            bold(&summary.claims.to_string()),
            summary.evidence,
            summary.gaps,
            summary.questions,
        );
        let errors = self.poll_errors.load(Ordering::SeqCst);
        if errors > 0 {
            eprintln!("   {}", dim(&format!("{errors} status requests failed and were retried")));
        }
    }

    fn on_job_failed(&self, job_id: Option<&str>, error: String) {
        self.bar.finish_and_clear();
        match job_id {
            Some(id) => eprintln!("{} Job {} failed: {}", red("✘"), bold(id), red(&error)),
            None => eprintln!("{} Upload failed: {}", red("✘"), red(&error)),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze a paper and print the text report
  scarf analyze paper.pdf

  # Write an HTML split view
  scarf analyze paper.pdf --format html -o report.html

  # Check or follow a job started elsewhere
  scarf status 3f2a9c
  scarf watch 3f2a9c --format markdown

  # Re-render a saved result payload
  scarf render result.json --format markdown
  curl -s localhost:8000/status/3f2a9c | scarf render -

  # Chat with an indexed document
  scarf ingest notes.md
  scarf ask "What sample size did the study use?"

ENVIRONMENT VARIABLES:
  SCARF_BASE_URL          Backend base URL (default http://localhost:8000)
  SCARF_POLL_INTERVAL_MS  Milliseconds between status requests (default 2000)
  SCARF_TIMEOUT           Per-request HTTP timeout in seconds (default 30)
  SCARF_MAX_POLLS         Give up after this many status requests
  SCARF_ACCEPT            Comma-separated accepted extensions (default .pdf)
  RUST_LOG                Override log filter (e.g. scarf_client=debug)
"#;

/// Upload documents to a SCARF analysis backend and render the report.
#[derive(Parser, Debug)]
#[command(
    name = "scarf",
    version,
    about = "Upload documents to a SCARF analysis backend and render the report",
    long_about = "Upload a document to a SCARF claim/evidence/gap analysis backend, follow the \
analysis job until it finishes, and render the extracted claims, evidence, gaps and validation \
questions as text, Markdown, HTML or JSON.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Backend base URL.
    #[arg(long, global = true, env = "SCARF_BASE_URL", default_value = scarf_client::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Milliseconds between status requests (min 10).
    #[arg(long, global = true, env = "SCARF_POLL_INTERVAL_MS", default_value_t = scarf_client::config::DEFAULT_POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, global = true, env = "SCARF_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Give up after this many status requests (default: poll until done).
    #[arg(long, global = true, env = "SCARF_MAX_POLLS",
          value_parser = clap::value_parser!(u32).range(1..))]
    max_polls: Option<u32>,

    /// Accepted file extensions.
    #[arg(long, global = true, env = "SCARF_ACCEPT", value_delimiter = ',', default_value = ".pdf")]
    accept: Vec<String>,

    /// Disable progress bar.
    #[arg(long, global = true, env = "SCARF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SCARF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SCARF_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a document, wait for the analysis and print the report.
    Analyze {
        /// Candidate files; the first one is uploaded.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write the report to this file instead of stdout.
        #[arg(short, long, env = "SCARF_OUTPUT")]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "text")]
        format: FormatArg,
    },

    /// Print the current status of a job once.
    Status {
        job_id: String,

        /// Print the raw job record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Follow an existing job until it finishes and print the report.
    Watch {
        job_id: String,

        #[arg(long, value_enum, default_value = "text")]
        format: FormatArg,
    },

    /// Render a saved result payload (or status response); `-` reads stdin.
    Render {
        input: String,

        #[arg(long, value_enum, default_value = "text")]
        format: FormatArg,
    },

    /// Ask a question about the document indexed for chat.
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Index a document for chat.
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Check that the backend is up.
    Health,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Text,
    Markdown,
    Html,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Markdown => ReportFormat::Markdown,
            FormatArg::Html => ReportFormat::Html,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar gives all the feedback that matters during a job, so
    // library INFO logs are muted while it is on screen.
    let polls = matches!(cli.command, Command::Analyze { .. } | Command::Watch { .. });
    let show_progress = polls && !g.quiet && !g.no_progress;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn JobProgressCallback>)
    } else {
        None
    };
    let config = build_config(g, progress_cb)?;

    match cli.command {
        Command::Analyze {
            files,
            output,
            format,
        } => {
            if let Some(output) = output {
                let format: ReportFormat = format.into();
                // A directory target gets `<document stem>.<format extension>`.
                let output_path = match files.first().and_then(|f| f.file_stem()) {
                    Some(stem) if output.is_dir() => {
                        output.join(stem).with_extension(format.extension())
                    }
                    _ => output,
                };
                let out = analyze_to_file(&files, &output_path, format, &config)
                    .await
                    .context("Analysis failed")?;
                if !g.quiet {
                    eprintln!(
                        "{}  {} claims  →  {}",
                        green("✔"),
                        out.view.summary.claims,
                        bold(&output_path.display().to_string()),
                    );
                }
            } else {
                let out = analyze(&files, &config).await.context("Analysis failed")?;
                let rendered = render(&out.view, Some(&out.file_name), format.into())
                    .context("Failed to render report")?;
                print_stdout(&rendered)?;
            }
        }

        Command::Status { job_id, json } => {
            let job = fetch_status(&job_id, &config)
                .await
                .context("Status request failed")?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&job).context("Failed to serialise job")?
                );
            } else {
                println!("{}", job.status_line());
                if let Some(ref e) = job.error {
                    println!("Error:  {}", red(e));
                }
            }
        }

        Command::Watch { job_id, format } => {
            let job = follow(&job_id, &config).await?;
            let cb = config.progress_callback.as_ref();
            match job.status {
                JobStatus::Completed => {
                    let report = flow::job_report(job).context("Job result could not be read")?;
                    if let Some(cb) = cb {
                        cb.on_job_complete(&job_id, &report.view.summary);
                    }
                    let rendered = render(&report.view, None, format.into())
                        .context("Failed to render report")?;
                    print_stdout(&rendered)?;
                }
                _ => {
                    let error = job.error.unwrap_or_default();
                    if let Some(cb) = cb {
                        cb.on_job_failed(Some(&job_id), error.clone());
                    }
                    bail!("Processing Failed: {error}");
                }
            }
        }

        Command::Render { input, format } => {
            let json = if input == "-" {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read stdin")?;
                buf
            } else {
                tokio::fs::read_to_string(&input)
                    .await
                    .with_context(|| format!("Failed to read {input:?}"))?
            };
            let rendered = render_saved(&json, None, format.into()).context("Failed to render result")?;
            print_stdout(&rendered)?;
        }

        Command::Ask { question } => {
            let chat = ChatSession::new(Arc::new(
                HttpBackend::new(&config).context("Invalid configuration")?,
            ));
            let question = question.join(" ");
            let Some(reply) = chat.ask(&question).await else {
                bail!("Question is empty");
            };
            if reply.content == ANSWER_ERROR {
                bail!("{ANSWER_ERROR}");
            }
            println!("{}", reply.content);
            if !reply.citations.is_empty() && !g.quiet {
                println!();
                for (i, c) in reply.citations.iter().enumerate() {
                    println!("  {} {}", dim(&format!("[{}]", i + 1)), c);
                }
            }
        }

        Command::Ingest { files } => {
            let chat = ChatSession::new(Arc::new(
                HttpBackend::new(&config).context("Invalid configuration")?,
            ));
            let filename = chat
                .upload_document(&files)
                .await
                .context("Document upload failed")?;
            if !g.quiet {
                eprintln!("{} Indexed {}", green("✔"), bold(&filename));
            }
        }

        Command::Health => {
            let h = health(&config).await.context("Backend is unreachable")?;
            match h.message {
                Some(m) => println!("{}  {}", green(&h.status), dim(&m)),
                None => println!("{}", green(&h.status)),
            }
        }
    }

    Ok(())
}

/// Poll `job_id` until it is terminal; Ctrl-C stops polling.
async fn follow(job_id: &str, config: &ClientConfig) -> Result<UploadJob> {
    let mut events = watch_stream(job_id, config).context("Invalid configuration")?;
    let mut last = None;
    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(PollEvent::Status(job)) => last = Some(job),
                Some(PollEvent::Error(_)) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => bail!("Interrupted; job {job_id} keeps running on the backend"),
        }
    }
    match last {
        Some(job) if job.is_terminal() => Ok(job),
        _ => bail!("Polling of job {job_id} stopped before it finished"),
    }
}

/// Map CLI args to `ClientConfig`.
fn build_config(g: &GlobalArgs, progress: Option<ProgressCallback>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(g.base_url.clone())
        .poll_interval_ms(g.poll_interval_ms)
        .request_timeout_secs(g.timeout)
        .max_polls(g.max_polls)
        .accept(g.accept.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_stdout(s: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(s.as_bytes())
        .context("Failed to write to stdout")?;
    // Ensure a trailing newline on stdout.
    if !s.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}
