use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use scribe::config::Config;
use scribe::consts::{FIELD_FILE, FIELD_SUMMARY_TYPE, FIELD_TEXT, default_db_path};
use scribe::display::{TerminalDisplay, TextSlot};
use scribe::endpoint::http::HttpEndpoint;
use scribe::events::{CycleOutcome, settle};
use scribe::form::Form;
use scribe::handler::{RenderPolicy, SubmissionHandler};

/// Id of the form every CLI submission goes through.
const FORM_ID: &str = "summarize-form";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SummaryType {
    Quick,
    Detailed,
}

impl SummaryType {
    fn as_str(self) -> &'static str {
        match self {
            SummaryType::Quick => "quick",
            SummaryType::Detailed => "detailed",
        }
    }
}

#[derive(Parser)]
#[command(name = "scribe", version, about = "Send documents to a summarizer, show what comes back.")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database holding stored defaults [default: ~/.scribe/scribe.db]
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Render every response as it resolves, even ones older than the latest submission
    #[arg(long, global = true, default_value_t = false)]
    last_writer_wins: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Submit once and print the result
    Submit {
        /// Text to summarize (appended to the file's text by the service)
        #[arg(long)]
        text: Option<String>,

        /// Document to upload (.txt, .pdf, .docx, .md, .html, .csv)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Summary length
        #[arg(short = 't', long, value_enum)]
        summary_type: Option<SummaryType>,

        /// Extra form field, repeatable
        #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Summarizer base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Submit each line typed; results print as they arrive
    Repl {
        /// Summary length
        #[arg(short = 't', long, value_enum)]
        summary_type: Option<SummaryType>,

        /// Summarizer base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Manage stored defaults
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a stored value
    Get { key: String },
    /// Store a value (keys: base_url, summary_type)
    Set { key: String, value: String },
    /// Forget a stored value
    Unset { key: String },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got `{raw}`")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = open_config(cli.db.as_deref())?;
    let policy = if cli.last_writer_wins {
        RenderPolicy::LastWriterWins
    } else {
        RenderPolicy::LatestSubmission
    };

    match cli.command {
        Command::Submit {
            text,
            file,
            summary_type,
            fields,
            base_url,
        } => {
            let base_url = config.base_url(base_url.as_deref())?;
            let summary_type = config.summary_type(summary_type.map(SummaryType::as_str))?;

            let form = Form::new(FORM_ID);
            if let Some(path) = &file {
                form.attach_path(FIELD_FILE, path)?;
            }
            if let Some(text) = &text {
                form.set_text(FIELD_TEXT, text);
            }
            form.set_text(FIELD_SUMMARY_TYPE, &summary_type);
            for (name, value) in &fields {
                form.set_text(name, value);
            }

            handle_submit(&form, &base_url, policy).await
        }
        Command::Repl {
            summary_type,
            base_url,
        } => {
            let base_url = config.base_url(base_url.as_deref())?;
            let summary_type = config.summary_type(summary_type.map(SummaryType::as_str))?;
            handle_repl(&base_url, &summary_type, policy).await
        }
        Command::Config { action } => handle_config(&config, action),
    }
}

fn open_config(db: Option<&Path>) -> Result<Config> {
    let path = match db {
        Some(path) => path.to_path_buf(),
        None => default_db_path().context("cannot determine home directory; pass --db")?,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let path = path
        .to_str()
        .with_context(|| format!("database path is not valid UTF-8: {}", path.display()))?;
    Config::open(path)
}

async fn handle_submit(form: &Form, base_url: &str, policy: RenderPolicy) -> Result<()> {
    let display = Arc::new(TextSlot::new());
    SubmissionHandler::new(Arc::new(HttpEndpoint::new(base_url)), display.clone(), policy)
        .attach(form);

    let outcomes = form.submit().settled().await;
    match outcomes.as_slice() {
        [CycleOutcome::Rendered(text)] => println!("{text}"),
        _ => bail!("submission did not produce a result"),
    }
    Ok(())
}

async fn handle_repl(base_url: &str, summary_type: &str, policy: RenderPolicy) -> Result<()> {
    let form = Form::new(FORM_ID);
    form.set_text(FIELD_SUMMARY_TYPE, summary_type);
    SubmissionHandler::new(
        Arc::new(HttpEndpoint::new(base_url)),
        Arc::new(TerminalDisplay::new()),
        policy,
    )
    .attach(&form);

    println!("scribe {} → {}", env!("CARGO_PKG_VERSION"), base_url);
    println!("type text to summarize, /help for commands");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut pending: Vec<JoinHandle<CycleOutcome>> = Vec::new();

    loop {
        print!("\nscribe> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                // Leave without waiting for in-flight submissions.
                return Ok(());
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }
        if input.starts_with('/') {
            if let Err(e) = run_command(&form, input) {
                eprintln!("error: {e:#}");
            }
            continue;
        }

        form.set_text(FIELD_TEXT, input);
        pending.retain(|handle| !handle.is_finished());
        pending.extend(form.submit().into_pending());
    }

    if !pending.is_empty() {
        println!("waiting for {} submission(s)...", pending.len());
        tokio::select! {
            _ = settle(pending) => {}
            _ = tokio::signal::ctrl_c() => println!("\ninterrupted"),
        }
    }
    Ok(())
}

/// REPL commands that edit the form rather than submit it.
fn run_command(form: &Form, input: &str) -> Result<()> {
    let (name, arg) = match input.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (input, ""),
    };
    match name {
        "/file" if arg.is_empty() => {
            form.remove(FIELD_FILE);
            println!("file detached");
        }
        "/file" => {
            form.attach_path(FIELD_FILE, Path::new(arg))?;
            println!("attached {arg}");
        }
        "/type" => {
            let summary_type = SummaryType::from_str(arg, true)
                .map_err(|_| anyhow::anyhow!("expected quick or detailed, got `{arg}`"))?;
            form.set_text(FIELD_SUMMARY_TYPE, summary_type.as_str());
            println!("summary type: {}", summary_type.as_str());
        }
        "/help" => {
            println!("  <text>          submit text");
            println!("  /file <path>    attach a document (no path detaches)");
            println!("  /type <kind>    quick or detailed");
            println!("  quit            leave after pending results arrive");
        }
        other => bail!("unknown command: {other}"),
    }
    Ok(())
}

fn handle_config(config: &Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => match config.get(&key)? {
            Some(value) => println!("{value}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            println!("✓ {key} = {value}");
        }
        ConfigAction::Unset { key } => {
            config.remove(&key)?;
            println!("✓ {key} unset");
        }
    }
    Ok(())
}
