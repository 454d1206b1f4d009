//! brain-terminal - faux-terminal chat client for the Brain Terminal proxy

mod config;
mod line;
mod ui;
mod utils;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use brain_client::{ChatClient, Framing, ProxyTransport};
use clap::Parser;

use crate::config::{Config, Overrides};

/// brain-terminal - generate realities from the command line
#[derive(Parser, Debug)]
#[command(name = "brain-terminal")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Proxy chat endpoint (default: http://localhost:3000/api/chat)
    #[arg(short, long)]
    url: Option<String>,

    /// Response framing (event-stream, plain-text)
    #[arg(long, value_parser = parse_framing)]
    framing: Option<Framing>,

    /// Run in non-interactive mode with a single prompt
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// Go straight to the terminal screen
    #[arg(long)]
    skip_intro: bool,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output (written to a log file while the TUI is running)
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

fn parse_framing(s: &str) -> Result<Framing, String> {
    match s.to_lowercase().as_str() {
        "event-stream" | "sse" => Ok(Framing::EventStream),
        "plain-text" | "plain" => Ok(Framing::PlainText),
        other => Err(format!(
            "unknown framing '{}' (expected event-stream or plain-text)",
            other
        )),
    }
}

/// Install the tracing subscriber. A log file is used when the TUI owns the screen.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("brain=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize config and exit
    if args.init_config {
        match Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = match args.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load(),
    };

    // CLI takes precedence over the config file
    let settings = cfg.resolve(Overrides {
        url: args.url,
        framing: args.framing,
        no_tui: args.no_tui,
        skip_intro: args.skip_intro,
    });

    let use_tui = settings.tui
        && args.command.is_none()
        && std::io::stdin().is_terminal()
        && std::io::stdout().is_terminal();

    if args.verbose {
        init_tracing(use_tui.then_some(settings.log_file.as_path()))?;
    }
    tracing::debug!(url = %settings.url, framing = ?settings.framing, tui = use_tui, "starting");

    let transport = Arc::new(ProxyTransport::new(&settings.url).with_framing(settings.framing));
    let mut client = ChatClient::new(transport);

    // Non-interactive mode
    if let Some(command) = args.command {
        return line::run_once(&mut client, &command).await;
    }

    if use_tui {
        return ui::run_tui(&mut client, &settings).await;
    }

    line::run_lines(&mut client).await
}
