//! # docchat CLI
//!
//! ```bash
//! docchat ask --file report.pdf "What does the report conclude?"
//! docchat chat --file report.pdf --file diagram.png
//! docchat fingerprint report.pdf copy-of-report.pdf
//! docchat --config ./docchat.toml chat --file notes.pdf
//! ```
//!
//! Logs go to stderr and are controlled by `RUST_LOG` (default `info`).

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use docchat::fingerprint::fingerprint;
use docchat::{load_config, Config, IngestOutcome, SessionAssistant};

/// Chat with your PDFs and images.
#[derive(Parser)]
#[command(name = "docchat", version, about)]
struct Cli {
    /// Path to a TOML configuration file. Built-in defaults (local
    /// embeddings, Ollama chat) apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest files and answer a single question.
    Ask {
        /// PDF or image file to ingest (repeatable).
        #[arg(long = "file", short = 'f')]
        files: Vec<PathBuf>,

        /// The question.
        question: String,
    },

    /// Ingest files, then answer questions read from stdin.
    ///
    /// `:clear` forgets every ingested file, `:quit` exits.
    Chat {
        /// PDF or image file to ingest (repeatable).
        #[arg(long = "file", short = 'f')]
        files: Vec<PathBuf>,
    },

    /// Print content fingerprints (SHA-256) of files.
    Fingerprint {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Fingerprint { files } = &cli.command {
        for file in files {
            println!("{}  {}", fingerprint(file)?, file.display());
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    let mut assistant = SessionAssistant::new(config)?;

    match cli.command {
        Commands::Ask { files, question } => {
            ingest_all(&mut assistant, &files).await;
            println!("{}", assistant.ask(&question).await?);
        }
        Commands::Chat { files } => {
            ingest_all(&mut assistant, &files).await;
            chat_loop(&mut assistant).await?;
        }
        Commands::Fingerprint { .. } => {}
    }

    Ok(())
}

/// Ingest each file in turn, reporting per-file results. A failure resets
/// the session but does not stop the remaining files.
async fn ingest_all(assistant: &mut SessionAssistant, files: &[PathBuf]) {
    for file in files {
        report(file, assistant.ingest_path(file).await);
    }
}

fn report(file: &Path, result: Result<IngestOutcome, docchat::AssistantError>) {
    match result {
        Ok(IngestOutcome::Ingested { chunks }) => {
            println!("{}: ingested ({} chunks)", file.display(), chunks)
        }
        Ok(IngestOutcome::AlreadyIngested) => println!("{}: already ingested", file.display()),
        Err(e) if e.resets_session() => {
            println!("{}: failed: {} (session cleared)", file.display(), e)
        }
        Err(e) => println!("{}: skipped: {}", file.display(), e),
    }
}

/// Read questions line by line until `:quit` or end of input.
async fn chat_loop(assistant: &mut SessionAssistant) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        match question {
            "" => continue,
            ":quit" | ":q" => break,
            ":clear" => {
                assistant.clear();
                println!("Session cleared.");
            }
            _ => match assistant.ask(question).await {
                Ok(reply) => println!("{}", reply),
                Err(e) => println!("error: {}", e),
            },
        }
    }
    Ok(())
}
