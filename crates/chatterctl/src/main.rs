//! Chatter Control - terminal chat client for the chatter engine.
//!
//! Wires stdin submissions into the event pipeline and prints transcript
//! lines as they render. The engine itself lives in `chatter_core`; this
//! binary is only the glue around its input stream and transcript sink.

use anyhow::{Context, Result};
use chatter_core::config::ChatConfig;
use chatter_core::context::ContextStore;
use chatter_core::dictionary::DictionaryClient;
use chatter_core::loader;
use chatter_core::matcher::Matcher;
use chatter_core::pipeline::ChatPipeline;
use chatter_core::rules::RuleTable;
use clap::Parser;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "chatterctl")]
#[command(about = "Chatter - a rule-driven terminal chatbot", long_about = None)]
#[command(version)]
struct Cli {
    /// Conversation rule file (XML); overrides the configured path
    #[arg(long)]
    data: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => ChatConfig::load(path),
        None => ChatConfig::default(),
    };
    let data_file = cli
        .data
        .unwrap_or_else(|| PathBuf::from(&config.data_file));

    let table = Arc::new(RuleTable::new());
    match loader::load_file(&data_file) {
        Ok(rules) => {
            info!(
                "Loaded {} conversation rules from {}",
                rules.len(),
                data_file.display()
            );
            table.load(rules);
        }
        Err(err) => {
            // The chatbot still runs, it just has nothing to say.
            warn!("Error loading conversations: {err}; starting with an empty rule table");
        }
    }

    let context = Arc::new(ContextStore::new());
    let dictionary = DictionaryClient::new(
        &config.dictionary.base_url,
        Duration::from_secs(config.dictionary.timeout_secs),
    )
    .context("Failed to build dictionary client")?;
    let matcher = Arc::new(Matcher::new(
        Arc::clone(&table),
        Arc::clone(&context),
        Arc::new(dictionary),
    ));

    let (input_tx, input_rx) = mpsc::channel(64);
    let (transcript_tx, mut transcript_rx) = mpsc::channel(64);
    let pipeline = ChatPipeline::new(config.clone(), matcher, context, transcript_tx);
    let pipeline_task = tokio::spawn(pipeline.run(input_rx));

    // Render task: the only place transcript lines reach the screen.
    let bot_label = config.bot_label.clone();
    let render_task = tokio::spawn(async move {
        while let Some(line) = transcript_rx.recv().await {
            if line.starts_with(&bot_label) {
                println!("{}", line.cyan());
            } else {
                println!("{line}");
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if input_tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!("Error reading input: {err}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // Dropping the input sender drains the pipeline; the transcript sender
    // goes with it and the render task finishes after the last line.
    drop(input_tx);
    let _ = pipeline_task.await;
    let _ = render_task.await;
    info!("Chat session ended");

    Ok(())
}
