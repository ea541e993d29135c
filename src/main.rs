mod analysis;
mod backend;
mod cache;
mod config;
mod decode;
mod error;
mod gmail_hub;
mod message;
mod message_processor;
mod pipeline;
mod protocol;
mod sanitize;
#[cfg(test)]
mod test_http;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use analysis::AnalysisRequestBuilder;
use backend::HttpBackend;
use cache::AnalysisCache;
use config::Config;
use gmail_hub::GmailHub;
use pipeline::Analyzer;

#[derive(Parser)]
#[command(name = "gmail_insight", about = "Decode Gmail messages and fetch backend insights")]
struct Cli {
    #[arg(
        long,
        env = "GMAIL_INSIGHT_CONFIG",
        default_value = ".config/gmail_insight.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one message and print the backend's result
    Analyze { id: String },
    /// Print the decoded recent messages
    Recent,
    /// Answer line-delimited JSON requests on stdin
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries results, logs go to stderr
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load_or_default(&cli.config)?;

    let source = Arc::new(GmailHub::from_config(&cfg));
    let analyzer = Analyzer::new(
        AnalysisRequestBuilder::new(source, cfg.analysis.recent_window)
            .with_listing_query(cfg.analysis.listing_query.clone()),
        Arc::new(HttpBackend::new(&cfg.backend)?),
        AnalysisCache::from_config(&cfg.cache),
    );

    match cli.command {
        Command::Analyze { id } => {
            let analysis = analyzer.analyze(&id).await?;
            println!("{}", serde_json::to_string_pretty(&*analysis)?);
        }
        Command::Recent => {
            let emails = analyzer.recent_emails().await?;
            println!("{}", serde_json::to_string_pretty(&emails)?);
        }
        Command::Serve => serve(&analyzer).await?,
    }

    Ok(())
}

async fn serve(analyzer: &Analyzer) -> Result<(), Box<dyn std::error::Error>> {
    info!("Serving requests on stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = protocol::handle_line(analyzer, &line).await;
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}
