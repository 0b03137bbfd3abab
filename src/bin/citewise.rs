//! CLI binary for citewise.

use std::path::PathBuf;

use citewise::message::{ChatMessage, ModelSpec};
use citewise::pipeline::AnswerRequest;
use citewise::{AnswerPipeline, CitewiseConfig, CitewiseServer};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Search-augmented, citation-grounded answers from a streaming chat backend.
#[derive(Parser)]
#[command(name = "citewise", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address.
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default).
    Serve,

    /// Answer one question and print the answer with its sources.
    Ask {
        /// The question.
        query: String,

        /// Backend model id.
        #[arg(short, long, default_value = "default")]
        model: String,
    },

    /// Write the default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `ask` output stays clean on stdout.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("citewise=info,citewise_search=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(CitewiseConfig::default_config_path);

    if let Some(Command::InitConfig { force }) = cli.command {
        return init_config(&config_path, force);
    }

    let mut config = if cli.config.is_some() || config_path.exists() {
        CitewiseConfig::from_file(&config_path)?
    } else {
        CitewiseConfig::default()
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Ask { query, model } => ask(config, query, model).await,
        Command::InitConfig { .. } => Ok(()),
    }
}

async fn serve(config: CitewiseConfig) -> anyhow::Result<()> {
    let server = CitewiseServer::start(&config).await?;
    info!(addr = %server.addr(), "citewise started");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    server.shutdown();
    Ok(())
}

async fn ask(config: CitewiseConfig, query: String, model: String) -> anyhow::Result<()> {
    let pipeline = AnswerPipeline::from_config(&config)?;
    let request = AnswerRequest {
        messages: vec![ChatMessage::user(query)],
        model: ModelSpec::new(model),
        google_api_key: None,
        google_cse_id: None,
    };

    let answer = pipeline.answer(&request).await?;
    println!("{}", answer.text);
    if !answer.sources.is_empty() {
        println!();
        for (n, source) in answer.sources.cited() {
            println!("[{n}] {} <{}>", source.title, source.link);
        }
    }
    Ok(())
}

fn init_config(path: &std::path::Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    CitewiseConfig::default().save_to_file(path)?;
    println!("wrote {}", path.display());
    Ok(())
}
