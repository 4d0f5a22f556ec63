//! Bengali RAG question answering CLI.

use anyhow::{Context, Result};
use bengali_rag_qa::{
    Config, Embedder, RagPipeline, Session,
    cleaner::TextCleaner,
    embedding,
    llm::LlmClient,
    pipeline::{validate_query, validate_top_k},
    server::{self, AppState},
};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Bengali question answering over passage and MCQ knowledge
#[derive(Parser)]
#[command(name = "rag-qa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// The question, in Bengali
        query: String,

        /// Neighbours per partition (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the scored answer as JSON
        #[arg(long)]
        json: bool,

        /// Also print the ranked context
        #[arg(long)]
        show_context: bool,
    },

    /// Interactive conversation with short-term memory
    Chat {
        /// Neighbours per partition (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Serve the HTTP API
    Serve {
        /// Bind host (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (defaults to server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Clean OCR-extracted passage and MCQ text for ingestion
    Clean {
        /// Raw passage text file
        #[arg(long)]
        passage: PathBuf,

        /// Raw MCQ text file
        #[arg(long)]
        mcq: PathBuf,

        /// Output directory for section1.txt and section2.txt
        #[arg(short, long, default_value = "data/cleaned")]
        output: PathBuf,
    },

    /// Test LLM and embedding connections
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "bengali_rag_qa=debug,tower_http=debug"
    } else {
        "bengali_rag_qa=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Ask {
            query,
            top_k,
            json,
            show_context,
        } => cmd_ask(config, query, top_k, json, show_context).await,
        Commands::Chat { top_k } => cmd_chat(config, top_k).await,
        Commands::Serve { host, port } => cmd_serve(config, host, port).await,
        Commands::Clean {
            passage,
            mcq,
            output,
        } => cmd_clean(config, passage, mcq, output).await,
        Commands::Test => cmd_test(config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load(path).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn cmd_ask(
    config_path: Option<&Path>,
    query: String,
    top_k: Option<usize>,
    json: bool,
    show_context: bool,
) -> Result<()> {
    let query = validate_query(&query)?.to_string();
    let config = load_config(config_path)?;
    let top_k = validate_top_k(top_k.unwrap_or(config.retrieval.top_k))?;
    let pipeline = RagPipeline::from_config(&config).context("Failed to build pipeline")?;

    let start = Instant::now();
    let session = Session::new();
    let report = pipeline
        .run(&query, &session, top_k)
        .await
        .context("Failed to answer question")?;
    let duration = start.elapsed();

    if json {
        let json_str = if show_context {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string_pretty(&report.result)
        }
        .context("Failed to serialize answer")?;
        println!("{}", json_str);
        return Ok(());
    }

    if show_context {
        println!("Context:");
        println!("{}", "─".repeat(60));
        for (i, item) in report.context.items().iter().enumerate() {
            let preview: String = item.text.chars().take(120).collect();
            println!(
                "{:>2}. [{}] {:.4}  {}",
                i + 1,
                item.partition,
                item.distance,
                preview.trim()
            );
        }
        println!("{}", "─".repeat(60));
        println!();
    }

    println!("Answer: {}", report.result.answer);
    println!();
    println!("  Groundedness: {:.4}", report.result.groundedness);
    println!("  Relevance:    {:.4}", report.result.relevance);
    println!(
        "  Context:      {} items in {:.2?}",
        report.context.len(),
        duration
    );

    Ok(())
}

async fn cmd_chat(config_path: Option<&Path>, top_k: Option<usize>) -> Result<()> {
    let config = load_config(config_path)?;
    let top_k = validate_top_k(top_k.unwrap_or(config.retrieval.top_k))?;
    let pipeline = RagPipeline::from_config(&config).context("Failed to build pipeline")?;
    let session = Session::new();

    println!("Ask in Bengali. Type 'exit' or 'quit' to leave.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        match pipeline.converse(line, &session, top_k).await {
            Ok(result) => {
                println!("Bot: {}", result.answer);
                println!(
                    "     (groundedness {:.2}, relevance {:.2})\n",
                    result.groundedness, result.relevance
                );
            }
            Err(e) => println!("Error: {}\n", e),
        }
    }

    Ok(())
}

async fn cmd_serve(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let pipeline = RagPipeline::from_config(&config).context("Failed to build pipeline")?;
    let state = Arc::new(AppState::new(pipeline).with_top_k(config.retrieval.top_k));

    server::serve(&config.server, state)
        .await
        .context("Server failed")?;
    Ok(())
}

async fn cmd_clean(
    config_path: Option<&Path>,
    passage: PathBuf,
    mcq: PathBuf,
    output: PathBuf,
) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    if config.llm.api_base.is_empty() || config.llm.api_key.is_empty() {
        anyhow::bail!("LLM_API_BASE and LLM_API_KEY are required for cleaning");
    }

    println!("Cleaning with model: {}", config.llm.model);
    let start = Instant::now();

    let cleaner = TextCleaner::from_config(&config.llm);
    let files = cleaner
        .clean_files(&passage, &mcq, &output)
        .await
        .context("Failed to clean text")?;

    println!("\nCleaned text written in {:.2?}:", start.elapsed());
    println!("  Passages: {}", files.passage.display());
    println!("  MCQ:      {}", files.mcq.display());

    Ok(())
}

async fn cmd_test(config_path: Option<&Path>) -> Result<()> {
    println!("Testing connections...\n");

    let config = Config::load(config_path).context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  LLM API Base:     {}", config.llm.api_base);
    println!("  LLM Model:        {}", config.llm.model);
    println!(
        "  LLM API Key:      {}...",
        config.llm.api_key.chars().take(8).collect::<String>()
    );
    println!("  Retrieval model:  {}", config.retrieval_embedder.model);
    println!("  Evaluation model: {}", config.eval_embedder.model);
    println!(
        "  Index:            {} ({})",
        config.index.url, config.index.collection
    );
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = LlmClient::new(config.llm.clone());
    println!("Sending test request...");
    match client.test_connection().await {
        Ok(()) => println!("  LLM: connection successful!"),
        Err(e) => println!("  LLM: connection failed: {}", e),
    }

    for (label, embedder_config) in [
        ("Retrieval embedder", &config.retrieval_embedder),
        ("Evaluation embedder", &config.eval_embedder),
    ] {
        let outcome = match embedding::from_config(embedder_config) {
            Ok(embedder) => embedder.embed("পরীক্ষা").await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(vector) => println!("  {}: ok ({} dimensions)", label, vector.len()),
            Err(e) => println!("  {}: failed: {}", label, e),
        }
    }

    Ok(())
}
