//! Command-line entry points: translate, ask, bootstrap, eval

use anyhow::{bail, Result};
use cfg_evals::api::{self, AppState};
use cfg_evals::bootstrap;
use cfg_evals::config::Settings;
use cfg_evals::evals;
use cfg_evals::execution::ClickHouseEngine;
use cfg_evals::translator::Translator;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cfg_evals")]
#[command(about = "Natural-language analytics questions to constrained SQL")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a question and print the SQL without executing it
    Translate {
        /// The analytics question in natural language
        question: String,
    },
    /// Run a question through the full pipeline and print the JSON response
    Ask {
        /// The analytics question in natural language
        question: String,
    },
    /// Create default.MOCK_DATA in ClickHouse and seed sample rows if empty
    Bootstrap,
    /// Run the eval dataset through the pipeline and print a report
    Eval {
        /// JSONL file of {id, question, expect_sql_regex} cases
        #[arg(default_value = "evals/dataset.jsonl")]
        dataset: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Translate { question } => translate(settings, question).await,
        Commands::Ask { question } => ask(settings, question).await,
        Commands::Bootstrap => run_bootstrap(settings).await,
        Commands::Eval { dataset } => run_evals(settings, dataset).await,
    }
}

async fn translate(settings: Settings, question: String) -> Result<()> {
    let translator = Translator::from_settings(&settings)?;
    let translation = translator.translate(&question).await?;
    println!("{}", translation.sql);
    info!(heuristic = translation.heuristic, "Translated");
    Ok(())
}

async fn ask(settings: Settings, question: String) -> Result<()> {
    let state = AppState::from_settings(settings)?;
    let body = serde_json::json!({ "question": question }).to_string();
    let response = api::route(&state, "POST", "/nl-query", &body).await;
    match response.json_value() {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("{}", response.body),
    }
    if response.status != 200 {
        bail!("request failed with status {}", response.status);
    }
    Ok(())
}

async fn run_bootstrap(settings: Settings) -> Result<()> {
    // Local-server defaults for an unconfigured environment
    let mut clickhouse = settings.clickhouse;
    clickhouse.host.get_or_insert_with(|| "localhost".to_string());
    clickhouse.port.get_or_insert(8123);
    clickhouse.database.get_or_insert_with(|| "default".to_string());

    let engine = ClickHouseEngine::connect(&clickhouse)?;
    let outcome = bootstrap::run(&engine).await?;
    info!(?outcome, "Bootstrap complete.");
    Ok(())
}

async fn run_evals(settings: Settings, dataset: PathBuf) -> Result<()> {
    let cases = evals::load_cases(&dataset)?;
    let state = AppState::from_settings(settings)?;
    let report = evals::run(&state, &cases).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}
