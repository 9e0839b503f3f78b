// Loan Risk Analyzer - CLI
// Render prompts, normalize saved replies, or run one analysis

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use loan_risk::config::corpus_path_from_env;
use loan_risk::{init_tracing, AppConfig, LoanAnalyzer, PromptBuilder, RegulatoryContext, ResponseNormalizer};

#[derive(Parser)]
#[command(name = "loan-risk", version, about = "Loan agreement risk analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the prompt that would be sent for a document
    Prompt {
        #[arg(long)]
        file: PathBuf,
        /// Regulatory corpus (defaults to LOAN_RISK_CORPUS or rag_corpus.txt)
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Normalize a saved model reply into the analysis JSON
    Normalize {
        #[arg(long)]
        file: PathBuf,
        /// Skip schema enforcement and print whatever JSON was found
        #[arg(long)]
        raw: bool,
    },
    /// Run a full analysis of a document against the configured model
    Analyze {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Prompt { file, corpus } => {
            let document = read_document(&file)?;
            let context = RegulatoryContext::load(corpus.unwrap_or_else(corpus_path_from_env));
            print!("{}", PromptBuilder::new(context).build_prompt(&document));
        }
        Commands::Normalize { file, raw } => {
            let reply = read_document(&file)?;
            let output = ResponseNormalizer::new(!raw)
                .normalize(&reply)
                .context("Failed to parse model output")?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Analyze { file } => {
            let document = read_document(&file)?;
            let config = AppConfig::from_env()?;
            let analyzer = LoanAnalyzer::new(
                config.text_generator(),
                RegulatoryContext::load(&config.corpus_path),
                ResponseNormalizer::new(config.enforce_schema),
            );
            let output = analyzer.analyze(&document).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {:?} as UTF-8 text", path))
}
