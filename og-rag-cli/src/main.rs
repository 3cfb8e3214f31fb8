//! og-rag CLI: chunk extracted documents, index them in Qdrant and answer
//! questions grounded in the indexed corpus, one-shot or interactively.

mod cli;
mod commands;
mod loader;
mod logging;
mod session;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    commands::run(cli).await
}
