use anyhow::Result;
use clap::Parser;

mod backend;
mod cli;
mod config;
mod formatter;
mod llm;
mod orchestrator;
mod overlay;
mod pipeline;
mod script;
mod types;
mod utils;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = args.into_config()?;

    let summary = pipeline::launch(&config).await?;

    // Partial output is kept on disk, but the exit code reports it.
    if !summary.failed.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
