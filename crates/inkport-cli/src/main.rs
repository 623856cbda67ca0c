use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use inkport_sync::{MigrationConfig, MigrationDriver, PostOutcome, RunMode};

#[derive(Debug, Parser)]
#[command(name = "inkport")]
#[command(about = "Migrate WordPress posts, authors and categories into Sanity")]
struct Cli {
    /// Migrate only the newest post, as a smoke test.
    #[arg(long)]
    single: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let Some(config) = inkport_cli::bootstrap() else {
        return ExitCode::FAILURE;
    };
    let mode = if cli.single {
        RunMode::FirstPostOnly
    } else {
        RunMode::AllPosts
    };

    match run(&config, mode).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "migration aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &MigrationConfig, mode: RunMode) -> Result<()> {
    let mut driver = MigrationDriver::from_config(config)?;
    let summary = driver.run(mode).await?;

    for report in &summary.posts {
        if let PostOutcome::Failed { message } = &report.outcome {
            println!("failed: {} ({}): {}", report.title, report.slug, message);
        }
    }
    println!(
        "migration complete: run_id={} categories={} posts={} succeeded={} failed={} skipped={}",
        summary.run_id,
        summary.categories,
        summary.total,
        summary.succeeded,
        summary.failed,
        summary.skipped
    );
    Ok(())
}
