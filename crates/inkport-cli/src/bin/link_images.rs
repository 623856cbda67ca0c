use std::process::ExitCode;

use inkport_sync::CategoryImageLinker;

#[tokio::main]
async fn main() -> ExitCode {
    let Some(config) = inkport_cli::bootstrap() else {
        return ExitCode::FAILURE;
    };

    let result = match CategoryImageLinker::from_config(&config) {
        Ok(linker) => linker.run().await,
        Err(err) => Err(err),
    };
    match result {
        Ok(summary) => {
            println!(
                "category images linked: updated={} skipped={} failed={}",
                summary.updated, summary.skipped, summary.failed
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "category image linking aborted");
            ExitCode::FAILURE
        }
    }
}
