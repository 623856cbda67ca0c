//! Process setup shared by the `inkport` binaries.

use inkport_sync::{preflight_from_env, MigrationConfig};
use tracing_subscriber::EnvFilter;

pub const CRATE_NAME: &str = "inkport-cli";

/// Load `.env`, install the fmt subscriber and read the configuration.
/// `None` means preflight failed and has already been logged.
pub fn bootstrap() -> Option<MigrationConfig> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    preflight_from_env().ok()
}
