#![cfg(not(tarpaulin_include))]

use filtable::app;
use filtable::config::AppConfig;
use std::env;

/// Main entry point for the Filtable web server
///
/// Settings come from `FILTABLE_*` environment variables; a first command line
/// argument overrides the bind address. Log level follows `RUST_LOG` and
/// defaults to `info`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config = AppConfig::from_env().with_args(&args);

    log::info!(
        "Starting Filtable with uploads in {}",
        config.upload_dir.display()
    );
    app::run(config).await
}
