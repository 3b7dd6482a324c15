//! Main Entrypoint for the Tutor CLI
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and command-line flags.
//! 2. Initializing logging.
//! 3. Running the interactive session on a single-threaded runtime.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tutor_service::{
    app,
    config::{Cli, Config},
};

fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    config.apply(&cli);

    // --- 2. Initialize Logging ---
    // Logs go to stderr so they never interleave with the conversation.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!(
        speech = ?config.speech_backend,
        rate = config.speech_rate,
        "Configuration loaded"
    );

    // --- 3. Run the Session ---
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build the async runtime")?;
    let result = runtime.block_on(app::run(config));

    // A pending stdin read lives on the blocking pool; don't wait for it.
    runtime.shutdown_background();
    result
}
