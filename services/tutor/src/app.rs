//! Startup sequence and the interactive session over stdin.

use crate::config::Config;
use crate::provider::{gpt2::LocalGpt2, voice};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};
use tutor_core::responder::Responder;
use tutor_core::session::TutorSession;
use tutor_core::speech::Speaker;

pub const LOADING_MESSAGE: &str = "Loading the knowledge model... This may take a moment...";
pub const LOADED_MESSAGE: &str = "Model loaded successfully!";

/// Loads the model, then converses over stdin until the session ends.
pub async fn run(config: Config) -> Result<()> {
    let engine = voice::build(config.speech_backend, config.speech_rate)
        .context("Failed to initialise speech output")?;

    println!("{LOADING_MESSAGE}");
    let source = config.model.clone();
    let seed = config.seed;
    let model = tokio::task::spawn_blocking(move || LocalGpt2::load(&source, seed))
        .await?
        .context("Failed to load the language model")?;
    println!("{LOADED_MESSAGE}");
    info!(model = ?config.model, "Model ready");

    let mut session = TutorSession::new(
        Responder::new(Arc::new(model)),
        Speaker::new(engine),
    );
    session
        .run(BufReader::new(tokio::io::stdin()), interrupt())
        .await
}

/// Resolves on Ctrl+C. If the handler cannot be installed it never resolves.
async fn interrupt() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received interrupt signal"),
        Err(e) => {
            warn!(error = ?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
