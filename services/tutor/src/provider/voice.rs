//! Speech output through the platform's text-to-speech program.
//!
//! The text is written to the program's stdin and the call resolves when the
//! program exits, i.e. when playback has finished.

use crate::config::SpeechBackend;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};
use tutor_core::speech::SpeechEngine;

const ESPEAK_PROGRAMS: [&str; 2] = ["espeak-ng", "espeak"];

/// Drives an external text-to-speech program.
#[derive(Debug, Clone)]
pub struct CommandVoice {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandVoice {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `espeak-ng` (or `espeak`) reading text from stdin at `rate` words per minute.
    pub fn espeak(rate: u32) -> Result<Self> {
        let program = find_program(&ESPEAK_PROGRAMS, None)
            .ok_or_else(|| anyhow!("neither espeak-ng nor espeak was found on PATH"))?;
        Ok(Self::new(
            program,
            vec!["-s".to_string(), rate.to_string(), "--stdin".to_string()],
        ))
    }

    /// macOS `say` at `rate` words per minute; reads stdin when given no text.
    pub fn say(rate: u32) -> Result<Self> {
        let program =
            find_program(&["say"], None).ok_or_else(|| anyhow!("'say' was not found on PATH"))?;
        Ok(Self::new(program, vec!["-r".to_string(), rate.to_string()]))
    }
}

#[async_trait]
impl SpeechEngine for CommandVoice {
    async fn say(&self, text: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(text.as_bytes()).await {
                // The program may exit without draining its input.
                Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(e.into()),
                _ => {}
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            bail!("{} exited with {}", self.program.display(), status);
        }
        Ok(())
    }
}

/// Prints without producing audio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentVoice;

#[async_trait]
impl SpeechEngine for SilentVoice {
    async fn say(&self, text: &str) -> Result<()> {
        debug!(text, "Speech output disabled");
        Ok(())
    }
}

/// Creates the speech engine for `backend`, failing if its program is missing.
pub fn build(backend: SpeechBackend, rate: u32) -> Result<Box<dyn SpeechEngine>> {
    let engine: Box<dyn SpeechEngine> = match backend {
        SpeechBackend::Silent => Box::new(SilentVoice),
        SpeechBackend::Espeak => Box::new(CommandVoice::espeak(rate)?),
        SpeechBackend::Say => Box::new(CommandVoice::say(rate)?),
        SpeechBackend::Auto if cfg!(target_os = "macos") => Box::new(CommandVoice::say(rate)?),
        SpeechBackend::Auto => Box::new(CommandVoice::espeak(rate)?),
    };
    info!(?backend, rate, "Speech output ready");
    Ok(engine)
}

/// The first of `names` that resolves to an executable, searching `paths`
/// (a `PATH`-style list) or the process `PATH` when `None`.
fn find_program(names: &[&str], paths: Option<&OsStr>) -> Option<PathBuf> {
    names.iter().find_map(|name| match paths {
        Some(paths) => which::which_in(*name, Some(paths), ".").ok(),
        None => which::which(*name).ok(),
    })
}
