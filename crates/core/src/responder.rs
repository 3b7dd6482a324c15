//! Turns a user question into an answer using the text model, falling back
//! to canned explanations when the model has little to say.

use crate::fallback;
use crate::llm_client::{GenerationParams, TextModel};
use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Prepended to the canned explanation when the model output is too short.
pub const FALLBACK_LEAD_IN: &str = "Let me explain that in detail. ";

/// Generated answers shorter than this (in characters) are replaced.
pub const MIN_ANSWER_CHARS: usize = 10;

/// Builds the prompt fed to the model for a question.
pub fn build_prompt(question: &str) -> String {
    format!("Question: {question}\nDetailed Answer:")
}

/// Formats a failure the way it is spoken back to the user.
pub fn diagnostic(err: &anyhow::Error) -> String {
    format!("Sorry, I encountered an error: {err}")
}

/// Echoes a generation failure to `out` as `Error: ...` and returns the
/// diagnostic to speak in place of an answer.
pub fn report_failure<W: Write>(out: &mut W, err: &anyhow::Error) -> String {
    if let Err(write_err) = writeln!(out, "Error: {err}") {
        warn!(error = ?write_err, "Failed to echo generation error");
    }
    diagnostic(err)
}

/// Where an answer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Text produced by the model, with the prompt echo removed.
    Generated(String),
    /// Lead-in plus a canned explanation.
    Fallback(String),
}

impl Answer {
    pub fn text(&self) -> &str {
        match self {
            Answer::Generated(text) | Answer::Fallback(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Answer::Generated(text) | Answer::Fallback(text) => text,
        }
    }
}

/// Produces answers by prompting a [`TextModel`].
#[derive(Clone)]
pub struct Responder {
    model: Arc<dyn TextModel>,
    params: GenerationParams,
}

impl Responder {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            model,
            params: GenerationParams::DETAILED_ANSWER,
        }
    }

    /// Generates an answer, returning model failures to the caller.
    pub async fn try_generate(&self, question: &str) -> Result<Answer> {
        let prompt = build_prompt(question);
        let decoded = self.model.complete(&prompt, &self.params).await?;
        let answer = strip_prompt(&decoded, &prompt);
        debug!(chars = answer.chars().count(), "Model output after prompt removal");

        if answer.chars().count() < MIN_ANSWER_CHARS {
            info!(question, "Model output too short, using fallback explanation");
            return Ok(Answer::Fallback(format!(
                "{FALLBACK_LEAD_IN}{}",
                fallback::lookup(question)
            )));
        }
        Ok(Answer::Generated(answer.to_string()))
    }

    /// Generates an answer, never failing.
    ///
    /// Model failures are echoed as `Error: ...` on stdout and turned into a
    /// diagnostic sentence that can be spoken like any other answer.
    pub async fn generate(&self, question: &str) -> String {
        match self.try_generate(question).await {
            Ok(answer) => answer.into_text(),
            Err(e) => {
                error!(error = ?e, "Answer generation failed");
                report_failure(&mut std::io::stdout(), &e)
            }
        }
    }
}

/// Removes the echoed prompt from the front of `decoded` and trims it.
fn strip_prompt<'a>(decoded: &'a str, prompt: &str) -> &'a str {
    decoded.strip_prefix(prompt).unwrap_or(decoded).trim()
}
