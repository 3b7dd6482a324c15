//! Core logic for the spoken teaching assistant.
//!
//! Everything here is independent of the concrete text model and speech
//! synthesizer: both are reached through traits (`TextModel`, `SpeechEngine`)
//! so the service binary can plug in real backends and tests can plug in mocks.

pub mod fallback;
pub mod llm_client;
pub mod responder;
pub mod session;
pub mod speech;

/// Represents commands that the core logic issues to an external runtime.
///
/// This enum is the primary API for decoupling the session's decision-making
/// from the runtime's execution of side effects (speaking text or ending
/// the session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Command the runtime to speak the given text to the user.
    SpeakText(String),
    /// Command indicating the session is complete, with a final message.
    SessionComplete(String),
}
