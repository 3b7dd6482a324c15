//! Concrete backends for the core traits.
//!
//! - `gpt2`: a local GPT-2 model implementing `TextModel`.
//! - `voice`: system text-to-speech programs implementing `SpeechEngine`.

pub mod gpt2;
pub mod voice;
