//! Speech output: every utterance is printed, then rendered audibly.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// Default speaking rate in words per minute.
pub const DEFAULT_RATE: u32 = 150;

/// A text-to-speech renderer.
///
/// `say` resolves only once playback has finished, so callers observe speech
/// as a blocking operation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn say(&self, text: &str) -> Result<()>;
}

/// Prints assistant utterances with a role label and hands them to a
/// [`SpeechEngine`].
pub struct Speaker {
    engine: Box<dyn SpeechEngine>,
}

impl Speaker {
    pub fn new(engine: Box<dyn SpeechEngine>) -> Self {
        Self { engine }
    }

    pub async fn speak(&self, text: &str) -> Result<()> {
        println!("Assistant: {text}");
        debug!(chars = text.len(), "Rendering speech");
        self.engine.say(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[tokio::test]
    async fn test_speak_forwards_text_to_engine() {
        let mut engine = MockSpeechEngine::new();
        engine
            .expect_say()
            .withf(|text| text == "Hello there")
            .times(1)
            .returning(|_| Ok(()));

        let speaker = Speaker::new(Box::new(engine));
        speaker.speak("Hello there").await.unwrap();
    }

    #[tokio::test]
    async fn test_speak_propagates_engine_failure() {
        let mut engine = MockSpeechEngine::new();
        engine
            .expect_say()
            .returning(|_| Err(anyhow!("audio device busy")));

        let speaker = Speaker::new(Box::new(engine));
        let err = speaker.speak("Hello").await.unwrap_err();
        assert_eq!(err.to_string(), "audio device busy");
    }
}
