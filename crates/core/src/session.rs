//! The interactive question/answer loop.
//!
//! A session greets the user, then repeatedly reads a line, answers it and
//! speaks the answer until the user says goodbye, input ends, or the
//! interrupt future resolves. Failures inside a turn are spoken back to the
//! user and the session keeps going; only a failure to speak the greeting
//! aborts [`TutorSession::run`].

use crate::Command;
use crate::responder::{Responder, diagnostic};
use crate::speech::Speaker;
use anyhow::{Context, Result};
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{error, info, warn};

pub const GREETING: &str = "Hello! I'm your AI teaching assistant. I can help explain any topic in detail. Just ask me anything, and I'll provide a comprehensive explanation. Type 'exit' to quit.";
pub const FAREWELL: &str = "Goodbye! I hope you learned something new today!";

/// Words that end the session, compared after trimming and lowercasing.
pub const EXIT_WORDS: [&str; 3] = ["exit", "quit", "bye"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Terminated,
}

/// What a raw input line amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    Empty,
    Exit,
    Question(&'a str),
}

/// Normalizes a raw line and classifies it.
pub fn classify(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Input::Empty
    } else if EXIT_WORDS.contains(&trimmed.to_lowercase().as_str()) {
        Input::Exit
    } else {
        Input::Question(trimmed)
    }
}

pub struct TutorSession {
    responder: Responder,
    speaker: Speaker,
    state: SessionState,
}

impl TutorSession {
    pub fn new(responder: Responder, speaker: Speaker) -> Self {
        Self {
            responder,
            speaker,
            state: SessionState::Running,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Decides what one input line asks the runtime to do.
    ///
    /// Returns `None` for blank lines; the generator is not consulted.
    pub async fn process_line(&self, line: &str) -> Option<Command> {
        match classify(line) {
            Input::Empty => None,
            Input::Exit => Some(Command::SessionComplete(FAREWELL.to_string())),
            Input::Question(question) => {
                info!(question, "Answering question");
                Some(Command::SpeakText(self.responder.generate(question).await))
            }
        }
    }

    /// Runs the session until it terminates.
    ///
    /// `input` supplies one question per line. When `interrupt` resolves the
    /// current turn is abandoned, the farewell is spoken and the session ends.
    pub async fn run<R, F>(&mut self, input: R, interrupt: F) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        self.speaker
            .speak(GREETING)
            .await
            .context("Failed to speak greeting")?;

        let mut lines = input.lines();
        tokio::pin!(interrupt);

        while self.state == SessionState::Running {
            let outcome = tokio::select! {
                biased;
                _ = &mut interrupt => None,
                outcome = self.turn(&mut lines) => Some(outcome),
            };

            match outcome {
                // The farewell may already be playing.
                None if self.state == SessionState::Terminated => {
                    println!();
                    info!("Interrupted while ending session");
                }
                None => {
                    println!();
                    info!("Interrupted, ending session");
                    self.finish(FAREWELL).await;
                }
                Some(Ok(())) => {}
                Some(Err(e)) if self.state == SessionState::Running => {
                    error!(error = ?e, "Turn failed");
                    if let Err(report_err) = self.speaker.speak(&diagnostic(&e)).await {
                        error!(error = ?report_err, "Failed to report turn failure");
                    }
                }
                Some(Err(e)) => warn!(error = ?e, "Failed while ending session"),
            }
        }

        info!("Session terminated");
        Ok(())
    }

    /// Reads and handles a single line.
    async fn turn<R>(&mut self, lines: &mut Lines<R>) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        print!("You: ");
        std::io::stdout().flush()?;

        let command = match lines.next_line().await.context("Failed to read input")? {
            Some(line) => self.process_line(&line).await,
            None => {
                info!("Input closed");
                Some(Command::SessionComplete(FAREWELL.to_string()))
            }
        };

        match command {
            Some(Command::SpeakText(text)) => self.speaker.speak(&text).await,
            Some(Command::SessionComplete(text)) => {
                self.state = SessionState::Terminated;
                self.speaker.speak(&text).await
            }
            None => Ok(()),
        }
    }

    async fn finish(&mut self, farewell: &str) {
        self.state = SessionState::Terminated;
        if let Err(e) = self.speaker.speak(farewell).await {
            warn!(error = ?e, "Failed to speak farewell");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;
    use crate::llm_client::{GenerationParams, MockTextModel, TextModel};
    use crate::speech::SpeechEngine;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Records everything it is asked to say; fails on texts containing `fail_on`
    /// and lingers on texts containing `slow_on`.
    #[derive(Clone, Default)]
    struct Transcript {
        spoken: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
        slow_on: Option<&'static str>,
    }

    impl Transcript {
        fn lines(&self) -> Vec<String> {
            self.spoken.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SpeechEngine for Transcript {
        async fn say(&self, text: &str) -> Result<()> {
            self.spoken.lock().unwrap().push(text.to_string());
            if self.slow_on.is_some_and(|marker| text.contains(marker)) {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            match self.fail_on {
                Some(marker) if text.contains(marker) => Err(anyhow!("speaker unplugged")),
                _ => Ok(()),
            }
        }
    }

    struct StalledModel;

    #[async_trait]
    impl TextModel for StalledModel {
        async fn complete(&self, _prompt: &str, _params: &GenerationParams) -> Result<String> {
            std::future::pending().await
        }
    }

    fn session(model: Arc<dyn TextModel>, transcript: &Transcript) -> TutorSession {
        TutorSession::new(
            Responder::new(model),
            Speaker::new(Box::new(transcript.clone())),
        )
    }

    fn echo_model(answer: &'static str) -> MockTextModel {
        let mut model = MockTextModel::new();
        model
            .expect_complete()
            .returning(move |prompt, _| Ok(format!("{prompt} {answer}")));
        model
    }

    #[test]
    fn test_exit_words_are_recognised() {
        for line in ["exit", "EXIT", "  quit  ", "Bye", "bye\n"] {
            assert_eq!(classify(line), Input::Exit, "line: {line:?}");
        }
    }

    #[test]
    fn test_near_exit_words_are_questions() {
        assert_eq!(classify("exiting"), Input::Question("exiting"));
        assert_eq!(classify("quit smoking"), Input::Question("quit smoking"));
    }

    #[test]
    fn test_blank_lines_are_empty() {
        assert_eq!(classify(""), Input::Empty);
        assert_eq!(classify("   \t "), Input::Empty);
    }

    #[test]
    fn test_questions_are_trimmed() {
        assert_eq!(
            classify("  what is science?  "),
            Input::Question("what is science?")
        );
    }

    #[tokio::test]
    async fn test_process_line_empty_does_not_call_generator() {
        let mut model = MockTextModel::new();
        model.expect_complete().never();
        let transcript = Transcript::default();
        let session = session(Arc::new(model), &transcript);

        assert_eq!(session.process_line("   ").await, None);
        assert_eq!(session.state(), SessionState::Running);
    }

    #[tokio::test]
    async fn test_process_line_exit_completes_session() {
        let mut model = MockTextModel::new();
        model.expect_complete().never();
        let transcript = Transcript::default();
        let session = session(Arc::new(model), &transcript);

        assert_eq!(
            session.process_line("  Quit ").await,
            Some(Command::SessionComplete(FAREWELL.to_string()))
        );
    }

    #[tokio::test]
    async fn test_run_greets_answers_and_says_goodbye() {
        let transcript = Transcript::default();
        let mut session = session(
            Arc::new(echo_model("Plants turn light into sugar.")),
            &transcript,
        );

        let input: &[u8] = b"what is photosynthesis\n\nbye\nnever read\n";
        session
            .run(input, std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(
            transcript.lines(),
            vec![
                GREETING.to_string(),
                "Plants turn light into sugar.".to_string(),
                FAREWELL.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_end_of_input_ends_session() {
        let transcript = Transcript::default();
        let mut session = session(Arc::new(MockTextModel::new()), &transcript);

        let input: &[u8] = b"";
        session
            .run(input, std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(transcript.lines(), vec![GREETING, FAREWELL]);
    }

    #[tokio::test]
    async fn test_generation_failure_does_not_end_session() {
        let mut model = MockTextModel::new();
        model
            .expect_complete()
            .withf(|prompt, _| prompt.contains("broken"))
            .times(1)
            .returning(|_, _| Err(anyhow!("tokenizer exploded")));
        model
            .expect_complete()
            .withf(|prompt, _| prompt.contains("history"))
            .times(1)
            .returning(|prompt, _| Ok(format!("{prompt} It is about the past.")));

        let transcript = Transcript::default();
        let mut session = session(Arc::new(model), &transcript);

        let input: &[u8] = b"broken question\nwhat is history\nexit\n";
        session
            .run(input, std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(
            transcript.lines(),
            vec![
                GREETING.to_string(),
                "Sorry, I encountered an error: tokenizer exploded".to_string(),
                "It is about the past.".to_string(),
                FAREWELL.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_degraded_generator_falls_back() {
        let transcript = Transcript::default();
        let mut session = session(Arc::new(echo_model("")), &transcript);

        let input: &[u8] = b"what is addition\nexit\n";
        session
            .run(input, std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(
            transcript.lines()[1],
            format!("Let me explain that in detail. {}", fallback::ADDITION)
        );
    }

    #[tokio::test]
    async fn test_speech_failure_is_reported_and_loop_continues() {
        let transcript = Transcript {
            fail_on: Some("unlucky"),
            ..Default::default()
        };
        let mut model = MockTextModel::new();
        model
            .expect_complete()
            .returning(|prompt, _| Ok(format!("{prompt} an unlucky answer here")));

        let mut session = session(Arc::new(model), &transcript);
        let input: &[u8] = b"first\nquit\n";
        session
            .run(input, std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(
            transcript.lines(),
            vec![
                GREETING.to_string(),
                "an unlucky answer here".to_string(),
                "Sorry, I encountered an error: speaker unplugged".to_string(),
                FAREWELL.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_greeting_failure_is_fatal() {
        let transcript = Transcript {
            fail_on: Some("teaching assistant"),
            ..Default::default()
        };
        let mut session = session(Arc::new(MockTextModel::new()), &transcript);

        let input: &[u8] = b"what is science\n";
        let result = session.run(input, std::future::pending::<()>()).await;
        assert!(result.is_err());
        assert_eq!(transcript.lines(), vec![GREETING]);
    }

    #[tokio::test]
    async fn test_interrupt_during_generation_says_goodbye() {
        let transcript = Transcript::default();
        let mut session = session(Arc::new(StalledModel), &transcript);

        let input: &[u8] = b"a question that never finishes\n";
        session
            .run(input, tokio::time::sleep(Duration::from_millis(20)))
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(transcript.lines(), vec![GREETING, FAREWELL]);
    }

    #[tokio::test]
    async fn test_interrupt_during_farewell_does_not_repeat_it() {
        let transcript = Transcript {
            slow_on: Some("Goodbye"),
            ..Default::default()
        };
        let mut session = session(Arc::new(MockTextModel::new()), &transcript);

        let input: &[u8] = b"exit\n";
        session
            .run(input, tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(transcript.lines(), vec![GREETING, FAREWELL]);
    }
}
