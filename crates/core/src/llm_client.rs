use anyhow::Result;
use async_trait::async_trait;

/// Decoding parameters handed to a [`TextModel`].
///
/// Field semantics follow the usual causal-LM `generate` conventions:
/// `max_length` bounds the whole sequence (prompt plus completion), and the
/// end-of-sequence token doubles as the padding token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Prompt tokens beyond this count are dropped before generation.
    pub max_input_tokens: usize,
    /// Upper bound on the total sequence length in tokens.
    pub max_length: usize,
    pub num_return_sequences: usize,
    /// Forbid any n-gram of this size from appearing twice (0 disables).
    pub no_repeat_ngram_size: usize,
    /// Sample from the distribution instead of taking the argmax.
    pub do_sample: bool,
    pub top_k: usize,
    pub top_p: f32,
    pub temperature: f32,
    /// Stop as soon as the end-of-sequence token is produced.
    pub early_stopping: bool,
}

impl GenerationParams {
    /// The fixed configuration used for every answer.
    pub const DETAILED_ANSWER: Self = Self {
        max_input_tokens: 1000,
        max_length: 500,
        num_return_sequences: 1,
        no_repeat_ngram_size: 3,
        do_sample: true,
        top_k: 50,
        top_p: 0.95,
        temperature: 0.7,
        early_stopping: true,
    };
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::DETAILED_ANSWER
    }
}

/// A pretrained causal language model together with its tokenizer.
///
/// Implementations encode `prompt`, run generation under `params` and return
/// the decoded sequence with special tokens removed. The returned text
/// normally starts with the prompt itself; stripping that echo is the
/// caller's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}
