//! Configuration types for the GPT-2 generator.

use serde::{Deserialize, Serialize};

/// GPT-2 hyper-parameters as found in a Hugging Face `config.json`.
///
/// Missing fields default to the 124M "gpt2" checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gpt2Config {
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,
    /// Maximum sequence length (size of the position embedding table).
    #[serde(default = "default_n_positions")]
    pub n_positions: usize,
    /// Hidden dimension.
    #[serde(default = "default_n_embd")]
    pub n_embd: usize,
    #[serde(default = "default_n_layer")]
    pub n_layer: usize,
    #[serde(default = "default_n_head")]
    pub n_head: usize,
    #[serde(default = "default_layer_norm_epsilon")]
    pub layer_norm_epsilon: f64,
    #[serde(default = "default_special_token_id")]
    pub bos_token_id: u32,
    /// End-of-sequence token; also used for padding.
    #[serde(default = "default_special_token_id")]
    pub eos_token_id: u32,
}

fn default_vocab_size() -> usize {
    50257
}

fn default_n_positions() -> usize {
    1024
}

fn default_n_embd() -> usize {
    768
}

fn default_n_layer() -> usize {
    12
}

fn default_n_head() -> usize {
    12
}

fn default_layer_norm_epsilon() -> f64 {
    1e-5
}

fn default_special_token_id() -> u32 {
    50256
}

impl Default for Gpt2Config {
    fn default() -> Self {
        Self {
            vocab_size: default_vocab_size(),
            n_positions: default_n_positions(),
            n_embd: default_n_embd(),
            n_layer: default_n_layer(),
            n_head: default_n_head(),
            layer_norm_epsilon: default_layer_norm_epsilon(),
            bos_token_id: default_special_token_id(),
            eos_token_id: default_special_token_id(),
        }
    }
}

impl Gpt2Config {
    /// Dimension of a single attention head.
    pub fn head_dim(&self) -> usize {
        self.n_embd / self.n_head
    }
}

/// Sampling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Temperature for sampling (1.0 = no change, 0.0 = greedy).
    pub temperature: f32,
    /// Top-k sampling (0 = disabled).
    pub top_k: usize,
    /// Top-p (nucleus) sampling (1.0 = disabled).
    pub top_p: f32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_k: 0,
            top_p: 1.0,
        }
    }
}

/// Settings for one call to [`crate::Gpt2Generator::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Prompt tokens beyond this count are dropped (leading tokens are kept).
    pub max_input_tokens: usize,
    /// Upper bound on prompt plus generated tokens. At least one token is
    /// generated even when the prompt already reaches it.
    pub max_length: usize,
    /// Size of n-grams that may not repeat (0 disables the constraint).
    pub no_repeat_ngram_size: usize,
    /// Sample from the distribution; when false, decode greedily.
    pub do_sample: bool,
    pub sampling: SamplingConfig,
    /// Stop as soon as the end-of-sequence token is produced.
    pub stop_at_eos: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_input_tokens: 1024,
            max_length: 256,
            no_repeat_ngram_size: 0,
            do_sample: true,
            sampling: SamplingConfig::default(),
            stop_at_eos: true,
        }
    }
}
