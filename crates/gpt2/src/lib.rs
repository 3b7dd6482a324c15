//! A small GPT-2 text generator built on candle.
//!
//! - [`config`]: model hyper-parameters and generation settings
//! - [`loader`]: locating weights, tokenizer and config (local dir or Hub)
//! - [`model`]: the GPT-2 transformer with a per-layer KV cache
//! - [`sampler`]: temperature / top-k / top-p / greedy token selection
//! - [`ngram`]: the no-repeat-n-gram constraint
//! - [`generator`]: the autoregressive loop tying it all together

pub mod config;
pub mod error;
pub mod generator;
pub mod loader;
pub mod model;
pub mod ngram;
pub mod sampler;

pub use candle_core;

pub use config::{GenerationConfig, Gpt2Config, SamplingConfig};
pub use error::{Error, Result};
pub use generator::Gpt2Generator;
pub use model::Gpt2Model;
pub use sampler::Sampler;
