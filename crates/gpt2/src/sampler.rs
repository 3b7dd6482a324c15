//! Token sampling strategies.
//!
//! ```text
//! Logits [vocab_size]
//!     │
//!     ▼ Temperature scaling
//! Logits / temperature
//!     │
//!     ▼ Top-k filtering (optional)
//! Keep top k tokens
//!     │
//!     ▼ Softmax
//! Probabilities
//!     │
//!     ▼ Top-p filtering (optional)
//! Smallest prefix with cumulative prob > p
//!     │
//!     ▼ Renormalize + Sample
//! Selected token
//! ```
//!
//! Logits of `-inf` (tokens banned by an earlier constraint) never win.

use candle_core::Tensor;
use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};

use crate::config::SamplingConfig;
use crate::error::{Error, Result};

/// Token sampler with configurable sampling strategies.
#[derive(Debug, Clone)]
pub struct Sampler {
    temperature: f32,
    /// Top-k value (0 = disabled).
    top_k: usize,
    /// Top-p value (1.0 = disabled).
    top_p: f32,
    rng: rand::rngs::StdRng,
}

impl Sampler {
    pub fn new(config: &SamplingConfig) -> Self {
        Self::with_rng(config, rand::rngs::StdRng::from_entropy())
    }

    /// Creates a sampler with a fixed seed for reproducible output.
    pub fn with_seed(config: &SamplingConfig, seed: u64) -> Self {
        Self::with_rng(config, rand::rngs::StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &SamplingConfig, rng: rand::rngs::StdRng) -> Self {
        Self {
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
            rng,
        }
    }

    /// Replaces the sampling parameters, keeping the random state.
    pub fn configure(&mut self, config: &SamplingConfig) {
        self.temperature = config.temperature;
        self.top_k = config.top_k;
        self.top_p = config.top_p;
    }

    /// Samples a token from 1D logits `[vocab_size]`.
    pub fn sample(&mut self, logits: &Tensor) -> Result<u32> {
        let logits: Vec<f32> = logits.to_vec1()?;
        self.sample_from_logits(&logits)
    }

    /// Samples a token from raw logits.
    pub fn sample_from_logits(&mut self, logits: &[f32]) -> Result<u32> {
        if logits.iter().all(|l| *l == f32::NEG_INFINITY) {
            return Err(Error::Sampling("every token is masked".into()));
        }

        if self.temperature <= 0.0 {
            return Ok(argmax(logits));
        }

        // (token, logit) pairs, best first.
        let mut candidates: Vec<(u32, f32)> = logits
            .iter()
            .enumerate()
            .map(|(i, &l)| (i as u32, l / self.temperature))
            .collect();
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        if self.top_k > 0 && self.top_k < candidates.len() {
            candidates.truncate(self.top_k);
        }

        let mut probs = softmax(&candidates);

        if self.top_p > 0.0 && self.top_p < 1.0 {
            let mut cumulative = 0.0f32;
            let mut cutoff = probs.len();
            for (i, p) in probs.iter().enumerate() {
                cumulative += p;
                if cumulative > self.top_p {
                    cutoff = i + 1;
                    break;
                }
            }
            candidates.truncate(cutoff);
            probs.truncate(cutoff);
        }

        let dist = WeightedIndex::new(&probs)
            .map_err(|e| Error::Sampling(format!("failed to create distribution: {e}")))?;
        Ok(candidates[dist.sample(&mut self.rng)].0)
    }
}

/// Index of the largest logit (first one on ties).
pub fn argmax(logits: &[f32]) -> u32 {
    let mut best = 0;
    for (i, &l) in logits.iter().enumerate() {
        if l > logits[best] {
            best = i;
        }
    }
    best as u32
}

/// Softmax over candidate logits sorted best first.
fn softmax(candidates: &[(u32, f32)]) -> Vec<f32> {
    let max = candidates[0].1;
    let exps: Vec<f32> = candidates.iter().map(|(_, l)| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
