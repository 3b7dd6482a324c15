//! Autoregressive text generation.

use candle_core::{DType, Device, IndexOp, Tensor};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::config::{GenerationConfig, Gpt2Config, SamplingConfig};
use crate::error::{Error, Result};
use crate::loader::{self, ModelFiles};
use crate::model::Gpt2Model;
use crate::ngram;
use crate::sampler::{Sampler, argmax};

/// Runs the decoding loop over token ids.
///
/// Returns the full sequence: the prompt followed by the generated tokens.
/// Generation stops at `eos_token_id` (when `stop_at_eos` is set), when the
/// sequence reaches `max_length`, or when the position table is exhausted.
pub fn generate_tokens(
    model: &mut Gpt2Model,
    sampler: &mut Sampler,
    prompt: &[u32],
    config: &GenerationConfig,
    eos_token_id: u32,
    device: &Device,
) -> Result<Vec<u32>> {
    if prompt.is_empty() {
        return Err(Error::Tokenization("prompt encoded to zero tokens".into()));
    }

    let max_length = config.max_length.min(model.n_positions());
    let mut tokens = prompt.to_vec();
    let mut input = prompt.to_vec();
    let mut position = 0;

    model.clear_kv_cache();
    loop {
        let input_ids = Tensor::new(input.as_slice(), device)?.unsqueeze(0)?;
        let logits = model.forward(&input_ids, position)?.i(0)?.to_dtype(DType::F32)?;
        position += input.len();

        let mut logits: Vec<f32> = logits.to_vec1()?;
        ngram::apply(&mut logits, &tokens, config.no_repeat_ngram_size);
        let next = if config.do_sample {
            sampler.sample_from_logits(&logits)?
        } else {
            argmax(&logits)
        };
        tokens.push(next);

        if config.stop_at_eos && next == eos_token_id {
            debug!(generated = tokens.len() - prompt.len(), "End of sequence");
            break;
        }
        if tokens.len() >= max_length || tokens.len() >= model.n_positions() {
            debug!(generated = tokens.len() - prompt.len(), "Length limit reached");
            break;
        }
        input = vec![next];
    }

    Ok(tokens)
}

/// A loaded GPT-2 model with its tokenizer and sampler.
pub struct Gpt2Generator {
    model: Gpt2Model,
    tokenizer: Tokenizer,
    sampler: Sampler,
    eos_token_id: u32,
    device: Device,
}

impl Gpt2Generator {
    /// Loads config, weights and tokenizer onto `device`.
    ///
    /// A `seed` makes sampling reproducible across runs.
    pub fn load(files: &ModelFiles, device: &Device, seed: Option<u64>) -> Result<Self> {
        let config: Gpt2Config = loader::load_config(&files.config)?;
        let vb = loader::load_safetensors(&files.weights, DType::F32, device)?;
        let model = Gpt2Model::new(&config, vb)?;
        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| Error::ModelLoad(format!("Failed to load tokenizer: {e}")))?;

        let sampling = SamplingConfig::default();
        let sampler = match seed {
            Some(seed) => Sampler::with_seed(&sampling, seed),
            None => Sampler::new(&sampling),
        };
        info!(
            n_layer = config.n_layer,
            n_embd = config.n_embd,
            vocab_size = config.vocab_size,
            "GPT-2 model loaded"
        );

        Ok(Self {
            model,
            tokenizer,
            sampler,
            eos_token_id: config.eos_token_id,
            device: device.clone(),
        })
    }

    /// Encodes `prompt`, generates a continuation and decodes the whole
    /// sequence (prompt included) with special tokens skipped.
    pub fn complete(&mut self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let encoding = self
            .tokenizer
            .encode(prompt, false)
            .map_err(|e| Error::Tokenization(e.to_string()))?;
        let mut prompt_ids = encoding.get_ids().to_vec();
        prompt_ids.truncate(config.max_input_tokens);
        debug!(prompt_tokens = prompt_ids.len(), "Prompt encoded");

        self.sampler.configure(&config.sampling);
        let tokens = generate_tokens(
            &mut self.model,
            &mut self.sampler,
            &prompt_ids,
            config,
            self.eos_token_id,
            &self.device,
        )?;

        self.tokenizer
            .decode(&tokens, true)
            .map_err(|e| Error::Tokenization(e.to_string()))
    }
}
