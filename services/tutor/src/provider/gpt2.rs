//! Runs the local GPT-2 generator behind the `TextModel` trait.

use crate::config::ModelSource;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tutor_core::llm_client::{GenerationParams, TextModel};
use tutor_gpt2::candle_core::Device;
use tutor_gpt2::loader::ModelFiles;
use tutor_gpt2::{GenerationConfig, Gpt2Generator, SamplingConfig};

/// A GPT-2 model loaded into memory.
///
/// Generation is CPU bound, so each call runs on the blocking pool; the
/// mutex serialises calls over the model's KV cache and sampler.
pub struct LocalGpt2 {
    generator: Arc<Mutex<Gpt2Generator>>,
}

impl LocalGpt2 {
    /// Resolves model files and loads them on the CPU.
    pub fn load(source: &ModelSource, seed: Option<u64>) -> Result<Self> {
        let files = match source {
            ModelSource::Local(dir) => {
                info!(dir = %dir.display(), "Loading model from local directory");
                ModelFiles::from_dir(dir)?
            }
            ModelSource::Hub { model_id, revision } => ModelFiles::download(model_id, revision)?,
        };
        let generator = Gpt2Generator::load(&files, &Device::Cpu, seed)?;
        Ok(Self {
            generator: Arc::new(Mutex::new(generator)),
        })
    }
}

/// Translates the core decoding parameters into the generator's settings.
pub fn generation_config(params: &GenerationParams) -> GenerationConfig {
    if params.num_return_sequences != 1 {
        warn!(
            requested = params.num_return_sequences,
            "Only a single sequence is generated per call"
        );
    }
    GenerationConfig {
        max_input_tokens: params.max_input_tokens,
        max_length: params.max_length,
        no_repeat_ngram_size: params.no_repeat_ngram_size,
        do_sample: params.do_sample,
        sampling: SamplingConfig {
            temperature: params.temperature,
            top_k: params.top_k,
            top_p: params.top_p,
        },
        stop_at_eos: params.early_stopping,
    }
}

#[async_trait]
impl TextModel for LocalGpt2 {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let config = generation_config(params);
        let generator = Arc::clone(&self.generator);
        let prompt = prompt.to_string();

        tokio::task::spawn_blocking(move || -> Result<String> {
            let mut generator = generator
                .lock()
                .map_err(|_| anyhow!("language model is unavailable after an earlier crash"))?;
            Ok(generator.complete(&prompt, &config)?)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_config_mirrors_detailed_answer() {
        let config = generation_config(&GenerationParams::DETAILED_ANSWER);
        assert_eq!(config.max_input_tokens, 1000);
        assert_eq!(config.max_length, 500);
        assert_eq!(config.no_repeat_ngram_size, 3);
        assert!(config.do_sample);
        assert_eq!(config.sampling.top_k, 50);
        assert_eq!(config.sampling.top_p, 0.95);
        assert_eq!(config.sampling.temperature, 0.7);
        assert!(config.stop_at_eos);
    }

    #[test]
    fn test_missing_local_model_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let result = LocalGpt2::load(&ModelSource::Local(dir.path().to_path_buf()), None);
        let err = result.err().expect("loading an empty directory must fail");
        assert!(err.to_string().contains("config.json not found"));
    }
}
