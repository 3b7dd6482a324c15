//! Model loading utilities.
//!
//! Model files come either from a local directory or from the Hugging Face
//! Hub cache (downloading on first use).

use std::path::{Path, PathBuf};

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use hf_hub::{Repo, RepoType, api::sync::Api};
use tracing::info;

use crate::config::Gpt2Config;
use crate::error::{Error, Result};

const CONFIG_FILE: &str = "config.json";
const WEIGHTS_FILE: &str = "model.safetensors";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// Paths to the files needed to run a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub weights: PathBuf,
    pub tokenizer: PathBuf,
}

impl ModelFiles {
    /// Uses files from a local directory, failing if any is missing.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let file = |name: &str| {
            let path = dir.join(name);
            if path.is_file() {
                Ok(path)
            } else {
                Err(Error::ModelLoad(format!(
                    "{name} not found in {}",
                    dir.display()
                )))
            }
        };

        Ok(Self {
            config: file(CONFIG_FILE)?,
            weights: file(WEIGHTS_FILE)?,
            tokenizer: file(TOKENIZER_FILE)?,
        })
    }

    /// Fetches files from the Hugging Face Hub (or its local cache).
    ///
    /// # Arguments
    ///
    /// * `model_id` - Hub model ID (e.g., "gpt2")
    /// * `revision` - Git revision (branch, tag, or commit hash)
    pub fn download(model_id: &str, revision: &str) -> Result<Self> {
        let api =
            Api::new().map_err(|e| Error::ModelLoad(format!("Failed to create HF API: {e}")))?;
        let repo = api.repo(Repo::with_revision(
            model_id.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));
        info!(model_id, revision, "Resolving model files from the Hub");

        let get = |name: &str| {
            repo.get(name)
                .map_err(|e| Error::ModelLoad(format!("Failed to download {name}: {e}")))
        };

        Ok(Self {
            config: get(CONFIG_FILE)?,
            weights: get(WEIGHTS_FILE)?,
            tokenizer: get(TOKENIZER_FILE)?,
        })
    }
}

/// Reads and parses `config.json`.
pub fn load_config(path: &Path) -> Result<Gpt2Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::ModelLoad(format!("Failed to read {}: {e}", path.display())))?;
    let config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Creates a VarBuilder over SafeTensors weights.
///
/// # Safety
///
/// The file is memory-mapped; it must not be modified while the model is
/// alive.
#[allow(unsafe_code)]
pub fn load_safetensors(path: &Path, dtype: DType, device: &Device) -> Result<VarBuilder<'static>> {
    let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[path], dtype, device)? };
    Ok(vb)
}
