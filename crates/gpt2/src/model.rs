//! GPT-2 transformer.
//!
//! Weight names follow the Hugging Face checkpoint layout (`wte`, `wpe`,
//! `h.{i}.attn.c_attn`, ...). The projection layers are stored transposed
//! relative to `candle_nn::Linear` (`[in, out]`), hence [`Conv1D`].
//!
//! ```text
//! tokens ─► wte + wpe ─► [ln_1 ─► attn ─► + ─► ln_2 ─► mlp ─► +] × n_layer ─► ln_f ─► wteᵀ ─► logits
//! ```

use candle_core::{D, Device, Module, Tensor};
use candle_nn::{Embedding, LayerNorm, VarBuilder, embedding, init::Init, layer_norm};

use crate::config::Gpt2Config;
use crate::error::Result;

/// Affine projection with `[in, out]` weights.
#[derive(Debug, Clone)]
struct Conv1D {
    weight: Tensor,
    bias: Tensor,
}

impl Conv1D {
    fn new(in_features: usize, out_features: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        let weight = vb.get_with_hints(
            (in_features, out_features),
            "weight",
            Init::Randn {
                mean: 0.0,
                stdev: 0.02,
            },
        )?;
        let bias = vb.get_with_hints(out_features, "bias", Init::Const(0.0))?;
        Ok(Self { weight, bias })
    }
}

impl Module for Conv1D {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        xs.broadcast_matmul(&self.weight)?.broadcast_add(&self.bias)
    }
}

/// Causal self-attention with a KV cache.
#[derive(Debug, Clone)]
struct Attention {
    c_attn: Conv1D,
    c_proj: Conv1D,
    n_head: usize,
    head_dim: usize,
    scale: f64,
    /// Cached keys and values `[batch, n_head, past_len, head_dim]`.
    kv_cache: Option<(Tensor, Tensor)>,
}

impl Attention {
    fn new(config: &Gpt2Config, vb: VarBuilder) -> candle_core::Result<Self> {
        let n_embd = config.n_embd;
        let head_dim = config.head_dim();
        Ok(Self {
            c_attn: Conv1D::new(n_embd, 3 * n_embd, vb.pp("c_attn"))?,
            c_proj: Conv1D::new(n_embd, n_embd, vb.pp("c_proj"))?,
            n_head: config.n_head,
            head_dim,
            scale: 1.0 / (head_dim as f64).sqrt(),
            kv_cache: None,
        })
    }

    /// Slices one of q/k/v out of the fused projection and splits heads.
    fn split_heads(&self, qkv: &Tensor, index: usize) -> candle_core::Result<Tensor> {
        let (batch, seq_len, _) = qkv.dims3()?;
        let n_embd = self.n_head * self.head_dim;
        qkv.narrow(D::Minus1, index * n_embd, n_embd)?
            .reshape((batch, seq_len, self.n_head, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(&mut self, xs: &Tensor, mask: Option<&Tensor>) -> candle_core::Result<Tensor> {
        let (batch, seq_len, n_embd) = xs.dims3()?;
        let qkv = self.c_attn.forward(xs)?;
        let q = self.split_heads(&qkv, 0)?;
        let k = self.split_heads(&qkv, 1)?;
        let v = self.split_heads(&qkv, 2)?;

        let (k, v) = match &self.kv_cache {
            Some((past_k, past_v)) => (
                Tensor::cat(&[past_k, &k], 2)?,
                Tensor::cat(&[past_v, &v], 2)?,
            ),
            None => (k, v),
        };
        self.kv_cache = Some((k.clone(), v.clone()));

        let scores = (q.matmul(&k.t()?.contiguous()?)? * self.scale)?;
        let scores = match mask {
            Some(mask) => scores.broadcast_add(mask)?,
            None => scores,
        };
        let weights = candle_nn::ops::softmax_last_dim(&scores)?;

        let out = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((batch, seq_len, n_embd))?;
        self.c_proj.forward(&out)
    }
}

#[derive(Debug, Clone)]
struct Mlp {
    c_fc: Conv1D,
    c_proj: Conv1D,
}

impl Mlp {
    fn new(config: &Gpt2Config, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            c_fc: Conv1D::new(config.n_embd, 4 * config.n_embd, vb.pp("c_fc"))?,
            c_proj: Conv1D::new(4 * config.n_embd, config.n_embd, vb.pp("c_proj"))?,
        })
    }
}

impl Module for Mlp {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        // GPT-2 uses the tanh approximation of GELU.
        self.c_proj.forward(&self.c_fc.forward(xs)?.gelu()?)
    }
}

#[derive(Debug, Clone)]
struct Block {
    ln_1: LayerNorm,
    attn: Attention,
    ln_2: LayerNorm,
    mlp: Mlp,
}

impl Block {
    fn new(config: &Gpt2Config, vb: VarBuilder) -> candle_core::Result<Self> {
        let eps = config.layer_norm_epsilon;
        Ok(Self {
            ln_1: layer_norm(config.n_embd, eps, vb.pp("ln_1"))?,
            attn: Attention::new(config, vb.pp("attn"))?,
            ln_2: layer_norm(config.n_embd, eps, vb.pp("ln_2"))?,
            mlp: Mlp::new(config, vb.pp("mlp"))?,
        })
    }

    fn forward(&mut self, xs: &Tensor, mask: Option<&Tensor>) -> candle_core::Result<Tensor> {
        let residual = xs;
        let xs = (self.attn.forward(&self.ln_1.forward(xs)?, mask)? + residual)?;
        let residual = &xs;
        self.mlp.forward(&self.ln_2.forward(&xs)?)? + residual
    }
}

/// GPT-2 language model with tied input/output embeddings.
#[derive(Debug, Clone)]
pub struct Gpt2Model {
    wte: Embedding,
    wpe: Embedding,
    blocks: Vec<Block>,
    ln_f: LayerNorm,
    n_positions: usize,
}

impl Gpt2Model {
    /// Builds the model from a VarBuilder.
    ///
    /// Accepts checkpoints with or without the `transformer.` prefix.
    pub fn new(config: &Gpt2Config, vb: VarBuilder) -> Result<Self> {
        let vb = if vb.contains_tensor("transformer.wte.weight") {
            vb.pp("transformer")
        } else {
            vb
        };

        let wte = embedding(config.vocab_size, config.n_embd, vb.pp("wte"))?;
        let wpe = embedding(config.n_positions, config.n_embd, vb.pp("wpe"))?;
        let blocks = (0..config.n_layer)
            .map(|i| Block::new(config, vb.pp(format!("h.{i}"))))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let ln_f = layer_norm(config.n_embd, config.layer_norm_epsilon, vb.pp("ln_f"))?;

        Ok(Self {
            wte,
            wpe,
            blocks,
            ln_f,
            n_positions: config.n_positions,
        })
    }

    /// Maximum sequence length the position table supports.
    pub fn n_positions(&self) -> usize {
        self.n_positions
    }

    /// Runs the model over `input_ids` `[batch, seq_len]`, which start at
    /// position `start_pos` (the number of tokens already in the cache).
    ///
    /// Returns logits for the last position, `[batch, vocab_size]`.
    pub fn forward(&mut self, input_ids: &Tensor, start_pos: usize) -> Result<Tensor> {
        let (_batch, seq_len) = input_ids.dims2()?;
        let device = input_ids.device();

        let positions =
            Tensor::arange(start_pos as u32, (start_pos + seq_len) as u32, device)?.unsqueeze(0)?;
        let mut hidden = self
            .wte
            .forward(input_ids)?
            .broadcast_add(&self.wpe.forward(&positions)?)?;

        let mask = if seq_len > 1 {
            Some(causal_mask(seq_len, start_pos, device)?)
        } else {
            None
        };
        for block in self.blocks.iter_mut() {
            hidden = block.forward(&hidden, mask.as_ref())?;
        }

        let hidden = self.ln_f.forward(&hidden)?;
        let last = hidden.narrow(1, seq_len - 1, 1)?.squeeze(1)?;
        let logits = last.matmul(&self.wte.embeddings().t()?)?;
        Ok(logits)
    }

    /// Drops cached keys and values so the next call starts a new sequence.
    pub fn clear_kv_cache(&mut self) {
        for block in self.blocks.iter_mut() {
            block.attn.kv_cache = None;
        }
    }
}

/// Additive mask `[seq_len, past_len + seq_len]` hiding future positions.
fn causal_mask(seq_len: usize, past_len: usize, device: &Device) -> candle_core::Result<Tensor> {
    let total = past_len + seq_len;
    let mask: Vec<f32> = (0..seq_len)
        .flat_map(|i| {
            (0..total).map(move |j| {
                if j > past_len + i {
                    f32::NEG_INFINITY
                } else {
                    0.0
                }
            })
        })
        .collect();
    Tensor::from_vec(mask, (seq_len, total), device)
}
