//! No-repeat-n-gram constraint.
//!
//! With `n = 3`, once the sequence contains `a b c`, the token `c` is banned
//! whenever the last two tokens are `a b` again.

use std::collections::HashSet;

/// Tokens that would complete an n-gram already present in `tokens`.
pub fn banned_tokens(tokens: &[u32], n: usize) -> HashSet<u32> {
    if n == 0 || tokens.len() + 1 < n {
        return HashSet::new();
    }

    let prefix = &tokens[tokens.len() + 1 - n..];
    tokens
        .windows(n)
        .filter(|window| &window[..n - 1] == prefix)
        .map(|window| window[n - 1])
        .collect()
}

/// Sets the logits of banned tokens to `-inf`.
pub fn apply(logits: &mut [f32], tokens: &[u32], n: usize) {
    for token in banned_tokens(tokens, n) {
        if let Some(logit) = logits.get_mut(token as usize) {
            *logit = f32::NEG_INFINITY;
        }
    }
}
