//! Integration tests for the no-repeat-n-gram constraint.

use std::collections::HashSet;

use tutor_gpt2::ngram::{apply, banned_tokens};

#[test]
fn test_nothing_banned_for_short_sequences() {
    assert!(banned_tokens(&[], 3).is_empty());
    assert!(banned_tokens(&[1], 3).is_empty());
    assert!(banned_tokens(&[1, 2], 3).is_empty());
}

#[test]
fn test_repeated_prefix_bans_continuation() {
    // "1 2 3 ... 1 2" -> 3 would repeat the trigram "1 2 3".
    let tokens = [1, 2, 3, 4, 1, 2];
    assert_eq!(banned_tokens(&tokens, 3), HashSet::from([3]));
}

#[test]
fn test_every_earlier_continuation_is_banned() {
    let tokens = [7, 8, 1, 7, 8, 2, 7, 8];
    assert_eq!(banned_tokens(&tokens, 3), HashSet::from([1, 2]));
}

#[test]
fn test_unseen_prefix_bans_nothing() {
    let tokens = [1, 2, 3, 4, 5];
    assert!(banned_tokens(&tokens, 3).is_empty());
}

#[test]
fn test_zero_disables_constraint() {
    assert!(banned_tokens(&[1, 1, 1, 1], 0).is_empty());
}

#[test]
fn test_apply_masks_logits() {
    let mut logits = vec![0.5; 6];
    apply(&mut logits, &[1, 2, 3, 1, 2], 3);
    assert_eq!(logits[3], f32::NEG_INFINITY);
    assert_eq!(logits.iter().filter(|l| l.is_finite()).count(), 5);
}
