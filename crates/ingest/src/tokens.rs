//! Token counting with the `o200k_base` encoding.

use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;
use tracing::warn;

static ENCODER: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn encoder() -> Option<&'static CoreBPE> {
    ENCODER
        .get_or_init(|| match tiktoken_rs::o200k_base() {
            Ok(bpe) => Some(bpe),
            Err(e) => {
                warn!("o200k_base unavailable, estimating tokens from length: {e}");
                None
            }
        })
        .as_ref()
}

/// Number of tokens in `text`, or an estimate of one per four chars when
/// the encoder cannot be loaded.
pub fn count_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    match encoder() {
        Some(bpe) => bpe.encode_ordinary(text).len(),
        None => approximate_tokens(text),
    }
}

pub fn approximate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(count_tokens(""), 0);
    }

    #[test]
    fn counts_words() {
        let n = count_tokens("Hello world");
        assert!((1..=4).contains(&n), "got {n}");
    }

    #[test]
    fn approximation_rounds_up() {
        assert_eq!(approximate_tokens("abcde"), 2);
        assert_eq!(approximate_tokens("abcd"), 1);
    }
}
