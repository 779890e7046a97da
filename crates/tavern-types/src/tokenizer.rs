//! Pluggable token counting for messages.
//!
//! Token counts drive the sliding-window memory budget. They are an
//! approximation (words and punctuation), not an exact model-tokenizer
//! count, and callers can swap in their own counter.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Words (with an optional contraction tail), ellipses, or single
/// punctuation characters.
static WORD_PUNCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+(?:'\w+)?|\.\.\.|[^\w\s]").expect("word/punctuation regex is valid")
});

/// Counts tokens in a piece of text.
///
/// Implemented for every `Fn(&str) -> usize`, so a plain function or closure
/// can be injected wherever a tokenizer is expected.
pub trait Tokenizer: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count(&self, text: &str) -> usize {
        self(text)
    }
}

/// Default tokenizer: splits on words and punctuation.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn count(&self, text: &str) -> usize {
        WORD_PUNCT.find_iter(text).count()
    }
}

impl fmt::Display for WordTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "word-punct")
    }
}

/// Split text into word and punctuation tokens.
///
/// This is the splitter behind [`WordTokenizer`].
pub fn tokenize(text: &str) -> Vec<&str> {
    WORD_PUNCT.find_iter(text).map(|m| m.as_str()).collect()
}

/// Whitespace word count. Handy when a caller wants predictable counts.
pub fn whitespace_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_tokenizer_counts_punctuation() {
        assert_eq!(WordTokenizer.count("Hello, world!"), 4);
        assert_eq!(WordTokenizer.count(""), 0);
    }

    #[test]
    fn test_contractions_and_ellipsis_stay_whole() {
        assert_eq!(tokenize("don't stop..."), vec!["don't", "stop", "..."]);
    }

    #[test]
    fn test_closure_is_a_tokenizer() {
        let chars = |text: &str| text.chars().count();
        assert_eq!(chars.count("abc"), 3);
        assert_eq!(whitespace_count.count("a b  c"), 3);
    }
}
