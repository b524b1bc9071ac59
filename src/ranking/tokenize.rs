// Query/chunk tokenization for the relevance scorer
use std::collections::HashSet;

use once_cell::sync::Lazy;

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "had", "has",
        "have", "he", "her", "his", "if", "in", "into", "is", "it", "its", "of", "on", "or",
        "she", "that", "the", "their", "them", "then", "there", "these", "they", "this", "to",
        "was", "we", "were", "which", "will", "with", "you", "your",
    ]
    .into_iter()
    .collect()
});

/// Case-insensitive alphanumeric tokenization with stopword removal.
/// Deterministic: the same text always yields the same token sequence.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Tokens of a configured keyword or phrase; stopwords are kept so phrases
/// like "day of" still match literally.
pub fn phrase_tokens(phrase: &str) -> Vec<String> {
    phrase
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
