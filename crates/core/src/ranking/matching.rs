//! Title matching and format detection helpers.

use std::collections::HashSet;

/// Audio format guessed from a release title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Flac,
    M4b,
    Mp3,
    /// Some other audio container or codec.
    OtherAudio,
    Unknown,
}

impl AudioFormat {
    pub fn detect(title: &str) -> Self {
        let tokens: HashSet<String> = tokens(title).collect();
        let has = |t: &str| tokens.contains(t);

        if has("flac") {
            AudioFormat::Flac
        } else if has("m4b") {
            AudioFormat::M4b
        } else if has("mp3") {
            AudioFormat::Mp3
        } else if ["aac", "m4a", "ogg", "opus", "wma", "alac"]
            .iter()
            .any(|t| has(t))
        {
            AudioFormat::OtherAudio
        } else {
            AudioFormat::Unknown
        }
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
}

/// Significant lowercase words of a title or name.
pub fn extract_keywords(text: &str) -> HashSet<String> {
    let stop_words: HashSet<&str> = [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "as", "is", "was", "are", "were", "been", "be", "have", "has", "had",
    ]
    .into_iter()
    .collect();

    tokens(text)
        .filter(|s| s.chars().count() > 1)
        .filter(|s| !stop_words.contains(s.as_str()))
        .collect()
}

/// Share (0.0-1.0) of `wanted` keywords found in `haystack`.
///
/// Nothing to look for counts as a full match.
pub fn keyword_ratio(wanted: &HashSet<String>, haystack: &HashSet<String>) -> f64 {
    if wanted.is_empty() {
        return 1.0;
    }
    let found = wanted.iter().filter(|kw| haystack.contains(*kw)).count();
    found as f64 / wanted.len() as f64
}
