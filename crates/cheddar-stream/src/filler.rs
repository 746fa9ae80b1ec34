//! Filler classification.
//!
//! A filler fragment is short and contains a conversational continuation
//! cue. Classification is reported alongside each placement; filler is
//! placed like any other fragment.

/// Fragments at or above this many characters are never filler.
pub const DEFAULT_MAX_CHARS: usize = 30;

pub const DEFAULT_KEYWORDS: &[&str] = &["hmm", "okay", "next", "go on", "continue"];

/// Status substrings that mark the current turn complete. Case-sensitive.
pub const COMPLETION_SIGNALS: &[&str] = &["Ready", "Listening", "Error"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillerPolicy {
    max_chars: usize,
    keywords: Vec<String>,
}

impl Default for FillerPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS, DEFAULT_KEYWORDS)
    }
}

impl FillerPolicy {
    pub fn new<S: AsRef<str>>(max_chars: usize, keywords: &[S]) -> Self {
        Self {
            max_chars,
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Length is counted in chars, not bytes.
    pub fn is_filler(&self, fragment: &str) -> bool {
        if fragment.chars().count() >= self.max_chars {
            return false;
        }
        let lower = fragment.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

/// Whether a host status line signals that the current turn is finished.
pub fn is_completion_status(status: &str) -> bool {
    COMPLETION_SIGNALS.iter().any(|s| status.contains(s))
}
