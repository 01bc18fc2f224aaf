//! Text expansion applied to documents and queries before embedding.
//!
//! Both sides of a search go through [`TextNormalizer::enhance`], so a query
//! written with a synonym lands near a document written with the canonical
//! term and vice versa.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::terms::TermDictionary;

/// How dictionary terms are located in text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Case-insensitive substring containment. Over-matches short numeric
    /// synonyms ("22" inside "220"), but is what existing indexes were built with.
    #[default]
    Substring,
    /// Whole-token phrase matching.
    Token,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown match mode '{0}' (expected 'substring' or 'token')")]
pub struct UnknownMatchMode(String);

impl FromStr for MatchMode {
    type Err = UnknownMatchMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substring" => Ok(MatchMode::Substring),
            "token" => Ok(MatchMode::Token),
            other => Err(UnknownMatchMode(other.to_string())),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Substring => f.write_str("substring"),
            MatchMode::Token => f.write_str("token"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextNormalizer {
    dictionary: Arc<TermDictionary>,
    mode: MatchMode,
}

impl TextNormalizer {
    pub fn new(dictionary: Arc<TermDictionary>, mode: MatchMode) -> Self {
        Self { dictionary, mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn dictionary(&self) -> &TermDictionary {
        &self.dictionary
    }

    /// Lowercases `text` and appends every term reachable in one hop.
    ///
    /// A canonical term pulls in its synonyms; a synonym pulls in its canonical
    /// term followed by its siblings. Appended terms are not expanded further.
    /// Every containment check runs against the text built so far, so a term is
    /// never appended twice.
    pub fn enhance(&self, text: &str) -> String {
        let mut enhanced = text.to_lowercase();

        for entry in self.dictionary.entries() {
            if self.contains(&enhanced, &entry.canonical) {
                for synonym in &entry.synonyms {
                    if !self.contains(&enhanced, synonym) {
                        push_term(&mut enhanced, synonym);
                    }
                }
            }

            for synonym in &entry.synonyms {
                if self.contains(&enhanced, synonym) && !self.contains(&enhanced, &entry.canonical) {
                    push_term(&mut enhanced, &entry.canonical);
                    for sibling in &entry.synonyms {
                        if sibling != synonym && !self.contains(&enhanced, sibling) {
                            push_term(&mut enhanced, sibling);
                        }
                    }
                }
            }
        }

        tracing::trace!(input = text, enhanced = %enhanced, "expanded text");
        enhanced
    }

    fn contains(&self, haystack: &str, term: &str) -> bool {
        match self.mode {
            MatchMode::Substring => haystack.contains(term),
            MatchMode::Token => contains_phrase(haystack, term),
        }
    }
}

fn push_term(enhanced: &mut String, term: &str) {
    enhanced.push(' ');
    enhanced.push_str(term);
}

fn tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|t| !t.is_empty())
        .collect()
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    let phrase = tokens(phrase);
    if phrase.is_empty() {
        return false;
    }
    let haystack = tokens(haystack);
    haystack.windows(phrase.len()).any(|window| window == phrase.as_slice())
}
