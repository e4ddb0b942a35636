//! Startup-loaded word resources: the slang lexicon and the stopword set.
//!
//! Both are immutable after construction and shared read-only between
//! preprocessing workers.

use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

const BUNDLED_INDONESIAN: &str = include_str!("../resources/stopwords/indonesian");
const BUNDLED_ENGLISH: &str = include_str!("../resources/stopwords/english");

/// Colloquial fillers and forms of address common in comment sections.
const CUSTOM_STOPWORDS: &[&str] = &[
    "di", "ke", "ya", "eh", "he", "nya", "nih", "sih", "si", "tau", "tuh",
    "dong", "kok", "wow", "om", "kak", "bang", "bro", "cici", "kakak", "ka",
];

/// Negation and first person carry signal for this task and are never dropped.
const PROTECTED_WORDS: &[&str] = &["tidak", "aku"];

/// Slang token -> canonical token. Misses pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct SlangLexicon {
    entries: HashMap<String, String>,
}

impl SlangLexicon {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Load a JSON object of string keys to string values.
    ///
    /// Any read or parse failure is logged and yields an empty lexicon, which
    /// turns slang normalization into an identity pass.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match read_lexicon(path) {
            Ok(entries) => {
                info!(path = %path.display(), entries = entries.len(), "slang lexicon loaded");
                Self { entries }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "slang lexicon unavailable, normalization disabled");
                Self::default()
            }
        }
    }

    pub fn normalize(&self, tokens: Vec<String>) -> Vec<String> {
        if self.entries.is_empty() {
            return tokens;
        }
        tokens
            .into_iter()
            .map(|t| match self.entries.get(&t) {
                Some(canonical) => canonical.clone(),
                None => t,
            })
            .collect()
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_lexicon(path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let entries: HashMap<String, String> = serde_json::from_str(&buf)?;
    Ok(entries)
}

/// Indonesian + English stopwords plus custom fillers, minus the protected words.
#[derive(Debug, Clone)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl StopwordSet {
    /// Build from the lists compiled into the crate.
    pub fn bundled() -> Self {
        Self::from_lists(&[BUNDLED_INDONESIAN, BUNDLED_ENGLISH])
    }

    /// Build from an NLTK-style corpus directory holding `indonesian` and `english`.
    /// A missing or unreadable list is fatal.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut lists = Vec::with_capacity(2);
        for lang in ["indonesian", "english"] {
            let path = dir.join(lang);
            let text = fs::read_to_string(&path).map_err(|source| Error::Stopwords { path: path.clone(), source })?;
            lists.push(text);
        }
        let refs: Vec<&str> = lists.iter().map(String::as_str).collect();
        let set = Self::from_lists(&refs);
        info!(dir = %dir.display(), words = set.len(), "stopwords loaded");
        Ok(set)
    }

    fn from_lists(lists: &[&str]) -> Self {
        let mut words: HashSet<String> = lists
            .iter()
            .flat_map(|list| list.lines())
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        words.extend(CUSTOM_STOPWORDS.iter().map(|w| w.to_string()));
        for w in PROTECTED_WORDS {
            words.remove(*w);
        }
        Self { words }
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for StopwordSet {
    fn default() -> Self {
        Self::bundled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn bundled_set_merges_and_protects() {
        let sw = StopwordSet::bundled();
        assert!(sw.is_stopword("yang"));
        assert!(sw.is_stopword("the"));
        assert!(sw.is_stopword("bang"));
        assert!(!sw.is_stopword("tidak"));
        assert!(!sw.is_stopword("aku"));
        assert!(!sw.is_stopword("gacor"));
    }

    #[test]
    fn missing_dir_is_fatal() {
        let err = StopwordSet::from_dir("/nonexistent/corpora/stopwords").unwrap_err();
        assert!(matches!(err, Error::Stopwords { .. }));
    }

    #[test]
    fn lexicon_passes_misses_through() {
        let mut entries = HashMap::new();
        entries.insert("yg".to_string(), "yang".to_string());
        let lex = SlangLexicon::new(entries);
        assert_eq!(lex.normalize(owned(&["yg", "gacor"])), owned(&["yang", "gacor"]));
    }

    #[test]
    fn unreadable_lexicon_degrades_to_identity() {
        let lex = SlangLexicon::load("/nonexistent/kamus_slang.json");
        assert!(lex.is_empty());
        assert_eq!(lex.normalize(owned(&["btw"])), owned(&["btw"]));
    }
}
