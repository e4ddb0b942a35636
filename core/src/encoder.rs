use crate::error::{Error, Result};
use ndarray::Array2;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// `[rows, max_length]` token ids, zero padded.
pub type EncodedBatch = Array2<u32>;

const DEFAULT_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

fn default_filters() -> String {
    DEFAULT_FILTERS.to_string()
}
fn default_split() -> String {
    " ".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct TokenizerDocument {
    class_name: String,
    config: TokenizerConfig,
}

#[derive(Debug, Deserialize)]
struct TokenizerConfig {
    #[serde(default)]
    num_words: Option<usize>,
    #[serde(default = "default_filters")]
    filters: String,
    #[serde(default = "default_true")]
    lower: bool,
    #[serde(default = "default_split")]
    split: String,
    #[serde(default)]
    char_level: bool,
    #[serde(default)]
    oov_token: Option<String>,
    /// Either an object or the same object serialized into a string.
    word_index: Value,
}

/// Trained token -> id mapping, read-only after load.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    word_index: HashMap<String, u32>,
    num_words: Option<usize>,
    oov_index: Option<u32>,
    filters: String,
    lower: bool,
    split: String,
    char_level: bool,
}

impl Vocabulary {
    pub fn from_word_index(word_index: HashMap<String, u32>, oov_token: Option<&str>) -> Self {
        let oov_index = oov_token.and_then(|t| word_index.get(t).copied());
        Self {
            word_index,
            num_words: None,
            oov_index,
            filters: default_filters(),
            lower: true,
            split: default_split(),
            char_level: false,
        }
    }

    /// Ids at or above `num_words` are treated as out of vocabulary.
    pub fn with_num_words(mut self, num_words: usize) -> Self {
        self.num_words = Some(num_words);
        self
    }

    /// Read a tokenizer document as written by `Tokenizer.to_json()`, optionally
    /// wrapped in one more level of JSON string encoding.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut f = File::open(path).map_err(|source| Error::VocabularyIo { path: path.to_path_buf(), source })?;
        let mut buf = String::new();
        f.read_to_string(&mut buf)
            .map_err(|source| Error::VocabularyIo { path: path.to_path_buf(), source })?;
        let vocab = Self::from_json_str(&buf)?;
        info!(path = %path.display(), words = vocab.len(), "vocabulary loaded");
        Ok(vocab)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let mut value: Value = serde_json::from_str(text).map_err(|e| Error::Vocabulary(e.to_string()))?;
        if let Value::String(inner) = value {
            value = serde_json::from_str(&inner).map_err(|e| Error::Vocabulary(e.to_string()))?;
        }
        let doc: TokenizerDocument = serde_json::from_value(value).map_err(|e| Error::Vocabulary(e.to_string()))?;
        if doc.class_name != "Tokenizer" {
            return Err(Error::Vocabulary(format!("unexpected class_name {:?}", doc.class_name)));
        }
        let cfg = doc.config;
        let word_index: HashMap<String, u32> = match cfg.word_index {
            Value::String(s) => serde_json::from_str(&s),
            other => serde_json::from_value(other),
        }
        .map_err(|e| Error::Vocabulary(format!("word_index: {e}")))?;
        if word_index.is_empty() {
            return Err(Error::Vocabulary("word_index is empty".into()));
        }
        let oov_index = match &cfg.oov_token {
            Some(tok) => Some(
                *word_index
                    .get(tok)
                    .ok_or_else(|| Error::Vocabulary(format!("oov_token {tok:?} missing from word_index")))?,
            ),
            None => None,
        };
        Ok(Self {
            word_index,
            num_words: cfg.num_words.filter(|n| *n > 0),
            oov_index,
            filters: cfg.filters,
            lower: cfg.lower,
            split: cfg.split,
            char_level: cfg.char_level,
        })
    }

    pub fn len(&self) -> usize {
        self.word_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_index.is_empty()
    }

    pub fn oov_index(&self) -> Option<u32> {
        self.oov_index
    }

    pub fn id(&self, word: &str) -> Option<u32> {
        self.word_index.get(word).copied()
    }

    fn words(&self, text: &str) -> Vec<String> {
        let text = if self.lower { text.to_lowercase() } else { text.to_string() };
        if self.char_level {
            return text.chars().map(String::from).collect();
        }
        // Every filter character becomes the whole split string, as in Keras.
        let mut translated = String::with_capacity(text.len());
        for c in text.chars() {
            if self.filters.contains(c) {
                translated.push_str(&self.split);
            } else {
                translated.push(c);
            }
        }
        translated
            .split(self.split.as_str())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Unknown words (and ids beyond `num_words`) map to the OOV id, or are
    /// dropped when the vocabulary has no OOV token.
    pub fn to_sequence(&self, text: &str) -> Vec<u32> {
        self.words(text)
            .iter()
            .filter_map(|w| match self.word_index.get(w) {
                Some(&i) if self.num_words.map_or(true, |n| (i as usize) < n) => Some(i),
                _ => self.oov_index,
            })
            .collect()
    }
}

/// Fixed-width encoder: post padding with zeros and post truncation.
#[derive(Debug, Clone)]
pub struct SequenceEncoder {
    vocabulary: Option<Vocabulary>,
    max_length: usize,
}

impl SequenceEncoder {
    pub fn new(max_length: usize) -> Self {
        Self { vocabulary: None, max_length }
    }

    pub fn with_vocabulary(vocabulary: Vocabulary, max_length: usize) -> Self {
        Self { vocabulary: Some(vocabulary), max_length }
    }

    /// Load errors propagate; the encoder keeps its previous state on failure.
    pub fn load_vocabulary<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.vocabulary = Some(Vocabulary::load(path)?);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.vocabulary.is_some()
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn encode<S: AsRef<str>>(&self, texts: &[S]) -> Result<EncodedBatch> {
        let vocab = self.vocabulary.as_ref().ok_or(Error::VocabularyNotLoaded)?;
        let mut out = Array2::<u32>::zeros((texts.len(), self.max_length));
        for (row, text) in texts.iter().enumerate() {
            let ids = vocab.to_sequence(text.as_ref());
            for (col, id) in ids.into_iter().take(self.max_length).enumerate() {
                out[[row, col]] = id;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        let idx: HashMap<String, u32> = [("<OOV>", 1), ("gacor", 2), ("slot", 3), ("main", 4)]
            .iter()
            .map(|(w, i)| (w.to_string(), *i))
            .collect();
        Vocabulary::from_word_index(idx, Some("<OOV>"))
    }

    #[test]
    fn pads_and_truncates_at_end() {
        let enc = SequenceEncoder::with_vocabulary(vocab(), 4);
        let m = enc.encode(&["gacor slot", "main main main main gacor slot"]).unwrap();
        assert_eq!(m.shape(), &[2, 4]);
        assert_eq!(m.row(0).to_vec(), vec![2, 3, 0, 0]);
        assert_eq!(m.row(1).to_vec(), vec![4, 4, 4, 4]);
    }

    #[test]
    fn unknown_words_use_oov() {
        let enc = SequenceEncoder::with_vocabulary(vocab(), 3);
        let m = enc.encode(&["asing gacor"]).unwrap();
        assert_eq!(m.row(0).to_vec(), vec![1, 2, 0]);
    }

    #[test]
    fn num_words_caps_ids() {
        let enc = SequenceEncoder::with_vocabulary(vocab().with_num_words(3), 3);
        let m = enc.encode(&["slot main"]).unwrap();
        assert_eq!(m.row(0).to_vec(), vec![1, 1, 0]);
    }

    #[test]
    fn filters_expand_to_multichar_split() {
        let doc = r#"{"class_name": "Tokenizer", "config": {"filters": ",!", "split": "--", "word_index": {"slot": 1, "gacor": 2}}}"#;
        let vocab = Vocabulary::from_json_str(doc).unwrap();
        assert_eq!(vocab.to_sequence("slot,gacor!"), vec![1, 2]);
        assert_eq!(vocab.to_sequence("slot--gacor"), vec![1, 2]);
    }

    #[test]
    fn encode_before_load_is_usage_error() {
        let enc = SequenceEncoder::new(50);
        assert!(matches!(enc.encode(&["gacor"]), Err(Error::VocabularyNotLoaded)));
    }

    #[test]
    fn empty_batch_has_zero_rows() {
        let enc = SequenceEncoder::with_vocabulary(vocab(), 50);
        let empty: [&str; 0] = [];
        assert_eq!(enc.encode(&empty).unwrap().shape(), &[0, 50]);
    }
}
