use crate::config::PipelineConfig;
use crate::error::Result;
use crate::lexicon::{SlangLexicon, StopwordSet};
use crate::normalizer;
use crate::stemmer::IndonesianStemmer;
use rayon::prelude::*;

/// Text -> normalized token sequence.
///
/// Stages run in a fixed order: cleanse, tokenize, slang normalization,
/// stopword removal, length filter, stemming. Stemming only ever sees tokens
/// that survived filtering.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    lexicon: SlangLexicon,
    stopwords: StopwordSet,
    stemmer: IndonesianStemmer,
    fold_unicode: bool,
}

impl Preprocessor {
    pub fn new(lexicon: SlangLexicon, stopwords: StopwordSet, stemmer: IndonesianStemmer) -> Self {
        Self { lexicon, stopwords, stemmer, fold_unicode: false }
    }

    pub fn with_fold_unicode(mut self, fold_unicode: bool) -> Self {
        self.fold_unicode = fold_unicode;
        self
    }

    /// Stopword and root-word failures are fatal; a bad slang lexicon only disables slang mapping.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let lexicon = SlangLexicon::load(&config.slang_path);
        let stopwords = match &config.stopwords_dir {
            Some(dir) => StopwordSet::from_dir(dir)?,
            None => StopwordSet::bundled(),
        };
        let stemmer = match &config.root_words_path {
            Some(path) => IndonesianStemmer::load_root_words(path)?,
            None => IndonesianStemmer::new(),
        };
        Ok(Self::new(lexicon, stopwords, stemmer).with_fold_unicode(config.fold_unicode))
    }

    pub fn cleanse(&self, text: &str) -> String {
        normalizer::cleanse(text)
    }

    pub fn normalize_slang(&self, tokens: Vec<String>) -> Vec<String> {
        self.lexicon.normalize(tokens)
    }

    pub fn remove_stopwords(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter().filter(|t| !self.stopwords.is_stopword(t)).collect()
    }

    pub fn filter_length(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter().filter(|t| t.chars().count() > 1).collect()
    }

    pub fn stem_tokens(&self, tokens: Vec<String>) -> Vec<String> {
        if tokens.is_empty() {
            return tokens;
        }
        tokens.iter().map(|t| self.stemmer.stem(t)).collect()
    }

    pub fn preprocess_text(&self, text: &str) -> Vec<String> {
        let folded = normalizer::fold_case(text, self.fold_unicode);
        let cleaned = self.cleanse(&folded);
        let tokens = normalizer::tokenize(&cleaned);
        let tokens = self.normalize_slang(tokens);
        let tokens = self.remove_stopwords(tokens);
        let tokens = self.filter_length(tokens);
        self.stem_tokens(tokens)
    }

    /// Missing cells (e.g. empty CSV fields) produce an empty sequence.
    pub fn preprocess(&self, text: Option<&str>) -> Vec<String> {
        match text {
            Some(t) => self.preprocess_text(t),
            None => Vec::new(),
        }
    }

    pub fn preprocess_joined(&self, text: Option<&str>) -> String {
        self.preprocess(text).join(" ")
    }

    /// Preprocess rows on the rayon pool. Row `i` of the output belongs to row `i` of the input.
    pub fn preprocess_batch<S>(&self, rows: &[Option<S>]) -> Vec<String>
    where
        S: AsRef<str> + Sync,
    {
        rows.par_iter()
            .map(|row| self.preprocess_joined(row.as_ref().map(S::as_ref)))
            .collect()
    }
}
