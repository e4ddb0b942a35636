use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_LENGTH: usize = 50;
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Paths and knobs for the preprocessing and inference pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub slang_path: PathBuf,
    /// Directory with NLTK-layout `indonesian` and `english` stopword files.
    /// The bundled lists are used when unset.
    pub stopwords_dir: Option<PathBuf>,
    /// Optional root-word list (one per line); listed words are never stemmed.
    pub root_words_path: Option<PathBuf>,
    pub vocabulary_path: PathBuf,
    pub model_dir: PathBuf,
    pub max_length: usize,
    pub threshold: f32,
    /// NFKC-fold input before lower-casing. Off by default: styled and
    /// full-width letters are then stripped like any other non-ASCII text.
    pub fold_unicode: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            slang_path: PathBuf::from("kamus_slang.json"),
            stopwords_dir: None,
            root_words_path: None,
            vocabulary_path: PathBuf::from("tokenizer.json"),
            model_dir: PathBuf::from("."),
            max_length: DEFAULT_MAX_LENGTH,
            threshold: DEFAULT_THRESHOLD,
            fold_unicode: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let wrap = |source: anyhow::Error| Error::Config { path: path.to_path_buf(), source };
        let mut f = File::open(path).map_err(|e| wrap(e.into()))?;
        let mut buf = String::new();
        f.read_to_string(&mut buf).map_err(|e| wrap(e.into()))?;
        let config: PipelineConfig = serde_json::from_str(&buf).map_err(|e| wrap(e.into()))?;
        Ok(config)
    }

    /// Relative paths in a config file are resolved against the file's directory.
    pub fn resolve_relative_to<P: AsRef<Path>>(mut self, base: P) -> Self {
        let base = base.as_ref();
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.slang_path);
        join(&mut self.vocabulary_path);
        join(&mut self.model_dir);
        if let Some(p) = self.stopwords_dir.as_mut() {
            join(p);
        }
        if let Some(p) = self.root_words_path.as_mut() {
            join(p);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: PipelineConfig = serde_json::from_str(r#"{"max_length": 64}"#).unwrap();
        assert_eq!(cfg.max_length, 64);
        assert_eq!(cfg.threshold, DEFAULT_THRESHOLD);
        assert_eq!(cfg.vocabulary_path, PathBuf::from("tokenizer.json"));
        assert!(cfg.stopwords_dir.is_none());
        assert!(!cfg.fold_unicode);
    }

    #[test]
    fn relative_paths_join_base() {
        let cfg = PipelineConfig::default().resolve_relative_to("/srv/judol");
        assert_eq!(cfg.slang_path, PathBuf::from("/srv/judol/kamus_slang.json"));
        assert_eq!(cfg.model_dir, PathBuf::from("/srv/judol/."));
    }
}
