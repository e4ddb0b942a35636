use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Base stopword resources are required; there is no degraded mode without them.
    #[error("failed to load stopword resource {path}: {source}")]
    Stopwords {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read vocabulary {path}: {source}")]
    VocabularyIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid vocabulary: {0}")]
    Vocabulary(String),

    #[error("failed to read model artifact {path}: {source}")]
    ModelIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model artifact: {0}")]
    ModelArtifact(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("vocabulary not loaded; call load_vocabulary first")]
    VocabularyNotLoaded,

    #[error("no model loaded; call load_model first")]
    ModelNotLoaded,

    #[error("failed to read config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Usage errors are caller bugs (calling encode/classify before a successful load).
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::VocabularyNotLoaded | Error::ModelNotLoaded)
    }
}
