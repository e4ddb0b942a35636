//! Text pipeline and scoring engine for flagging online-gambling promotion
//! in Indonesian comments.

pub mod classification;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod lexicon;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod scenario;
pub mod scorer;
pub mod stemmer;

pub use classification::{Classification, ConfusionMatrix, EvaluationCategory, Label, Threshold};
pub use config::PipelineConfig;
pub use encoder::{EncodedBatch, SequenceEncoder, Vocabulary};
pub use engine::{ModelScores, ScoringEngine, FALLBACK_SCORE};
pub use error::{Error, Result};
pub use lexicon::{SlangLexicon, StopwordSet};
pub use model::{ModelArtifact, SequenceModel};
pub use pipeline::Preprocessor;
pub use scenario::{Scenario, SCENARIOS};
pub use scorer::Scorer;
pub use stemmer::IndonesianStemmer;
