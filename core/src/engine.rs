use crate::classification::{Classification, Threshold};
use crate::config::PipelineConfig;
use crate::encoder::{EncodedBatch, SequenceEncoder};
use crate::error::{Error, Result};
use crate::model::SequenceModel;
use crate::pipeline::Preprocessor;
use crate::scenario::Scenario;
use crate::scorer::Scorer;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Score reported when inference fails at runtime.
///
/// Kept at 0.0 for compatibility with existing consumers, although it makes a
/// broken model look like a confident "not gambling" verdict. Callers that need
/// to tell the two apart use [`ScoringEngine::try_classify_batch`].
pub const FALLBACK_SCORE: f32 = 0.0;

struct ActiveModel {
    name: String,
    scorer: Arc<dyn Scorer>,
}

/// Scores together with the name of the model that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelScores {
    pub model: String,
    pub scores: Vec<f32>,
}

/// Preprocess -> encode -> predict, around a swappable model.
///
/// The engine starts unloaded; a successful `load_model` makes it ready and
/// later loads replace the model as a whole. Classification clones the active
/// model handle under a read lock, so a concurrent swap is never observed half-done.
pub struct ScoringEngine {
    preprocessor: Arc<Preprocessor>,
    encoder: Arc<SequenceEncoder>,
    active: RwLock<Option<Arc<ActiveModel>>>,
}

impl ScoringEngine {
    pub fn new(preprocessor: Arc<Preprocessor>, encoder: Arc<SequenceEncoder>) -> Self {
        Self { preprocessor, encoder, active: RwLock::new(None) }
    }

    /// Build the preprocessor and load the vocabulary. Both are startup-fatal.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let preprocessor = Preprocessor::from_config(config)?;
        let mut encoder = SequenceEncoder::new(config.max_length);
        encoder.load_vocabulary(&config.vocabulary_path)?;
        Ok(Self::new(Arc::new(preprocessor), Arc::new(encoder)))
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn encoder(&self) -> &SequenceEncoder {
        &self.encoder
    }

    /// Load a model artifact. On failure the previous model (if any) stays active.
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        self.load_named(name, path)
    }

    pub fn load_scenario<P: AsRef<Path>>(&self, scenario: &Scenario, model_dir: P) -> bool {
        match scenario.artifact_path(model_dir.as_ref()) {
            Some(path) => self.load_named(scenario.name.to_string(), &path),
            None => {
                error!(scenario = scenario.name, dir = %model_dir.as_ref().display(), "no artifact for scenario");
                false
            }
        }
    }

    fn load_named(&self, name: String, path: &Path) -> bool {
        match SequenceModel::load(path) {
            Ok(model) => {
                self.install(name, Arc::new(model));
                true
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to load model");
                false
            }
        }
    }

    /// Swap in any scorer as the active model.
    pub fn install(&self, name: impl Into<String>, scorer: Arc<dyn Scorer>) {
        let name = name.into();
        info!(model = %name, "model activated");
        *self.active.write() = Some(Arc::new(ActiveModel { name, scorer }));
    }

    pub fn active_model(&self) -> Option<String> {
        self.active.read().as_ref().map(|m| m.name.clone())
    }

    pub fn is_ready(&self) -> bool {
        self.active.read().is_some()
    }

    fn current(&self) -> Result<Arc<ActiveModel>> {
        self.active.read().clone().ok_or(Error::ModelNotLoaded)
    }

    /// Score one raw text. Runtime inference failures yield [`FALLBACK_SCORE`].
    pub fn classify_one(&self, text: &str) -> Result<f32> {
        let model = self.current()?;
        debug!(text = %preview(text), "classifying");
        let joined = self.preprocessor.preprocess_text(text).join(" ");
        let batch = self.encoder.encode(&[joined])?;
        match infer(model.scorer.as_ref(), &batch) {
            Ok(scores) => Ok(scores[0]),
            Err(err) => {
                error!(model = %model.name, error = %err, "inference failed, returning fallback score");
                Ok(FALLBACK_SCORE)
            }
        }
    }

    pub fn classify_text(&self, text: &str, threshold: Threshold) -> Result<Classification> {
        Ok(threshold.classify(self.classify_one(text)?))
    }

    /// Score already-preprocessed, space-joined rows in one inference call.
    /// Inference failures come back as [`Error::Inference`].
    pub fn try_classify_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<f32>> {
        let model = self.current()?;
        score_rows(&model, &self.encoder, texts)
    }

    /// As [`Self::try_classify_batch`], but an inference failure yields one
    /// [`FALLBACK_SCORE`] per row. Usage errors still propagate.
    pub fn classify_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<f32>> {
        Ok(self.classify_batch_named(texts)?.scores)
    }

    /// As [`Self::classify_batch`], also naming the model that scored the rows.
    /// Name and scores come from the same model even if it is swapped meanwhile.
    pub fn classify_batch_named<S: AsRef<str>>(&self, texts: &[S]) -> Result<ModelScores> {
        let model = self.current()?;
        let scores = match score_rows(&model, &self.encoder, texts) {
            Err(Error::Inference(msg)) => {
                error!(model = %model.name, rows = texts.len(), error = %msg, "batch inference failed, returning fallback scores");
                vec![FALLBACK_SCORE; texts.len()]
            }
            other => other?,
        };
        Ok(ModelScores { model: model.name.clone(), scores })
    }
}

fn score_rows<S: AsRef<str>>(model: &ActiveModel, encoder: &SequenceEncoder, texts: &[S]) -> Result<Vec<f32>> {
    let batch = encoder.encode(texts)?;
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    debug!(rows = texts.len(), model = %model.name, "batch inference");
    infer(model.scorer.as_ref(), &batch)
}

fn infer(scorer: &dyn Scorer, batch: &EncodedBatch) -> Result<Vec<f32>> {
    let scores = scorer.predict(batch).map_err(|e| Error::Inference(format!("{e:#}")))?;
    if scores.len() != batch.nrows() {
        return Err(Error::Inference(format!("scorer returned {} scores for {} rows", scores.len(), batch.nrows())));
    }
    Ok(scores)
}

fn preview(text: &str) -> String {
    let mut p: String = text.chars().take(20).collect();
    if text.chars().nth(20).is_some() {
        p.push_str("...");
    }
    p
}
