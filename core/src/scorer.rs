use crate::encoder::EncodedBatch;

/// Anything that turns a padded id matrix into one score in `[0, 1]` per row.
///
/// [`crate::model::SequenceModel`] is the bundled implementation; other
/// runtimes plug in through [`crate::engine::ScoringEngine::install`].
pub trait Scorer: Send + Sync {
    fn predict(&self, batch: &EncodedBatch) -> anyhow::Result<Vec<f32>>;
}
