//! The fixed menu of trained model scenarios.
//!
//! Hyperparameters are display metadata only; nothing in scoring reads them.

use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Scenario {
    pub name: &'static str,
    pub learning_rate: f64,
    pub batch_size: u32,
    pub epochs: u32,
    /// Validation ranking of the best three scenarios.
    pub rank: Option<u8>,
}

const fn scenario(name: &'static str, learning_rate: f64, batch_size: u32, epochs: u32, rank: Option<u8>) -> Scenario {
    Scenario { name, learning_rate, batch_size, epochs, rank }
}

pub static SCENARIOS: [Scenario; 12] = [
    scenario("model 1", 0.001, 32, 5, None),
    scenario("model 2", 0.001, 32, 10, Some(3)),
    scenario("model 3", 0.001, 32, 25, None),
    scenario("model 4", 0.001, 64, 5, None),
    scenario("model 5", 0.001, 64, 10, Some(2)),
    scenario("model 6", 0.001, 64, 25, Some(1)),
    scenario("model 7", 0.0001, 32, 5, None),
    scenario("model 8", 0.0001, 32, 10, None),
    scenario("model 9", 0.0001, 32, 25, None),
    scenario("model 10", 0.0001, 64, 50, None),
    scenario("model 11", 0.0001, 64, 10, None),
    scenario("model 12", 0.0001, 64, 25, None),
];

const ARTIFACT_EXTENSIONS: [&str; 2] = ["json", "bin"];

impl Scenario {
    /// Lookup by name; a trailing artifact extension is ignored ("model 6.json").
    pub fn find(name: &str) -> Option<&'static Scenario> {
        let name = name.trim();
        let stem = ARTIFACT_EXTENSIONS
            .iter()
            .find_map(|ext| name.strip_suffix(&format!(".{ext}")))
            .unwrap_or(name);
        SCENARIOS.iter().find(|s| s.name.eq_ignore_ascii_case(stem))
    }

    /// The first existing `<name>.json` / `<name>.bin` under `model_dir`.
    pub fn artifact_path<P: AsRef<Path>>(&self, model_dir: P) -> Option<PathBuf> {
        ARTIFACT_EXTENSIONS
            .iter()
            .map(|ext| model_dir.as_ref().join(format!("{}.{ext}", self.name)))
            .find(|p| p.is_file())
    }

    pub fn label(&self) -> String {
        let mut label = format!(
            "{} (LR: {} | Batch: {} | Epoch: {})",
            self.name, self.learning_rate, self.batch_size, self.epochs
        );
        if let Some(rank) = self.rank {
            label.push_str(&format!(" [rank {rank}]"));
        }
        label
    }
}
