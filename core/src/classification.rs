use crate::config::DEFAULT_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Judi Online")]
    Gambling,
    #[serde(rename = "Non-Judi Online")]
    NotGambling,
}

impl Label {
    pub fn is_positive(self) -> bool {
        self == Label::Gambling
    }

    pub fn as_binary(self) -> u8 {
        self.is_positive() as u8
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Gambling => f.write_str("Judi Online"),
            Label::NotGambling => f.write_str("Non-Judi Online"),
        }
    }
}

/// Score cut-off; `score >= threshold` is the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold(pub f32);

impl Default for Threshold {
    fn default() -> Self {
        Threshold(DEFAULT_THRESHOLD)
    }
}

impl Threshold {
    pub fn label(self, score: f32) -> Label {
        if score >= self.0 {
            Label::Gambling
        } else {
            Label::NotGambling
        }
    }

    pub fn classify(self, score: f32) -> Classification {
        Classification { score, label: self.label(score) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub score: f32,
    pub label: Label,
}

/// Prediction outcome against a ground-truth label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluationCategory {
    #[serde(rename = "TP (True Positive)")]
    TruePositive,
    #[serde(rename = "TN (True Negative)")]
    TrueNegative,
    #[serde(rename = "FP (False Positive)")]
    FalsePositive,
    #[serde(rename = "FN (False Negative)")]
    FalseNegative,
}

impl EvaluationCategory {
    /// `actual` is the 0/1 ground truth; any other value has no category.
    pub fn from_outcome(actual: u8, predicted: Label) -> Option<Self> {
        match (actual, predicted.is_positive()) {
            (1, true) => Some(EvaluationCategory::TruePositive),
            (0, false) => Some(EvaluationCategory::TrueNegative),
            (0, true) => Some(EvaluationCategory::FalsePositive),
            (1, false) => Some(EvaluationCategory::FalseNegative),
            _ => None,
        }
    }
}

impl fmt::Display for EvaluationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EvaluationCategory::TruePositive => "TP (True Positive)",
            EvaluationCategory::TrueNegative => "TN (True Negative)",
            EvaluationCategory::FalsePositive => "FP (False Positive)",
            EvaluationCategory::FalseNegative => "FN (False Negative)",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_positive: u64,
    pub true_negative: u64,
    pub false_positive: u64,
    pub false_negative: u64,
}

impl ConfusionMatrix {
    pub fn record(&mut self, category: EvaluationCategory) {
        match category {
            EvaluationCategory::TruePositive => self.true_positive += 1,
            EvaluationCategory::TrueNegative => self.true_negative += 1,
            EvaluationCategory::FalsePositive => self.false_positive += 1,
            EvaluationCategory::FalseNegative => self.false_negative += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.true_positive + self.true_negative + self.false_positive + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

impl Extend<EvaluationCategory> for ConfusionMatrix {
    fn extend<I: IntoIterator<Item = EvaluationCategory>>(&mut self, iter: I) {
        for c in iter {
            self.record(c);
        }
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
