// src/inference/scorer.rs
//! Class and confidence from a normalized feature vector
//!
//! Binary models threshold a sigmoid at 0.5; multiclass models take the
//! arg-max of a max-shifted softmax and report 1-based severity levels. When
//! several classes share the maximum probability the lowest index wins.

use super::model::{BinaryModel, MulticlassModel, ScorerModel};
use crate::config::constants::scoring;
use crate::error::{PdError, PdResult};
use crate::error_context;
use crate::processing::FeatureVector;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Scorer output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 0/1 for binary models, 1..=K for multiclass models
    pub class: usize,
    /// Probability of the reported class
    pub confidence: f64,
    /// Probability per class, index 0 first
    pub distribution: Vec<f64>,
}

impl Prediction {
    /// Severity band of a positive binary prediction
    pub fn speech_severity(&self) -> Option<SpeechSeverity> {
        match (self.distribution.as_slice(), self.class) {
            ([_, positive], 1) => Some(SpeechSeverity::from_probability(*positive)),
            _ => None,
        }
    }
}

/// Grading of a positive speech classification by its probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechSeverity {
    /// Below 0.6
    Slight,
    /// 0.6 to 0.75
    Mild,
    /// 0.75 to 0.85
    Moderate,
    /// 0.85 to 0.95
    ModeratelySevere,
    /// 0.95 and above
    Severe,
}

impl SpeechSeverity {
    /// Band for the class-1 probability
    pub fn from_probability(probability: f64) -> Self {
        let [slight, mild, moderate, moderately_severe] = scoring::SPEECH_SEVERITY_BANDS;
        if probability < slight {
            SpeechSeverity::Slight
        } else if probability < mild {
            SpeechSeverity::Mild
        } else if probability < moderate {
            SpeechSeverity::Moderate
        } else if probability < moderately_severe {
            SpeechSeverity::ModeratelySevere
        } else {
            SpeechSeverity::Severe
        }
    }
}

impl fmt::Display for SpeechSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SpeechSeverity::Slight => "slight",
            SpeechSeverity::Mild => "mild",
            SpeechSeverity::Moderate => "moderate",
            SpeechSeverity::ModeratelySevere => "moderately severe",
            SpeechSeverity::Severe => "severe",
        };
        f.write_str(label)
    }
}

/// Polymorphic scoring interface over every evaluable model variant
pub trait Scorer: Send + Sync {
    /// Required feature vector length
    fn feature_dim(&self) -> usize;

    /// Number of output classes
    fn num_classes(&self) -> usize;

    /// Score one raw (unnormalized) feature vector
    fn score(&self, features: &FeatureVector) -> PdResult<Prediction>;
}

/// Logistic function with its input clamped to ±500
pub fn sigmoid(z: f64) -> f64 {
    let z = z.clamp(-scoring::SIGMOID_CLAMP, scoring::SIGMOID_CLAMP);
    1.0 / (1.0 + (-z).exp())
}

/// Softmax with the maximum logit subtracted before exponentiation
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the first one wins ties
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, value) in values.iter().enumerate().skip(1) {
        if *value > values[best] {
            best = index;
        }
    }
    best
}

fn check_dim(expected: usize, features: &FeatureVector) -> PdResult<()> {
    if features.len() != expected {
        return Err(PdError::shape(
            "feature vector length",
            expected,
            features.len(),
            error_context!("scorer", "score"),
        ));
    }
    Ok(())
}

impl Scorer for BinaryModel {
    fn feature_dim(&self) -> usize {
        self.normalization().len()
    }

    fn num_classes(&self) -> usize {
        2
    }

    fn score(&self, features: &FeatureVector) -> PdResult<Prediction> {
        check_dim(self.feature_dim(), features)?;
        let z = Array1::from(self.normalization().normalize(features)?.into_inner());
        let probability = sigmoid(z.dot(self.weights()) + self.bias());

        let class = usize::from(probability > scoring::BINARY_THRESHOLD);
        let confidence = if class == 1 { probability } else { 1.0 - probability };
        trace!(probability, class, "binary score");
        Ok(Prediction {
            class,
            confidence,
            distribution: vec![1.0 - probability, probability],
        })
    }
}

impl Scorer for MulticlassModel {
    fn feature_dim(&self) -> usize {
        self.normalization().len()
    }

    fn num_classes(&self) -> usize {
        self.bias().len()
    }

    fn score(&self, features: &FeatureVector) -> PdResult<Prediction> {
        check_dim(self.feature_dim(), features)?;
        let z = Array1::from(self.normalization().normalize(features)?.into_inner());
        let logits = z.dot(self.weights()) + self.bias();

        let distribution = softmax(&logits.to_vec());
        let best = argmax(&distribution);
        trace!(level = best + 1, confidence = distribution[best], "multiclass score");
        Ok(Prediction {
            class: best + 1,
            confidence: distribution[best],
            distribution,
        })
    }
}

impl Scorer for ScorerModel {
    fn feature_dim(&self) -> usize {
        ScorerModel::feature_dim(self)
    }

    fn num_classes(&self) -> usize {
        ScorerModel::num_classes(self)
    }

    fn score(&self, features: &FeatureVector) -> PdResult<Prediction> {
        match self {
            ScorerModel::Binary(model) => model.score(features),
            ScorerModel::Multiclass(model) => model.score(features),
        }
    }
}
