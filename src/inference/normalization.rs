// src/inference/normalization.rs
//! Per-feature standardization owned by a scorer model

use crate::config::constants::scoring::STD_FLOOR;
use crate::error::{PdError, PdResult};
use crate::error_context;
use crate::processing::FeatureVector;

/// Mean and standard deviation aligned index-for-index with a feature vector
///
/// Standard deviations are floored at construction so normalization never
/// divides by zero.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationParams {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl NormalizationParams {
    /// Floors every std at the scoring floor
    pub fn new(mean: Vec<f64>, std: Vec<f64>) -> PdResult<Self> {
        if mean.len() != std.len() {
            return Err(PdError::shape(
                "scaler_std length",
                mean.len(),
                std.len(),
                error_context!("normalization", "new"),
            ));
        }
        if mean.iter().chain(&std).any(|v| !v.is_finite()) {
            return Err(PdError::invalid_data(
                "normalization parameters",
                "mean and std must be finite",
                error_context!("normalization", "new"),
            ));
        }
        let std = std.into_iter().map(|s| s.max(STD_FLOOR)).collect();
        Ok(Self { mean, std })
    }

    /// Parameters that leave features unchanged
    pub fn identity(len: usize) -> Self {
        Self {
            mean: vec![0.0; len],
            std: vec![1.0; len],
        }
    }

    /// Feature count
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    /// True for zero features
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Per-feature mean
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Per-feature std after flooring
    pub fn std(&self) -> &[f64] {
        &self.std
    }

    /// `(x - mean) / std` elementwise
    pub fn normalize(&self, features: &FeatureVector) -> PdResult<FeatureVector> {
        self.check_len(features, "normalize")?;
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(x, (m, s))| (x - m) / s)
            .collect::<Vec<_>>()
            .into())
    }

    /// Inverse of [`normalize`](Self::normalize)
    pub fn denormalize(&self, normalized: &FeatureVector) -> PdResult<FeatureVector> {
        self.check_len(normalized, "denormalize")?;
        Ok(normalized
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(z, (m, s))| z * s + m)
            .collect::<Vec<_>>()
            .into())
    }

    fn check_len(&self, features: &FeatureVector, operation: &'static str) -> PdResult<()> {
        if features.len() != self.len() {
            return Err(PdError::shape(
                "feature vector length",
                self.len(),
                features.len(),
                error_context!("normalization", operation),
            ));
        }
        Ok(())
    }
}
