// src/processing/features/mod.rs
//! Feature extraction
//!
//! Two extractors turn raw input into a fixed-length [`FeatureVector`]:
//! - [`StatisticalExtractor`]: per-channel statistics of a sensor window
//! - [`SpeechExtractor`]: 8 acoustic voice biomarkers from an audio window
//!
//! The position of every value in the vector is part of the model contract:
//! scorer weights are aligned index-for-index with extractor output.
//! [`streaming`] wraps both extractors around a fixed-capacity buffer.

pub mod speech;
pub mod statistical;
pub mod streaming;

use crate::error::PdResult;
use serde::{Deserialize, Serialize};
use std::ops::Index;

pub use speech::{SpeechConfig, SpeechExtractor};
pub use statistical::StatisticalExtractor;
pub use streaming::{StreamingSensorExtractor, StreamingSpeechExtractor};

/// Ordered, fixed-length feature values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Wrap extracted values
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Vector of `len` zeros
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for an empty vector
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the values
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Iterate in layout order
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }

    /// Unwrap the values
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// True when no value is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl AsRef<[f64]> for FeatureVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

/// Common contract of the extractors
pub trait FeatureExtractor {
    /// Raw input the extractor consumes
    type Input: ?Sized;

    /// Length of every vector this extractor produces
    fn feature_count(&self) -> usize;

    /// Name of each position in the output vector
    fn feature_names(&self) -> Vec<String>;

    /// Deterministic extraction; shape errors are the only failures
    fn extract(&self, input: &Self::Input) -> PdResult<FeatureVector>;
}
