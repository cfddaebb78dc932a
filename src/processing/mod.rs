// src/processing/mod.rs
//! Window processing: feature extraction and sensor pattern analysis

pub mod analysis;
pub mod features;
pub(crate) mod stats;

pub use analysis::{analyze, EmgMetrics, FingerMetrics, ImuMetrics, SymptomMetrics};
pub use features::{
    FeatureExtractor, FeatureVector, SpeechConfig, SpeechExtractor, StatisticalExtractor,
    StreamingSensorExtractor, StreamingSpeechExtractor,
};
