// src/inference/mod.rs
//! Severity scoring
//!
//! Linear scorer models, their JSON and fixed-point persistence, and the
//! registry that keeps one model in service while allowing replacement.

pub mod fixed_point;
pub mod model;
pub mod normalization;
pub mod record;
pub mod registry;
pub mod scorer;

pub use fixed_point::{
    export_fixed_point, export_fixed_point_with, import_fixed_point, FixedPointModel,
};
pub use model::{BinaryModel, ModelKind, MulticlassModel, ScorerModel};
pub use normalization::NormalizationParams;
pub use record::{load_model, save_model, BiasField, ModelMetadata, ModelRecord, WeightsField};
pub use registry::{ModelHandle, ModelRegistry};
pub use scorer::{argmax, sigmoid, softmax, Prediction, Scorer, SpeechSeverity};
