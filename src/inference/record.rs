// src/inference/record.rs
//! Portable JSON model record
//!
//! ```json
//! {
//!   "weights": [[...K...], ...F rows...] | [...F or F*K...],
//!   "bias": 0.1 | [...K...],
//!   "scaler_mean": [...F...],
//!   "scaler_std": [...F...],
//!   "feature_names": [...F...],            // optional
//!   "metadata": {
//!     "model_type": "simple_linear_classifier",
//!     "input_features": 54,                 // or "input_shape": [50, 9]
//!     "output_classes": 5,
//!     "created_at": "2024-06-01T12:00:00"
//!   }
//! }
//! ```
//!
//! Every length is checked against the declared metadata before a model is
//! built. A disagreement is a `ShapeMismatch`; anything else malformed is a
//! `ModelLoad` error. There is no fallback model.

use super::model::{BinaryModel, ModelKind, MulticlassModel, ScorerModel};
use super::normalization::NormalizationParams;
use crate::config::constants::features::STATISTICS_PER_CHANNEL;
use crate::error::{PdError, PdResult};
use crate::error_context;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Weights as stored: flat, or one row per feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightsField {
    /// `F` values, or `F x K` feature-major
    Flat(Vec<f64>),
    /// `[feature][class]`
    Matrix(Vec<Vec<f64>>),
}

/// Bias as stored: scalar for binary models, one per class otherwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BiasField {
    /// Binary intercept
    Scalar(f64),
    /// Per-class intercepts
    Vector(Vec<f64>),
}

/// Record metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Type tag selecting the model variant
    pub model_type: String,
    /// Declared feature count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_features: Option<usize>,
    /// `[window_length, channels]` for sensor models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<Vec<usize>>,
    /// Declared class count
    pub output_classes: usize,
    /// Creation time, kept as written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Serialized scorer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Linear weights
    pub weights: WeightsField,
    /// Intercept(s)
    pub bias: BiasField,
    /// Training mean per feature
    pub scaler_mean: Vec<f64>,
    /// Training std per feature
    pub scaler_std: Vec<f64>,
    /// Optional names; length must match the feature count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    /// Type and dimension declarations
    pub metadata: ModelMetadata,
}

impl ModelRecord {
    /// Parse a record from JSON text
    pub fn from_json_str(json: &str) -> PdResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            PdError::model_load(format!("malformed record: {}", e), error_context!("record", "parse"))
        })
    }

    /// Read a record file
    pub fn read<P: AsRef<Path>>(path: P) -> PdResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PdError::model_load(
                format!("cannot read {}: {}", path.display(), e),
                error_context!("record", "read"),
            )
        })?;
        Self::from_json_str(&content)
    }

    /// Pretty JSON text
    pub fn to_json_string(&self) -> PdResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the record as pretty JSON
    pub fn write<P: AsRef<Path>>(&self, path: P) -> PdResult<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    /// Feature count declared by the metadata
    pub fn declared_features(&self) -> Option<usize> {
        self.metadata.input_features.or_else(|| match self.metadata.input_shape.as_deref() {
            Some([_, channels]) => Some(channels * STATISTICS_PER_CHANNEL),
            _ => None,
        })
    }

    /// Validate every dimension and build the model
    pub fn into_model(self) -> PdResult<ScorerModel> {
        let kind = ModelKind::from_tag(&self.metadata.model_type)?;
        if kind.is_external() {
            return Err(external_model(&self.metadata.model_type));
        }

        let features = self.declared_features().ok_or_else(|| {
            PdError::model_load(
                "metadata declares neither input_features nor input_shape",
                error_context!("record", "into_model"),
            )
        })?;
        let classes = self.metadata.output_classes;

        check_len("scaler_mean length", features, self.scaler_mean.len())?;
        check_len("scaler_std length", features, self.scaler_std.len())?;
        if let Some(names) = &self.feature_names {
            check_len("feature_names length", features, names.len())?;
        }
        let normalization = NormalizationParams::new(self.scaler_mean, self.scaler_std)?;

        let model = match kind {
            ModelKind::LinearBinary => {
                check_len("output_classes", 2, classes)?;
                let weights = match self.weights {
                    WeightsField::Flat(w) => w,
                    WeightsField::Matrix(rows) => flatten_single_column(rows)?,
                };
                check_len("weights length", features, weights.len())?;
                let bias = match self.bias {
                    BiasField::Scalar(b) => b,
                    BiasField::Vector(v) => {
                        check_len("bias length", 1, v.len())?;
                        v[0]
                    }
                };
                ScorerModel::Binary(BinaryModel::new(weights, bias, normalization)?)
            }
            ModelKind::LinearMulticlass => {
                let weights = match self.weights {
                    WeightsField::Flat(w) => {
                        check_len("weights length", features * classes, w.len())?;
                        w
                    }
                    WeightsField::Matrix(rows) => {
                        check_len("weights rows", features, rows.len())?;
                        for row in &rows {
                            check_len("weights row length", classes, row.len())?;
                        }
                        rows.into_iter().flatten().collect()
                    }
                };
                let bias = match self.bias {
                    BiasField::Vector(v) => v,
                    BiasField::Scalar(_) => {
                        return Err(PdError::model_load(
                            "multiclass model needs one bias per class",
                            error_context!("record", "into_model"),
                        ))
                    }
                };
                check_len("bias length", classes, bias.len())?;
                let matrix = Array2::from_shape_vec((features, classes), weights).map_err(|e| {
                    PdError::model_load(e.to_string(), error_context!("record", "into_model"))
                })?;
                ScorerModel::Multiclass(MulticlassModel::new(matrix, bias, normalization)?)
            }
            ModelKind::DeepSequence => return Err(external_model(&self.metadata.model_type)),
        };

        info!(
            kind = kind.tag(),
            features = model.feature_dim(),
            classes = model.num_classes(),
            "model record validated"
        );
        Ok(model)
    }

    /// Capture a model for persistence
    pub fn from_model(model: &ScorerModel, feature_names: Option<Vec<String>>) -> Self {
        let normalization = model.normalization();
        let (weights, bias) = match model {
            ScorerModel::Binary(m) => (WeightsField::Flat(m.weights().to_vec()), BiasField::Scalar(m.bias())),
            ScorerModel::Multiclass(m) => (
                WeightsField::Matrix(m.weights().outer_iter().map(|row| row.to_vec()).collect()),
                BiasField::Vector(m.bias().to_vec()),
            ),
        };
        Self {
            weights,
            bias,
            scaler_mean: normalization.mean().to_vec(),
            scaler_std: normalization.std().to_vec(),
            feature_names,
            metadata: ModelMetadata {
                model_type: model.kind().tag().to_string(),
                input_features: Some(model.feature_dim()),
                input_shape: None,
                output_classes: model.num_classes(),
                created_at: Some(chrono::Utc::now().to_rfc3339()),
                extra: serde_json::Map::new(),
            },
        }
    }
}

/// Load and validate a model file
pub fn load_model<P: AsRef<Path>>(path: P) -> PdResult<ScorerModel> {
    let path = path.as_ref();
    let model = ModelRecord::read(path)?.into_model()?;
    info!(path = %path.display(), "model loaded");
    Ok(model)
}

/// Persist a model as a JSON record
pub fn save_model<P: AsRef<Path>>(model: &ScorerModel, path: P) -> PdResult<()> {
    ModelRecord::from_model(model, None).write(path)
}

fn external_model(tag: &str) -> PdError {
    PdError::model_load(
        format!("model type '{}' is evaluated outside this crate", tag),
        error_context!("record", "into_model"),
    )
}

fn check_len(what: &str, expected: usize, actual: usize) -> PdResult<()> {
    if expected != actual {
        return Err(PdError::shape(what, expected, actual, error_context!("record", "validate")));
    }
    Ok(())
}

/// Binary weights stored as an `[F x 1]` column
fn flatten_single_column(rows: Vec<Vec<f64>>) -> PdResult<Vec<f64>> {
    rows.into_iter()
        .map(|row| match row.as_slice() {
            [w] => Ok(*w),
            _ => Err(PdError::shape("binary weights row length", 1, row.len(), error_context!("record", "validate"))),
        })
        .collect()
}
