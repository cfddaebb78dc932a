// src/inference/model.rs
//! Scorer model variants
//!
//! A model is built once, never mutated, and replaced wholesale on redeploy.
//! Constructors check every dimension so scoring never has to.

use super::normalization::NormalizationParams;
use crate::error::{PdError, PdResult};
use crate::error_context;
use ndarray::{Array1, Array2};

/// Declared model type, as written in the record metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Logistic model over the 8 speech features
    LinearBinary,
    /// Softmax model over sensor statistics, severity levels 1..=5
    LinearMulticlass,
    /// Deep sequence model served outside this crate
    DeepSequence,
}

impl ModelKind {
    /// Resolve a metadata `model_type` tag
    pub fn from_tag(tag: &str) -> PdResult<Self> {
        match tag {
            "optimized_speech_parkinson_classifier" | "speech_parkinson_classifier" => {
                Ok(ModelKind::LinearBinary)
            }
            "simple_linear_classifier" => Ok(ModelKind::LinearMulticlass),
            "cnn_lstm" | "cnn_lstm_classifier" => Ok(ModelKind::DeepSequence),
            other => Err(PdError::model_load(
                format!("unknown model_type '{}'", other),
                error_context!("model", "from_tag"),
            )),
        }
    }

    /// Canonical tag written when saving
    pub fn tag(&self) -> &'static str {
        match self {
            ModelKind::LinearBinary => "optimized_speech_parkinson_classifier",
            ModelKind::LinearMulticlass => "simple_linear_classifier",
            ModelKind::DeepSequence => "cnn_lstm",
        }
    }

    /// True for variants this crate cannot evaluate
    pub fn is_external(&self) -> bool {
        matches!(self, ModelKind::DeepSequence)
    }
}

/// Logistic regression: `sigmoid(w . z + b)`
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryModel {
    weights: Array1<f64>,
    bias: f64,
    normalization: NormalizationParams,
}

impl BinaryModel {
    /// Validates that weights match the normalization length
    pub fn new(weights: Vec<f64>, bias: f64, normalization: NormalizationParams) -> PdResult<Self> {
        if weights.len() != normalization.len() {
            return Err(PdError::shape(
                "binary weights length",
                normalization.len(),
                weights.len(),
                error_context!("model", "binary_new"),
            ));
        }
        ensure_finite(weights.iter().chain(std::iter::once(&bias)), "binary_new")?;
        Ok(Self {
            weights: Array1::from(weights),
            bias,
            normalization,
        })
    }

    /// One weight per feature
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Intercept
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Scaler applied before the linear layer
    pub fn normalization(&self) -> &NormalizationParams {
        &self.normalization
    }
}

/// Multinomial logistic regression: `softmax(z . W + b)`
#[derive(Debug, Clone, PartialEq)]
pub struct MulticlassModel {
    /// `[features x classes]`
    weights: Array2<f64>,
    bias: Array1<f64>,
    normalization: NormalizationParams,
}

impl MulticlassModel {
    /// Validates a `[features x classes]` matrix against bias and normalization
    pub fn new(
        weights: Array2<f64>,
        bias: Vec<f64>,
        normalization: NormalizationParams,
    ) -> PdResult<Self> {
        let (features, classes) = weights.dim();
        if features != normalization.len() {
            return Err(PdError::shape(
                "weight matrix rows",
                normalization.len(),
                features,
                error_context!("model", "multiclass_new"),
            ));
        }
        if classes < 2 {
            return Err(PdError::shape(
                "weight matrix columns",
                2,
                classes,
                error_context!("model", "multiclass_new"),
            ));
        }
        if bias.len() != classes {
            return Err(PdError::shape(
                "bias length",
                classes,
                bias.len(),
                error_context!("model", "multiclass_new"),
            ));
        }
        ensure_finite(weights.iter().chain(&bias), "multiclass_new")?;
        Ok(Self {
            weights,
            bias: Array1::from(bias),
            normalization,
        })
    }

    /// Feature-major weight matrix
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    /// One intercept per class
    pub fn bias(&self) -> &Array1<f64> {
        &self.bias
    }

    /// Scaler applied before the linear layer
    pub fn normalization(&self) -> &NormalizationParams {
        &self.normalization
    }
}

fn ensure_finite<'a>(mut values: impl Iterator<Item = &'a f64>, operation: &'static str) -> PdResult<()> {
    if values.any(|v| !v.is_finite()) {
        return Err(PdError::model_load(
            "model parameters must be finite",
            error_context!("model", operation),
        ));
    }
    Ok(())
}

/// Any model this crate can evaluate
#[derive(Debug, Clone, PartialEq)]
pub enum ScorerModel {
    /// Logistic regression
    Binary(BinaryModel),
    /// Softmax regression
    Multiclass(MulticlassModel),
}

impl ScorerModel {
    /// Variant tag
    pub fn kind(&self) -> ModelKind {
        match self {
            ScorerModel::Binary(_) => ModelKind::LinearBinary,
            ScorerModel::Multiclass(_) => ModelKind::LinearMulticlass,
        }
    }

    /// Expected feature vector length
    pub fn feature_dim(&self) -> usize {
        self.normalization().len()
    }

    /// 2 for binary models, K for multiclass
    pub fn num_classes(&self) -> usize {
        match self {
            ScorerModel::Binary(_) => 2,
            ScorerModel::Multiclass(m) => m.bias.len(),
        }
    }

    /// Scaler applied before the linear layer
    pub fn normalization(&self) -> &NormalizationParams {
        match self {
            ScorerModel::Binary(m) => &m.normalization,
            ScorerModel::Multiclass(m) => &m.normalization,
        }
    }
}

impl From<BinaryModel> for ScorerModel {
    fn from(model: BinaryModel) -> Self {
        ScorerModel::Binary(model)
    }
}

impl From<MulticlassModel> for ScorerModel {
    fn from(model: MulticlassModel) -> Self {
        ScorerModel::Multiclass(model)
    }
}
