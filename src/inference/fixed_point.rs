// src/inference/fixed_point.rs
//! Fixed-point model export for integer-only targets
//!
//! Layout (all integers little-endian):
//!
//! | offset | size | field                               |
//! |--------|------|-------------------------------------|
//! | 0      | 4    | magic `PDFX`                        |
//! | 4      | 1    | format version                      |
//! | 5      | 1    | kind (0 binary, 1 multiclass)       |
//! | 6      | 1    | fractional bits                     |
//! | 7      | 1    | reserved, zero                      |
//! | 8      | 2    | feature count F                     |
//! | 10     | 2    | class count                         |
//! | 12     | 4    | value count                         |
//! | 16     | 4·n  | i32 values                          |
//! | 16+4n  | 4    | CRC-32 of everything before it      |
//!
//! Values are `mean[F]`, `inv_std[F]`, `inv_std_shift[F]`,
//! `weights[F x K]` (feature-major) and `bias[K]`, where K is 1 for binary
//! models. `mean`, `weights` and `bias` share the header's fractional bits.
//!
//! The reciprocal standard deviation spans too many magnitudes for one
//! Q format (a floored std of 1e-8 gives 1e8), so each feature carries its own
//! scale: `inv_std[i] * 2^-inv_std_shift[i]`, with the mantissa normalized to
//! at most 30 bits. On the target, `((x - mean) * inv_std) >> shift` needs a
//! 64-bit product.

use super::model::{BinaryModel, ModelKind, MulticlassModel, ScorerModel};
use super::normalization::NormalizationParams;
use crate::config::constants::export as k;
use crate::config::ExportSettings;
use crate::error::{PdError, PdResult};
use crate::error_context;
use ndarray::Array2;
use tracing::debug;

const KIND_BINARY: u8 = 0;
const KIND_MULTICLASS: u8 = 1;

/// Quantized model parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedPointModel {
    /// Binary or multiclass
    pub kind: ModelKind,
    /// Q format of mean, weights and bias
    pub fractional_bits: u8,
    /// Feature count F
    pub feature_dim: usize,
    /// Class count
    pub num_classes: usize,
    /// Quantized scaler mean
    pub mean: Vec<i32>,
    /// Per-feature mantissa of `1 / std`
    pub inv_std: Vec<i32>,
    /// Per-feature right shift applied to `inv_std`
    pub inv_std_shift: Vec<i32>,
    /// `[feature_dim x columns]`, row-major
    pub weights: Vec<i32>,
    /// One value per weight column
    pub bias: Vec<i32>,
}

impl FixedPointModel {
    /// Quantize a model to `fractional_bits` bits after the binary point
    pub fn quantize(model: &ScorerModel, fractional_bits: u8) -> PdResult<Self> {
        check_fractional_bits(fractional_bits)?;
        let scale = f64::from(1u32 << fractional_bits);
        let norm = model.normalization();

        let (inv_std, inv_std_shift): (Vec<i32>, Vec<i32>) = norm
            .std()
            .iter()
            .enumerate()
            .map(|(i, s)| block_scale(1.0 / s, i))
            .collect::<PdResult<Vec<_>>>()?
            .into_iter()
            .unzip();
        let (weights, bias): (Vec<f64>, Vec<f64>) = match model {
            ScorerModel::Binary(m) => (m.weights().to_vec(), vec![m.bias()]),
            ScorerModel::Multiclass(m) => (m.weights().iter().copied().collect(), m.bias().to_vec()),
        };

        Ok(Self {
            kind: model.kind(),
            fractional_bits,
            feature_dim: model.feature_dim(),
            num_classes: model.num_classes(),
            mean: quantize_all(norm.mean(), scale, "scaler_mean")?,
            inv_std,
            inv_std_shift,
            weights: quantize_all(&weights, scale, "weights")?,
            bias: quantize_all(&bias, scale, "bias")?,
        })
    }

    /// Weight columns per feature
    pub fn columns(&self) -> usize {
        columns_for(self.kind, self.num_classes)
    }

    fn value_count(&self) -> usize {
        self.mean.len()
            + self.inv_std.len()
            + self.inv_std_shift.len()
            + self.weights.len()
            + self.bias.len()
    }

    /// Serialize with header and CRC trailer
    pub fn to_bytes(&self) -> PdResult<Vec<u8>> {
        let kind = match self.kind {
            ModelKind::LinearBinary => KIND_BINARY,
            ModelKind::LinearMulticlass => KIND_MULTICLASS,
            ModelKind::DeepSequence => {
                return Err(PdError::Quantization {
                    reason: "external models have no fixed-point form".to_string(),
                    context: error_context!("fixed_point", "to_bytes"),
                })
            }
        };
        let feature_dim = header_u16(self.feature_dim, "feature count")?;
        let num_classes = header_u16(self.num_classes, "class count")?;
        let value_count = u32::try_from(self.value_count()).map_err(|_| PdError::Quantization {
            reason: "parameter block too large".to_string(),
            context: error_context!("fixed_point", "to_bytes"),
        })?;

        let mut bytes = Vec::with_capacity(k::HEADER_LEN + 4 * self.value_count() + k::TRAILER_LEN);
        bytes.extend_from_slice(&k::MAGIC);
        bytes.push(k::FORMAT_VERSION);
        bytes.push(kind);
        bytes.push(self.fractional_bits);
        bytes.push(0);
        bytes.extend_from_slice(&feature_dim.to_le_bytes());
        bytes.extend_from_slice(&num_classes.to_le_bytes());
        bytes.extend_from_slice(&value_count.to_le_bytes());
        let values = self
            .mean
            .iter()
            .chain(&self.inv_std)
            .chain(&self.inv_std_shift)
            .chain(&self.weights)
            .chain(&self.bias);
        for value in values {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        let crc = crc32fast::hash(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        Ok(bytes)
    }

    /// Parse and verify a serialized model
    pub fn from_bytes(bytes: &[u8]) -> PdResult<Self> {
        if bytes.len() < k::HEADER_LEN + k::TRAILER_LEN {
            return Err(corrupt(format!("{} bytes is shorter than header and trailer", bytes.len())));
        }
        if bytes[..4] != k::MAGIC {
            return Err(corrupt("bad magic".to_string()));
        }

        let (body, trailer) = bytes.split_at(bytes.len() - k::TRAILER_LEN);
        let stored_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let computed_crc = crc32fast::hash(body);
        if stored_crc != computed_crc {
            return Err(corrupt(format!(
                "CRC mismatch: stored {:08X}, computed {:08X}",
                stored_crc, computed_crc
            )));
        }

        if body[4] != k::FORMAT_VERSION {
            return Err(corrupt(format!("unsupported format version {}", body[4])));
        }
        let kind = match body[5] {
            KIND_BINARY => ModelKind::LinearBinary,
            KIND_MULTICLASS => ModelKind::LinearMulticlass,
            other => return Err(corrupt(format!("unknown model kind {}", other))),
        };
        let fractional_bits = body[6];
        check_fractional_bits(fractional_bits).map_err(|_| {
            corrupt(format!("fractional bits {} out of range", fractional_bits))
        })?;
        let feature_dim = usize::from(u16::from_le_bytes([body[8], body[9]]));
        let num_classes = usize::from(u16::from_le_bytes([body[10], body[11]]));
        let value_count = u32::from_le_bytes([body[12], body[13], body[14], body[15]]) as usize;

        let columns = columns_for(kind, num_classes);
        let expected = 3 * feature_dim + feature_dim * columns + columns;
        if value_count != expected {
            return Err(PdError::shape(
                "fixed-point value count",
                expected,
                value_count,
                error_context!("fixed_point", "from_bytes"),
            ));
        }
        let payload = &body[k::HEADER_LEN..];
        if payload.len() != 4 * value_count {
            return Err(PdError::shape(
                "fixed-point payload bytes",
                4 * value_count,
                payload.len(),
                error_context!("fixed_point", "from_bytes"),
            ));
        }

        let mut values = payload
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]));
        let mut take = |n: usize| values.by_ref().take(n).collect::<Vec<i32>>();
        let mean = take(feature_dim);
        let inv_std = take(feature_dim);
        let inv_std_shift = take(feature_dim);
        let weights = take(feature_dim * columns);
        let bias = take(columns);

        debug!(?kind, feature_dim, num_classes, fractional_bits, "fixed-point model parsed");
        Ok(Self {
            kind,
            fractional_bits,
            feature_dim,
            num_classes,
            mean,
            inv_std,
            inv_std_shift,
            weights,
            bias,
        })
    }

    /// Convert back to a floating-point model
    pub fn dequantize(&self) -> PdResult<ScorerModel> {
        let scale = f64::from(1u32 << self.fractional_bits);
        let to_f64 = |values: &[i32]| values.iter().map(|&v| f64::from(v) / scale).collect::<Vec<f64>>();

        let std = self
            .inv_std
            .iter()
            .zip(&self.inv_std_shift)
            .map(|(&mantissa, &shift)| {
                if mantissa <= 0 || !(0..=k::MAX_NORM_SHIFT).contains(&shift) {
                    return Err(PdError::model_load(
                        format!("invalid inverse std {} >> {}", mantissa, shift),
                        error_context!("fixed_point", "dequantize"),
                    ));
                }
                Ok(2f64.powi(shift) / f64::from(mantissa))
            })
            .collect::<PdResult<Vec<f64>>>()?;
        let normalization = NormalizationParams::new(to_f64(&self.mean), std)?;

        let weights = to_f64(&self.weights);
        let bias = to_f64(&self.bias);
        match self.kind {
            ModelKind::LinearBinary => {
                let bias = match bias.as_slice() {
                    [b] => *b,
                    other => {
                        return Err(PdError::shape(
                            "binary bias length",
                            1,
                            other.len(),
                            error_context!("fixed_point", "dequantize"),
                        ))
                    }
                };
                Ok(BinaryModel::new(weights, bias, normalization)?.into())
            }
            ModelKind::LinearMulticlass => {
                let matrix = Array2::from_shape_vec((self.feature_dim, self.num_classes), weights)
                    .map_err(|e| PdError::model_load(e.to_string(), error_context!("fixed_point", "dequantize")))?;
                Ok(MulticlassModel::new(matrix, bias, normalization)?.into())
            }
            ModelKind::DeepSequence => Err(PdError::model_load(
                "external models have no fixed-point form",
                error_context!("fixed_point", "dequantize"),
            )),
        }
    }
}

/// Quantize and serialize a model
pub fn export_fixed_point(model: &ScorerModel, fractional_bits: u8) -> PdResult<Vec<u8>> {
    let bytes = FixedPointModel::quantize(model, fractional_bits)?.to_bytes()?;
    debug!(fractional_bits, bytes = bytes.len(), "fixed-point model exported");
    Ok(bytes)
}

/// Quantize and serialize with the configured fractional bits
pub fn export_fixed_point_with(model: &ScorerModel, settings: &ExportSettings) -> PdResult<Vec<u8>> {
    export_fixed_point(model, settings.fractional_bits)
}

/// Parse a serialized fixed-point model
pub fn import_fixed_point(bytes: &[u8]) -> PdResult<FixedPointModel> {
    FixedPointModel::from_bytes(bytes)
}

fn columns_for(kind: ModelKind, num_classes: usize) -> usize {
    match kind {
        ModelKind::LinearBinary => 1,
        _ => num_classes,
    }
}

fn check_fractional_bits(bits: u8) -> PdResult<()> {
    if !(k::MIN_FRACTIONAL_BITS..=k::MAX_FRACTIONAL_BITS).contains(&bits) {
        return Err(PdError::Quantization {
            reason: format!(
                "fractional bits must be in {}..={}, got {}",
                k::MIN_FRACTIONAL_BITS,
                k::MAX_FRACTIONAL_BITS,
                bits
            ),
            context: error_context!("fixed_point", "quantize"),
        });
    }
    Ok(())
}

fn quantize_all(values: &[f64], scale: f64, what: &str) -> PdResult<Vec<i32>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let q = (v * scale).round();
            if !q.is_finite() || q < f64::from(i32::MIN) || q > f64::from(i32::MAX) {
                return Err(PdError::Quantization {
                    reason: format!("{}[{}] = {} does not fit i32 at scale {}", what, i, v, scale),
                    context: error_context!("fixed_point", "quantize"),
                });
            }
            Ok(q as i32)
        })
        .collect()
}

/// Mantissa and right shift for one reciprocal std
///
/// The shift is the largest that keeps the mantissa below 2^30.
fn block_scale(inv_std: f64, index: usize) -> PdResult<(i32, i32)> {
    let unrepresentable = || PdError::Quantization {
        reason: format!("inverse scaler_std[{}] = {} has no block-scaled form", index, inv_std),
        context: error_context!("fixed_point", "quantize"),
    };
    if !inv_std.is_finite() || inv_std <= 0.0 {
        return Err(unrepresentable());
    }
    let exponent = inv_std.log2().floor() as i32;
    let shift = (k::NORM_MANTISSA_BITS - 1 - exponent).clamp(0, k::MAX_NORM_SHIFT);
    let mantissa = (inv_std * 2f64.powi(shift)).round();
    if mantissa < 1.0 || mantissa > f64::from(i32::MAX) {
        return Err(unrepresentable());
    }
    Ok((mantissa as i32, shift))
}

fn header_u16(value: usize, what: &str) -> PdResult<u16> {
    u16::try_from(value).map_err(|_| PdError::Quantization {
        reason: format!("{} {} does not fit the header", what, value),
        context: error_context!("fixed_point", "to_bytes"),
    })
}

fn corrupt(reason: String) -> PdError {
    PdError::model_load(reason, error_context!("fixed_point", "from_bytes"))
}
