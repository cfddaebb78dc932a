// src/processing/features/statistical.rs
//! Per-channel statistical features of a sensor window
//!
//! Output layout for `C` channels (length `6 * C`):
//!
//! | block              | positions      |
//! |--------------------|----------------|
//! | means              | `0..C`         |
//! | std (population)   | `C..2C`        |
//! | maxima             | `2C..3C`       |
//! | minima             | `3C..4C`       |
//! | `[zcr, change]`    | `4C..6C`, interleaved per channel |

use super::{FeatureExtractor, FeatureVector};
use crate::acquisition::SensorWindow;
use crate::config::constants::features::STATISTICS_PER_CHANNEL;
use crate::error::PdResult;
use crate::processing::stats;
use tracing::trace;

/// Statistical extractor for a fixed window geometry
#[derive(Debug, Clone)]
pub struct StatisticalExtractor {
    window_length: usize,
    channels: usize,
}

impl StatisticalExtractor {
    /// Extractor for `[window_length, channels]` windows
    pub fn new(window_length: usize, channels: usize) -> Self {
        Self {
            window_length,
            channels,
        }
    }

    /// Samples per window
    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Channels per sample
    pub fn channels(&self) -> usize {
        self.channels
    }

    fn zero_crossing_rate(channel: &[f64]) -> f64 {
        let changes = channel
            .windows(2)
            .filter(|w| stats::sign(w[0]) != stats::sign(w[1]))
            .count();
        changes as f64 / channel.len() as f64
    }

    fn change_rate(channel: &[f64]) -> f64 {
        if channel.len() <= 1 {
            return 0.0;
        }
        stats::diff(channel).iter().map(|d| d.abs()).sum::<f64>() / (channel.len() - 1) as f64
    }
}

impl FeatureExtractor for StatisticalExtractor {
    type Input = SensorWindow;

    fn feature_count(&self) -> usize {
        self.channels * STATISTICS_PER_CHANNEL
    }

    fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.feature_count());
        for stat in ["mean", "std", "max", "min"] {
            names.extend((0..self.channels).map(|ch| format!("ch{}_{}", ch, stat)));
        }
        for ch in 0..self.channels {
            names.push(format!("ch{}_zero_crossing_rate", ch));
            names.push(format!("ch{}_change_rate", ch));
        }
        names
    }

    fn extract(&self, window: &SensorWindow) -> PdResult<FeatureVector> {
        window.ensure_shape(self.window_length, self.channels)?;

        let c = self.channels;
        let mut out = vec![0.0; self.feature_count()];
        for (ch, column) in window.channel_iter().enumerate() {
            let values = column.to_vec();
            out[ch] = stats::mean(&values);
            out[c + ch] = stats::std_dev(&values);
            out[2 * c + ch] = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            out[3 * c + ch] = values.iter().copied().fold(f64::INFINITY, f64::min);
            out[4 * c + 2 * ch] = Self::zero_crossing_rate(&values);
            out[4 * c + 2 * ch + 1] = Self::change_rate(&values);
        }

        trace!(features = out.len(), "extracted statistical features");
        Ok(FeatureVector::new(out))
    }
}
