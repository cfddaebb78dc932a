// src/config/mod.rs
//! Runtime configuration for the monitoring core

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::ConfigLoader;

use crate::error::{PdError, PdResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete runtime configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SystemConfig {
    /// Sensor window geometry
    #[serde(default)]
    pub window: WindowSettings,
    /// Speech front end
    #[serde(default)]
    pub speech: SpeechSettings,
    /// Model record location
    #[serde(default)]
    pub model: ModelSettings,
    /// Fixed-point export
    #[serde(default)]
    pub export: ExportSettings,
}

/// Sensor window geometry
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WindowSettings {
    /// Samples per window
    #[serde(default = "defaults::window_length")]
    pub length: usize,

    /// Channels per sample
    #[serde(default = "defaults::window_channels")]
    pub channels: usize,
}

/// Speech front-end parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SpeechSettings {
    /// Audio sample rate
    #[serde(default = "defaults::speech_sample_rate_hz")]
    pub sample_rate_hz: u32,

    /// Analysis frame in samples
    #[serde(default = "defaults::frame_length")]
    pub frame_length: usize,

    /// Hop between frames in samples
    #[serde(default = "defaults::hop_length")]
    pub hop_length: usize,

    /// Normalized autocorrelation peak for a voiced frame
    #[serde(default = "defaults::voicing_threshold")]
    pub voicing_threshold: f64,

    /// Streaming audio buffer in samples
    #[serde(default = "defaults::buffer_capacity")]
    pub buffer_capacity: usize,
}

/// Model record location
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ModelSettings {
    /// JSON model record
    #[serde(default = "defaults::model_path")]
    pub path: PathBuf,

    /// Reload and republish the model when the record changes on disk
    #[serde(default)]
    pub watch: bool,
}

/// Fixed-point export parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExportSettings {
    /// Fractional bits of mean, weights and bias
    #[serde(default = "defaults::fractional_bits")]
    pub fractional_bits: u8,
}

mod defaults {
    use crate::config::constants::*;
    use std::path::PathBuf;

    pub fn window_length() -> usize { window::DEFAULT_LENGTH }
    pub fn window_channels() -> usize { window::DEFAULT_CHANNELS }

    pub fn speech_sample_rate_hz() -> u32 { speech::DEFAULT_SAMPLE_RATE_HZ }
    pub fn frame_length() -> usize { speech::DEFAULT_FRAME_LENGTH }
    pub fn hop_length() -> usize { speech::DEFAULT_HOP_LENGTH }
    pub fn voicing_threshold() -> f64 { speech::DEFAULT_VOICING_THRESHOLD }
    pub fn buffer_capacity() -> usize { speech::DEFAULT_BUFFER_CAPACITY }

    pub fn model_path() -> PathBuf { PathBuf::from(paths::DEFAULT_MODEL_PATH) }

    pub fn fractional_bits() -> u8 { export::DEFAULT_FRACTIONAL_BITS }
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            length: defaults::window_length(),
            channels: defaults::window_channels(),
        }
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: defaults::speech_sample_rate_hz(),
            frame_length: defaults::frame_length(),
            hop_length: defaults::hop_length(),
            voicing_threshold: defaults::voicing_threshold(),
            buffer_capacity: defaults::buffer_capacity(),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: defaults::model_path(),
            watch: false,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            fractional_bits: defaults::fractional_bits(),
        }
    }
}

impl SystemConfig {
    /// Validate configuration consistency
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.window.length == 0 || self.window.length > window::MAX_LENGTH {
            errors.push(format!(
                "window.length must be in 1..={}, got {}",
                window::MAX_LENGTH,
                self.window.length
            ));
        }
        if self.window.channels == 0 || self.window.channels > window::MAX_CHANNELS {
            errors.push(format!(
                "window.channels must be in 1..={}, got {}",
                window::MAX_CHANNELS,
                self.window.channels
            ));
        }

        let max_period = (self.speech.sample_rate_hz as f64 / speech::F0_MIN_HZ) as usize;
        if self.speech.frame_length <= max_period {
            errors.push(format!(
                "speech.frame_length ({}) must exceed the longest pitch period ({} samples)",
                self.speech.frame_length, max_period
            ));
        }
        if self.speech.hop_length == 0 || self.speech.hop_length > self.speech.frame_length {
            errors.push(format!(
                "speech.hop_length must be in 1..={}, got {}",
                self.speech.frame_length, self.speech.hop_length
            ));
        }
        if !(0.0..1.0).contains(&self.speech.voicing_threshold) {
            errors.push(format!(
                "speech.voicing_threshold must be in [0, 1), got {}",
                self.speech.voicing_threshold
            ));
        }
        if self.speech.buffer_capacity < self.speech.frame_length {
            errors.push(format!(
                "speech.buffer_capacity ({}) must hold at least one frame ({})",
                self.speech.buffer_capacity, self.speech.frame_length
            ));
        }

        let bits = self.export.fractional_bits;
        if !(export::MIN_FRACTIONAL_BITS..=export::MAX_FRACTIONAL_BITS).contains(&bits) {
            errors.push(format!(
                "export.fractional_bits must be in {}..={}, got {}",
                export::MIN_FRACTIONAL_BITS,
                export::MAX_FRACTIONAL_BITS,
                bits
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold every failure into one configuration error
    pub fn validate(&self) -> PdResult<()> {
        self.validate_consistency().map_err(|errors| PdError::Configuration {
            component: "system".to_string(),
            reason: errors.join("; "),
        })
    }

    /// Length of the statistical feature vector implied by the window geometry
    pub fn statistical_feature_count(&self) -> usize {
        self.window.channels * features::STATISTICS_PER_CHANNEL
    }
}
