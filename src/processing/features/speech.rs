// src/processing/features/speech.rs
//! Acoustic voice biomarkers
//!
//! Produces the 8-value speech vector
//! `[f0_mean, f0_std, jitter_local, shimmer_local, hnr, mfcc_1, mfcc_2, mfcc_3]`.
//!
//! Pitch is estimated per analysis frame from the normalized autocorrelation
//! peak inside the 75-500 Hz period range; a frame is voiced when that peak
//! reaches the voicing threshold. Sub-features that cannot be computed from
//! the available data fall back to 0.0, so the vector length never changes.

use super::{FeatureExtractor, FeatureVector};
use crate::config::constants::{features, speech};
use crate::config::SpeechSettings;
use crate::error::{PdError, PdResult};
use crate::error_context;
use crate::processing::stats;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Speech front-end parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechConfig {
    /// Audio sample rate
    pub sample_rate_hz: u32,
    /// Analysis frame in samples
    pub frame_length: usize,
    /// Hop between frames in samples
    pub hop_length: usize,
    /// Normalized autocorrelation peak for a voiced frame
    pub voicing_threshold: f64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: speech::DEFAULT_SAMPLE_RATE_HZ,
            frame_length: speech::DEFAULT_FRAME_LENGTH,
            hop_length: speech::DEFAULT_HOP_LENGTH,
            voicing_threshold: speech::DEFAULT_VOICING_THRESHOLD,
        }
    }
}

impl From<&SpeechSettings> for SpeechConfig {
    fn from(settings: &SpeechSettings) -> Self {
        Self {
            sample_rate_hz: settings.sample_rate_hz,
            frame_length: settings.frame_length,
            hop_length: settings.hop_length,
            voicing_threshold: settings.voicing_threshold,
        }
    }
}

/// Autocorrelation by FFT: zero-pad, power spectrum, inverse
struct Autocorrelator {
    size: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl Autocorrelator {
    fn new(planner: &mut FftPlanner<f64>, signal_len: usize) -> Self {
        let size = (2 * signal_len).max(2).next_power_of_two();
        Self {
            size,
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
        }
    }

    /// Raw (unnormalized) autocorrelation for lags `0..signal.len()`
    fn compute(&self, signal: &[f64]) -> Vec<f64> {
        let mut buffer: Vec<Complex<f64>> = signal
            .iter()
            .map(|&x| Complex::new(x, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(self.size)
            .collect();

        self.forward.process(&mut buffer);
        for bin in buffer.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        self.inverse.process(&mut buffer);

        let scale = self.size as f64;
        buffer[..signal.len()].iter().map(|c| c.re / scale).collect()
    }
}

/// 8-dimensional speech feature extractor
pub struct SpeechExtractor {
    config: SpeechConfig,
    frame_autocorr: Autocorrelator,
    spectrum: Arc<dyn Fft<f64>>,
    hann: Vec<f64>,
}

impl fmt::Debug for SpeechExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechExtractor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SpeechExtractor {
    /// Extractor for the `[speech]` section of the runtime configuration
    pub fn from_config(settings: &SpeechSettings) -> PdResult<Self> {
        Self::new(SpeechConfig::from(settings))
    }

    /// Plans the FFTs for the configured frame length
    pub fn new(config: SpeechConfig) -> PdResult<Self> {
        if config.frame_length < 2 || config.hop_length == 0 || config.sample_rate_hz == 0 {
            return Err(PdError::Configuration {
                component: "speech".to_string(),
                reason: format!(
                    "invalid framing: frame {} hop {} rate {}",
                    config.frame_length, config.hop_length, config.sample_rate_hz
                ),
            });
        }

        let mut planner = FftPlanner::new();
        let frame_autocorr = Autocorrelator::new(&mut planner, config.frame_length);
        let spectrum = planner.plan_fft_forward(config.frame_length);
        let n = config.frame_length as f64;
        let hann = (0..config.frame_length)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n).cos())
            .collect();

        Ok(Self {
            config,
            frame_autocorr,
            spectrum,
            hann,
        })
    }

    /// Framing in use
    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    /// Analysis frames; input shorter than one frame yields one zero-padded frame
    fn frames(&self, audio: &[f64]) -> Vec<Vec<f64>> {
        let len = self.config.frame_length;
        if audio.len() < len {
            let mut padded = audio.to_vec();
            padded.resize(len, 0.0);
            return vec![padded];
        }
        (0..=audio.len() - len)
            .step_by(self.config.hop_length)
            .map(|start| audio[start..start + len].to_vec())
            .collect()
    }

    fn lag_range(&self, signal_len: usize) -> (usize, usize) {
        let rate = self.config.sample_rate_hz as f64;
        let min_lag = (rate / speech::F0_MAX_HZ) as usize;
        let max_lag = ((rate / speech::F0_MIN_HZ) as usize).min(signal_len.saturating_sub(2));
        (min_lag.max(1), max_lag)
    }

    /// Pitch of one frame in Hz, `None` when unvoiced
    fn frame_pitch(&self, frame: &[f64]) -> Option<f64> {
        let ac = self.frame_autocorr.compute(frame);
        let energy = ac[0];
        if energy <= 0.0 {
            return None;
        }

        let (min_lag, max_lag) = self.lag_range(frame.len());
        if min_lag >= max_lag {
            return None;
        }
        let mut best = min_lag;
        for lag in min_lag..=max_lag {
            if ac[lag] > ac[best] {
                best = lag;
            }
        }
        if ac[best] / energy < self.config.voicing_threshold {
            return None;
        }

        // Parabolic refinement around the integer peak
        let (a, b, c) = (ac[best - 1], ac[best], ac[best + 1]);
        let curvature = a - 2.0 * b + c;
        let offset = if curvature < 0.0 {
            (0.5 * (a - c) / curvature).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        Some(self.config.sample_rate_hz as f64 / (best as f64 + offset))
    }

    fn pitch_track(&self, frames: &[Vec<f64>]) -> Vec<f64> {
        frames.iter().filter_map(|frame| self.frame_pitch(frame)).collect()
    }

    /// Mean absolute relative change between consecutive values
    fn relative_variability(values: &[f64]) -> f64 {
        if values.len() < speech::MIN_VARIABILITY_FRAMES {
            return 0.0;
        }
        let diffs: Vec<f64> = stats::diff(values).iter().map(|d| d.abs()).collect();
        stats::finite_or_zero(stats::mean(&diffs) / stats::mean(values))
    }

    fn jitter(f0: &[f64]) -> f64 {
        let periods: Vec<f64> = f0.iter().map(|hz| 1.0 / hz).collect();
        Self::relative_variability(&periods)
    }

    fn shimmer(&self, audio: &[f64]) -> f64 {
        let rate = self.config.sample_rate_hz as f64;
        let frame = (speech::SHIMMER_FRAME_SECONDS * rate) as usize;
        let hop = ((speech::SHIMMER_HOP_SECONDS * rate) as usize).max(1);
        if frame == 0 || audio.len() < frame {
            return 0.0;
        }
        let energies: Vec<f64> = (0..=audio.len() - frame)
            .step_by(hop)
            .map(|start| audio[start..start + frame].iter().map(|x| x * x).sum::<f64>())
            .filter(|&e| e > 0.0)
            .collect();
        Self::relative_variability(&energies)
    }

    /// Harmonic-to-noise ratio of the whole signal in dB, clamped to [0, 20]
    fn hnr(&self, audio: &[f64]) -> f64 {
        let rate = self.config.sample_rate_hz as f64;
        let min_period = (rate / speech::F0_MAX_HZ) as usize;
        let max_period = (rate / speech::F0_MIN_HZ) as usize;
        if max_period >= audio.len() || min_period >= max_period {
            return 0.0;
        }

        let mut planner = FftPlanner::new();
        let ac = Autocorrelator::new(&mut planner, audio.len()).compute(audio);
        if ac[0] <= 0.0 {
            return 0.0;
        }

        let mut peak = min_period;
        for lag in min_period..max_period {
            if ac[lag] > ac[peak] {
                peak = lag;
            }
        }
        let signal_power = ac[peak];
        let noise_power = stats::mean(&ac) - signal_power;
        if noise_power <= 0.0 {
            return speech::HNR_MAX_DB;
        }

        let hnr = 10.0 * (signal_power / noise_power).log10();
        if hnr.is_finite() {
            hnr.clamp(speech::HNR_MIN_DB, speech::HNR_MAX_DB)
        } else {
            0.0
        }
    }

    /// Band log-energies of one windowed frame
    fn band_log_energies(&self, frame: &[f64]) -> [f64; speech::CEPSTRAL_BANDS] {
        let mut buffer: Vec<Complex<f64>> = frame
            .iter()
            .zip(&self.hann)
            .map(|(x, w)| Complex::new(x * w, 0.0))
            .collect();
        self.spectrum.process(&mut buffer);

        // Bins 1..=N/2, split into equal-width bands
        let bins = self.config.frame_length / 2;
        let mut energies = [0.0; speech::CEPSTRAL_BANDS];
        for (band, energy) in energies.iter_mut().enumerate() {
            let lo = 1 + band * bins / speech::CEPSTRAL_BANDS;
            let hi = 1 + (band + 1) * bins / speech::CEPSTRAL_BANDS;
            let power: f64 = buffer[lo..hi].iter().map(|c| c.norm_sqr()).sum();
            *energy = (power + speech::LOG_ENERGY_FLOOR).ln();
        }
        energies
    }

    /// DCT-II coefficients 1..=3 of the band log-energies, averaged over frames
    fn cepstral_coefficients(&self, frames: &[Vec<f64>]) -> [f64; speech::CEPSTRAL_COEFFICIENTS] {
        let bands = speech::CEPSTRAL_BANDS as f64;
        let mut sums = [0.0; speech::CEPSTRAL_COEFFICIENTS];
        for frame in frames {
            let energies = self.band_log_energies(frame);
            for (index, sum) in sums.iter_mut().enumerate() {
                let k = (index + 1) as f64;
                *sum += energies
                    .iter()
                    .enumerate()
                    .map(|(n, e)| e * (PI * k * (n as f64 + 0.5) / bands).cos())
                    .sum::<f64>();
            }
        }
        let count = frames.len().max(1) as f64;
        sums.map(|s| s / count)
    }
}

impl FeatureExtractor for SpeechExtractor {
    type Input = [f64];

    fn feature_count(&self) -> usize {
        features::SPEECH_FEATURE_COUNT
    }

    fn feature_names(&self) -> Vec<String> {
        features::SPEECH_FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    fn extract(&self, audio: &[f64]) -> PdResult<FeatureVector> {
        if audio.is_empty() {
            return Ok(FeatureVector::zeros(features::SPEECH_FEATURE_COUNT));
        }
        if let Some(position) = audio.iter().position(|v| !v.is_finite()) {
            return Err(PdError::invalid_data(
                "audio window",
                format!("non-finite sample at index {}", position),
                error_context!("speech", "extract"),
            ));
        }

        let peak = audio.iter().fold(0.0f64, |m, x| m.max(x.abs()));
        let normalized: Vec<f64> = if peak > 0.0 {
            audio.iter().map(|x| x / peak).collect()
        } else {
            audio.to_vec()
        };

        let frames = self.frames(&normalized);
        let f0 = self.pitch_track(&frames);
        if f0.len() < speech::MIN_VARIABILITY_FRAMES {
            debug!(voiced = f0.len(), frames = frames.len(), "too few voiced frames for jitter");
        }
        let mfcc = self.cepstral_coefficients(&frames);

        let values = [
            stats::mean(&f0),
            stats::std_dev(&f0),
            Self::jitter(&f0),
            self.shimmer(&normalized),
            self.hnr(&normalized),
            mfcc[0],
            mfcc[1],
            mfcc[2],
        ];
        Ok(FeatureVector::new(
            values.iter().map(|&v| stats::finite_or_zero(v)).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f64, seconds: f64) -> Vec<f64> {
        let rate = speech::DEFAULT_SAMPLE_RATE_HZ as f64;
        (0..(rate * seconds) as usize)
            .map(|i| 0.8 * (2.0 * PI * freq * i as f64 / rate).sin())
            .collect()
    }

    fn extractor() -> SpeechExtractor {
        SpeechExtractor::new(SpeechConfig::default()).unwrap()
    }

    #[test]
    fn test_default_settings_match_default_config() {
        let from_settings = SpeechExtractor::from_config(&SpeechSettings::default()).unwrap();
        assert_eq!(from_settings.config(), &SpeechConfig::default());

        let mut settings = SpeechSettings::default();
        settings.hop_length = 0;
        assert!(matches!(
            SpeechExtractor::from_config(&settings),
            Err(PdError::Configuration { .. })
        ));
    }

    #[test]
    fn test_empty_audio_gives_zeros() {
        let f = extractor().extract(&[]).unwrap();
        assert_eq!(f, FeatureVector::zeros(8));
    }

    #[test]
    fn test_silence_is_degenerate_not_error() {
        let f = extractor().extract(&vec![0.0; 4000]).unwrap();
        assert_eq!(f.len(), 8);
        assert!(f.is_finite());
        assert_eq!(f[0], 0.0);
        assert_eq!(f[2], 0.0);
        assert_eq!(f[4], 0.0);
    }

    #[test]
    fn test_pure_tone_pitch() {
        let f = extractor().extract(&tone(200.0, 0.5)).unwrap();
        assert!((f[0] - 200.0).abs() < 2.0, "f0 mean {}", f[0]);
        assert!(f[1] < 1.0, "f0 std {}", f[1]);
        assert!(f[2] < 0.01, "jitter {}", f[2]);
        assert!(f[4] > 0.0 && f[4] <= 20.0);
    }

    #[test]
    fn test_scale_invariance() {
        let quiet: Vec<f64> = tone(150.0, 0.25).iter().map(|x| x * 0.01).collect();
        let loud = tone(150.0, 0.25);
        let a = extractor().extract(&quiet).unwrap();
        let b = extractor().extract(&loud).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_short_audio_padded_to_one_frame() {
        let f = extractor().extract(&tone(200.0, 0.01)).unwrap();
        assert_eq!(f.len(), 8);
        assert!(f.is_finite());
        // fewer than three voiced frames
        assert_eq!(f[2], 0.0);
    }

    #[test]
    fn test_non_finite_audio_rejected() {
        let mut audio = tone(200.0, 0.1);
        audio[10] = f64::NAN;
        assert!(matches!(extractor().extract(&audio), Err(PdError::InvalidData { .. })));
    }
}
