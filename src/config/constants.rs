// src/config/constants.rs
//! Numeric constants shared by the extractors, analyzer, scorer and planner
//!
//! Thresholds in [`analysis`] and [`plan`] are part of the clinical contract
//! and are deliberately not exposed through the TOML configuration.

/// Sensor window geometry
pub mod window {
    /// Samples per window (T)
    pub const DEFAULT_LENGTH: usize = 50;
    /// Channels per sample (C): 5 finger + 1 EMG + 3 IMU
    pub const DEFAULT_CHANNELS: usize = 9;
    /// Largest accepted channel count
    pub const MAX_CHANNELS: usize = 64;
    /// Largest accepted window length
    pub const MAX_LENGTH: usize = 100_000;

    /// Flex sensors, thumb to pinky, channels 0..5
    pub const FINGER_CHANNELS: usize = 5;
    /// Index of the EMG channel
    pub const EMG_CHANNEL: usize = 5;
    /// Index of the IMU x axis
    pub const IMU_FIRST_CHANNEL: usize = 6;
    /// IMU axes (x, y, z)
    pub const IMU_AXES: usize = 3;
}

/// Feature vector layout
pub mod features {
    /// mean, std, max, min, zero-crossing rate, change rate
    pub const STATISTICS_PER_CHANNEL: usize = 6;
    /// Length of the speech vector
    pub const SPEECH_FEATURE_COUNT: usize = 8;
    /// Speech vector positions, in order
    pub const SPEECH_FEATURE_NAMES: [&str; SPEECH_FEATURE_COUNT] = [
        "f0_mean",
        "f0_std",
        "jitter_local",
        "shimmer_local",
        "hnr",
        "mfcc_1",
        "mfcc_2",
        "mfcc_3",
    ];
}

/// Speech extraction parameters
pub mod speech {
    /// Audio sample rate
    pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 16_000;
    /// Analysis frame in samples
    pub const DEFAULT_FRAME_LENGTH: usize = 1024;
    /// Hop between analysis frames in samples
    pub const DEFAULT_HOP_LENGTH: usize = 512;
    /// Normalized autocorrelation peak a voiced frame must reach
    pub const DEFAULT_VOICING_THRESHOLD: f64 = 0.3;
    /// Streaming audio buffer, one second at the default rate
    pub const DEFAULT_BUFFER_CAPACITY: usize = 16_000;

    /// Lowest pitch searched
    pub const F0_MIN_HZ: f64 = 75.0;
    /// Highest pitch searched
    pub const F0_MAX_HZ: f64 = 500.0;
    /// Jitter and shimmer need at least this many usable frames
    pub const MIN_VARIABILITY_FRAMES: usize = 3;

    /// Short-time energy frame for shimmer
    pub const SHIMMER_FRAME_SECONDS: f64 = 0.025;
    /// Short-time energy hop for shimmer
    pub const SHIMMER_HOP_SECONDS: f64 = 0.010;

    /// HNR lower clamp
    pub const HNR_MIN_DB: f64 = 0.0;
    /// HNR upper clamp, also the value for noise-free input
    pub const HNR_MAX_DB: f64 = 20.0;

    /// Linear energy bands fed to the DCT
    pub const CEPSTRAL_BANDS: usize = 8;
    /// Coefficients kept after c0
    pub const CEPSTRAL_COEFFICIENTS: usize = 3;
    /// Added to band energies before the log
    pub const LOG_ENERGY_FLOOR: f64 = 1e-8;
}

/// Scoring and normalization
pub mod scoring {
    /// Smallest standard deviation a model may divide by
    pub const STD_FLOOR: f64 = 1e-8;
    /// Sigmoid input is clamped to this magnitude
    pub const SIGMOID_CLAMP: f64 = 500.0;
    /// Probability above which a binary model reports class 1
    pub const BINARY_THRESHOLD: f64 = 0.5;
    /// Classes of the multiclass severity model
    pub const SEVERITY_CLASSES: usize = 5;

    /// Upper bounds (exclusive) of the speech severity bands above the binary threshold
    pub const SPEECH_SEVERITY_BANDS: [f64; 4] = [0.6, 0.75, 0.85, 0.95];
}

/// Sensor pattern analyzer
pub mod analysis {
    /// Denominator guard in the analyzer formulas
    pub const EPSILON: f64 = 1e-6;
    /// Symmetry when fewer than five finger channels are present
    pub const DEFAULT_SYMMETRY: f64 = 0.5;
    /// Finger channels needed for symmetry
    pub const SYMMETRY_MIN_CHANNELS: usize = 5;
    /// A channel contributes to the tremor index only with more samples than this
    pub const TREMOR_MIN_SAMPLES: usize = 10;
    /// EMG samples needed for the fatigue ratio
    pub const FATIGUE_MIN_SAMPLES: usize = 10;
    /// Fatigue when the EMG window is too short
    pub const DEFAULT_FATIGUE: f64 = 0.5;
    /// Upper bound of the fatigue index
    pub const FATIGUE_CAP: f64 = 2.0;
    /// IMU samples needed for a jerk estimate
    pub const SMOOTHNESS_MIN_SAMPLES: usize = 2;
    /// Upper bound of the three-axis balance index
    pub const BALANCE_CAP: f64 = 10.0;
    /// IMU samples needed for tremor frequency
    pub const TREMOR_FREQUENCY_MIN_SAMPLES: usize = 20;
    /// Magnitude peaks needed for tremor frequency
    pub const TREMOR_FREQUENCY_MIN_PEAKS: usize = 3;
    /// Assumed IMU sampling rate for tremor frequency, never inferred from input
    pub const TREMOR_SAMPLING_RATE_HZ: f64 = 100.0;
}

/// Training-plan rules
pub mod plan {
    /// Level used for out-of-range input
    pub const FALLBACK_LEVEL: i64 = 3;
    /// Tremor index above which resistance is lowered
    pub const TREMOR_ADJUST_THRESHOLD: f64 = 0.5;
    /// Resistance removed for high tremor
    pub const TREMOR_RESISTANCE_REDUCTION: u32 = 20;
    /// Resistance never drops below this
    pub const RESISTANCE_FLOOR: u32 = 30;
    /// Muscle activation below which strength work is added
    pub const LOW_ACTIVATION_THRESHOLD: f64 = 0.3;
    /// Balance index below which stability work is added
    pub const LOW_BALANCE_THRESHOLD: f64 = 2.0;
    /// Session length once strength work is added
    pub const EXTENDED_DURATION: &str = "30-35 minutes";

    /// Recommendation trigger
    pub const LOW_FLEXIBILITY_THRESHOLD: f64 = 0.5;
    /// Recommendation trigger
    pub const LOW_COORDINATION_THRESHOLD: f64 = 0.6;
    /// Recommendation trigger
    pub const TREMOR_ADVICE_THRESHOLD: f64 = 0.3;
    /// Recommendation trigger
    pub const HIGH_FATIGUE_THRESHOLD: f64 = 1.5;
    /// Tremor frequency that warrants a medical consultation
    pub const HIGH_TREMOR_FREQUENCY_HZ: f64 = 4.0;
    /// Highest level that gets the keep-exercising line
    pub const MAINTENANCE_MAX_LEVEL: i64 = 2;
    /// Lowest level that gets the therapist line
    pub const THERAPIST_MIN_LEVEL: i64 = 4;
}

/// Fixed-point export
pub mod export {
    /// File magic
    pub const MAGIC: [u8; 4] = *b"PDFX";
    /// Current layout version
    pub const FORMAT_VERSION: u8 = 2;
    /// Header bytes before the payload
    pub const HEADER_LEN: usize = 16;
    /// CRC-32 trailer bytes
    pub const TRAILER_LEN: usize = 4;
    /// Q16.16 unless configured
    pub const DEFAULT_FRACTIONAL_BITS: u8 = 16;
    /// Smallest accepted fractional bits
    pub const MIN_FRACTIONAL_BITS: u8 = 1;
    /// Largest accepted fractional bits
    pub const MAX_FRACTIONAL_BITS: u8 = 30;
    /// Mantissa width for the per-feature reciprocal std
    pub const NORM_MANTISSA_BITS: i32 = 30;
    /// Largest per-feature shift for the reciprocal std
    pub const MAX_NORM_SHIFT: i32 = 62;
}

/// File system paths
pub mod paths {
    /// Base configuration file
    pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
    /// Machine-local overrides
    pub const LOCAL_CONFIG_FILE: &str = "config/local.toml";
    /// Sensor model record
    pub const DEFAULT_MODEL_PATH: &str = "models/simple_parkinson_model.json";
    /// Environment override prefix
    pub const ENV_PREFIX: &str = "PDM_";
    /// Separates section and key in override names
    pub const ENV_SECTION_SEPARATOR: &str = "__";
}
