// src/processing/analysis.rs
//! Sensor pattern analysis
//!
//! Model-independent symptom indicators computed directly from raw windows.
//! Each modality is optional and yields its own metric group; an absent
//! modality simply produces an absent group.

use crate::acquisition::{ModalityWindows, SensorWindow};
use crate::config::constants::analysis as k;
use crate::processing::stats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Finger flex indicators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FingerMetrics {
    /// Mean per-channel standard deviation
    pub flexibility: f64,
    /// Mean of the inter-finger correlation matrix
    pub coordination: f64,
    /// Thumb-pinky and index-ring correlation
    pub symmetry: f64,
    /// Variance of the first difference, averaged over channels
    pub tremor_index: f64,
}

/// EMG indicators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmgMetrics {
    /// Mean absolute EMG
    pub muscle_activation: f64,
    /// Last-quarter to first-quarter power ratio, at most 2
    pub fatigue_index: f64,
    /// Inverse EMG standard deviation
    pub control_stability: f64,
}

/// IMU indicators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuMetrics {
    /// Mean inverse jerk spread
    pub movement_smoothness: f64,
    /// Inverse spread of the acceleration magnitude
    pub balance_index: f64,
    /// Hz, from magnitude peak spacing at 100 Hz
    pub tremor_frequency: f64,
}

/// Symptom indicators grouped by modality
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SymptomMetrics {
    /// Present when finger channels were supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finger_analysis: Option<FingerMetrics>,
    /// Present when an EMG channel was supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emg_analysis: Option<EmgMetrics>,
    /// Present when IMU channels were supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imu_analysis: Option<ImuMetrics>,
}

impl SymptomMetrics {
    /// Finger tremor index, if analyzed
    pub fn tremor_index(&self) -> Option<f64> {
        self.finger_analysis.map(|m| m.tremor_index)
    }

    /// EMG activation, if analyzed
    pub fn muscle_activation(&self) -> Option<f64> {
        self.emg_analysis.map(|m| m.muscle_activation)
    }

    /// IMU balance index, if analyzed
    pub fn balance_index(&self) -> Option<f64> {
        self.imu_analysis.map(|m| m.balance_index)
    }

    /// Every present indicator by name
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        let mut map = BTreeMap::new();
        if let Some(f) = self.finger_analysis {
            map.insert("flexibility", f.flexibility);
            map.insert("coordination", f.coordination);
            map.insert("symmetry", f.symmetry);
            map.insert("tremor_index", f.tremor_index);
        }
        if let Some(e) = self.emg_analysis {
            map.insert("muscle_activation", e.muscle_activation);
            map.insert("fatigue_index", e.fatigue_index);
            map.insert("control_stability", e.control_stability);
        }
        if let Some(i) = self.imu_analysis {
            map.insert("movement_smoothness", i.movement_smoothness);
            map.insert("balance_index", i.balance_index);
            map.insert("tremor_frequency", i.tremor_frequency);
        }
        map
    }

    /// Single indicator by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.to_map().get(name).copied()
    }
}

/// Analyze every present modality
pub fn analyze(windows: &ModalityWindows) -> SymptomMetrics {
    let emg = match windows.emg.as_deref() {
        Some([]) => {
            debug!("empty EMG channel treated as absent");
            None
        }
        other => other,
    };
    SymptomMetrics {
        finger_analysis: windows.fingers.as_ref().map(analyze_fingers),
        emg_analysis: emg.map(analyze_emg),
        imu_analysis: windows.imu.as_ref().map(analyze_imu),
    }
}

fn columns(window: &SensorWindow) -> Vec<Vec<f64>> {
    window.channel_iter().map(|c| c.to_vec()).collect()
}

/// Finger indicators from a `[T, fingers]` window
pub fn analyze_fingers(window: &SensorWindow) -> FingerMetrics {
    let channels = columns(window);
    let count = channels.len();

    let flexibility = stats::mean(&channels.iter().map(|c| stats::std_dev(c)).collect::<Vec<_>>());

    // Mean of the full correlation matrix, diagonal included; constant channels correlate as 0
    let mut total = 0.0;
    for a in &channels {
        for b in &channels {
            total += stats::correlation(a, b);
        }
    }
    let coordination = total / (count * count) as f64;

    let symmetry = if count >= k::SYMMETRY_MIN_CHANNELS {
        let thumb_pinky = stats::correlation(&channels[0], &channels[4]).abs();
        let index_ring = stats::correlation(&channels[1], &channels[3]).abs();
        (thumb_pinky + index_ring) / 2.0
    } else {
        k::DEFAULT_SYMMETRY
    };

    // Short channels add nothing but still count in the denominator
    let tremor_sum: f64 = channels
        .iter()
        .filter(|c| c.len() > k::TREMOR_MIN_SAMPLES)
        .map(|c| stats::variance(&stats::diff(c)))
        .sum();
    let tremor_index = tremor_sum / count as f64;

    FingerMetrics {
        flexibility,
        coordination,
        symmetry,
        tremor_index,
    }
}

/// EMG indicators from one channel
pub fn analyze_emg(emg: &[f64]) -> EmgMetrics {
    let muscle_activation = stats::mean(&emg.iter().map(|x| x.abs()).collect::<Vec<_>>());

    let fatigue_index = if emg.len() < k::FATIGUE_MIN_SAMPLES {
        k::DEFAULT_FATIGUE
    } else {
        let quarter = emg.len() / 4;
        let power = |s: &[f64]| stats::mean(&s.iter().map(|x| x * x).collect::<Vec<_>>());
        let early = power(&emg[..quarter]);
        let late = power(&emg[emg.len() - quarter..]);
        (late / (early + k::EPSILON)).min(k::FATIGUE_CAP)
    };

    let control_stability = 1.0 / (stats::std_dev(emg) + k::EPSILON);

    EmgMetrics {
        muscle_activation,
        fatigue_index,
        control_stability,
    }
}

/// IMU indicators from a `[T, axes]` window
pub fn analyze_imu(window: &SensorWindow) -> ImuMetrics {
    let channels = columns(window);
    let count = channels.len();

    let smoothness_sum: f64 = channels
        .iter()
        .filter(|c| c.len() > k::SMOOTHNESS_MIN_SAMPLES)
        .map(|c| 1.0 / (stats::std_dev(&stats::diff(&stats::diff(c))) + k::EPSILON))
        .sum();
    let movement_smoothness = smoothness_sum / count as f64;

    // A single channel is treated as an already-combined magnitude
    let magnitude: Vec<f64> = if count == 1 {
        channels[0].clone()
    } else {
        window
            .sample_iter()
            .map(|s| s.iter().map(|v| v * v).sum::<f64>().sqrt())
            .collect()
    };

    let balance_index = if count == 1 {
        1.0 / (stats::std_dev(&magnitude) + k::EPSILON)
    } else {
        (1.0 / (stats::std_dev(&magnitude) + k::EPSILON)).min(k::BALANCE_CAP)
    };

    ImuMetrics {
        movement_smoothness,
        balance_index,
        tremor_frequency: tremor_frequency(&magnitude),
    }
}

/// Dominant oscillation rate in Hz, assuming the fixed analyzer sampling rate
pub fn tremor_frequency(signal: &[f64]) -> f64 {
    if signal.len() < k::TREMOR_FREQUENCY_MIN_SAMPLES {
        return 0.0;
    }
    let peaks: Vec<usize> = (1..signal.len() - 1)
        .filter(|&i| signal[i] > signal[i - 1] && signal[i] > signal[i + 1])
        .collect();
    if peaks.len() < k::TREMOR_FREQUENCY_MIN_PEAKS {
        return 0.0;
    }
    let intervals: Vec<f64> = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    k::TREMOR_SAMPLING_RATE_HZ / stats::mean(&intervals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(rows: Vec<Vec<f64>>) -> SensorWindow {
        SensorWindow::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_all_zero_window() {
        let fingers = window(vec![vec![0.0; 5]; 50]);
        let metrics = analyze_fingers(&fingers);
        assert_eq!(metrics.tremor_index, 0.0);
        assert_eq!(metrics.flexibility, 0.0);
        assert_eq!(metrics.coordination, 0.0);
        assert_eq!(metrics.symmetry, 0.0);

        let imu = analyze_imu(&window(vec![vec![0.0; 3]; 50]));
        assert_eq!(imu.balance_index, 10.0);
        assert_eq!(imu.tremor_frequency, 0.0);
    }

    #[test]
    fn test_symmetry_default_below_five_channels() {
        let rows: Vec<Vec<f64>> = (0..20).map(|t| vec![t as f64, (t * 2) as f64, 1.0]).collect();
        assert_eq!(analyze_fingers(&window(rows)).symmetry, 0.5);
    }

    #[test]
    fn test_tremor_index_short_channels_contribute_zero() {
        let rows: Vec<Vec<f64>> = (0..10).map(|t| vec![(t % 2) as f64; 2]).collect();
        assert_eq!(analyze_fingers(&window(rows)).tremor_index, 0.0);

        // 11 samples alternating 0,1: diffs alternate +1,-1 -> variance 1
        let rows: Vec<Vec<f64>> = (0..11).map(|t| vec![(t % 2) as f64, 0.0]).collect();
        assert!((analyze_fingers(&window(rows)).tremor_index - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_coordination_perfectly_correlated() {
        let rows: Vec<Vec<f64>> = (0..20).map(|t| vec![t as f64, 2.0 * t as f64]).collect();
        assert!((analyze_fingers(&window(rows)).coordination - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fatigue_capped_and_default() {
        let mut emg = vec![0.01; 40];
        for v in emg.iter_mut().skip(30) {
            *v = 100.0;
        }
        assert_eq!(analyze_emg(&emg).fatigue_index, 2.0);
        assert_eq!(analyze_emg(&[1.0; 9]).fatigue_index, 0.5);
    }

    #[test]
    fn test_emg_activation_and_stability() {
        let metrics = analyze_emg(&[1.0, -1.0, 1.0, -1.0]);
        assert_eq!(metrics.muscle_activation, 1.0);
        assert!((metrics.control_stability - 1.0 / (1.0 + 1e-6)).abs() < 1e-12);
    }

    #[test]
    fn test_single_channel_balance_uncapped() {
        let imu = window(vec![vec![1.0]; 30]);
        let metrics = analyze_imu(&imu);
        assert!((metrics.balance_index - 1e6).abs() < 1e-3);
    }

    #[test]
    fn test_tremor_frequency_from_peaks() {
        // Peak every 20 samples at 100 Hz -> 5 Hz
        let signal: Vec<f64> = (0..100)
            .map(|t| (2.0 * std::f64::consts::PI * t as f64 / 20.0 + 0.3).sin())
            .collect();
        assert!((tremor_frequency(&signal) - 5.0).abs() < 1e-9);
        assert_eq!(tremor_frequency(&signal[..19]), 0.0);
    }

    #[test]
    fn test_absent_modalities() {
        let metrics = analyze(&ModalityWindows {
            fingers: None,
            emg: Some(vec![0.5; 20]),
            imu: None,
        });
        assert!(metrics.finger_analysis.is_none());
        assert!(metrics.imu_analysis.is_none());
        assert_eq!(metrics.muscle_activation(), Some(0.5));
        assert_eq!(metrics.get("tremor_index"), None);

        let json = serde_json::to_value(metrics).unwrap();
        assert!(json.get("finger_analysis").is_none());
        assert!(json["emg_analysis"]["fatigue_index"].is_number());
    }
}
