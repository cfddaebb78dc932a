// src/acquisition/session.rs
//! Session records produced by the external collection layer
//!
//! Only `fingers`, `emg` and `imu` are interpreted. Every other field, at the
//! session or the sample level, is carried through untouched in `extra`.

use crate::acquisition::window::{ModalityWindows, SensorWindow};
use crate::config::constants::window;
use crate::error::{PdError, PdResult};
use crate::error_context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One telemetry sample from the glove
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    /// Five finger flex readings, thumb first
    pub fingers: Vec<f64>,
    /// Single EMG reading
    pub emg: f64,
    /// Three IMU axes
    pub imu: Vec<f64>,
    /// Opaque per-sample metadata (timestamps and the like)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SamplePoint {
    /// Channel vector in device order: fingers, EMG, IMU
    pub fn channels(&self) -> Vec<f64> {
        let mut channels = Vec::with_capacity(window::DEFAULT_CHANNELS);
        channels.extend_from_slice(&self.fingers);
        channels.push(self.emg);
        channels.extend_from_slice(&self.imu);
        channels
    }

    fn validate(&self, index: usize) -> PdResult<()> {
        if self.fingers.len() != window::FINGER_CHANNELS {
            return Err(PdError::shape(
                format!("finger readings in sample {}", index),
                window::FINGER_CHANNELS,
                self.fingers.len(),
                error_context!("session", "validate"),
            ));
        }
        if self.imu.len() != window::IMU_AXES {
            return Err(PdError::shape(
                format!("IMU axes in sample {}", index),
                window::IMU_AXES,
                self.imu.len(),
                error_context!("session", "validate"),
            ));
        }
        Ok(())
    }
}

/// A recorded session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Subject identifier
    pub patient_id: String,
    /// Clinician-assigned level, when known
    #[serde(default)]
    pub parkinson_level: Option<i64>,
    /// Collection start, as written by the collector
    #[serde(default)]
    pub session_time: Option<String>,
    /// Session length in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Sample count reported by the collector
    #[serde(default)]
    pub data_points: Option<usize>,
    /// Samples in collection order
    pub data: Vec<SamplePoint>,
    /// Opaque session metadata
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionRecord {
    /// Parse and validate a session from JSON text
    pub fn from_json_str(json: &str) -> PdResult<Self> {
        let record: SessionRecord = serde_json::from_str(json)?;
        record.validate()?;
        Ok(record)
    }

    /// Read and validate a session file
    pub fn load<P: AsRef<Path>>(path: P) -> PdResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check every sample carries the expected modality widths
    pub fn validate(&self) -> PdResult<()> {
        self.data
            .iter()
            .enumerate()
            .try_for_each(|(index, sample)| sample.validate(index))
    }

    /// Whole session as one `T x 9` window
    pub fn to_sensor_window(&self) -> PdResult<SensorWindow> {
        self.slice_window(0, self.data.len())
    }

    /// Whole session split by modality
    pub fn to_modality_windows(&self) -> PdResult<ModalityWindows> {
        ModalityWindows::from_device_window(&self.to_sensor_window()?)
    }

    /// Windows of `length` samples starting every `stride` samples
    ///
    /// A trailing partial window is dropped.
    pub fn windows(&self, length: usize, stride: usize) -> PdResult<Vec<SensorWindow>> {
        if length == 0 || stride == 0 {
            return Err(PdError::invalid_data(
                "window slicing",
                format!("length and stride must be positive, got {} and {}", length, stride),
                error_context!("session", "windows"),
            ));
        }
        if self.data.len() < length {
            return Ok(Vec::new());
        }
        (0..=self.data.len() - length)
            .step_by(stride)
            .map(|start| self.slice_window(start, length))
            .collect()
    }

    fn slice_window(&self, start: usize, length: usize) -> PdResult<SensorWindow> {
        let samples = &self.data[start..start + length];
        for (offset, sample) in samples.iter().enumerate() {
            sample.validate(start + offset)?;
        }
        let flat: Vec<f64> = samples.iter().flat_map(SamplePoint::channels).collect();
        SensorWindow::from_flat(length, window::DEFAULT_CHANNELS, flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_json(samples: usize) -> String {
        let data: Vec<String> = (0..samples)
            .map(|i| {
                format!(
                    r#"{{"timestamp": {}, "fingers": [1,2,3,4,{}], "emg": 0.5, "imu": [0.1,0.2,9.8]}}"#,
                    i, i
                )
            })
            .collect();
        format!(
            r#"{{"patient_id": "P001", "parkinson_level": null, "session_time": "2024-01-01T10:00:00",
                "duration": 1.0, "data_points": {}, "device": "glove-v2", "data": [{}]}}"#,
            samples,
            data.join(",")
        )
    }

    #[test]
    fn test_parse_preserves_extra_fields() {
        let session = SessionRecord::from_json_str(&session_json(3)).unwrap();
        assert_eq!(session.patient_id, "P001");
        assert_eq!(session.parkinson_level, None);
        assert_eq!(session.extra["device"], "glove-v2");
        assert_eq!(session.data[2].extra["timestamp"], 2);

        let round_trip = serde_json::to_value(&session).unwrap();
        assert_eq!(round_trip["device"], "glove-v2");
        assert_eq!(round_trip["data"][1]["timestamp"], 1);
    }

    #[test]
    fn test_wrong_finger_count_rejected() {
        let json = r#"{"patient_id": "P", "data": [{"fingers": [1,2,3], "emg": 0, "imu": [0,0,0]}]}"#;
        assert!(matches!(
            SessionRecord::from_json_str(json),
            Err(PdError::ShapeMismatch { expected: 5, actual: 3, .. })
        ));
    }

    #[test]
    fn test_channel_order() {
        let session = SessionRecord::from_json_str(&session_json(2)).unwrap();
        let window = session.to_sensor_window().unwrap();
        assert_eq!(window.channels(), 9);
        assert_eq!(window.channel(4)[1], 1.0);
        assert_eq!(window.channel(5)[0], 0.5);
        assert_eq!(window.channel(8)[0], 9.8);
    }

    #[test]
    fn test_sliding_windows() {
        let session = SessionRecord::from_json_str(&session_json(55)).unwrap();
        let windows = session.windows(50, 1).unwrap();
        assert_eq!(windows.len(), 6);
        assert_eq!(windows[5].channel(4)[0], 5.0);

        let coarse = session.windows(50, 10).unwrap();
        assert_eq!(coarse.len(), 1);
        assert!(session.windows(60, 1).unwrap().is_empty());
    }
}
