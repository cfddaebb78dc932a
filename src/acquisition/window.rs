// src/acquisition/window.rs
//! Fixed-shape sensor windows

use crate::config::constants::window;
use crate::error::{PdError, PdResult};
use crate::error_context;
use ndarray::{Array2, ArrayView1, Axis};

/// `T` samples of `C` channels, stored sample-major
///
/// Construction rejects ragged rows, empty windows and non-finite samples,
/// so every extractor downstream can assume a well-formed rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorWindow {
    data: Array2<f64>,
}

impl SensorWindow {
    /// Build from per-sample rows
    pub fn from_rows(rows: &[Vec<f64>]) -> PdResult<Self> {
        let length = rows.len();
        let channels = rows.first().map(Vec::len).unwrap_or(0);

        for (index, row) in rows.iter().enumerate() {
            if row.len() != channels {
                return Err(PdError::shape(
                    format!("channel count of sample {}", index),
                    channels,
                    row.len(),
                    error_context!("window", "from_rows"),
                ));
            }
        }

        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::from_flat(length, channels, flat)
    }

    /// Build from a sample-major flat buffer of `length * channels` values
    pub fn from_flat(length: usize, channels: usize, values: Vec<f64>) -> PdResult<Self> {
        if length == 0 || channels == 0 {
            return Err(PdError::invalid_data(
                "sensor window",
                format!("window must be non-empty, got {}x{}", length, channels),
                error_context!("window", "from_flat"),
            ));
        }
        if let Some(position) = values.iter().position(|v| !v.is_finite()) {
            return Err(PdError::invalid_data(
                "sensor window",
                format!(
                    "non-finite value at sample {} channel {}",
                    position / channels,
                    position % channels
                ),
                error_context!("window", "from_flat"),
            ));
        }
        let actual = values.len();
        let data = Array2::from_shape_vec((length, channels), values).map_err(|_| {
            PdError::shape(
                "window value count",
                length * channels,
                actual,
                error_context!("window", "from_flat"),
            )
        })?;
        Ok(Self { data })
    }

    /// Build a single-channel window
    pub fn from_channel(values: Vec<f64>) -> PdResult<Self> {
        let length = values.len();
        Self::from_flat(length, 1, values)
    }

    /// Number of samples (T)
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Always false; empty windows cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of channels (C)
    pub fn channels(&self) -> usize {
        self.data.ncols()
    }

    /// All samples of one channel
    pub fn channel(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.column(index)
    }

    /// Iterate channels in order
    pub fn channel_iter(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.data.axis_iter(Axis(1))
    }

    /// Iterate samples in order
    pub fn sample_iter(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.data.axis_iter(Axis(0))
    }

    /// Underlying `T x C` matrix
    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    /// Copy of channels `start..start + count`
    pub fn select_channels(&self, start: usize, count: usize) -> PdResult<Self> {
        if count == 0 || start + count > self.channels() {
            return Err(PdError::shape(
                "channel range end",
                self.channels(),
                start + count,
                error_context!("window", "select_channels"),
            ));
        }
        let data = self
            .data
            .slice(ndarray::s![.., start..start + count])
            .to_owned();
        Ok(Self { data })
    }

    /// Reject windows whose shape differs from the model geometry
    pub fn ensure_shape(&self, length: usize, channels: usize) -> PdResult<()> {
        if self.len() != length {
            return Err(PdError::shape(
                "window length",
                length,
                self.len(),
                error_context!("window", "ensure_shape"),
            ));
        }
        if self.channels() != channels {
            return Err(PdError::shape(
                "window channel count",
                channels,
                self.channels(),
                error_context!("window", "ensure_shape"),
            ));
        }
        Ok(())
    }
}

/// Per-modality slices of one observation epoch
///
/// Any modality may be absent; the analyzer reports absent metric groups for
/// those rather than failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModalityWindows {
    /// Finger flex channels (normally 5)
    pub fingers: Option<SensorWindow>,
    /// Single EMG channel
    pub emg: Option<Vec<f64>>,
    /// IMU axes (normally 3), or a single pre-combined channel
    pub imu: Option<SensorWindow>,
}

impl ModalityWindows {
    /// Split a combined device window laid out as fingers, EMG, IMU
    pub fn from_device_window(window: &SensorWindow) -> PdResult<Self> {
        let expected = window::IMU_FIRST_CHANNEL + window::IMU_AXES;
        if window.channels() != expected {
            return Err(PdError::shape(
                "device window channel count",
                expected,
                window.channels(),
                error_context!("window", "from_device_window"),
            ));
        }
        Ok(Self {
            fingers: Some(window.select_channels(0, window::FINGER_CHANNELS)?),
            emg: Some(window.channel(window::EMG_CHANNEL).to_vec()),
            imu: Some(window.select_channels(window::IMU_FIRST_CHANNEL, window::IMU_AXES)?),
        })
    }

    /// True when no modality is present
    pub fn is_empty(&self) -> bool {
        self.fingers.is_none() && self.emg.is_none() && self.imu.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(length: usize, channels: usize) -> SensorWindow {
        let rows: Vec<Vec<f64>> = (0..length)
            .map(|t| (0..channels).map(|c| (t * channels + c) as f64).collect())
            .collect();
        SensorWindow::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            SensorWindow::from_rows(&rows),
            Err(PdError::ShapeMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_empty_and_non_finite_rejected() {
        assert!(matches!(SensorWindow::from_rows(&[]), Err(PdError::InvalidData { .. })));
        let rows = vec![vec![1.0, f64::NAN]];
        assert!(matches!(SensorWindow::from_rows(&rows), Err(PdError::InvalidData { .. })));
    }

    #[test]
    fn test_channel_access() {
        let window = ramp(4, 3);
        assert_eq!(window.len(), 4);
        assert_eq!(window.channels(), 3);
        assert_eq!(window.channel(1).to_vec(), vec![1.0, 4.0, 7.0, 10.0]);
    }

    #[test]
    fn test_ensure_shape() {
        let window = ramp(50, 9);
        assert!(window.ensure_shape(50, 9).is_ok());
        assert!(matches!(
            window.ensure_shape(50, 8),
            Err(PdError::ShapeMismatch { expected: 8, actual: 9, .. })
        ));
    }

    #[test]
    fn test_device_window_split() {
        let window = ramp(10, 9);
        let modalities = ModalityWindows::from_device_window(&window).unwrap();
        let fingers = modalities.fingers.unwrap();
        let imu = modalities.imu.unwrap();
        assert_eq!(fingers.channels(), 5);
        assert_eq!(imu.channels(), 3);
        assert_eq!(modalities.emg.unwrap()[0], 5.0);
        assert_eq!(imu.channel(0)[0], 6.0);
    }
}
