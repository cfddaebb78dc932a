// src/acquisition/sample_buffer.rs
//! Fixed-capacity frame buffer for the streaming extractors
//!
//! Storage is allocated once. The buffer becomes ready when exactly
//! `capacity` frames have been written since the last reset; writing past that
//! point is an error and never overwrites or drops data.

use crate::acquisition::window::SensorWindow;
use crate::error::{PdError, PdResult};
use crate::error_context;

/// Preallocated buffer of `capacity` frames of `width` values each
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    storage: Box<[f64]>,
    capacity: usize,
    width: usize,
    written: usize,
}

impl SampleBuffer {
    /// Create a buffer holding `capacity` frames of `width` channels
    pub fn new(capacity: usize, width: usize) -> PdResult<Self> {
        if capacity == 0 || width == 0 {
            return Err(PdError::invalid_data(
                "sample buffer geometry",
                format!("capacity and width must be positive, got {}x{}", capacity, width),
                error_context!("sample_buffer", "new"),
            ));
        }
        Ok(Self {
            storage: vec![0.0; capacity * width].into_boxed_slice(),
            capacity,
            width,
            written: 0,
        })
    }

    /// Append one frame
    ///
    /// NaN and infinite values are rejected with `InvalidData` and the
    /// frame is not written.
    pub fn push(&mut self, frame: &[f64]) -> PdResult<()> {
        if frame.len() != self.width {
            return Err(PdError::shape(
                "frame width",
                self.width,
                frame.len(),
                error_context!("sample_buffer", "push"),
            ));
        }
        if let Some(channel) = frame.iter().position(|v| !v.is_finite()) {
            return Err(PdError::invalid_data(
                "sample frame",
                format!("non-finite value in channel {}", channel),
                error_context!("sample_buffer", "push"),
            ));
        }
        if self.written == self.capacity {
            return Err(PdError::BufferOverflow {
                capacity: self.capacity,
                attempted: self.written + 1,
                context: error_context!("sample_buffer", "push"),
            });
        }
        let start = self.written * self.width;
        self.storage[start..start + self.width].copy_from_slice(frame);
        self.written += 1;
        Ok(())
    }

    /// Append a single value to a one-channel buffer
    pub fn push_value(&mut self, value: f64) -> PdResult<()> {
        self.push(std::slice::from_ref(&value))
    }

    /// True once exactly `capacity` frames have been written
    pub fn is_ready(&self) -> bool {
        self.written == self.capacity
    }

    /// Frames written since the last reset
    pub fn len(&self) -> usize {
        self.written
    }

    /// True when nothing has been written since the last reset
    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Frames per window
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Values per frame
    pub fn width(&self) -> usize {
        self.width
    }

    /// Contents of a full buffer, sample-major
    pub fn as_full_slice(&self) -> PdResult<&[f64]> {
        if !self.is_ready() {
            return Err(PdError::invalid_data(
                "sample buffer",
                format!("buffer holds {} of {} frames", self.written, self.capacity),
                error_context!("sample_buffer", "as_full_slice"),
            ));
        }
        Ok(&self.storage)
    }

    /// Copy a full buffer into a window
    pub fn to_window(&self) -> PdResult<SensorWindow> {
        let values = self.as_full_slice()?.to_vec();
        SensorWindow::from_flat(self.capacity, self.width, values)
    }

    /// Forget all written frames
    pub fn reset(&mut self) {
        self.storage.fill(0.0);
        self.written = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_only_when_exactly_full() {
        let mut buffer = SampleBuffer::new(4, 1).unwrap();
        for i in 0..3 {
            buffer.push_value(i as f64).unwrap();
            assert!(!buffer.is_ready());
        }
        buffer.push_value(3.0).unwrap();
        assert!(buffer.is_ready());
        assert_eq!(buffer.as_full_slice().unwrap(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_overflow_is_error() {
        let mut buffer = SampleBuffer::new(2, 1).unwrap();
        buffer.push_value(1.0).unwrap();
        buffer.push_value(2.0).unwrap();
        assert!(matches!(
            buffer.push_value(3.0),
            Err(PdError::BufferOverflow { capacity: 2, attempted: 3, .. })
        ));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_reset_restarts_window() {
        let mut buffer = SampleBuffer::new(2, 2).unwrap();
        buffer.push(&[1.0, 2.0]).unwrap();
        buffer.push(&[3.0, 4.0]).unwrap();
        buffer.reset();
        assert!(buffer.is_empty());
        assert!(buffer.as_full_slice().is_err());
        buffer.push(&[5.0, 6.0]).unwrap();
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_frame_width_checked() {
        let mut buffer = SampleBuffer::new(2, 3).unwrap();
        assert!(matches!(
            buffer.push(&[1.0]),
            Err(PdError::ShapeMismatch { expected: 3, actual: 1, .. })
        ));
    }

    #[test]
    fn test_non_finite_frame_rejected() {
        let mut buffer = SampleBuffer::new(2, 2).unwrap();
        assert!(matches!(
            buffer.push(&[1.0, f64::NAN]),
            Err(PdError::InvalidData { .. })
        ));
        assert!(buffer.push_value(f64::INFINITY).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_to_window() {
        let mut buffer = SampleBuffer::new(2, 2).unwrap();
        buffer.push(&[1.0, 2.0]).unwrap();
        buffer.push(&[3.0, 4.0]).unwrap();
        let window = buffer.to_window().unwrap();
        assert_eq!(window.channel(1).to_vec(), vec![2.0, 4.0]);
    }
}
