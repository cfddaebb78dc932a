// src/processing/features/streaming.rs
//! Sample-at-a-time extraction over non-overlapping windows
//!
//! Samples accumulate in a preallocated [`SampleBuffer`]. Extraction is only
//! possible once the buffer is exactly full, and always resets it, so
//! consecutive windows never overlap. Pushing into a full buffer fails with
//! `BufferOverflow` instead of discarding data.

use super::{FeatureExtractor, FeatureVector, SpeechExtractor, StatisticalExtractor};
use crate::acquisition::SampleBuffer;
use crate::config::SpeechSettings;
use crate::error::{PdError, PdResult};
use crate::error_context;
use tracing::debug;

/// Streaming wrapper around [`StatisticalExtractor`]
#[derive(Debug)]
pub struct StreamingSensorExtractor {
    buffer: SampleBuffer,
    extractor: StatisticalExtractor,
}

impl StreamingSensorExtractor {
    /// Buffer sized to the extractor window
    pub fn new(extractor: StatisticalExtractor) -> PdResult<Self> {
        let buffer = SampleBuffer::new(extractor.window_length(), extractor.channels())?;
        Ok(Self { buffer, extractor })
    }

    /// Append one multi-channel sample
    pub fn push_sample(&mut self, channels: &[f64]) -> PdResult<()> {
        self.buffer.push(channels)
    }

    /// Append a sample and extract if that completed the window
    pub fn push_and_extract(&mut self, channels: &[f64]) -> PdResult<Option<FeatureVector>> {
        self.push_sample(channels)?;
        if self.is_ready() {
            self.extract_and_reset().map(Some)
        } else {
            Ok(None)
        }
    }

    /// True once the window is full
    pub fn is_ready(&self) -> bool {
        self.buffer.is_ready()
    }

    /// Samples collected toward the current window
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Extract from the full buffer, then clear it
    ///
    /// A full buffer is cleared whether or not extraction succeeds.
    pub fn extract_and_reset(&mut self) -> PdResult<FeatureVector> {
        if !self.buffer.is_ready() {
            return Err(PdError::invalid_data(
                "sensor stream",
                format!("{} of {} samples collected", self.buffer.len(), self.buffer.capacity()),
                error_context!("streaming_sensor", "extract_and_reset"),
            ));
        }
        let features = self
            .buffer
            .to_window()
            .and_then(|window| self.extractor.extract(&window));
        self.buffer.reset();
        debug!(window = self.extractor.window_length(), "streaming sensor window extracted");
        features
    }

    /// Drop buffered samples
    pub fn reset(&mut self) {
        self.buffer.reset();
    }
}

/// Streaming wrapper around [`SpeechExtractor`]
#[derive(Debug)]
pub struct StreamingSpeechExtractor {
    buffer: SampleBuffer,
    extractor: SpeechExtractor,
}

impl StreamingSpeechExtractor {
    /// Buffer of `capacity` samples; must hold one frame
    pub fn new(extractor: SpeechExtractor, capacity: usize) -> PdResult<Self> {
        if capacity < extractor.config().frame_length {
            return Err(PdError::invalid_data(
                "speech buffer capacity",
                format!(
                    "capacity {} is shorter than one frame ({})",
                    capacity,
                    extractor.config().frame_length
                ),
                error_context!("streaming_speech", "new"),
            ));
        }
        Ok(Self {
            buffer: SampleBuffer::new(capacity, 1)?,
            extractor,
        })
    }

    /// Extractor and buffer sized from the `[speech]` settings
    pub fn from_config(settings: &SpeechSettings) -> PdResult<Self> {
        Self::new(SpeechExtractor::from_config(settings)?, settings.buffer_capacity)
    }

    /// Append one audio sample
    pub fn push_sample(&mut self, sample: f64) -> PdResult<()> {
        self.buffer.push_value(sample)
    }

    /// Append as many samples as fit; returns how many were consumed
    pub fn push_slice(&mut self, samples: &[f64]) -> PdResult<usize> {
        let room = self.buffer.capacity() - self.buffer.len();
        let take = room.min(samples.len());
        for &sample in &samples[..take] {
            self.buffer.push_value(sample)?;
        }
        Ok(take)
    }

    /// True once the window is full
    pub fn is_ready(&self) -> bool {
        self.buffer.is_ready()
    }

    /// Samples per extraction
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Extract from the full buffer, then clear it
    ///
    /// A full buffer is cleared whether or not extraction succeeds.
    pub fn extract_and_reset(&mut self) -> PdResult<FeatureVector> {
        let features = self.extractor.extract(self.buffer.as_full_slice()?);
        self.buffer.reset();
        debug!(capacity = self.buffer.capacity(), "streaming speech window extracted");
        features
    }

    /// Drop buffered samples
    pub fn reset(&mut self) {
        self.buffer.reset();
    }
}
