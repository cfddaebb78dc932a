// src/acquisition/mod.rs
//! Input shapes handed to the core by the collection layer

pub mod sample_buffer;
pub mod session;
pub mod window;

pub use sample_buffer::SampleBuffer;
pub use session::{SamplePoint, SessionRecord};
pub use window::{ModalityWindows, SensorWindow};
