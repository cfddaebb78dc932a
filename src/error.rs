// src/error.rs
//! Unified error handling for the monitoring core
//!
//! Every fallible operation in the crate returns [`PdResult`]. Structural
//! problems (wrong window shape, a model record that disagrees with itself, a
//! full streaming buffer) surface as [`PdError`] values carrying an
//! [`ErrorContext`] that records where they were raised. Numeric degeneracies
//! inside feature formulas never reach this type: they are replaced by
//! documented defaults at the point of computation.

use std::fmt;
use thiserror::Error;

/// Unified error type for the monitoring core
#[derive(Debug, Error)]
pub enum PdError {
    /// A feature vector, window or parameter block has the wrong dimensions
    #[error("[SHAPE] {what}: expected {expected}, got {actual} ({context})")]
    ShapeMismatch {
        /// What was being measured (e.g. "feature vector length")
        what: String,
        /// Declared size
        expected: usize,
        /// Observed size
        actual: usize,
        /// Where the mismatch was detected
        context: ErrorContext,
    },

    /// A model record is malformed, incomplete or of an unsupported type
    #[error("[MODEL] Failed to load model: {reason} ({context})")]
    ModelLoad {
        /// Human readable cause
        reason: String,
        /// Where loading failed
        context: ErrorContext,
    },

    /// A fixed-capacity buffer was asked to hold more than it can
    #[error("[BUFFER] Overflow: tried to write sample {attempted} into {capacity}-sample buffer ({context})")]
    BufferOverflow {
        /// Declared capacity
        capacity: usize,
        /// Index of the rejected write (1-based count)
        attempted: usize,
        /// Where the overflow occurred
        context: ErrorContext,
    },

    /// Input data that cannot be processed at all
    #[error("[DATA] Invalid {data_type}: {reason} ({context})")]
    InvalidData {
        /// Kind of data rejected
        data_type: String,
        /// Why it was rejected
        reason: String,
        /// Where it was rejected
        context: ErrorContext,
    },

    /// Configuration failed validation
    #[error("[CONFIG] Configuration error in {component}: {reason}")]
    Configuration {
        /// Config section or component
        component: String,
        /// Validation failure
        reason: String,
    },

    /// A parameter cannot be represented in the requested fixed-point format
    #[error("[QUANT] {reason} ({context})")]
    Quantization {
        /// Offending value description
        reason: String,
        /// Where quantization failed
        context: ErrorContext,
    },

    /// Watcher setup or event delivery failure
    #[error("[WATCH] {0}")]
    Watcher(String),

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON encode/decode failure
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML parse failure
    #[error(transparent)]
    TomlParse(#[from] toml::de::Error),
}

/// Location information attached to structured errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Component that raised the error
    pub component: &'static str,
    /// Operation in progress
    pub operation: &'static str,
    /// Source file, when created through [`error_context!`](crate::error_context)
    pub file: Option<&'static str>,
    /// Source line, when created through [`error_context!`](crate::error_context)
    pub line: Option<u32>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &'static str, operation: &'static str) -> Self {
        Self {
            component,
            operation,
            file: None,
            line: None,
        }
    }

    /// Create error context with file and line information
    pub fn with_location(
        component: &'static str,
        operation: &'static str,
        file: &'static str,
        line: u32,
    ) -> Self {
        Self {
            component,
            operation,
            file: Some(file),
            line: Some(line),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.file, self.line) {
            (Some(file), Some(line)) => {
                write!(f, "{}::{} at {}:{}", self.component, self.operation, file, line)
            }
            _ => write!(f, "{}::{}", self.component, self.operation),
        }
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

/// Result type alias for monitoring-core operations
pub type PdResult<T> = Result<T, PdError>;

impl PdError {
    /// Shape mismatch raised at the current location
    pub fn shape(what: impl Into<String>, expected: usize, actual: usize, context: ErrorContext) -> Self {
        PdError::ShapeMismatch {
            what: what.into(),
            expected,
            actual,
            context,
        }
    }

    /// Model-load failure raised at the current location
    pub fn model_load(reason: impl Into<String>, context: ErrorContext) -> Self {
        PdError::ModelLoad {
            reason: reason.into(),
            context,
        }
    }

    /// Invalid-data failure raised at the current location
    pub fn invalid_data(data_type: impl Into<String>, reason: impl Into<String>, context: ErrorContext) -> Self {
        PdError::InvalidData {
            data_type: data_type.into(),
            reason: reason.into(),
            context,
        }
    }

    /// True for failures the caller cannot fix by retrying with other input
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PdError::ModelLoad { .. } | PdError::Quantization { .. } | PdError::Configuration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("scorer", "score");
        assert_eq!(context.component, "scorer");
        assert_eq!(context.operation, "score");
        assert!(context.file.is_none());
    }

    #[test]
    fn test_error_context_macro_records_location() {
        let context = error_context!("record", "load");
        assert_eq!(context.file, Some(file!()));
        assert!(context.line.is_some());
        assert!(context.to_string().starts_with("record::load at "));
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = PdError::shape("weights length", 54, 36, ErrorContext::new("record", "validate"));
        let display = format!("{}", err);
        assert!(display.contains("weights length"));
        assert!(display.contains("54"));
        assert!(display.contains("36"));
    }

    #[test]
    fn test_buffer_overflow_display() {
        let err = PdError::BufferOverflow {
            capacity: 1024,
            attempted: 1025,
            context: ErrorContext::new("sample_buffer", "push"),
        };
        let display = format!("{}", err);
        assert!(display.contains("1024"));
        assert!(display.contains("1025"));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PdError>();
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing model");
        let err: PdError = io.into();
        assert!(matches!(err, PdError::Io(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatal_classification() {
        let err = PdError::model_load("unknown model type", ErrorContext::new("record", "load"));
        assert!(err.is_fatal());
    }
}
