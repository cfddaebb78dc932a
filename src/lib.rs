//! PD-Monitor Core: symptom scoring and training plans for Parkinson's monitoring
//!
//! This library turns fixed-length sensor or voice windows from a wearable
//! glove into severity estimates and personalized exercise plans. It provides:
//!
//! - Statistical and acoustic feature extraction, including streaming buffers
//! - Linear severity scoring with JSON and fixed-point model records
//! - Model-independent symptom metrics from raw finger, EMG and IMU channels
//! - Rule-based training plans and recommendations
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pd_monitor_core::{AssessmentPipeline, ModelRegistry, SessionRecord, SystemConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SystemConfig::default();
//!     let registry = ModelRegistry::from_settings(&config.model)?;
//!     let pipeline = AssessmentPipeline::from_config(&config);
//!
//!     let session = SessionRecord::load("data/session_P001.json")?;
//!     for assessment in pipeline.assess_session(registry.current().as_ref(), &session)? {
//!         println!("{}", assessment);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod assessment;
pub mod config;
pub mod error;
pub mod inference;
pub mod planning;
pub mod processing;

// Re-export commonly used types for convenience
pub use acquisition::{ModalityWindows, SampleBuffer, SensorWindow, SessionRecord};
pub use assessment::{generate_assessment, Assessment, AssessmentPipeline};
pub use config::{ConfigLoader, SystemConfig};
pub use error::{ErrorContext, PdError, PdResult};
pub use inference::{
    export_fixed_point, export_fixed_point_with, import_fixed_point, load_model, save_model,
    ModelHandle, ModelRegistry, Prediction, Scorer, ScorerModel,
};
pub use planning::{generate_plan, generate_recommendations, SeverityLevel, TrainingPlan};
pub use processing::{
    analyze, FeatureExtractor, FeatureVector, SpeechExtractor, StatisticalExtractor, SymptomMetrics,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    let mut features = vec![
        "Statistical and speech feature extraction".to_string(),
        "Linear severity scoring".to_string(),
        "Fixed-point model export".to_string(),
        "Rule-based training plans".to_string(),
    ];
    if cfg!(feature = "hot-reload") {
        features.push("Model hot reload".to_string());
    }
    if cfg!(feature = "parallel") {
        features.push("Parallel batch assessment".to_string());
    }
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Symptom scoring and training-plan core for Parkinson's monitoring".to_string(),
        features,
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// Enabled capabilities
    pub features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert_eq!(info.name, NAME);
        assert_eq!(info.version, VERSION);
        assert!(info.features.len() >= 4);
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "pd-monitor-core");
    }
}
