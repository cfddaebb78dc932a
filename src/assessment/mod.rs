// src/assessment/mod.rs
//! End-to-end assessment
//!
//! One window in, one [`Assessment`] out: statistical features are scored by
//! the model in service while the raw window is analyzed for symptom metrics,
//! and both feed the training plan and recommendations.

use crate::acquisition::{ModalityWindows, SensorWindow, SessionRecord};
use crate::config::SystemConfig;
use crate::error::{PdError, PdResult};
use crate::error_context;
use crate::inference::Scorer;
use crate::planning::{generate_plan, generate_recommendations, SeverityLevel, TrainingPlan};
use crate::processing::{analyze, FeatureExtractor, StatisticalExtractor, SymptomMetrics};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

const REPORT_RULE: &str = "==================================================";

/// Output record handed to reporting and storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Subject identifier
    pub patient_id: String,
    /// RFC 3339 in JSON
    pub assessment_time: DateTime<Utc>,
    /// Severity level the plan was built for
    pub predicted_level: i64,
    /// Scorer confidence in the predicted level
    pub confidence: f64,
    /// Model-independent indicators
    pub symptom_analysis: SymptomMetrics,
    /// Adjusted plan
    pub training_plan: TrainingPlan,
    /// Ordered advice lines
    pub recommendations: Vec<String>,
}

impl Assessment {
    /// Indented JSON record
    pub fn to_json_pretty(&self) -> PdResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Named severity, when the predicted level is on the clinical scale
    pub fn severity(&self) -> Option<SeverityLevel> {
        SeverityLevel::from_level(self.predicted_level)
    }
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", REPORT_RULE)?;
        writeln!(f, "Parkinson's symptom assessment")?;
        writeln!(f, "{}", REPORT_RULE)?;
        writeln!(f, "Patient ID: {}", self.patient_id)?;
        writeln!(
            f,
            "Assessment time: {}",
            self.assessment_time.to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
        match self.severity() {
            Some(level) => writeln!(f, "Predicted level: {}", level)?,
            None => writeln!(f, "Predicted level: {}", self.predicted_level)?,
        }
        writeln!(f, "Confidence: {:.3}", self.confidence)?;

        if let Some(fingers) = self.symptom_analysis.finger_analysis {
            writeln!(f)?;
            writeln!(f, "Symptom analysis:")?;
            writeln!(f, "  Finger flexibility: {:.3}", fingers.flexibility)?;
            writeln!(f, "  Coordination: {:.3}", fingers.coordination)?;
            writeln!(f, "  Tremor index: {:.3}", fingers.tremor_index)?;
        }

        let plan = &self.training_plan;
        writeln!(f)?;
        writeln!(f, "Training plan:")?;
        writeln!(f, "  Duration: {}", plan.duration)?;
        writeln!(f, "  Intensity: {}", plan.intensity)?;
        writeln!(f, "  Servo resistance: {} degrees", plan.resistance)?;
        writeln!(f, "  Frequency: {}", plan.frequency)?;
        writeln!(f, "  Exercises: {}", plan.exercises.join(", "))?;

        writeln!(f)?;
        writeln!(f, "Recommendations:")?;
        for (i, line) in self.recommendations.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, line)?;
        }
        write!(f, "{}", REPORT_RULE)
    }
}

/// Assemble an assessment for a level produced elsewhere
pub fn generate_assessment(
    patient_id: &str,
    predicted_level: i64,
    confidence: f64,
    windows: &ModalityWindows,
) -> Assessment {
    let symptom_analysis = analyze(windows);
    Assessment {
        patient_id: patient_id.to_string(),
        assessment_time: Utc::now(),
        predicted_level,
        confidence,
        training_plan: generate_plan(predicted_level, &symptom_analysis),
        recommendations: generate_recommendations(predicted_level, &symptom_analysis),
        symptom_analysis,
    }
}

/// Feature extraction, scoring and planning for device windows
#[derive(Debug, Clone)]
pub struct AssessmentPipeline {
    extractor: StatisticalExtractor,
}

impl AssessmentPipeline {
    /// Pipeline around an existing extractor
    pub fn new(extractor: StatisticalExtractor) -> Self {
        Self { extractor }
    }

    /// Pipeline for the configured window geometry
    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(StatisticalExtractor::new(config.window.length, config.window.channels))
    }

    /// Extractor used for every window
    pub fn extractor(&self) -> &StatisticalExtractor {
        &self.extractor
    }

    /// Assess one device window (fingers, EMG, IMU channel layout)
    pub fn assess_window(
        &self,
        model: &dyn Scorer,
        patient_id: &str,
        window: &SensorWindow,
    ) -> PdResult<Assessment> {
        if model.feature_dim() != self.extractor.feature_count() {
            return Err(PdError::shape(
                "model feature count",
                self.extractor.feature_count(),
                model.feature_dim(),
                error_context!("assessment", "assess_window"),
            ));
        }
        let modalities = ModalityWindows::from_device_window(window)?;
        let features = self.extractor.extract(window)?;
        let prediction = model.score(&features)?;
        debug!(patient_id, class = prediction.class, confidence = prediction.confidence, "window scored");

        Ok(generate_assessment(
            patient_id,
            prediction.class as i64,
            prediction.confidence,
            &modalities,
        ))
    }

    /// Assess consecutive non-overlapping windows of a session
    pub fn assess_session(&self, model: &dyn Scorer, session: &SessionRecord) -> PdResult<Vec<Assessment>> {
        let length = self.extractor.window_length();
        let windows = session.windows(length, length)?;
        info!(patient_id = %session.patient_id, windows = windows.len(), "assessing session");
        self.assess_batch(model, &session.patient_id, &windows)
    }

    /// Assess independent windows against one shared model
    pub fn assess_batch(
        &self,
        model: &dyn Scorer,
        patient_id: &str,
        windows: &[SensorWindow],
    ) -> PdResult<Vec<Assessment>> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            windows
                .par_iter()
                .map(|window| self.assess_window(model, patient_id, window))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            windows
                .iter()
                .map(|window| self.assess_window(model, patient_id, window))
                .collect()
        }
    }
}
