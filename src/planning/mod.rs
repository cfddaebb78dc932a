// src/planning/mod.rs
//! Training-plan generation
//!
//! A plan starts from the fixed template of its severity level and is then
//! adjusted by symptom metrics. Rules run in a fixed order because they
//! prepend and append to the exercise list:
//!
//! 1. `tremor_index > 0.5`: resistance drops by 20 (never below 30) and a
//!    tremor control exercise goes first
//! 2. `muscle_activation < 0.3`: a strength exercise is appended and the
//!    session is lengthened
//! 3. `balance_index < 2`: a balance exercise is appended
//!
//! A rule only fires when its metric group is present. Levels outside 1..=5
//! use the level-3 template.

pub mod templates;

use crate::config::constants::plan as k;
use crate::processing::SymptomMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

pub use templates::{template, PlanTemplate};

/// Exercise prepended when tremor is high
pub const TREMOR_CONTROL_EXERCISE: &str = "tremor control exercise";
/// Exercise appended when muscle activation is low
pub const STRENGTH_BUILDING_EXERCISE: &str = "strength-building exercise";
/// Exercise appended when balance is poor
pub const BALANCE_STABILITY_EXERCISE: &str = "balance stability exercise";

/// Clinical severity, 1 (mild) to 5 (severe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum SeverityLevel {
    /// Level 1
    Mild = 1,
    /// Level 2
    MildModerate = 2,
    /// Level 3, also the fallback
    Moderate = 3,
    /// Level 4
    ModeratelySevere = 4,
    /// Level 5
    Severe = 5,
}

impl SeverityLevel {
    /// Every level in ascending order
    pub const ALL: [SeverityLevel; 5] = [
        SeverityLevel::Mild,
        SeverityLevel::MildModerate,
        SeverityLevel::Moderate,
        SeverityLevel::ModeratelySevere,
        SeverityLevel::Severe,
    ];

    /// Exact conversion; `None` outside 1..=5
    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(SeverityLevel::Mild),
            2 => Some(SeverityLevel::MildModerate),
            3 => Some(SeverityLevel::Moderate),
            4 => Some(SeverityLevel::ModeratelySevere),
            5 => Some(SeverityLevel::Severe),
            _ => None,
        }
    }

    /// Conversion with the level-3 fallback
    pub fn resolve(level: i64) -> Self {
        Self::from_level(level).unwrap_or_else(|| {
            warn!(level, fallback = k::FALLBACK_LEVEL, "severity level out of range, using fallback template");
            SeverityLevel::Moderate
        })
    }

    /// Numeric level
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Short label
    pub fn name(self) -> &'static str {
        match self {
            SeverityLevel::Mild => "Mild",
            SeverityLevel::MildModerate => "Mild-moderate",
            SeverityLevel::Moderate => "Moderate",
            SeverityLevel::ModeratelySevere => "Moderately severe",
            SeverityLevel::Severe => "Severe",
        }
    }

    /// One-line clinical description
    pub fn description(self) -> &'static str {
        match self {
            SeverityLevel::Mild => "slight tremor, daily activities essentially normal",
            SeverityLevel::MildModerate => "increased tremor, fine motor tasks begin to suffer",
            SeverityLevel::Moderate => "marked slowness of movement, balance problems appear",
            SeverityLevel::ModeratelySevere => "severe motor impairment, assistance needed",
            SeverityLevel::Severe => "mobility severely limited, full-time care needed",
        }
    }
}

impl TryFrom<i64> for SeverityLevel {
    type Error = String;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        Self::from_level(level).ok_or_else(|| format!("severity level {} outside 1..=5", level))
    }
}

impl From<SeverityLevel> for i64 {
    fn from(level: SeverityLevel) -> Self {
        i64::from(level.value())
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value(), self.name())
    }
}

/// Personalized exercise plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPlan {
    /// Session length range
    pub duration: String,
    /// Intensity label
    pub intensity: String,
    /// Servo resistance in actuator degrees
    #[serde(rename = "servo_resistance")]
    pub resistance: u32,
    /// Exercises in order
    pub exercises: Vec<String>,
    /// Sessions per week
    pub frequency: String,
    /// Plan goals
    pub goals: Vec<String>,
}

impl From<&PlanTemplate> for TrainingPlan {
    fn from(template: &PlanTemplate) -> Self {
        Self {
            duration: template.duration.to_string(),
            intensity: template.intensity.to_string(),
            resistance: template.resistance,
            exercises: template.exercises.iter().map(|e| e.to_string()).collect(),
            frequency: template.frequency.to_string(),
            goals: template.goals.iter().map(|g| g.to_string()).collect(),
        }
    }
}

/// Template for `level` adjusted by `metrics`
pub fn generate_plan(level: i64, metrics: &SymptomMetrics) -> TrainingPlan {
    let mut plan = TrainingPlan::from(template(SeverityLevel::resolve(level)));

    if metrics.tremor_index().map_or(false, |t| t > k::TREMOR_ADJUST_THRESHOLD) {
        plan.resistance = plan
            .resistance
            .saturating_sub(k::TREMOR_RESISTANCE_REDUCTION)
            .max(k::RESISTANCE_FLOOR);
        plan.exercises.insert(0, TREMOR_CONTROL_EXERCISE.to_string());
    }

    if metrics.muscle_activation().map_or(false, |a| a < k::LOW_ACTIVATION_THRESHOLD) {
        plan.exercises.push(STRENGTH_BUILDING_EXERCISE.to_string());
        plan.duration = k::EXTENDED_DURATION.to_string();
    }

    if metrics.balance_index().map_or(false, |b| b < k::LOW_BALANCE_THRESHOLD) {
        plan.exercises.push(BALANCE_STABILITY_EXERCISE.to_string());
    }

    debug!(level, resistance = plan.resistance, exercises = plan.exercises.len(), "training plan generated");
    plan
}

/// Ordered advice: status line, symptom-triggered lines, lifestyle line
///
/// The lifestyle line is chosen from the level as given, not the fallback.
pub fn generate_recommendations(level: i64, metrics: &SymptomMetrics) -> Vec<String> {
    let severity = SeverityLevel::resolve(level);
    let mut advice = vec![format!("Current status: {} - {}", severity.name(), severity.description())];

    if let Some(fingers) = metrics.finger_analysis {
        if fingers.flexibility < k::LOW_FLEXIBILITY_THRESHOLD {
            advice.push("Add finger flexibility exercises, at least 3 times a day".to_string());
        }
        if fingers.coordination < k::LOW_COORDINATION_THRESHOLD {
            advice.push("Focus on finger coordination training".to_string());
        }
        if fingers.tremor_index > k::TREMOR_ADVICE_THRESHOLD {
            advice.push("Practice tremor control with a lower resistance setting".to_string());
        }
    }

    if let Some(emg) = metrics.emg_analysis {
        if emg.fatigue_index > k::HIGH_FATIGUE_THRESHOLD {
            advice.push("Avoid overexertion and rest between sets".to_string());
        }
        if emg.muscle_activation < k::LOW_ACTIVATION_THRESHOLD {
            advice.push("Increase strength training gradually".to_string());
        }
    }

    if let Some(imu) = metrics.imu_analysis {
        if imu.balance_index < k::LOW_BALANCE_THRESHOLD {
            advice.push("Practice balance training in a safe, supervised setting".to_string());
        }
        if imu.tremor_frequency > k::HIGH_TREMOR_FREQUENCY_HZ {
            advice.push("Tremor frequency is high, consult a physician about medication".to_string());
        }
    }

    if level <= k::MAINTENANCE_MAX_LEVEL {
        advice.push("Keep exercising regularly to slow symptom progression".to_string());
    } else if level >= k::THERAPIST_MIN_LEVEL {
        advice.push("Consider guidance from a professional physical therapist".to_string());
    }

    advice
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{EmgMetrics, FingerMetrics, ImuMetrics};

    fn fingers(tremor_index: f64) -> FingerMetrics {
        FingerMetrics {
            flexibility: 1.0,
            coordination: 1.0,
            symmetry: 0.5,
            tremor_index,
        }
    }

    #[test]
    fn test_tremor_rule() {
        let metrics = SymptomMetrics {
            finger_analysis: Some(fingers(0.6)),
            ..Default::default()
        };
        let plan = generate_plan(3, &metrics);
        assert_eq!(plan.resistance, 70);
        assert_eq!(plan.exercises[0], TREMOR_CONTROL_EXERCISE);
        assert_eq!(plan.exercises.len(), 4);

        // Level 1 is already at the floor
        assert_eq!(generate_plan(1, &metrics).resistance, 30);
        // Level 2: 60 - 20 = 40
        assert_eq!(generate_plan(2, &metrics).resistance, 40);
    }

    #[test]
    fn test_rules_apply_in_order() {
        let metrics = SymptomMetrics {
            finger_analysis: Some(fingers(0.9)),
            emg_analysis: Some(EmgMetrics {
                muscle_activation: 0.1,
                fatigue_index: 1.0,
                control_stability: 1.0,
            }),
            imu_analysis: Some(ImuMetrics {
                movement_smoothness: 1.0,
                balance_index: 1.0,
                tremor_frequency: 0.0,
            }),
        };
        let plan = generate_plan(4, &metrics);
        assert_eq!(plan.duration, "30-35 minutes");
        assert_eq!(plan.exercises.first().map(String::as_str), Some(TREMOR_CONTROL_EXERCISE));
        assert_eq!(
            &plan.exercises[plan.exercises.len() - 2..],
            &[STRENGTH_BUILDING_EXERCISE.to_string(), BALANCE_STABILITY_EXERCISE.to_string()]
        );
    }

    #[test]
    fn test_no_metrics_leaves_template_untouched() {
        let plan = generate_plan(5, &SymptomMetrics::default());
        assert_eq!(plan, TrainingPlan::from(template(SeverityLevel::Severe)));
    }

    #[test]
    fn test_out_of_range_level_uses_moderate_template() {
        let metrics = SymptomMetrics::default();
        assert_eq!(generate_plan(0, &metrics), generate_plan(3, &metrics));
        assert_eq!(generate_plan(9, &metrics).resistance, 90);
    }

    #[test]
    fn test_plans_are_independent() {
        let metrics = SymptomMetrics {
            finger_analysis: Some(fingers(0.6)),
            ..Default::default()
        };
        let _ = generate_plan(3, &metrics);
        assert_eq!(generate_plan(3, &SymptomMetrics::default()).exercises.len(), 3);
    }

    #[test]
    fn test_recommendation_order() {
        let metrics = SymptomMetrics {
            finger_analysis: Some(FingerMetrics {
                flexibility: 0.1,
                coordination: 0.1,
                symmetry: 0.5,
                tremor_index: 0.4,
            }),
            emg_analysis: None,
            imu_analysis: Some(ImuMetrics {
                movement_smoothness: 1.0,
                balance_index: 5.0,
                tremor_frequency: 6.0,
            }),
        };
        let advice = generate_recommendations(4, &metrics);
        assert!(advice[0].starts_with("Current status: Moderately severe"));
        assert!(advice[1].contains("flexibility"));
        assert!(advice[2].contains("coordination"));
        assert!(advice[3].contains("tremor control"));
        assert!(advice[4].contains("physician"));
        assert!(advice[5].contains("physical therapist"));
        assert_eq!(advice.len(), 6);
    }

    #[test]
    fn test_lifestyle_line_uses_raw_level() {
        let metrics = SymptomMetrics::default();
        let low = generate_recommendations(-1, &metrics);
        assert!(low[0].starts_with("Current status: Moderate -"));
        assert!(low[1].contains("regularly"));
        assert_eq!(generate_recommendations(3, &metrics).len(), 1);
        assert!(generate_recommendations(7, &metrics)[1].contains("therapist"));
    }

    #[test]
    fn test_severity_level_serde() {
        assert_eq!(serde_json::to_string(&SeverityLevel::ModeratelySevere).unwrap(), "4");
        let level: SeverityLevel = serde_json::from_str("2").unwrap();
        assert_eq!(level, SeverityLevel::MildModerate);
        assert!(serde_json::from_str::<SeverityLevel>("6").is_err());
    }

    #[test]
    fn test_plan_serializes_servo_resistance() {
        let json = serde_json::to_value(generate_plan(2, &SymptomMetrics::default())).unwrap();
        assert_eq!(json["servo_resistance"], 60);
        assert!(json.get("resistance").is_none());
    }
}
