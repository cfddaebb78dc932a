// src/planning/templates.rs
//! Base training templates, one per severity level

use super::SeverityLevel;

/// Immutable starting point for a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanTemplate {
    /// Session length range
    pub duration: &'static str,
    /// Intensity label
    pub intensity: &'static str,
    /// Servo resistance in actuator degrees
    pub resistance: u32,
    /// Exercises in order
    pub exercises: &'static [&'static str],
    /// Sessions per week
    pub frequency: &'static str,
    /// Plan goals
    pub goals: &'static [&'static str],
}

const TEMPLATES: [PlanTemplate; 5] = [
    PlanTemplate {
        duration: "15-20 minutes",
        intensity: "low",
        resistance: 30,
        exercises: &[
            "finger dexterity practice",
            "light grip training",
            "coordination movement practice",
        ],
        frequency: "twice daily",
        goals: &["maintain current function", "prevent symptom progression"],
    },
    PlanTemplate {
        duration: "20-25 minutes",
        intensity: "low-moderate",
        resistance: 60,
        exercises: &[
            "fine motor control",
            "finger independence training",
            "reaction time practice",
        ],
        frequency: "2-3 times daily",
        goals: &["improve coordination", "strengthen finger control"],
    },
    PlanTemplate {
        duration: "25-30 minutes",
        intensity: "moderate",
        resistance: 90,
        exercises: &[
            "resistance training",
            "balance and coordination practice",
            "functional movement training",
        ],
        frequency: "3 times daily",
        goals: &["build muscle strength", "improve motor control"],
    },
    PlanTemplate {
        duration: "20-30 minutes",
        intensity: "moderate-high",
        resistance: 120,
        exercises: &[
            "assisted strength training",
            "passive joint mobilization",
            "balance stability practice",
        ],
        frequency: "2-3 times daily",
        goals: &["maintain muscle strength", "prevent joint stiffness"],
    },
    PlanTemplate {
        duration: "15-25 minutes",
        intensity: "adaptive",
        resistance: 150,
        exercises: &[
            "passive assisted training",
            "joint range-of-motion maintenance",
            "basic function preservation",
        ],
        frequency: "several short sessions daily",
        goals: &["maintain basic function", "improve quality of life"],
    },
];

/// Template for a level
pub fn template(level: SeverityLevel) -> &'static PlanTemplate {
    &TEMPLATES[level.value() as usize - 1]
}
