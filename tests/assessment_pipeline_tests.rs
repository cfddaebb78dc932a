// tests/assessment_pipeline_tests.rs
//! End-to-end tests: session record to assessments

use ndarray::Array2;
use pd_monitor_core::acquisition::{ModalityWindows, SensorWindow, SessionRecord};
use pd_monitor_core::inference::{ModelRegistry, MulticlassModel, NormalizationParams, ScorerModel};
use pd_monitor_core::planning::TREMOR_CONTROL_EXERCISE;
use pd_monitor_core::processing::{analyze, FingerMetrics};
use pd_monitor_core::{
    generate_assessment, generate_plan, AssessmentPipeline, SymptomMetrics, SystemConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn session_json(samples: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<serde_json::Value> = (0..samples)
        .map(|i| {
            let fingers: Vec<f64> = (0..5).map(|_| rng.gen_range(0.0..1023.0)).collect();
            serde_json::json!({
                "timestamp": 1_700_000_000_000u64 + i as u64 * 10,
                "fingers": fingers,
                "emg": rng.gen_range(-1.0..1.0),
                "imu": [rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), rng.gen_range(8.0..11.0)]
            })
        })
        .collect();
    serde_json::json!({
        "patient_id": "P042",
        "parkinson_level": 2,
        "session_time": "2024-05-20T10:15:00",
        "duration": samples as f64 / 100.0,
        "data_points": samples,
        "device": "glove-v2",
        "data": data
    })
    .to_string()
}

fn uniform_model() -> ScorerModel {
    MulticlassModel::new(Array2::zeros((54, 5)), vec![0.0; 5], NormalizationParams::identity(54))
        .unwrap()
        .into()
}

#[test]
fn test_session_round_trip_keeps_pass_through_fields() {
    let session = SessionRecord::from_json_str(&session_json(60, 1)).unwrap();
    assert_eq!(session.parkinson_level, Some(2));
    assert_eq!(session.extra["device"], "glove-v2");
    assert!(session.data[0].extra.contains_key("timestamp"));

    let json = serde_json::to_value(&session).unwrap();
    assert_eq!(json["device"], "glove-v2");
    assert!(json["data"][3]["timestamp"].is_number());
}

#[test]
fn test_session_assessed_per_full_window() {
    let session = SessionRecord::from_json_str(&session_json(130, 2)).unwrap();
    let registry = ModelRegistry::new(uniform_model());
    let pipeline = AssessmentPipeline::from_config(&SystemConfig::default());

    let assessments = pipeline
        .assess_session(registry.current().as_ref(), &session)
        .unwrap();
    // 130 samples: two full windows of 50, trailing 30 dropped
    assert_eq!(assessments.len(), 2);
    for assessment in &assessments {
        assert_eq!(assessment.patient_id, "P042");
        // Uniform distribution ties resolve to level 1
        assert_eq!(assessment.predicted_level, 1);
        assert!((assessment.confidence - 0.2).abs() < 1e-12);
        assert!(assessment.symptom_analysis.emg_analysis.is_some());
        let fatigue = assessment.symptom_analysis.emg_analysis.unwrap().fatigue_index;
        assert!(fatigue <= 2.0);
        let balance = assessment.symptom_analysis.imu_analysis.unwrap().balance_index;
        assert!(balance <= 10.0);
    }
}

#[test]
fn test_all_zero_window_defaults() {
    let window = SensorWindow::from_rows(&vec![vec![0.0; 9]; 50]).unwrap();
    let metrics = analyze(&ModalityWindows::from_device_window(&window).unwrap());

    let fingers = metrics.finger_analysis.unwrap();
    assert_eq!(fingers.tremor_index, 0.0);
    // Five finger channels present, so symmetry is computed (zero), not defaulted
    assert_eq!(fingers.symmetry, 0.0);
    assert_eq!(metrics.imu_analysis.unwrap().balance_index, 10.0);

    let three_fingers = ModalityWindows {
        fingers: Some(window.select_channels(0, 3).unwrap()),
        ..Default::default()
    };
    assert_eq!(analyze(&three_fingers).finger_analysis.unwrap().symmetry, 0.5);
}

#[test]
fn test_level_three_tremor_scenario() {
    let metrics = SymptomMetrics {
        finger_analysis: Some(FingerMetrics {
            flexibility: 1.0,
            coordination: 1.0,
            symmetry: 0.5,
            tremor_index: 0.6,
        }),
        ..Default::default()
    };
    let plan = generate_plan(3, &metrics);
    assert_eq!(plan.resistance, 70);
    assert_eq!(plan.exercises[0], TREMOR_CONTROL_EXERCISE);
}

#[test]
fn test_external_level_assessment_serializes() {
    let session = SessionRecord::from_json_str(&session_json(50, 3)).unwrap();
    let windows = session.to_modality_windows().unwrap();
    let assessment = generate_assessment(&session.patient_id, 4, 0.77, &windows);

    let json: serde_json::Value = serde_json::from_str(&assessment.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["predicted_level"], 4);
    assert_eq!(json["training_plan"]["intensity"], "moderate-high");
    assert!(json["symptom_analysis"]["finger_analysis"]["tremor_index"].is_number());
    assert!(json["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r.as_str().unwrap().contains("physical therapist")));
}

#[test]
fn test_batch_matches_sequential() {
    let session = SessionRecord::from_json_str(&session_json(200, 4)).unwrap();
    let windows = session.windows(50, 25).unwrap();
    assert_eq!(windows.len(), 7);

    let model = uniform_model();
    let pipeline = AssessmentPipeline::from_config(&SystemConfig::default());
    let batch = pipeline.assess_batch(&model, "P042", &windows).unwrap();
    for (window, assessment) in windows.iter().zip(&batch) {
        let single = pipeline.assess_window(&model, "P042", window).unwrap();
        assert_eq!(single.symptom_analysis, assessment.symptom_analysis);
        assert_eq!(single.training_plan, assessment.training_plan);
    }
}
