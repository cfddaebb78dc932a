// tests/scoring_properties.rs
//! Property tests for the scorer arithmetic and the normalization contract

use ndarray::Array2;
use pd_monitor_core::acquisition::SensorWindow;
use pd_monitor_core::inference::{
    argmax, sigmoid, softmax, MulticlassModel, NormalizationParams, Scorer,
};
use pd_monitor_core::processing::{
    FeatureExtractor, FeatureVector, FingerMetrics, StatisticalExtractor, SymptomMetrics,
};
use pd_monitor_core::generate_plan;
use proptest::prelude::*;

proptest! {
    #[test]
    fn softmax_sums_to_one(logits in prop::collection::vec(-1.0e3f64..1.0e3, 2..10)) {
        let p = softmax(&logits);
        let sum: f64 = p.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-6, "sum {}", sum);
        prop_assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn sigmoid_open_interval_inside_clamp(z in -30.0f64..30.0) {
        let s = sigmoid(z);
        prop_assert!(s > 0.0 && s < 1.0);
    }

    #[test]
    fn sigmoid_saturates_beyond_clamp(z in 500.0f64..1.0e300) {
        prop_assert_eq!(sigmoid(z), sigmoid(500.0));
        prop_assert_eq!(sigmoid(-z), sigmoid(-500.0));
    }

    #[test]
    fn ties_resolve_to_lowest_index(
        prefix in prop::collection::vec(0.0f64..0.5, 0..4),
        gap in prop::collection::vec(0.0f64..0.5, 0..4),
    ) {
        // Two copies of the maximum 1.0 with smaller values around them
        let mut values = prefix.clone();
        values.push(1.0);
        values.extend(&gap);
        values.push(1.0);
        prop_assert_eq!(argmax(&values), prefix.len());
    }

    #[test]
    fn normalization_round_trips(
        pairs in prop::collection::vec((-100.0f64..100.0, 0.01f64..50.0, -100.0f64..100.0), 1..20)
    ) {
        let mean: Vec<f64> = pairs.iter().map(|p| p.0).collect();
        let std: Vec<f64> = pairs.iter().map(|p| p.1).collect();
        let x = FeatureVector::new(pairs.iter().map(|p| p.2).collect());
        let params = NormalizationParams::new(mean, std).unwrap();

        let restored = params.denormalize(&params.normalize(&x).unwrap()).unwrap();
        for (a, b) in restored.iter().zip(x.iter()) {
            prop_assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn extraction_is_finite_for_any_window(
        values in prop::collection::vec(-1.0e3f64..1.0e3, 10 * 3)
    ) {
        let window = SensorWindow::from_flat(10, 3, values).unwrap();
        let features = StatisticalExtractor::new(10, 3).extract(&window).unwrap();
        prop_assert_eq!(features.len(), 18);
        prop_assert!(features.is_finite());
    }

    #[test]
    fn multiclass_levels_stay_on_scale(
        weights in prop::collection::vec(-2.0f64..2.0, 4 * 5),
        features in prop::collection::vec(-10.0f64..10.0, 4),
    ) {
        let model = MulticlassModel::new(
            Array2::from_shape_vec((4, 5), weights).unwrap(),
            vec![0.0; 5],
            NormalizationParams::identity(4),
        )
        .unwrap();
        let prediction = model.score(&FeatureVector::new(features)).unwrap();
        prop_assert!((1..=5).contains(&prediction.class));
        prop_assert_eq!(prediction.confidence, prediction.distribution[prediction.class - 1]);
    }

    #[test]
    fn high_tremor_never_raises_resistance(level in 1i64..=5, tremor in 0.5001f64..10.0) {
        let base = generate_plan(level, &SymptomMetrics::default()).resistance;
        let metrics = SymptomMetrics {
            finger_analysis: Some(FingerMetrics {
                flexibility: 1.0,
                coordination: 1.0,
                symmetry: 0.5,
                tremor_index: tremor,
            }),
            ..Default::default()
        };
        let adjusted = generate_plan(level, &metrics).resistance;
        prop_assert!(adjusted < base || adjusted == 30);
    }
}
