// tests/feature_extraction_tests.rs
//! Integration tests for feature extraction
//!
//! Covers the statistical extractor on device-shaped windows, the speech
//! extractor on synthetic voice, and agreement between the streaming and
//! batch variants.

use pd_monitor_core::acquisition::SensorWindow;
use pd_monitor_core::config::SpeechSettings;
use pd_monitor_core::processing::features::{
    FeatureExtractor, SpeechConfig, SpeechExtractor, StatisticalExtractor,
    StreamingSensorExtractor, StreamingSpeechExtractor,
};
use pd_monitor_core::PdError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

fn random_rows(rng: &mut StdRng, length: usize, channels: usize) -> Vec<Vec<f64>> {
    (0..length)
        .map(|_| (0..channels).map(|_| rng.gen_range(-3.0..3.0)).collect())
        .collect()
}

fn voice(seconds: f64, f0: f64) -> Vec<f64> {
    let rate = 16_000.0;
    (0..(rate * seconds) as usize)
        .map(|i| {
            let t = i as f64 / rate;
            0.6 * (2.0 * PI * f0 * t).sin() + 0.2 * (2.0 * PI * 2.0 * f0 * t).sin()
        })
        .collect()
}

#[test]
fn test_device_window_yields_fixed_length_finite_vector() {
    let mut rng = StdRng::seed_from_u64(42);
    let extractor = StatisticalExtractor::new(50, 9);

    for _ in 0..20 {
        let window = SensorWindow::from_rows(&random_rows(&mut rng, 50, 9)).unwrap();
        let features = extractor.extract(&window).unwrap();
        assert_eq!(features.len(), 54);
        assert!(features.is_finite());
    }
}

#[test]
fn test_extraction_is_reproducible() {
    let mut rng = StdRng::seed_from_u64(7);
    let extractor = StatisticalExtractor::new(50, 9);
    let window = SensorWindow::from_rows(&random_rows(&mut rng, 50, 9)).unwrap();

    let first = extractor.extract(&window).unwrap();
    let second = extractor.extract(&window).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_feature_names_follow_layout() {
    let extractor = StatisticalExtractor::new(50, 9);
    let names = extractor.feature_names();
    assert_eq!(names.len(), extractor.feature_count());
    assert_eq!(names[0], "ch0_mean");
    assert_eq!(names[9], "ch0_std");
    assert_eq!(names[36], "ch0_zero_crossing_rate");
    assert_eq!(names[53], "ch8_change_rate");
}

#[test]
fn test_wrong_window_shape_is_rejected() {
    let extractor = StatisticalExtractor::new(50, 9);
    let short = SensorWindow::from_rows(&vec![vec![0.0; 9]; 49]).unwrap();
    assert!(matches!(
        extractor.extract(&short),
        Err(PdError::ShapeMismatch { expected: 50, actual: 49, .. })
    ));
    let narrow = SensorWindow::from_rows(&vec![vec![0.0; 8]; 50]).unwrap();
    assert!(matches!(
        extractor.extract(&narrow),
        Err(PdError::ShapeMismatch { expected: 9, actual: 8, .. })
    ));
}

#[test]
fn test_streaming_sensor_matches_batch() {
    let mut rng = StdRng::seed_from_u64(3);
    let rows = random_rows(&mut rng, 50, 9);
    let extractor = StatisticalExtractor::new(50, 9);
    let expected = extractor
        .extract(&SensorWindow::from_rows(&rows).unwrap())
        .unwrap();

    let mut streaming = StreamingSensorExtractor::new(extractor).unwrap();
    let mut emitted = None;
    for (i, row) in rows.iter().enumerate() {
        let result = streaming.push_and_extract(row).unwrap();
        if i < 49 {
            assert!(result.is_none());
        } else {
            emitted = result;
        }
    }
    assert_eq!(emitted, Some(expected));
    assert_eq!(streaming.pending(), 0);
}

#[test]
fn test_speech_vector_shape_and_pitch() {
    let extractor = SpeechExtractor::new(SpeechConfig::default()).unwrap();
    let features = extractor.extract(&voice(1.0, 160.0)).unwrap();
    assert_eq!(features.len(), 8);
    assert!(features.is_finite());
    assert!((features[0] - 160.0).abs() < 3.0, "f0 mean {}", features[0]);
    assert_eq!(
        extractor.feature_names(),
        vec!["f0_mean", "f0_std", "jitter_local", "shimmer_local", "hnr", "mfcc_1", "mfcc_2", "mfcc_3"]
    );
}

#[test]
fn test_streaming_speech_matches_batch() {
    let audio = voice(0.25, 180.0);
    let extractor = SpeechExtractor::new(SpeechConfig::default()).unwrap();
    let expected = extractor.extract(&audio[..2048]).unwrap();

    let mut streaming =
        StreamingSpeechExtractor::new(SpeechExtractor::new(SpeechConfig::default()).unwrap(), 2048).unwrap();
    let consumed = streaming.push_slice(&audio).unwrap();
    assert_eq!(consumed, 2048);
    assert!(streaming.is_ready());
    assert_eq!(streaming.extract_and_reset().unwrap(), expected);
    assert!(!streaming.is_ready());
}

#[test]
fn test_streaming_speech_capacity_must_hold_a_frame() {
    let extractor = SpeechExtractor::new(SpeechConfig::default()).unwrap();
    assert!(StreamingSpeechExtractor::new(extractor, 512).is_err());
}

#[test]
fn test_bad_sample_does_not_stall_sensor_stream() {
    let mut streaming = StreamingSensorExtractor::new(StatisticalExtractor::new(3, 1)).unwrap();
    streaming.push_sample(&[1.0]).unwrap();
    assert!(matches!(
        streaming.push_sample(&[f64::NAN]),
        Err(PdError::InvalidData { .. })
    ));
    assert!(streaming.push_sample(&[f64::NEG_INFINITY]).is_err());
    streaming.push_sample(&[2.0]).unwrap();
    streaming.push_sample(&[3.0]).unwrap();

    let features = streaming.extract_and_reset().unwrap();
    assert!(features.is_finite());
    assert_eq!(streaming.pending(), 0);
    // Next window starts cleanly
    assert!(streaming.push_and_extract(&[3.0]).unwrap().is_none());
    assert_eq!(streaming.pending(), 1);
}

#[test]
fn test_streaming_speech_from_settings() {
    let settings = SpeechSettings {
        buffer_capacity: 2048,
        ..SpeechSettings::default()
    };
    let mut streaming = StreamingSpeechExtractor::from_config(&settings).unwrap();
    assert_eq!(streaming.capacity(), 2048);

    let audio = voice(0.25, 180.0);
    streaming.push_slice(&audio).unwrap();
    let expected = SpeechExtractor::from_config(&settings)
        .unwrap()
        .extract(&audio[..2048])
        .unwrap();
    assert_eq!(streaming.extract_and_reset().unwrap(), expected);
}
