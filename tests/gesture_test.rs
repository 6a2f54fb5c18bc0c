//! End-to-end tests of the gesture path: JSON recording in, session label out.

use motion_sense::core::{segment, Centroid, GestureConfig, GesturePipeline, NearestCentroid};
use motion_sense::ingest::{MotionSample, MotionSchema, MotionTable};
use motion_sense::stats::create_shared_stats;
use serde_json::{json, Value};
use std::f64::consts::PI;
use std::sync::Arc;

const RATE: f64 = 50.0;

/// Head pitch over time for a labelled gesture.
fn pitch(label: &str, t: f64, phase: f64) -> f64 {
    match label {
        "nod" => 15.0 + 5.0 * (2.0 * PI * 2.0 * t + phase).sin(),
        _ => 0.2 * (2.0 * PI * 0.5 * t + phase).sin(),
    }
}

/// A two-second controller recording whose head pitch follows `gesture`.
fn recording(id: &str, gesture: &str, phase: f64) -> Value {
    let records: Vec<Value> = (0..100)
        .map(|i| {
            let t = i as f64 / RATE;
            json!({
                "id": id,
                "timeStamp": t,
                "headPosition": { "x": 0.0, "y": 1.6, "z": 0.0 },
                "headRotation": { "x": pitch(gesture, t, phase), "y": 0.0, "z": 0.0 },
                "leftControllerPosition": { "x": -0.2, "y": 1.2, "z": -0.3 },
                "rightControllerPosition": { "x": 0.2, "y": 1.2, "z": -0.3 },
            })
        })
        .collect();
    json!({ "headControllersMotionRecordList": records })
}

fn table(document: &Value) -> MotionTable {
    MotionTable::from_json_str(&document.to_string()).unwrap()
}

/// Mean feature vector of a reference recording.
fn centroid(pipeline: &GesturePipeline, label: &str) -> Centroid {
    let matrix = pipeline.features(&table(&recording(label, label, 0.0)));
    let width = matrix.width();
    let mut sum = vec![0.0; width];
    for row in matrix.rows() {
        for (acc, value) in sum.iter_mut().zip(row.values()) {
            *acc += value;
        }
    }
    Centroid {
        label: label.to_string(),
        features: sum.iter().map(|v| v / matrix.len() as f64).collect(),
    }
}

fn trained(pipeline: &GesturePipeline) -> NearestCentroid {
    NearestCentroid::new(vec![centroid(pipeline, "nod"), centroid(pipeline, "still")]).unwrap()
}

#[test]
fn test_recording_schema_is_detected() {
    let table = table(&recording("nod", "nod", 0.0));

    assert_eq!(table.schema(), Some(MotionSchema::HeadControllers));
    assert_eq!(table.session_id(), Some("nod"));
    assert_eq!(table.len(), 100);
    assert!(table.samples()[0].left_hand_position.is_some());
}

#[test]
fn test_nod_is_classified_as_nod() {
    let pipeline = GesturePipeline::new(&GestureConfig::default()).unwrap();
    let model = trained(&pipeline);

    let result = pipeline.run(&table(&recording("nod", "nod", 1.0)), &model).unwrap();

    assert_eq!(result.predicted.as_deref(), Some("nod"));
    assert_eq!(result.actual.as_deref(), Some("nod"));
    assert_eq!(result.balanced_accuracy, Some(1.0));
    assert_eq!(result.weighted_f1_score, Some(1.0));
    assert!(result.windows_classified >= 19);
}

#[test]
fn test_still_is_classified_as_still() {
    let pipeline = GesturePipeline::new(&GestureConfig::default()).unwrap();
    let model = trained(&pipeline);

    let result = pipeline.run(&table(&recording("still", "still", 2.0)), &model).unwrap();

    assert_eq!(result.predicted.as_deref(), Some("still"));
    assert_eq!(result.balanced_accuracy, Some(1.0));
}

#[test]
fn test_mislabelled_session_scores_zero() {
    let pipeline = GesturePipeline::new(&GestureConfig::default()).unwrap();
    let model = trained(&pipeline);

    let result = pipeline.run(&table(&recording("shake", "nod", 1.0)), &model).unwrap();

    assert_eq!(result.predicted.as_deref(), Some("nod"));
    assert_eq!(result.actual.as_deref(), Some("shake"));
    assert_eq!(result.balanced_accuracy, Some(0.0));
    assert_eq!(result.weighted_f1_score, Some(0.0));
}

#[test]
fn test_model_loaded_from_file() {
    let pipeline = GesturePipeline::new(&GestureConfig::default()).unwrap();
    let model = trained(&pipeline);

    let dir = std::env::temp_dir().join(format!("motion-sense-model-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("centroids.json");
    std::fs::write(&path, serde_json::to_string(&model).unwrap()).unwrap();

    let loaded = NearestCentroid::from_path(&path).unwrap();
    assert_eq!(loaded.width(), 30);

    let recording = table(&recording("nod", "nod", 0.5));
    assert_eq!(
        pipeline.run(&recording, &loaded).unwrap(),
        pipeline.run(&recording, &model).unwrap()
    );
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_model_width_mismatch_is_an_error() {
    let pipeline = GesturePipeline::new(&GestureConfig::default()).unwrap();
    let model = NearestCentroid::from_json_str(
        r#"{"centroids": [{"label": "nod", "features": [1.0, 2.0]}]}"#,
    )
    .unwrap();

    assert!(pipeline.run(&table(&recording("nod", "nod", 0.0)), &model).is_err());
}

#[test]
fn test_repeated_runs_agree() {
    let pipeline = GesturePipeline::new(&GestureConfig {
        window_length_secs: 0.2,
        overlap_secs: 0.1,
        ..GestureConfig::default()
    })
    .unwrap();
    let model = trained(&pipeline);
    let recording = table(&recording("nod", "nod", 0.3));

    assert_eq!(pipeline.run(&recording, &model).unwrap(), pipeline.run(&recording, &model).unwrap());
}

#[test]
fn test_stats_follow_pipeline_runs() {
    let stats = create_shared_stats();
    let pipeline = GesturePipeline::new(&GestureConfig::default())
        .unwrap()
        .with_stats(Arc::clone(&stats));
    let model = trained(&pipeline);

    let result = pipeline.run(&table(&recording("nod", "nod", 1.0)), &model).unwrap();

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.sessions_processed, 1);
    assert_eq!(snapshot.windows_classified, result.windows_classified as u64);
}

#[test]
fn test_windows_cover_every_sample() {
    let times: Vec<f64> = (0..137).map(|i| 0.5 + i as f64 * 0.013).collect();
    let table = MotionTable::from_samples(times.iter().map(|&t| MotionSample::at(t)).collect());
    let last = times[times.len() - 1];

    // None of these steps divides the 1.768 s span, so the last sample is inside a window
    for (length, overlap) in [(0.1, 0.0), (0.25, 0.1), (0.3, 0.29), (1.0, 0.5), (0.07, 0.0)] {
        let windows: Vec<_> = segment(&table, length, overlap).unwrap().collect();
        let step = length - overlap;
        assert!(!windows.is_empty());

        for (n, window) in windows.iter().enumerate() {
            assert!((window.start - (times[0] + n as f64 * step)).abs() < 1e-9);
            assert!(window.start < last);
        }
        for &t in &times {
            assert!(
                windows.iter().any(|w| w.contains(t)),
                "sample {t} uncovered for length {length}, overlap {overlap}"
            );
        }
    }
}
