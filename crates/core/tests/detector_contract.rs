//! Contract tests for the full cascade.
//!
//! The model-dependent tests mirror the behavior of the pretrained
//! reference models on two sample photos (one with a single face, one with
//! none). Models and photos are release artifacts, not repository content,
//! so those tests are `#[ignore]`d; point `MTCNN_TEST_DATA` at a directory
//! containing `mtcnn_pnet.onnx`, `mtcnn_rnet.onnx`, `mtcnn_onet.onnx`,
//! `single_face.jpg`, and `no_faces.jpg`, then run `cargo test -- --ignored`.

use std::io::Write;
use std::path::{Path, PathBuf};

use mtcnn_core::detection::domain::face_detector::{DetectError, FaceDetector};
use mtcnn_core::detection::infrastructure::onnx_mtcnn_detector::{MtcnnConfig, OnnxMtcnnDetector};
use mtcnn_core::shared::constants::{ONET_MODEL_NAME, PNET_MODEL_NAME, RNET_MODEL_NAME};
use mtcnn_core::shared::image::ImageData;

fn data_dir() -> PathBuf {
    PathBuf::from(
        std::env::var("MTCNN_TEST_DATA").expect("MTCNN_TEST_DATA must point at the test assets"),
    )
}

fn detector(dir: &Path, config: MtcnnConfig) -> OnnxMtcnnDetector {
    OnnxMtcnnDetector::new(
        &dir.join(PNET_MODEL_NAME),
        &dir.join(RNET_MODEL_NAME),
        &dir.join(ONET_MODEL_NAME),
        config,
    )
    .expect("stage models must load")
}

#[test]
#[ignore = "requires ONNX stage models and sample images (MTCNN_TEST_DATA)"]
fn detects_single_face_with_box_and_five_keypoints() {
    let dir = data_dir();
    let mut mtcnn = detector(&dir, MtcnnConfig::default());
    let image = ImageData::open(&dir.join("single_face.jpg")).unwrap();

    let faces = mtcnn.detect_faces(&image).unwrap();
    assert_eq!(faces.len(), 1);

    let face = &faces[0];
    assert!(face.bounding_box.width > 0);
    assert!(face.bounding_box.height > 0);
    assert!(face.confidence > 0.0 && face.confidence <= 1.0);

    let named = face.keypoints.named();
    assert_eq!(named.len(), 5);
    let names: Vec<&str> = named.iter().map(|(n, _)| *n).collect();
    for expected in ["left_eye", "right_eye", "nose", "mouth_left", "mouth_right"] {
        assert!(names.contains(&expected));
    }
}

#[test]
#[ignore = "requires ONNX stage models and sample images (MTCNN_TEST_DATA)"]
fn no_faces_image_yields_empty_result_not_error() {
    let dir = data_dir();
    let mut mtcnn = detector(&dir, MtcnnConfig::default());
    let image = ImageData::open(&dir.join("no_faces.jpg")).unwrap();

    let faces = mtcnn.detect_faces(&image).unwrap();
    assert!(faces.is_empty());
}

#[test]
#[ignore = "requires ONNX stage models (MTCNN_TEST_DATA)"]
fn invalid_image_input_is_a_distinct_error() {
    let dir = data_dir();
    let mut mtcnn = detector(&dir, MtcnnConfig::default());

    // Single-channel data cannot be detected on; the call must fail with
    // the invalid-image kind before any inference happens.
    let gray = ImageData::from_raw(vec![0u8; 64 * 64], 64, 64, 1).unwrap();
    let err = mtcnn.detect_faces(&gray).unwrap_err();
    assert!(matches!(err, DetectError::InvalidImage(_)));
}

#[test]
#[ignore = "requires ONNX stage models and sample images (MTCNN_TEST_DATA)"]
fn looser_thresholds_return_at_least_as_many_faces() {
    let dir = data_dir();
    let mut strict = detector(
        &dir,
        MtcnnConfig {
            steps_threshold: [0.2, 0.7, 0.7],
            ..MtcnnConfig::default()
        },
    );
    let mut loose = detector(
        &dir,
        MtcnnConfig {
            steps_threshold: [0.1, 0.1, 0.1],
            ..MtcnnConfig::default()
        },
    );

    let image = ImageData::open(&dir.join("single_face.jpg")).unwrap();

    // Two instances coexist in one thread; running one must not disturb
    // the other's results.
    let strict_faces = strict.detect_faces(&image).unwrap();
    let loose_faces = loose.detect_faces(&image).unwrap();
    let strict_again = strict.detect_faces(&image).unwrap();

    assert_eq!(strict_faces.len(), 1);
    assert!(loose_faces.len() >= strict_faces.len());
    assert_eq!(strict_faces.len(), strict_again.len());
}

// ── model-free contract checks ───────────────────────────────────────

#[test]
fn non_image_file_content_maps_to_invalid_image() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"import unittest\n").unwrap();

    let err: DetectError = ImageData::open(file.path()).unwrap_err().into();
    assert!(matches!(err, DetectError::InvalidImage(_)));
}

#[test]
fn malformed_raw_buffer_maps_to_invalid_image() {
    let err: DetectError = ImageData::from_raw(vec![1, 2, 3], 10, 10, 3)
        .unwrap_err()
        .into();
    assert!(matches!(err, DetectError::InvalidImage(_)));
    assert!(err.to_string().starts_with("invalid image"));
}
