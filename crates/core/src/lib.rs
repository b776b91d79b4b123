//! MTCNN face detection: a three-stage convolutional cascade (PNet → RNet →
//! ONet) over an image pyramid, executed through ONNX Runtime.
//!
//! The library exposes a domain-level [`detection::domain::face_detector::FaceDetector`]
//! trait and one infrastructure implementation backed by pretrained ONNX
//! models. Model files are opaque artifacts resolved from a cache directory
//! or downloaded on first use.

pub mod detection;
pub mod shared;
