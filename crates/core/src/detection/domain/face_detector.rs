use thiserror::Error;

use crate::shared::face::Face;
use crate::shared::image::{ImageData, InvalidImage};

#[derive(Error, Debug)]
pub enum DetectError {
    /// The input is not a detectable image. Distinct from an empty result:
    /// a valid image with no faces yields `Ok(vec![])`.
    #[error(transparent)]
    InvalidImage(#[from] InvalidImage),

    #[error("inference failed: {0}")]
    Inference(#[from] ort::Error),

    /// A stage model produced tensors the cascade cannot interpret.
    #[error("unexpected model output: {0}")]
    ModelOutput(String),
}

/// Domain interface for face detection.
///
/// Implementations may be stateful, hence `&mut self`. Each instance owns
/// its configuration and sessions; separate instances never share state.
pub trait FaceDetector: Send {
    fn detect_faces(&mut self, image: &ImageData) -> Result<Vec<Face>, DetectError>;
}
