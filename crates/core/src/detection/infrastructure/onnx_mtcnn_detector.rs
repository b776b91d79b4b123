//! MTCNN cascade using ONNX Runtime via `ort`.
//!
//! Three sessions run in sequence: PNet proposes windows over an image
//! pyramid, RNet rejects most of them on 24×24 crops, ONet scores the
//! survivors on 48×48 crops and regresses the five landmarks. Stage
//! thresholds come from [`MtcnnConfig::steps_threshold`]; lowering a
//! threshold trades precision for recall.

use std::path::Path;

use ndarray::{s, Array2, ArrayD, Ix2, Ix4};

use crate::detection::domain::box_utils::{
    calibrate, generate_candidates, nms, to_square, trunc_coords, Candidate, Suppression,
};
use crate::detection::domain::face_detector::{DetectError, FaceDetector};
use crate::detection::domain::scale_pyramid::compute_scales;
use crate::detection::infrastructure::model_resolver::StageModels;
use crate::detection::infrastructure::preprocess::{crop_batch, scaled_tensor};
use crate::shared::constants::{
    DEFAULT_MIN_FACE_SIZE, DEFAULT_SCALE_FACTOR, DEFAULT_STEPS_THRESHOLD,
};
use crate::shared::face::{BoundingBox, Face, Keypoints};
use crate::shared::image::ImageData;

/// NMS threshold applied within one pyramid level.
const PNET_SCALE_NMS: f32 = 0.5;

/// NMS threshold when merging proposals across pyramid levels.
const PNET_MERGE_NMS: f32 = 0.7;

const RNET_NMS: f32 = 0.7;
const ONET_NMS: f32 = 0.7;

const RNET_INPUT_SIZE: u32 = 24;
const ONET_INPUT_SIZE: u32 = 48;

/// Cascade tuning knobs. Defaults match the reference pretrained models.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MtcnnConfig {
    /// Smallest face to look for, in pixels. Must be at least 12.
    pub min_face_size: u32,
    /// Per-stage confidence cutoffs (PNet, RNet, ONet), each in [0, 1].
    pub steps_threshold: [f32; 3],
    /// Pyramid decay factor, in (0, 1).
    pub scale_factor: f64,
}

impl Default for MtcnnConfig {
    fn default() -> Self {
        Self {
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            steps_threshold: DEFAULT_STEPS_THRESHOLD,
            scale_factor: DEFAULT_SCALE_FACTOR,
        }
    }
}

/// MTCNN face detector backed by three ONNX Runtime sessions.
///
/// Each instance owns its sessions and config; instances constructed side
/// by side share nothing and may be used independently in the same thread.
pub struct OnnxMtcnnDetector {
    pnet: ort::session::Session,
    rnet: ort::session::Session,
    onet: ort::session::Session,
    config: MtcnnConfig,
}

impl OnnxMtcnnDetector {
    /// Load the three stage models.
    pub fn new(
        pnet_path: &Path,
        rnet_path: &Path,
        onet_path: &Path,
        config: MtcnnConfig,
    ) -> Result<Self, DetectError> {
        let pnet = ort::session::Session::builder()?.commit_from_file(pnet_path)?;
        let rnet = ort::session::Session::builder()?.commit_from_file(rnet_path)?;
        let onet = ort::session::Session::builder()?.commit_from_file(onet_path)?;
        Ok(Self {
            pnet,
            rnet,
            onet,
            config,
        })
    }

    pub fn from_stage_models(
        models: &StageModels,
        config: MtcnnConfig,
    ) -> Result<Self, DetectError> {
        Self::new(&models.pnet, &models.rnet, &models.onet, config)
    }

    pub fn config(&self) -> &MtcnnConfig {
        &self.config
    }

    /// Stage 1: run PNet at every pyramid level, merge proposals.
    fn stage_proposal(&mut self, image: &ImageData) -> Result<Vec<Candidate>, DetectError> {
        let scales = compute_scales(
            image.width(),
            image.height(),
            self.config.min_face_size,
            self.config.scale_factor,
        );

        let mut total: Vec<Candidate> = Vec::new();
        for scale in scales {
            let input = ort::value::Tensor::from_array(scaled_tensor(image, scale))?;
            let outputs = self.pnet.run(ort::inputs![input])?;
            let mut arrays = Vec::with_capacity(outputs.len());
            for i in 0..outputs.len() {
                arrays.push(outputs[i].try_extract_array::<f32>()?.to_owned());
            }

            let prob = output_with_trailing(&arrays, 2, "pnet")?
                .view()
                .into_dimensionality::<Ix4>()
                .map_err(|e| DetectError::ModelOutput(format!("pnet prob map: {e}")))?;
            let reg = output_with_trailing(&arrays, 4, "pnet")?
                .view()
                .into_dimensionality::<Ix4>()
                .map_err(|e| DetectError::ModelOutput(format!("pnet regression map: {e}")))?;

            let cands = generate_candidates(
                prob.slice(s![0, .., .., 1]),
                reg.slice(s![0, .., .., ..]),
                scale,
                self.config.steps_threshold[0],
            );
            let keep = nms(&cands, PNET_SCALE_NMS, Suppression::Union);
            total.extend(keep.into_iter().map(|i| cands[i]));
        }

        if total.is_empty() {
            return Ok(total);
        }

        let keep = nms(&total, PNET_MERGE_NMS, Suppression::Union);
        let mut picked: Vec<Candidate> = keep.into_iter().map(|i| total[i]).collect();
        log::debug!("pnet: {} proposals after merge", picked.len());

        calibrate(&mut picked, false);
        to_square(&mut picked);
        trunc_coords(&mut picked);
        Ok(picked)
    }

    /// Stage 2: re-score proposals with RNet on 24×24 crops.
    fn stage_refine(
        &mut self,
        image: &ImageData,
        cands: Vec<Candidate>,
    ) -> Result<Vec<Candidate>, DetectError> {
        let input = ort::value::Tensor::from_array(crop_batch(image, &cands, RNET_INPUT_SIZE))?;
        let outputs = self.rnet.run(ort::inputs![input])?;
        let mut arrays = Vec::with_capacity(outputs.len());
        for i in 0..outputs.len() {
            arrays.push(outputs[i].try_extract_array::<f32>()?.to_owned());
        }

        let scores = matrix_output(&arrays, 2, "rnet")?;
        let reg = matrix_output(&arrays, 4, "rnet")?;

        let mut passed = Vec::new();
        for (i, c) in cands.iter().enumerate() {
            let score = scores[[i, 1]];
            if score < self.config.steps_threshold[1] {
                continue;
            }
            passed.push(Candidate {
                score,
                reg: [reg[[i, 0]], reg[[i, 1]], reg[[i, 2]], reg[[i, 3]]],
                ..*c
            });
        }
        if passed.is_empty() {
            return Ok(passed);
        }

        let keep = nms(&passed, RNET_NMS, Suppression::Union);
        let mut picked: Vec<Candidate> = keep.into_iter().map(|i| passed[i]).collect();
        log::debug!("rnet: {} candidates kept", picked.len());

        calibrate(&mut picked, true);
        to_square(&mut picked);
        trunc_coords(&mut picked);
        Ok(picked)
    }

    /// Stage 3: final ONet scoring, landmark regression, duplicate removal.
    fn stage_output(
        &mut self,
        image: &ImageData,
        cands: Vec<Candidate>,
    ) -> Result<Vec<Face>, DetectError> {
        let input = ort::value::Tensor::from_array(crop_batch(image, &cands, ONET_INPUT_SIZE))?;
        let outputs = self.onet.run(ort::inputs![input])?;
        let mut arrays = Vec::with_capacity(outputs.len());
        for i in 0..outputs.len() {
            arrays.push(outputs[i].try_extract_array::<f32>()?.to_owned());
        }

        let scores = matrix_output(&arrays, 2, "onet")?;
        let reg = matrix_output(&arrays, 4, "onet")?;
        let landmarks = matrix_output(&arrays, 10, "onet")?;

        let mut boxes = Vec::new();
        let mut points = Vec::new();
        for (i, c) in cands.iter().enumerate() {
            let score = scores[[i, 1]];
            if score < self.config.steps_threshold[2] {
                continue;
            }
            // Landmarks are regressed relative to the *uncalibrated* crop:
            // five x offsets then five y offsets, as fractions of the box.
            let w = c.width() + 1.0;
            let h = c.height() + 1.0;
            let mut pts = [(0.0f32, 0.0f32); 5];
            for (k, pt) in pts.iter_mut().enumerate() {
                *pt = (
                    c.x1 + landmarks[[i, k]] * w - 1.0,
                    c.y1 + landmarks[[i, k + 5]] * h - 1.0,
                );
            }
            boxes.push(Candidate {
                score,
                reg: [reg[[i, 0]], reg[[i, 1]], reg[[i, 2]], reg[[i, 3]]],
                ..*c
            });
            points.push(pts);
        }
        if boxes.is_empty() {
            return Ok(Vec::new());
        }

        calibrate(&mut boxes, true);
        let keep = nms(&boxes, ONET_NMS, Suppression::Min);
        log::debug!("onet: {} faces", keep.len());

        Ok(keep
            .into_iter()
            .map(|i| build_face(&boxes[i], &points[i], image.width(), image.height()))
            .collect())
    }
}

impl FaceDetector for OnnxMtcnnDetector {
    fn detect_faces(&mut self, image: &ImageData) -> Result<Vec<Face>, DetectError> {
        image.validate_for_detection()?;

        let proposals = self.stage_proposal(image)?;
        if proposals.is_empty() {
            return Ok(Vec::new());
        }
        let refined = self.stage_refine(image, proposals)?;
        if refined.is_empty() {
            return Ok(Vec::new());
        }
        self.stage_output(image, refined)
    }
}

/// Picks the output tensor whose trailing dimension matches `dim`.
///
/// ONNX exporters do not guarantee output ordering, but the MTCNN heads
/// are distinguishable by width: 2 (face/no-face), 4 (box regression),
/// 10 (landmarks).
fn output_with_trailing<'a>(
    arrays: &'a [ArrayD<f32>],
    dim: usize,
    stage: &str,
) -> Result<&'a ArrayD<f32>, DetectError> {
    arrays
        .iter()
        .find(|a| a.ndim() >= 2 && a.shape()[a.ndim() - 1] == dim)
        .ok_or_else(|| {
            DetectError::ModelOutput(format!(
                "{stage}: no output with trailing dimension {dim}"
            ))
        })
}

/// Batch-stage variant of [`output_with_trailing`]: the tensor must be a
/// `[batch, dim]` matrix.
fn matrix_output(
    arrays: &[ArrayD<f32>],
    dim: usize,
    stage: &str,
) -> Result<Array2<f32>, DetectError> {
    output_with_trailing(arrays, dim, stage)?
        .clone()
        .into_dimensionality::<Ix2>()
        .map_err(|e| DetectError::ModelOutput(format!("{stage}: {e}")))
}

fn build_face(c: &Candidate, points: &[(f32, f32); 5], width: u32, height: u32) -> Face {
    let x = c.x1.trunc().max(0.0) as i32;
    let y = c.y1.trunc().max(0.0) as i32;
    let x2 = (c.x2.trunc() as i32).min(width.saturating_sub(1) as i32);
    let y2 = (c.y2.trunc() as i32).min(height.saturating_sub(1) as i32);

    let pt = |k: usize| (points[k].0.trunc() as i32, points[k].1.trunc() as i32);

    Face {
        bounding_box: BoundingBox {
            x,
            y,
            width: (x2 - x).max(0),
            height: (y2 - y).max(0),
        },
        confidence: c.score,
        keypoints: Keypoints {
            left_eye: pt(0),
            right_eye: pt(1),
            nose: pt(2),
            mouth_left: pt(3),
            mouth_right: pt(4),
        },
    }
}
