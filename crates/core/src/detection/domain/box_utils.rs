//! Candidate-box plumbing shared by all three cascade stages: proposal
//! generation from PNet probability maps, non-maximum suppression,
//! regression calibration, and square conversion.
//!
//! Boxes are pixel-inclusive: a box from (0,0) to (11,11) spans 12 pixels
//! per side, so areas and intersections carry a +1 extent.

use std::cmp::Ordering;

use ndarray::{ArrayView2, ArrayView3};

/// Proposal-map stride: PNet halves resolution once.
pub const PNET_STRIDE: f32 = 2.0;

/// PNet window size in pixels.
pub const PNET_CELL: f32 = 12.0;

/// A face candidate between stages: corner coordinates, stage score, and
/// the regression offsets produced alongside the score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub reg: [f32; 4],
}

impl Candidate {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    fn area(&self) -> f32 {
        (self.width() + 1.0) * (self.height() + 1.0)
    }
}

/// Overlap criterion for suppression.
///
/// `Union` is the usual IoU. `Min` divides by the smaller area instead, so
/// a small box nested inside a large one is suppressed even when their IoU
/// is low — used by the output stage to drop duplicate landmarks boxes.
#[derive(Clone, Copy, Debug)]
pub enum Suppression {
    Union,
    Min,
}

/// Back-projects PNet probability-map cells at or above `threshold` into
/// image-space candidates with their regression vectors.
///
/// `scores[[row, col]]` is the face probability of the 12×12 window whose
/// top-left corner sits at `(stride * col, stride * row)` in the scaled
/// image; dividing by `scale` restores original-image coordinates.
pub fn generate_candidates(
    scores: ArrayView2<f32>,
    reg: ArrayView3<f32>,
    scale: f64,
    threshold: f32,
) -> Vec<Candidate> {
    let s = scale as f32;
    let mut out = Vec::new();
    for ((row, col), &score) in scores.indexed_iter() {
        if score < threshold {
            continue;
        }
        out.push(Candidate {
            x1: ((PNET_STRIDE * col as f32 + 1.0) / s).trunc(),
            y1: ((PNET_STRIDE * row as f32 + 1.0) / s).trunc(),
            x2: ((PNET_STRIDE * col as f32 + PNET_CELL) / s).trunc(),
            y2: ((PNET_STRIDE * row as f32 + PNET_CELL) / s).trunc(),
            score,
            reg: [
                reg[[row, col, 0]],
                reg[[row, col, 1]],
                reg[[row, col, 2]],
                reg[[row, col, 3]],
            ],
        });
    }
    out
}

/// Greedy non-maximum suppression. Returns kept indices into `cands`,
/// highest score first.
pub fn nms(cands: &[Candidate], threshold: f32, mode: Suppression) -> Vec<usize> {
    let mut order: Vec<usize> = (0..cands.len()).collect();
    order.sort_by(|&a, &b| {
        cands[b]
            .score
            .partial_cmp(&cands[a].score)
            .unwrap_or(Ordering::Equal)
    });

    let mut suppressed = vec![false; cands.len()];
    let mut keep = Vec::new();

    for (i, &idx) in order.iter().enumerate() {
        if suppressed[idx] {
            continue;
        }
        keep.push(idx);
        for &jdx in &order[i + 1..] {
            if suppressed[jdx] {
                continue;
            }
            if overlap(&cands[idx], &cands[jdx], mode) > threshold {
                suppressed[jdx] = true;
            }
        }
    }
    keep
}

fn overlap(a: &Candidate, b: &Candidate, mode: Suppression) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);

    let inter = (ix2 - ix1 + 1.0).max(0.0) * (iy2 - iy1 + 1.0).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    match mode {
        Suppression::Union => inter / (a.area() + b.area() - inter),
        Suppression::Min => inter / a.area().min(b.area()),
    }
}

/// Applies each candidate's regression offsets to its corners, consuming
/// the offsets.
///
/// `pixel_inclusive` selects the +1 extent the refinement stages (RNet,
/// ONet) were trained with; the proposal-stage regression uses the
/// exclusive extent.
pub fn calibrate(cands: &mut [Candidate], pixel_inclusive: bool) {
    let extra = if pixel_inclusive { 1.0 } else { 0.0 };
    for c in cands.iter_mut() {
        let w = c.width() + extra;
        let h = c.height() + extra;
        let [dx1, dy1, dx2, dy2] = c.reg;
        c.x1 += dx1 * w;
        c.y1 += dy1 * h;
        c.x2 += dx2 * w;
        c.y2 += dy2 * h;
        c.reg = [0.0; 4];
    }
}

/// Expands each box to a square around its center. The refinement stages
/// expect square crops.
pub fn to_square(cands: &mut [Candidate]) {
    for c in cands.iter_mut() {
        let w = c.width();
        let h = c.height();
        let side = w.max(h);
        c.x1 += w * 0.5 - side * 0.5;
        c.y1 += h * 0.5 - side * 0.5;
        c.x2 = c.x1 + side;
        c.y2 = c.y1 + side;
    }
}

/// Truncates corner coordinates toward zero, snapping boxes to the pixel
/// grid before cropping.
pub fn trunc_coords(cands: &mut [Candidate]) {
    for c in cands.iter_mut() {
        c.x1 = c.x1.trunc();
        c.y1 = c.y1.trunc();
        c.x2 = c.x2.trunc();
        c.y2 = c.y2.trunc();
    }
}
