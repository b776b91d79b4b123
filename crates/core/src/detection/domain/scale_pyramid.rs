//! Image-pyramid scale computation for the proposal stage.
//!
//! PNet is fully convolutional over 12×12 receptive fields, so the smallest
//! detectable face at scale 1.0 is 12 px. Scaling the image by
//! `12 / min_face_size` makes faces of `min_face_size` px fill one cell, and
//! successive multiplications by `scale_factor` cover larger faces until the
//! shorter image side drops below one cell.

/// PNet receptive-field size in pixels.
pub const CELL_SIZE: u32 = 12;

/// Scales to run PNet at, largest first.
///
/// Empty when the shorter image side is below `min_face_size` — no window
/// can fit, which is an empty result, not an error.
pub fn compute_scales(width: u32, height: u32, min_face_size: u32, scale_factor: f64) -> Vec<f64> {
    let m = CELL_SIZE as f64 / min_face_size as f64;
    let mut min_layer = width.min(height) as f64 * m;

    let mut scales = Vec::new();
    let mut scale = m;
    while min_layer >= CELL_SIZE as f64 {
        scales.push(scale);
        scale *= scale_factor;
        min_layer *= scale_factor;
    }
    scales
}
