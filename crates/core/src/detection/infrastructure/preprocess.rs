//! Pixel plumbing between [`ImageData`] and stage input tensors.
//!
//! All three networks consume NHWC float32 in BGR order, normalized as
//! `(v - 127.5) * 0.0078125`. Pyramid levels are produced by bilinear
//! downsampling of the full image; refinement crops are cut out of the
//! original image with zero padding where a candidate box leaves the frame.

use ndarray::{Array4, ArrayView3};

use crate::detection::domain::box_utils::Candidate;
use crate::shared::image::ImageData;

const PIXEL_MEAN: f32 = 127.5;
const PIXEL_SCALE: f32 = 0.007_812_5;

/// Maps a raw intensity into the models' input range, roughly [-1, 1].
pub fn normalize(v: f32) -> f32 {
    (v - PIXEL_MEAN) * PIXEL_SCALE
}

/// One pyramid level: the whole image resized by `scale`, normalized, as a
/// single-element NHWC batch.
pub fn scaled_tensor(image: &ImageData, scale: f64) -> Array4<f32> {
    let src = image.as_ndarray();
    let src_w = image.width() as usize;
    let src_h = image.height() as usize;
    let ws = (src_w as f64 * scale).ceil() as usize;
    let hs = (src_h as f64 * scale).ceil() as usize;

    let mut tensor = Array4::<f32>::zeros((1, hs, ws, 3));
    for y in 0..hs {
        let fy = (y as f32 + 0.5) * src_h as f32 / hs as f32 - 0.5;
        for x in 0..ws {
            let fx = (x as f32 + 0.5) * src_w as f32 / ws as f32 - 0.5;
            for c in 0..3 {
                tensor[[0, y, x, c]] = normalize(sample_clamped(src, fx, fy, c));
            }
        }
    }
    tensor
}

/// Refinement-stage input: each candidate box cropped out of the image and
/// resized to `size × size`, stacked into an NHWC batch in candidate order.
///
/// Box corners are pixel-inclusive; pixels outside the image contribute
/// zero intensity.
pub fn crop_batch(image: &ImageData, cands: &[Candidate], size: u32) -> Array4<f32> {
    let src = image.as_ndarray();
    let s = size as usize;
    let mut batch = Array4::<f32>::zeros((cands.len(), s, s, 3));

    for (n, cand) in cands.iter().enumerate() {
        let rw = cand.width() + 1.0;
        let rh = cand.height() + 1.0;
        for y in 0..s {
            let fy = cand.y1 + (y as f32 + 0.5) * rh / s as f32 - 0.5;
            for x in 0..s {
                let fx = cand.x1 + (x as f32 + 0.5) * rw / s as f32 - 0.5;
                for c in 0..3 {
                    batch[[n, y, x, c]] = normalize(sample_zero_padded(src, fx, fy, c));
                }
            }
        }
    }
    batch
}

/// Bilinear sample with edge clamping, for whole-image resizes.
fn sample_clamped(src: ArrayView3<u8>, fx: f32, fy: f32, c: usize) -> f32 {
    let (h, w) = (src.shape()[0] as i64, src.shape()[1] as i64);
    let pixel = |xi: i64, yi: i64| {
        let xi = xi.clamp(0, w - 1) as usize;
        let yi = yi.clamp(0, h - 1) as usize;
        src[[yi, xi, c]] as f32
    };
    blend(fx, fy, pixel)
}

/// Bilinear sample where out-of-image pixels read as zero, for crops that
/// overhang the frame.
fn sample_zero_padded(src: ArrayView3<u8>, fx: f32, fy: f32, c: usize) -> f32 {
    let (h, w) = (src.shape()[0] as i64, src.shape()[1] as i64);
    let pixel = |xi: i64, yi: i64| {
        if xi < 0 || yi < 0 || xi >= w || yi >= h {
            0.0
        } else {
            src[[yi as usize, xi as usize, c]] as f32
        }
    };
    blend(fx, fy, pixel)
}

fn blend(fx: f32, fy: f32, pixel: impl Fn(i64, i64) -> f32) -> f32 {
    let x0 = fx.floor();
    let y0 = fy.floor();
    let dx = fx - x0;
    let dy = fy - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let top = pixel(x0, y0) * (1.0 - dx) + pixel(x0 + 1, y0) * dx;
    let bottom = pixel(x0, y0 + 1) * (1.0 - dx) + pixel(x0 + 1, y0 + 1) * dx;
    top * (1.0 - dy) + bottom * dy
}
