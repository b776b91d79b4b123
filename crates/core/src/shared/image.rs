use std::path::Path;

use ndarray::ArrayView3;
use thiserror::Error;

/// Raised when input cannot be treated as a detectable image: raw data that
/// does not form a `height × width × channels` array, a file that fails to
/// decode, or pixel data with the wrong channel count.
#[derive(Error, Debug)]
#[error("invalid image: {reason}")]
pub struct InvalidImage {
    reason: String,
}

impl InvalidImage {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A single input image: contiguous BGR bytes in row-major order.
///
/// BGR matches what the cascade models were trained on; RGB→BGR reversal
/// happens at the I/O boundary in [`ImageData::open`]. The detection layer
/// treats pixel data as opaque beyond shape validation.
#[derive(Clone, Debug)]
pub struct ImageData {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl ImageData {
    /// Wraps raw pixel data. Fails with [`InvalidImage`] when the buffer
    /// length does not equal `width * height * channels`.
    pub fn from_raw(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
    ) -> Result<Self, InvalidImage> {
        let expected = (width as usize) * (height as usize) * (channels as usize);
        if data.len() != expected {
            return Err(InvalidImage::new(format!(
                "buffer of {} bytes does not form a {}x{}x{} array",
                data.len(),
                height,
                width,
                channels
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Decodes an image file and converts it to BGR.
    pub fn open(path: &Path) -> Result<Self, InvalidImage> {
        let decoded = image::open(path).map_err(|e| {
            InvalidImage::new(format!("cannot decode {}: {e}", path.display()))
        })?;
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut data = rgb.into_raw();
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        Ok(Self {
            data,
            width,
            height,
            channels: 3,
        })
    }

    /// Shape check performed before any inference touches the data.
    pub fn validate_for_detection(&self) -> Result<(), InvalidImage> {
        if self.channels != 3 {
            return Err(InvalidImage::new(format!(
                "expected 3-channel BGR data, got {} channel(s)",
                self.channels
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(InvalidImage::new("image has zero-sized dimensions"));
        }
        Ok(())
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                self.channels as usize,
            ),
            &self.data,
        )
        .expect("ImageData length is validated at construction")
    }
}
