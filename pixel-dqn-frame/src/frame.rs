use anyhow::Result;
use image::RgbImage;
use ndarray::{Array3, ArrayView3};
use pixel_dqn_core::error::PixelDqnError;

/// A 3-channel raster image of shape `height × width × 3`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    data: Array3<u8>,
}

impl Frame {
    /// Creates a frame from row-major RGB bytes.
    pub fn new(height: usize, width: usize, data: Vec<u8>) -> Result<Self> {
        let len = data.len();
        let data = Array3::from_shape_vec((height, width, 3), data).map_err(|_| {
            PixelDqnError::InvalidInput(format!(
                "{} bytes do not form a {}x{}x3 frame",
                len, height, width
            ))
        })?;
        Ok(Self { data })
    }

    /// Creates a frame from an array of shape `height × width × 3`.
    pub fn from_array(data: Array3<u8>) -> Result<Self> {
        if data.shape()[2] != 3 {
            return Err(PixelDqnError::InvalidInput(format!(
                "a frame must have 3 channels, got {}",
                data.shape()[2]
            ))
            .into());
        }
        Ok(Self { data })
    }

    /// Creates a frame from an RGB image.
    pub fn from_rgb_image(img: &RgbImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        Self::new(height as usize, width as usize, img.as_raw().clone())
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.data.shape()[0]
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.data.shape()[1]
    }

    /// View of the underlying array.
    pub fn as_array(&self) -> ArrayView3<u8> {
        self.data.view()
    }
}
