//! Image loading and preprocessing
//!
//! Turns a stored upload into the fixed-size, [0, 1]-scaled RGB tensor every
//! classifier in the cascade consumes. Steps, in order:
//! 1. read the raw bytes
//! 2. decode to 3-channel pixels
//! 3. cast to `f32` and divide by 255
//! 4. resize (bilinear) to the configured height and width
//!
//! The leading batch dimension is added when the tensor is handed to a
//! classifier, see [`ImageTensor::to_batched_tensor`].

use candle_core::{Device, Tensor};
use fashionlens_core::{Error, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageError, Rgb32FImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Color channels in every [`ImageTensor`]
pub const CHANNELS: usize = 3;

/// Target spatial size of the classifier input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSize {
    #[serde(default = "default_side")]
    pub height: u32,

    #[serde(default = "default_side")]
    pub width: u32,
}

impl InputSize {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// `[height, width, channels]`
    pub fn shape(&self) -> [usize; 3] {
        [self.height as usize, self.width as usize, CHANNELS]
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self {
            height: default_side(),
            width: default_side(),
        }
    }
}

fn default_side() -> u32 {
    60
}

/// A preprocessed image: HWC layout, RGB, values in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    height: usize,
    width: usize,
}

impl ImageTensor {
    /// Wrap an HWC buffer; its length must be `height * width * 3`
    pub fn new(data: Vec<f32>, height: usize, width: usize) -> Result<Self> {
        let expected = height * width * CHANNELS;
        if data.len() != expected {
            return Err(Error::shape_mismatch([expected], [data.len()]));
        }
        Ok(Self {
            data,
            height,
            width,
        })
    }

    /// An all-black image
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            data: vec![0.0; height * width * CHANNELS],
            height,
            width,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// `[height, width, channels]`
    pub fn shape(&self) -> [usize; 3] {
        [self.height, self.width, CHANNELS]
    }

    /// `[1, height, width, channels]`, the shape handed to a classifier
    pub fn batched_shape(&self) -> [usize; 4] {
        [1, self.height, self.width, CHANNELS]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// RGB values at row `y`, column `x`
    pub fn pixel(&self, y: usize, x: usize) -> Option<[f32; 3]> {
        if y >= self.height || x >= self.width {
            return None;
        }
        let offset = (y * self.width + x) * CHANNELS;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    /// Copy onto `device` as a `(1, H, W, C)` tensor
    pub fn to_batched_tensor(&self, device: &Device) -> candle_core::Result<Tensor> {
        Tensor::from_slice(&self.data, (1, self.height, self.width, CHANNELS), device)
    }
}

/// Decode, rescale and resize images to a fixed input size
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    size: InputSize,
}

impl ImagePreprocessor {
    /// Bilinear resizing to `size`
    pub fn new(size: InputSize) -> Self {
        Self { size }
    }

    pub fn input_size(&self) -> InputSize {
        self.size
    }

    /// Read, decode and preprocess the image stored at `path`
    pub fn load_and_preprocess(&self, path: impl AsRef<Path>) -> Result<ImageTensor> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "read image");
        self.preprocess_bytes(&bytes)
    }

    /// Decode and preprocess an in-memory encoded image
    pub fn preprocess_bytes(&self, bytes: &[u8]) -> Result<ImageTensor> {
        let image = image::load_from_memory(bytes).map_err(|e| match e {
            ImageError::Unsupported(inner) => Error::unsupported_format(inner.to_string()),
            other => Error::decode(other.to_string()),
        })?;
        Ok(self.preprocess_image(&image))
    }

    /// Rescale to [0, 1] and resize an already decoded image
    ///
    /// Images that already have the target size are not resampled, so a
    /// correctly sized float image passes through unchanged.
    pub fn preprocess_image(&self, image: &DynamicImage) -> ImageTensor {
        let rgb: Rgb32FImage = image.to_rgb32f();
        let InputSize { height, width } = self.size;

        let rgb = if rgb.dimensions() == (width, height) {
            rgb
        } else {
            imageops::resize(&rgb, width, height, FilterType::Triangle)
        };

        ImageTensor {
            data: rgb.into_raw(),
            height: height as usize,
            width: width as usize,
        }
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(InputSize::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};
    use std::io::Cursor;

    fn gradient(width: u32, height: u32) -> RgbImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 4 % 256) as u8, (y * 4 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    fn encode_png(image: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_output_shape() {
        let preprocessor = ImagePreprocessor::default();
        let tensor = preprocessor.preprocess_image(&DynamicImage::ImageRgb8(gradient(200, 120)));

        assert_eq!(tensor.shape(), [60, 60, 3]);
        assert_eq!(tensor.batched_shape(), [1, 60, 60, 3]);
        assert_eq!(tensor.data().len(), 60 * 60 * 3);
    }

    #[test]
    fn test_values_in_unit_range() {
        let preprocessor = ImagePreprocessor::default();
        let tensor = preprocessor.preprocess_image(&DynamicImage::ImageRgb8(gradient(97, 211)));

        assert!(tensor.data().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_rescale_divides_by_255() {
        let preprocessor = ImagePreprocessor::default();
        let image = gradient(60, 60);
        let tensor = preprocessor.preprocess_bytes(&encode_png(&image)).unwrap();

        for (x, y, px) in image.enumerate_pixels() {
            let got = tensor.pixel(y as usize, x as usize).unwrap();
            for c in 0..3 {
                assert!((got[c] - px.0[c] as f32 / 255.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_sized_normalized_input_is_unchanged() {
        let preprocessor = ImagePreprocessor::default();
        let input: Rgb32FImage = ImageBuffer::from_fn(60, 60, |x, y| {
            Rgb([x as f32 / 59.0, y as f32 / 59.0, 0.5])
        });
        let expected = input.clone().into_raw();

        let tensor = preprocessor.preprocess_image(&DynamicImage::ImageRgb32F(input));
        for (a, b) in tensor.data().iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6);
        }

        // A second pass over the output is a fixed point too
        let again = ImageTensor::new(tensor.data().to_vec(), 60, 60).unwrap();
        assert_eq!(again, tensor);
    }

    #[test]
    fn test_grayscale_expands_to_rgb() {
        let gray = image::GrayImage::from_pixel(10, 10, image::Luma([51]));
        let tensor = ImagePreprocessor::new(InputSize::new(10, 10))
            .preprocess_image(&DynamicImage::ImageLuma8(gray));

        let px = tensor.pixel(3, 4).unwrap();
        assert!(px.iter().all(|v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_corrupt_bytes_fail_to_decode() {
        let preprocessor = ImagePreprocessor::default();
        let mut bytes = encode_png(&gradient(8, 8));
        bytes.truncate(bytes.len() / 2);

        let err = preprocessor.preprocess_bytes(&bytes).unwrap_err();
        assert!(err.is_input_error(), "unexpected error: {}", err);
    }

    #[test]
    fn test_unknown_format_is_input_error() {
        let preprocessor = ImagePreprocessor::default();
        let err = preprocessor.preprocess_bytes(b"definitely not an image").unwrap_err();
        assert!(err.is_input_error(), "unexpected error: {}", err);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let preprocessor = ImagePreprocessor::default();
        let err = preprocessor
            .load_and_preprocess("/no/such/dir/shirt.jpg")
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shirt.png");
        std::fs::write(&path, encode_png(&gradient(120, 80))).unwrap();

        let tensor = ImagePreprocessor::default().load_and_preprocess(&path).unwrap();
        assert_eq!(tensor.shape(), [60, 60, 3]);
    }

    #[test]
    fn test_image_tensor_length_checked() {
        let err = ImageTensor::new(vec![0.0; 10], 2, 2).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_batched_tensor_shape() {
        let tensor = ImageTensor::zeros(60, 60)
            .to_batched_tensor(&Device::Cpu)
            .unwrap();
        assert_eq!(tensor.dims(), &[1, 60, 60, 3]);
    }
}
