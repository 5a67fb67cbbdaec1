// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame preprocessing for heatmap and SSD-style networks.
//!
//! These models take the frame resized to the exact input size (no letterbox),
//! in NCHW layout with raw `0..=255` values. OpenVINO-converted models expect
//! BGR channel order.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use ndarray::Array4;

/// Channel order of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    /// Blue, green, red (OpenVINO / Caffe convention).
    #[default]
    Bgr,
    /// Red, green, blue.
    Rgb,
}

impl ChannelOrder {
    /// Source RGB channel for each output channel.
    const fn source_channels(self) -> [usize; 3] {
        match self {
            Self::Bgr => [2, 1, 0],
            Self::Rgb => [0, 1, 2],
        }
    }
}

/// Resize a frame to the model input and convert it to a `[1, 3, H, W]` tensor.
///
/// # Arguments
///
/// * `image` - Input frame.
/// * `input_size` - Model input size as (height, width).
/// * `order` - Channel order the model expects.
///
/// # Returns
///
/// Tensor with raw (unnormalized) pixel values.
#[must_use]
pub fn preprocess_frame(
    image: &DynamicImage,
    input_size: (usize, usize),
    order: ChannelOrder,
) -> Array4<f32> {
    let (height, width) = input_size;
    let rgb = image.to_rgb8();

    #[allow(clippy::cast_possible_truncation)]
    let resized = if rgb.dimensions() == (width as u32, height as u32) {
        rgb
    } else {
        imageops::resize(&rgb, width as u32, height as u32, FilterType::Triangle)
    };

    rgb_to_tensor(&resized, order)
}

/// Convert an RGB buffer to a `[1, 3, H, W]` tensor in the requested channel order.
#[must_use]
pub fn rgb_to_tensor(image: &RgbImage, order: ChannelOrder) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let (width, height) = (width as usize, height as usize);
    let channels = order.source_channels();

    let mut tensor = Array4::zeros((1, 3, height, width));
    for (x, y, pixel) in image.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for (c, &source) in channels.iter().enumerate() {
            tensor[[0, c, y, x]] = f32::from(pixel[source]);
        }
    }
    tensor
}
