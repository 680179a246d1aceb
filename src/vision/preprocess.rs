// src/vision/preprocess.rs
//! Turns uploaded image bytes into the normalized tensor the classifier expects.

use image::{DynamicImage, imageops::FilterType};
use thiserror::Error;

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 224;
pub const CHANNELS: usize = 3;

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Normalized image in CHW layout: all R values, then all G, then all B.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    height: usize,
    width: usize,
}

impl ImageTensor {
    pub fn from_raw(data: Vec<f32>, height: usize, width: usize) -> Option<Self> {
        (data.len() == CHANNELS * height * width).then_some(Self { data, height, width })
    }

    /// `[channels, height, width]`
    pub fn shape(&self) -> [usize; 3] {
        [CHANNELS, self.height, self.width]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Decode, resize to 224x224, scale to [0,1] and normalize per channel.
pub fn preprocess_image(bytes: &[u8]) -> Result<ImageTensor, PreprocessError> {
    let image = image::load_from_memory(bytes)?;
    Ok(normalize_image(&image))
}

pub fn normalize_image(image: &DynamicImage) -> ImageTensor {
    let rgb = image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    let num_pixels = (width * height) as usize;

    let mut data = vec![0.0f32; CHANNELS * num_pixels];
    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..CHANNELS {
            data[c * num_pixels + i] =
                (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    ImageTensor {
        data,
        height: height as usize,
        width: width as usize,
    }
}
