//! CLIP ViT-B/32 image preprocessing, same steps as the reference
//! CLIPProcessor: shortest-edge resize, center crop, rescale, normalize.

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;
use std::path::Path;

use crate::error::EmbedError;

// CLIP normalization constants (preprocessor_config.json)
const MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
const STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Square input edge of the visual encoder
pub const INPUT_SIZE: u32 = 224;

/// Open and decode an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage, EmbedError> {
    image::open(path).map_err(|source| EmbedError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })
}

/// Shortest side scaled to `target`, aspect ratio kept.
fn shortest_edge_size(w: u32, h: u32, target: u32) -> (u32, u32) {
    if w <= h {
        (target, ((target as u64 * h as u64) / w.max(1) as u64) as u32)
    } else {
        (((target as u64 * w as u64) / h.max(1) as u64) as u32, target)
    }
}

/// Preprocess an image into a `[1, 3, 224, 224]` NCHW tensor.
///
/// 1. Convert to RGB (drops alpha, expands grayscale)
/// 2. Resize shortest side to 224, bicubic
/// 3. Center crop to 224x224
/// 4. Rescale by 1/255 and normalize with CLIP mean/std
pub fn preprocess_image(img: &DynamicImage) -> Array4<f32> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let (w, h) = rgb.dimensions();
    let (new_w, new_h) = shortest_edge_size(w, h, INPUT_SIZE);
    let resized = if (w, h) == (new_w, new_h) {
        rgb
    } else {
        rgb.resize_exact(new_w, new_h, FilterType::CatmullRom)
    };

    let x = new_w.saturating_sub(INPUT_SIZE) / 2;
    let y = new_h.saturating_sub(INPUT_SIZE) / 2;
    let cropped = resized.crop_imm(x, y, INPUT_SIZE, INPUT_SIZE).to_rgb8();

    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for (px, py, pixel) in cropped.enumerate_pixels() {
        for (c, &val) in pixel.0.iter().enumerate() {
            tensor[[0, c, py as usize, px as usize]] = (val as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    tensor
}
