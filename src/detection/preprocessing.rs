use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::filter::bilateral_filter;
use imageproc::morphology::{close, open};

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Parameters of the edge-preserving smoothing pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilateralParams {
    /// Neighbourhood diameter in pixels.
    pub diameter: u32,
    pub sigma_color: f32,
    pub sigma_space: f32,
}

impl Default for BilateralParams {
    fn default() -> Self {
        Self {
            diameter: 9,
            sigma_color: 75.0,
            sigma_space: 75.0,
        }
    }
}

/// Edge-preserving smoothing: flat areas are averaged while stroke edges survive.
pub fn bilateral_smooth(img: &GrayImage, params: &BilateralParams) -> GrayImage {
    if img.width() == 0 || img.height() == 0 {
        return img.clone();
    }
    bilateral_filter(img, params.diameter, params.sigma_color, params.sigma_space)
}

/// Global black/white split at the Otsu level; pixels above it become white.
pub fn binarize_otsu(img: &GrayImage) -> GrayImage {
    let level = otsu_level(img);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y)[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Bounds of the "near-white" colour class, on the 0-255 HSV scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhiteBounds {
    pub max_saturation: u8,
    pub min_value: u8,
}

impl Default for WhiteBounds {
    fn default() -> Self {
        Self {
            max_saturation: 60,
            min_value: 188,
        }
    }
}

/// HSV saturation and value of an RGB pixel, both scaled to 0-255.
pub fn saturation_value(rgb: [u8; 3]) -> (u8, u8) {
    let max = rgb.iter().copied().max().unwrap_or(0);
    let min = rgb.iter().copied().min().unwrap_or(0);
    if max == 0 {
        return (0, 0);
    }
    let max32 = max as u32;
    let saturation = ((max32 - min as u32) * 255 + max32 / 2) / max32;
    (saturation as u8, max)
}

/// Binary mask of bright, low-saturation pixels (the card's printed background).
pub fn white_mask(img: &DynamicImage, bounds: &WhiteBounds) -> GrayImage {
    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let (saturation, value) = saturation_value(rgb.get_pixel(x, y).0);
        if saturation <= bounds.max_saturation && value >= bounds.min_value {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Morphological close then open with a square kernel of side `2 * radius + 1`:
/// fills small holes, then removes speckles.
pub fn clean_mask(mask: &GrayImage, radius: u8) -> GrayImage {
    let closed = close(mask, Norm::LInf, radius);
    open(&closed, Norm::LInf, radius)
}
