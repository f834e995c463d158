use crate::core::image::load_image;
use crate::error::Result;
use image::{DynamicImage, GrayImage, Luma};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BLUR_THRESHOLD: f64 = 100.0;

/// What to do with a file that cannot be decoded during a blur scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnreadablePolicy {
    /// Leave it unflagged; the decode error is still reported.
    #[default]
    Skip,
    /// Treat it as blurry, making it eligible for deletion.
    Flag,
}

/// Variance of the Laplacian of the grayscale image.
///
/// Uses the 4-neighbour kernel `[0 1 0; 1 -4 1; 0 1 0]` with reflect-101
/// borders, so every pixel contributes. Lower means fewer edges. Colour
/// images are reduced with BT.601 weights (0.299, 0.587, 0.114), the usual
/// convention for Laplacian blur scores.
pub fn sharpness(image: &DynamicImage) -> f64 {
    laplacian_variance(&grayscale(image))
}

pub fn is_blurry(image: &DynamicImage, threshold: f64) -> bool {
    is_below_threshold(sharpness(image), threshold)
}

/// The blur decision on an already computed score.
pub fn is_below_threshold(sharpness: f64, threshold: f64) -> bool {
    sharpness < threshold
}

pub fn sharpness_of_file(path: &Path) -> Result<f64> {
    let image = load_image(path)?;
    Ok(sharpness(&image))
}

fn grayscale(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
        Luma([luma.round().min(255.0) as u8])
    })
}

fn laplacian_variance(image: &GrayImage) -> f64 {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let px = |x: i64, y: i64| -> f64 {
        let x = reflect_101(x, width);
        let y = reflect_101(y, height);
        image.get_pixel(x, y)[0] as f64
    };

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let laplacian =
                px(x, y - 1) + px(x - 1, y) + px(x + 1, y) + px(x, y + 1) - 4.0 * px(x, y);
            sum += laplacian;
            sum_sq += laplacian * laplacian;
        }
    }

    let count = (width as f64) * (height as f64);
    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}

/// Mirror an out-of-range index without repeating the edge pixel.
fn reflect_101(i: i64, len: u32) -> u32 {
    let len = len as i64;
    if len == 1 {
        return 0;
    }
    let mut i = i;
    if i < 0 {
        i = -i;
    }
    if i >= len {
        i = 2 * (len - 1) - i;
    }
    i as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn flat(value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([value])))
    }

    fn checkerboard() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(32, 32, |x, y| {
            if (x + y) % 2 == 0 { Luma([0]) } else { Luma([255]) }
        }))
    }

    #[test]
    fn test_flat_image_has_no_edges() {
        assert_eq!(sharpness(&flat(128)), 0.0);
        assert!(is_blurry(&flat(128), DEFAULT_BLUR_THRESHOLD));
    }

    #[test]
    fn test_checkerboard_is_sharp() {
        let score = sharpness(&checkerboard());
        assert!(score > 10_000.0, "score was {score}");
        assert!(!is_blurry(&checkerboard(), DEFAULT_BLUR_THRESHOLD));
    }

    #[test]
    fn test_known_variance() {
        // row [0, 10, 0] gives laplacian [20, -20, 20]
        let img = GrayImage::from_raw(3, 1, vec![0, 10, 0]).unwrap();
        let score = sharpness(&DynamicImage::ImageLuma8(img));
        assert!((score - 3200.0 / 9.0).abs() < 1e-9, "score was {score}");
    }

    #[test]
    fn test_threshold_decision() {
        assert!(is_below_threshold(40.0, 100.0));
        assert!(!is_below_threshold(150.0, 100.0));
        assert!(!is_below_threshold(100.0, 100.0));
    }

    #[test]
    fn test_threshold_is_monotone() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(32, 32, |x, _| {
            Luma([(x * 8) as u8])
        }));
        let score = sharpness(&img);
        for t1 in [0.0, 1.0, 10.0, 100.0, 1000.0] {
            if is_blurry(&img, t1) {
                assert!(is_blurry(&img, t1 + 1.0));
                assert!(is_blurry(&img, t1 * 10.0 + 1.0));
            }
        }
        assert!(is_blurry(&img, score + 1.0));
        assert!(!is_blurry(&img, score));
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(2, 5), 2);
        assert_eq!(reflect_101(-1, 1), 0);
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(
            serde_json::to_string(&UnreadablePolicy::Flag).unwrap(),
            "\"flag\""
        );
        assert_eq!(UnreadablePolicy::default(), UnreadablePolicy::Skip);
    }

    #[test]
    fn test_colour_uses_bt601_weights() {
        let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([255, 0, 0])));
        assert_eq!(grayscale(&red).get_pixel(0, 0)[0], 76);
        let green = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([0, 255, 0])));
        assert_eq!(grayscale(&green).get_pixel(1, 1)[0], 150);
    }
}
