#![allow(dead_code)]

use image::{GrayImage, ImageBuffer, Luma, Rgb};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Left-to-right ramp. Soft enough to count as blurry.
pub fn horizontal_gradient() -> GrayImage {
    GrayImage::from_fn(64, 64, |x, _| Luma([(x * 4) as u8]))
}

pub fn vertical_gradient() -> GrayImage {
    GrayImage::from_fn(64, 64, |_, y| Luma([(y * 4) as u8]))
}

/// High-frequency pattern with a very large Laplacian variance.
pub fn checkerboard() -> GrayImage {
    GrayImage::from_fn(64, 64, |x, y| {
        if (x / 2 + y / 2) % 2 == 0 {
            Luma([10])
        } else {
            Luma([245])
        }
    })
}

/// Checkerboard with a dark top half and a bright bottom half, so its hash
/// is far from both the flat and horizontal patterns while staying sharp.
pub fn split_checkerboard() -> GrayImage {
    GrayImage::from_fn(64, 64, |x, y| {
        let base = if y < 32 { 10 } else { 135 };
        if (x / 2 + y / 2) % 2 == 0 {
            Luma([base])
        } else {
            Luma([base + 110])
        }
    })
}

pub fn flat(value: u8) -> GrayImage {
    GrayImage::from_pixel(64, 64, Luma([value]))
}

pub fn save(dir: &Path, name: &str, image: &GrayImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

pub fn save_rgb(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let intensity = ((x + y) % 256) as u8;
        Rgb([intensity, intensity, intensity])
    });
    img.save(&path).unwrap();
    path
}

pub fn set_mtime(path: &Path, when: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(when)
        .unwrap();
}

pub fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}
