use crate::core::image::load_image;
use crate::error::Result;
use image::DynamicImage;
use image_hasher::{HashAlg, Hasher, HasherConfig};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Side length of the mean-hash grid; the fingerprint is `HASH_SIZE²` bits.
pub const HASH_SIZE: u32 = 8;

/// Fixed-width perceptual fingerprint of an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PerceptualHash {
    bits: Box<[u8]>,
}

impl PerceptualHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bits: bytes.to_vec().into_boxed_slice(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Hamming distance to `other`. Hashes of different widths count the
    /// missing bytes as fully different.
    pub fn distance(&self, other: &PerceptualHash) -> u32 {
        let common: u32 = self
            .bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        let extra = self.bits.len().abs_diff(other.bits.len()) as u32 * 8;
        common + extra
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.bits.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Serialize for PerceptualHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Reusable mean-hash ("average hash") generator.
pub struct PerceptualHasher {
    hasher: Hasher,
}

impl PerceptualHasher {
    pub fn new() -> Self {
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Mean)
            .hash_size(HASH_SIZE, HASH_SIZE)
            .to_hasher();
        Self { hasher }
    }

    pub fn hash_image(&self, image: &DynamicImage) -> PerceptualHash {
        PerceptualHash::from_bytes(self.hasher.hash_image(image).as_bytes())
    }

    pub fn hash_file(&self, path: &Path) -> Result<PerceptualHash> {
        let image = load_image(path)?;
        Ok(self.hash_image(&image))
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the perceptual fingerprint of a single image.
pub fn compute_hash(image: &DynamicImage) -> PerceptualHash {
    PerceptualHasher::new().hash_image(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn horizontal_gradient() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |x, _| Luma([(x * 4) as u8])))
    }

    fn vertical_gradient() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |_, y| Luma([(y * 4) as u8])))
    }

    #[test]
    fn test_hash_width() {
        let hash = compute_hash(&horizontal_gradient());
        assert_eq!(hash.as_bytes().len(), (HASH_SIZE * HASH_SIZE / 8) as usize);
        assert_eq!(hash.to_string().len(), 16);
    }

    #[test]
    fn test_identical_images_same_hash() {
        let a = compute_hash(&horizontal_gradient());
        let b = compute_hash(&horizontal_gradient());
        assert_eq!(a, b);
        assert_eq!(a.distance(&b), 0);
    }

    #[test]
    fn test_different_images_far_apart() {
        let a = compute_hash(&horizontal_gradient());
        let b = compute_hash(&vertical_gradient());
        assert!(a.distance(&b) >= 16, "distance was {}", a.distance(&b));
    }

    #[test]
    fn test_small_edits_stay_close() {
        let base = horizontal_gradient();
        let mut edited = base.to_luma8();
        edited.put_pixel(10, 10, Luma([255]));
        let a = compute_hash(&base);
        let b = compute_hash(&DynamicImage::ImageLuma8(edited));
        assert!(a.distance(&b) < 5);
    }

    #[test]
    fn test_distance_counts_bits() {
        let a = PerceptualHash::from_bytes(&[0b0000_0000, 0xff]);
        let b = PerceptualHash::from_bytes(&[0b0000_0111, 0xff]);
        assert_eq!(a.distance(&b), 3);
        assert_eq!(a.to_string(), "00ff");
    }
}
