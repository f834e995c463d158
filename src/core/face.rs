use crate::core::image::{Status, load_image};
use crate::error::{Error, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use rustface::{Detector, ImageData};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_TOLERANCE: f64 = 0.5;
pub const DEFAULT_OUTPUT_FOLDER: &str = "matched_images";

/// Length of a face embedding.
pub const ENCODING_LEN: usize = 128;

// the face patch is sampled portrait-shaped: 8 wide by 16 high
const PATCH_WIDTH: u32 = 8;
const PATCH_HEIGHT: u32 = 16;

/// Fixed-size, L2-normalised face embedding.
///
/// The values are the brightness pattern of the face crop, not a learned
/// identity descriptor. Two encodings are close when the crops look alike
/// (pose, lighting layout, expression), so `SeetaFaceEncoder` matches on
/// appearance only and the default tolerance is a starting point to tune.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceEncoding(Vec<f32>);

impl FaceEncoding {
    /// Normalise `values` into an encoding. Returns `None` for the wrong
    /// length or a vector with no variation.
    pub fn from_values(values: Vec<f32>) -> Option<Self> {
        if values.len() != ENCODING_LEN {
            return None;
        }
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm <= f32::EPSILON {
            return None;
        }
        Some(Self(values.into_iter().map(|v| v / norm).collect()))
    }

    /// Encode a grayscale crop that already contains just the face.
    ///
    /// The crop is resampled to a 8x16 patch, centred on its mean brightness
    /// and normalised, so global exposure changes do not move the encoding.
    pub fn from_patch(face: &GrayImage) -> Option<Self> {
        if face.width() == 0 || face.height() == 0 {
            return None;
        }
        let patch = imageops::resize(face, PATCH_WIDTH, PATCH_HEIGHT, FilterType::Triangle);
        let values: Vec<f32> = patch.pixels().map(|p| p[0] as f32).collect();
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        Self::from_values(values.into_iter().map(|v| v - mean).collect())
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean distance; 0 for identical faces, at most 2.
    pub fn distance(&self, other: &FaceEncoding) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| {
                let d = (*a - *b) as f64;
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }
}

/// Pluggable face embedding backend.
///
/// `Ok(None)` means the image holds no detectable face. Errors are reserved
/// for the backend itself failing.
pub trait FaceEncoder {
    fn encode(&mut self, image: &DynamicImage) -> Result<Option<FaceEncoding>>;
}

/// Encoder for images already cropped to a single face, such as frames
/// captured for use as a reference. A featureless image has no face.
#[derive(Debug, Default)]
pub struct CroppedFaceEncoder;

impl FaceEncoder for CroppedFaceEncoder {
    fn encode(&mut self, image: &DynamicImage) -> Result<Option<FaceEncoding>> {
        Ok(FaceEncoding::from_patch(&image.to_luma8()))
    }
}

/// Encoder that locates the largest frontal face with the SeetaFace cascade
/// and embeds that crop.
pub struct SeetaFaceEncoder {
    detector: Box<dyn Detector>,
}

impl SeetaFaceEncoder {
    pub fn from_model(model: &Path) -> Result<Self> {
        let model_err = |message: String| Error::FaceModel {
            path: model.to_path_buf(),
            message,
        };

        let model_path = model
            .to_str()
            .ok_or_else(|| model_err("path is not valid UTF-8".to_string()))?;
        if !model.is_file() {
            return Err(model_err("no such file".to_string()));
        }

        let mut detector =
            rustface::create_detector(model_path).map_err(|e| model_err(e.to_string()))?;
        detector.set_min_face_size(20);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        Ok(Self { detector })
    }
}

impl FaceEncoder for SeetaFaceEncoder {
    fn encode(&mut self, image: &DynamicImage) -> Result<Option<FaceEncoding>> {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        let faces = self.detector.detect(&ImageData::new(gray.as_raw(), width, height));

        let Some(face) = faces
            .iter()
            .max_by_key(|f| f.bbox().width() as u64 * f.bbox().height() as u64)
        else {
            return Ok(None);
        };

        let bbox = face.bbox();
        let Some((x, y, w, h)) =
            clip_to_image(bbox.x(), bbox.y(), bbox.width(), bbox.height(), width, height)
        else {
            return Ok(None);
        };
        log::debug!("face at ({x}, {y}) {w}x{h}, score {:.2}", face.score());

        let crop = imageops::crop_imm(&gray, x, y, w, h).to_image();
        Ok(FaceEncoding::from_patch(&crop))
    }
}

/// Intersect a detector box with the image bounds. `None` when nothing of
/// the box lies inside the image.
fn clip_to_image(
    x: i32,
    y: i32,
    w: u32,
    h: u32,
    width: u32,
    height: u32,
) -> Option<(u32, u32, u32, u32)> {
    let left = (x as i64).max(0);
    let top = (y as i64).max(0);
    let right = (x as i64 + w as i64).min(width as i64);
    let bottom = (y as i64 + h as i64).min(height as i64);
    if right <= left || bottom <= top {
        return None;
    }
    Some((
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    ))
}

/// True when `candidate` is strictly closer than `tolerance` to `reference`.
pub fn matches_reference(candidate: &FaceEncoding, reference: &FaceEncoding, tolerance: f64) -> bool {
    candidate.distance(reference) < tolerance
}

/// Encode the reference image for a run. A reference without a face is
/// fatal.
pub fn encode_reference(encoder: &mut dyn FaceEncoder, path: &Path) -> Result<FaceEncoding> {
    let image = load_image(path)?;
    encoder
        .encode(&image)?
        .ok_or_else(|| Error::NoFaceDetected(path.to_path_buf()))
}

/// Outcome of comparing one candidate file with the reference face.
#[derive(Debug, Clone, Serialize)]
pub struct FaceMatchRecord {
    pub path: PathBuf,
    pub face_found: bool,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copied_to: Option<PathBuf>,
    pub status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl FaceMatchRecord {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            face_found: false,
            matched: false,
            distance: None,
            copied_to: None,
            status: Status::Unprocessed,
            errors: Vec::new(),
        }
    }

    /// Encode the candidate and compare it with `reference`.
    ///
    /// Files without a face end up `Clear`. Unreadable files do too, with
    /// the decode error recorded. Neither aborts the batch.
    pub fn evaluate(
        &mut self,
        encoder: &mut dyn FaceEncoder,
        reference: &FaceEncoding,
        tolerance: f64,
    ) {
        let encoding = load_image(&self.path).and_then(|image| encoder.encode(&image));
        self.status = Status::Evaluated;

        match encoding {
            Ok(Some(encoding)) => {
                let distance = encoding.distance(reference);
                self.face_found = true;
                self.distance = Some(distance);
                self.matched = matches_reference(&encoding, reference, tolerance);
                log::debug!(
                    "{}: distance {:.3}, matched {}",
                    self.path.display(),
                    distance,
                    self.matched
                );
            }
            Ok(None) => {
                log::info!("No face found in {}; skipping", self.path.display());
            }
            Err(e) => {
                log::warn!("{}", e);
                self.errors.push(e.to_string());
            }
        }

        self.status = if self.matched {
            Status::Flagged
        } else {
            Status::Clear
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use tempfile::TempDir;

    fn face_like(seed: u32) -> GrayImage {
        GrayImage::from_fn(40, 80, |x, y| {
            let fx = x as f32 / 40.0;
            let fy = y as f32 / 80.0;
            let v = 128.0 + 60.0 * (fx * 3.0 + seed as f32).sin() * (fy * 5.0).cos();
            Luma([v as u8])
        })
    }

    #[test]
    fn test_encoding_is_normalised() {
        let encoding = FaceEncoding::from_patch(&face_like(1)).unwrap();
        assert_eq!(encoding.values().len(), ENCODING_LEN);
        let norm: f32 = encoding.values().iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_flat_patch_has_no_face() {
        let flat = GrayImage::from_pixel(20, 40, Luma([90]));
        assert!(FaceEncoding::from_patch(&flat).is_none());
        assert!(FaceEncoding::from_values(vec![1.0; 3]).is_none());
    }

    #[test]
    fn test_brightness_shift_still_matches() {
        let base = face_like(3);
        let mut brighter = base.clone();
        for p in brighter.pixels_mut() {
            p[0] = p[0].saturating_add(20);
        }

        let a = FaceEncoding::from_patch(&base).unwrap();
        let b = FaceEncoding::from_patch(&brighter).unwrap();
        assert!(matches_reference(&b, &a, DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_inverted_face_does_not_match() {
        let base = face_like(5);
        let mut inverted = base.clone();
        imageops::invert(&mut inverted);

        let a = FaceEncoding::from_patch(&base).unwrap();
        let b = FaceEncoding::from_patch(&inverted).unwrap();
        assert!(a.distance(&b) > 1.9);
        assert!(!matches_reference(&b, &a, DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_tolerance_is_strict() {
        let a = FaceEncoding::from_patch(&face_like(2)).unwrap();
        assert!(!matches_reference(&a, &a, 0.0));
        assert!(matches_reference(&a, &a, 1e-9));
    }

    #[test]
    fn test_reference_without_face_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blank.png");
        GrayImage::from_pixel(16, 16, Luma([0])).save(&path).unwrap();

        let err = encode_reference(&mut CroppedFaceEncoder, &path).unwrap_err();
        assert!(matches!(err, Error::NoFaceDetected(_)));
    }

    #[test]
    fn test_missing_model_is_reported() {
        let err = SeetaFaceEncoder::from_model(Path::new("/no/such/model.bin"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::FaceModel { .. }));
    }

    #[test]
    fn test_record_for_candidate_without_face() {
        let temp_dir = TempDir::new().unwrap();
        let reference = FaceEncoding::from_patch(&face_like(1)).unwrap();
        let path = temp_dir.path().join("wall.png");
        GrayImage::from_pixel(16, 16, Luma([200])).save(&path).unwrap();

        let mut record = FaceMatchRecord::new(&path);
        record.evaluate(&mut CroppedFaceEncoder, &reference, DEFAULT_TOLERANCE);
        assert!(!record.face_found);
        assert!(!record.matched);
        assert_eq!(record.status, Status::Clear);
        assert!(record.errors.is_empty());
    }

    #[test]
    fn test_clip_to_image() {
        assert_eq!(clip_to_image(10, 20, 30, 40, 100, 100), Some((10, 20, 30, 40)));
        // clipping the origin shrinks the box by the same amount
        assert_eq!(clip_to_image(-10, -5, 30, 40, 100, 100), Some((0, 0, 20, 35)));
        assert_eq!(clip_to_image(90, 90, 30, 30, 100, 100), Some((90, 90, 10, 10)));
        assert_eq!(clip_to_image(-40, 0, 30, 30, 100, 100), None);
        assert_eq!(clip_to_image(100, 0, 10, 10, 100, 100), None);
    }

    #[test]
    fn test_mirrored_face_is_a_different_appearance() {
        let base = face_like(1);
        let mirrored = imageops::flip_horizontal(&base);

        let a = FaceEncoding::from_patch(&base).unwrap();
        let b = FaceEncoding::from_patch(&mirrored).unwrap();
        assert!(a.distance(&b) > 1.0, "distance was {}", a.distance(&b));
        assert!(!matches_reference(&b, &a, DEFAULT_TOLERANCE));
    }
}
